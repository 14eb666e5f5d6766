use super::leave_request::LeaveStatus;
use serde::Serialize;
use utoipa::ToSchema;

/// Requests starting in one calendar month, broken down by status.
///
/// Cancelled requests only show up in `total_requests`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "year": 2026,
    "month": 3,
    "totalRequests": 5,
    "approvedRequests": 3,
    "pendingRequests": 1,
    "rejectedRequests": 1
}))]
pub struct MonthlyLeaveCounts {
    pub year: i32,
    /// 1 to 12
    pub month: u32,
    pub total_requests: i64,
    pub approved_requests: i64,
    pub pending_requests: i64,
    pub rejected_requests: i64,
}

impl MonthlyLeaveCounts {
    pub fn empty(year: i32, month: u32) -> Self {
        Self {
            year,
            month,
            total_requests: 0,
            approved_requests: 0,
            pending_requests: 0,
            rejected_requests: 0,
        }
    }

    pub fn count(&mut self, status: LeaveStatus) {
        self.total_requests += 1;
        match status {
            LeaveStatus::Approved => self.approved_requests += 1,
            LeaveStatus::Pending => self.pending_requests += 1,
            LeaveStatus::Rejected => self.rejected_requests += 1,
            LeaveStatus::Cancelled => {}
        }
    }
}
