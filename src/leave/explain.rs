//! Fact record sent to the provider, and the explanation built from it alone.

use crate::model::leave_request::{LeaveRequest, LeaveStatus};
use chrono::SecondsFormat;
use serde::Serialize;

/// Phrases that mark a provider or fallback message rather than an explanation.
const FAILURE_MARKERS: &[&str] = &[
    "unavailable",
    "disabled",
    "not configured",
    "could not be generated",
    "api key",
    "ai service",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionFacts {
    pub leave_request_id: u64,
    pub leave_type_code: String,
    pub leave_type_name: String,
    pub start_date: String,
    pub end_date: String,
    pub days: i64,
    pub status: LeaveStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reject_reason: Option<String>,
}

impl From<&LeaveRequest> for DecisionFacts {
    fn from(request: &LeaveRequest) -> Self {
        Self {
            leave_request_id: request.id,
            leave_type_code: request.leave_type_code.clone(),
            leave_type_name: request.leave_type_name.clone(),
            start_date: request.start_date.to_string(),
            end_date: request.end_date.to_string(),
            days: request.days,
            status: request.status,
            approved_at: request
                .approved_at
                .map(|at| at.to_rfc3339_opts(SecondsFormat::Secs, true)),
            reject_reason: request.reject_reason.clone(),
        }
    }
}

impl DecisionFacts {
    pub fn explain(&self) -> String {
        let subject = format!(
            "Your {} ({}) request from {} to {} ({} day{})",
            self.leave_type_name,
            self.leave_type_code,
            self.start_date,
            self.end_date,
            self.days,
            if self.days == 1 { "" } else { "s" }
        );

        match self.status {
            LeaveStatus::Approved => match &self.approved_at {
                Some(at) => format!("{subject} was approved at {at}."),
                None => format!("{subject} was approved."),
            },
            LeaveStatus::Rejected => match &self.reject_reason {
                Some(reason) => format!("{subject} was rejected. Reason: {reason}"),
                None => format!("{subject} was rejected. No rejection reason was recorded."),
            },
            LeaveStatus::Pending => {
                format!("{subject} is pending review; no decision has been made yet.")
            }
            LeaveStatus::Cancelled => format!("{subject} was cancelled before a decision was made."),
        }
    }
}

pub fn looks_like_failure(explanation: &str) -> bool {
    let lowered = explanation.to_lowercase();
    lowered.trim().is_empty() || FAILURE_MARKERS.iter().any(|m| lowered.contains(m))
}
