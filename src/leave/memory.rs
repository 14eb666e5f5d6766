//! In-process stand-ins for the MySQL repository and catalog.

use super::repository::{LeaveListFilter, LeaveRepository, LeaveTypeCatalog, StatusChange};
use super::rules::ranges_overlap;
use crate::error::LeaveResult;
use crate::model::leave_request::{LeaveRequest, LeaveStatus, NewLeaveRequest};
use crate::model::leave_type::LeaveType;
use crate::model::report::MonthlyLeaveCounts;
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct MemoryLeaveRepository {
    rows: Mutex<BTreeMap<u64, LeaveRequest>>,
}

impl MemoryLeaveRepository {
    /// Seeds a row as-is, e.g. one already approved.
    pub fn put(&self, request: LeaveRequest) {
        self.rows.lock().unwrap().insert(request.id, request);
    }

    fn select(&self, keep: impl Fn(&LeaveRequest) -> bool) -> Vec<LeaveRequest> {
        self.rows
            .lock()
            .unwrap()
            .values()
            .filter(|r| keep(r))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl LeaveRepository for MemoryLeaveRepository {
    async fn find(&self, id: u64) -> LeaveResult<Option<LeaveRequest>> {
        Ok(self.rows.lock().unwrap().get(&id).cloned())
    }

    async fn list(&self, filter: &LeaveListFilter) -> LeaveResult<(Vec<LeaveRequest>, i64)> {
        let mut matching = self.select(|r| {
            filter.status.is_none_or(|s| r.status == s)
                && filter.employee_id.is_none_or(|e| r.employee_id == e)
        });
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(filter.offset() as usize)
            .take(filter.page_size as usize)
            .collect();
        Ok((page, total))
    }

    async fn active_for_employee(
        &self,
        employee_id: u64,
        exclude_id: Option<u64>,
    ) -> LeaveResult<Vec<LeaveRequest>> {
        Ok(self.select(|r| {
            r.employee_id == employee_id && r.status.is_active() && Some(r.id) != exclude_id
        }))
    }

    async fn approved_of_type(
        &self,
        employee_id: u64,
        leave_type_id: u64,
        from: NaiveDate,
        to: NaiveDate,
        exclude_id: Option<u64>,
    ) -> LeaveResult<Vec<LeaveRequest>> {
        Ok(self.select(|r| {
            r.employee_id == employee_id
                && r.leave_type_id == leave_type_id
                && r.status == LeaveStatus::Approved
                && ranges_overlap(r.start_date, r.end_date, from, to)
                && Some(r.id) != exclude_id
        }))
    }

    async fn insert(&self, new: &NewLeaveRequest) -> LeaveResult<LeaveRequest> {
        let mut rows = self.rows.lock().unwrap();
        let id = rows.keys().next_back().map_or(1, |last| last + 1);
        let request = LeaveRequest {
            id,
            employee_id: new.employee_id,
            leave_type_id: new.leave_type.id,
            leave_type_code: new.leave_type.code.clone(),
            leave_type_name: new.leave_type.name.clone(),
            start_date: new.start_date,
            end_date: new.end_date,
            days: new.days,
            reason: new.reason.clone(),
            status: LeaveStatus::Pending,
            approved_by: None,
            approved_at: None,
            reject_reason: None,
            created_at: new.created_at,
            created_by: new.created_by,
            updated_at: None,
            updated_by: None,
        };
        rows.insert(id, request.clone());
        Ok(request)
    }

    async fn apply_status_change(&self, change: &StatusChange) -> LeaveResult<bool> {
        let mut rows = self.rows.lock().unwrap();
        let Some(row) = rows.get_mut(&change.id) else {
            return Ok(false);
        };
        if row.status != LeaveStatus::Pending {
            return Ok(false);
        }
        row.status = change.status;
        row.approved_by = change.approved_by;
        row.approved_at = change.approved_at;
        row.reject_reason = change.reject_reason.clone();
        row.updated_by = Some(change.updated_by);
        row.updated_at = Some(change.updated_at);
        Ok(true)
    }

    async fn monthly_counts(&self, year: i32) -> LeaveResult<Vec<MonthlyLeaveCounts>> {
        let mut months = BTreeMap::new();
        for r in self.select(|r| r.start_date.year() == year) {
            let month = r.start_date.month();
            months
                .entry(month)
                .or_insert_with(|| MonthlyLeaveCounts::empty(year, month))
                .count(r.status);
        }
        Ok(months.into_values().collect())
    }
}

pub struct MemoryLeaveTypeCatalog {
    types: Vec<LeaveType>,
}

impl MemoryLeaveTypeCatalog {
    pub fn new(types: Vec<LeaveType>) -> Self {
        Self { types }
    }

    /// ANNUAL (14 days), SICK and UNPAID, as seeded by the migration.
    pub fn standard() -> Self {
        let leave_type = |id, code: &str, name: &str, quota| LeaveType {
            id,
            code: code.to_string(),
            name: name.to_string(),
            default_annual_quota_days: quota,
        };
        Self::new(vec![
            leave_type(1, "ANNUAL", "Annual Leave", Some(14)),
            leave_type(2, "SICK", "Sick Leave", Some(0)),
            leave_type(3, "UNPAID", "Unpaid Leave", None),
        ])
    }
}

#[async_trait]
impl LeaveTypeCatalog for MemoryLeaveTypeCatalog {
    async fn find_by_code(&self, code: &str) -> LeaveResult<Option<LeaveType>> {
        Ok(self.types.iter().find(|t| t.has_code(code)).cloned())
    }

    async fn all(&self) -> LeaveResult<Vec<LeaveType>> {
        let mut types = self.types.clone();
        types.sort_by_key(|t| t.id);
        Ok(types)
    }
}
