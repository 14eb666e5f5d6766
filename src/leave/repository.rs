//! Storage contracts consumed by the policy engine, with their MySQL implementations.

use crate::error::{LeaveError, LeaveResult};
use crate::model::leave_request::{LeaveRequest, LeaveStatus, NewLeaveRequest};
use crate::model::leave_type::LeaveType;
use crate::model::report::MonthlyLeaveCounts;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, MySqlPool};
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct LeaveListFilter {
    pub status: Option<LeaveStatus>,
    /// `None` lists every employee's requests
    pub employee_id: Option<u64>,
    /// 1-based
    pub page: u32,
    pub page_size: u32,
}

impl LeaveListFilter {
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }
}

/// A Pending -> terminal edge. Applied only if the row is still Pending.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub id: u64,
    pub status: LeaveStatus,
    pub approved_by: Option<u64>,
    pub approved_at: Option<DateTime<Utc>>,
    pub reject_reason: Option<String>,
    pub updated_by: u64,
    pub updated_at: DateTime<Utc>,
}

#[async_trait]
pub trait LeaveRepository: Send + Sync {
    async fn find(&self, id: u64) -> LeaveResult<Option<LeaveRequest>>;

    /// Newest first, with the total matching count.
    async fn list(&self, filter: &LeaveListFilter) -> LeaveResult<(Vec<LeaveRequest>, i64)>;

    /// Pending or Approved requests of one employee.
    async fn active_for_employee(
        &self,
        employee_id: u64,
        exclude_id: Option<u64>,
    ) -> LeaveResult<Vec<LeaveRequest>>;

    /// Approved requests of one employee and leave type intersecting `[from, to]`.
    async fn approved_of_type(
        &self,
        employee_id: u64,
        leave_type_id: u64,
        from: NaiveDate,
        to: NaiveDate,
        exclude_id: Option<u64>,
    ) -> LeaveResult<Vec<LeaveRequest>>;

    async fn insert(&self, new: &NewLeaveRequest) -> LeaveResult<LeaveRequest>;

    /// `false` when the row had already left Pending.
    async fn apply_status_change(&self, change: &StatusChange) -> LeaveResult<bool>;

    /// Requests starting in `year`, grouped by start month. Months without requests are omitted.
    async fn monthly_counts(&self, year: i32) -> LeaveResult<Vec<MonthlyLeaveCounts>>;
}

#[async_trait]
pub trait LeaveTypeCatalog: Send + Sync {
    /// Case-insensitive.
    async fn find_by_code(&self, code: &str) -> LeaveResult<Option<LeaveType>>;

    /// Ordered by id.
    async fn all(&self) -> LeaveResult<Vec<LeaveType>>;
}

const SELECT_LEAVE: &str = r#"
    SELECT
        lr.id, lr.employee_id, lr.leave_type_id,
        lt.code AS leave_type_code, lt.name AS leave_type_name,
        lr.start_date, lr.end_date, lr.days, lr.reason, lr.status,
        lr.approved_by, lr.approved_at, lr.reject_reason,
        lr.created_at, lr.created_by, lr.updated_at, lr.updated_by
    FROM leave_requests lr
    JOIN leave_types lt ON lt.id = lr.leave_type_id
"#;

#[derive(FromRow)]
struct LeaveRow {
    id: u64,
    employee_id: u64,
    leave_type_id: u64,
    leave_type_code: String,
    leave_type_name: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    days: i32,
    reason: String,
    status: String,
    approved_by: Option<u64>,
    approved_at: Option<DateTime<Utc>>,
    reject_reason: Option<String>,
    created_at: DateTime<Utc>,
    created_by: Option<u64>,
    updated_at: Option<DateTime<Utc>>,
    updated_by: Option<u64>,
}

impl TryFrom<LeaveRow> for LeaveRequest {
    type Error = LeaveError;

    fn try_from(row: LeaveRow) -> Result<Self, Self::Error> {
        let status = LeaveStatus::from_str(&row.status).map_err(|_| {
            LeaveError::Storage(format!(
                "leave request {} has unknown status '{}'",
                row.id, row.status
            ))
        })?;

        Ok(LeaveRequest {
            id: row.id,
            employee_id: row.employee_id,
            leave_type_id: row.leave_type_id,
            leave_type_code: row.leave_type_code,
            leave_type_name: row.leave_type_name,
            start_date: row.start_date,
            end_date: row.end_date,
            days: i64::from(row.days),
            reason: row.reason,
            status,
            approved_by: row.approved_by,
            approved_at: row.approved_at,
            reject_reason: row.reject_reason,
            created_at: row.created_at,
            created_by: row.created_by,
            updated_at: row.updated_at,
            updated_by: row.updated_by,
        })
    }
}

fn into_requests(rows: Vec<LeaveRow>) -> LeaveResult<Vec<LeaveRequest>> {
    rows.into_iter().map(LeaveRequest::try_from).collect()
}

#[derive(FromRow)]
struct MonthlyRow {
    month: i64,
    total_requests: i64,
    approved_requests: i64,
    pending_requests: i64,
    rejected_requests: i64,
}

// Typed values for dynamically assembled WHERE clauses.
enum FilterValue {
    U64(u64),
    Str(String),
}

#[derive(Clone)]
pub struct MySqlLeaveRepository {
    pool: MySqlPool,
}

impl MySqlLeaveRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LeaveRepository for MySqlLeaveRepository {
    async fn find(&self, id: u64) -> LeaveResult<Option<LeaveRequest>> {
        let sql = format!("{SELECT_LEAVE} WHERE lr.id = ?");
        sqlx::query_as::<_, LeaveRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(LeaveRequest::try_from)
            .transpose()
    }

    async fn list(&self, filter: &LeaveListFilter) -> LeaveResult<(Vec<LeaveRequest>, i64)> {
        let mut conditions = Vec::new();
        let mut values = Vec::new();

        if let Some(status) = filter.status {
            conditions.push("lr.status = ?");
            values.push(FilterValue::Str(status.to_string()));
        }
        if let Some(employee_id) = filter.employee_id {
            conditions.push("lr.employee_id = ?");
            values.push(FilterValue::U64(employee_id));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_sql = format!("SELECT COUNT(*) FROM leave_requests lr {where_clause}");
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        for value in &values {
            count_query = match value {
                FilterValue::U64(v) => count_query.bind(*v),
                FilterValue::Str(v) => count_query.bind(v.as_str()),
            };
        }
        let total = count_query.fetch_one(&self.pool).await?;

        let list_sql =
            format!("{SELECT_LEAVE} {where_clause} ORDER BY lr.created_at DESC, lr.id DESC LIMIT ? OFFSET ?");
        let mut list_query = sqlx::query_as::<_, LeaveRow>(&list_sql);
        for value in &values {
            list_query = match value {
                FilterValue::U64(v) => list_query.bind(*v),
                FilterValue::Str(v) => list_query.bind(v.as_str()),
            };
        }
        let rows = list_query
            .bind(u64::from(filter.page_size))
            .bind(filter.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok((into_requests(rows)?, total))
    }

    async fn active_for_employee(
        &self,
        employee_id: u64,
        exclude_id: Option<u64>,
    ) -> LeaveResult<Vec<LeaveRequest>> {
        let sql = format!(
            "{SELECT_LEAVE} WHERE lr.employee_id = ? AND lr.status IN ('pending', 'approved') AND lr.id <> ?"
        );
        let rows = sqlx::query_as::<_, LeaveRow>(&sql)
            .bind(employee_id)
            .bind(exclude_id.unwrap_or(0))
            .fetch_all(&self.pool)
            .await?;
        into_requests(rows)
    }

    async fn approved_of_type(
        &self,
        employee_id: u64,
        leave_type_id: u64,
        from: NaiveDate,
        to: NaiveDate,
        exclude_id: Option<u64>,
    ) -> LeaveResult<Vec<LeaveRequest>> {
        let sql = format!(
            "{SELECT_LEAVE} WHERE lr.employee_id = ? AND lr.leave_type_id = ? \
             AND lr.status = 'approved' AND lr.start_date <= ? AND lr.end_date >= ? AND lr.id <> ?"
        );
        let rows = sqlx::query_as::<_, LeaveRow>(&sql)
            .bind(employee_id)
            .bind(leave_type_id)
            .bind(to)
            .bind(from)
            .bind(exclude_id.unwrap_or(0))
            .fetch_all(&self.pool)
            .await?;
        into_requests(rows)
    }

    async fn insert(&self, new: &NewLeaveRequest) -> LeaveResult<LeaveRequest> {
        let days = i32::try_from(new.days)
            .map_err(|_| LeaveError::validation("Leave request spans too many days."))?;

        let result = sqlx::query(
            r#"
            INSERT INTO leave_requests
                (employee_id, leave_type_id, start_date, end_date, days, reason, status, created_at, created_by)
            VALUES (?, ?, ?, ?, ?, ?, 'pending', ?, ?)
            "#,
        )
        .bind(new.employee_id)
        .bind(new.leave_type.id)
        .bind(new.start_date)
        .bind(new.end_date)
        .bind(days)
        .bind(&new.reason)
        .bind(new.created_at)
        .bind(new.created_by)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_id();
        self.find(id)
            .await?
            .ok_or_else(|| LeaveError::Storage(format!("inserted leave request {id} not readable")))
    }

    async fn apply_status_change(&self, change: &StatusChange) -> LeaveResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE leave_requests
            SET status = ?, approved_by = ?, approved_at = ?, reject_reason = ?,
                updated_by = ?, updated_at = ?
            WHERE id = ?
              AND status = 'pending'
            "#,
        )
        .bind(change.status.to_string())
        .bind(change.approved_by)
        .bind(change.approved_at)
        .bind(change.reject_reason.as_deref())
        .bind(change.updated_by)
        .bind(change.updated_at)
        .bind(change.id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn monthly_counts(&self, year: i32) -> LeaveResult<Vec<MonthlyLeaveCounts>> {
        let (Some(from), Some(until)) = (
            NaiveDate::from_ymd_opt(year, 1, 1),
            year.checked_add(1).and_then(|next| NaiveDate::from_ymd_opt(next, 1, 1)),
        ) else {
            return Err(LeaveError::validation(format!("Invalid year: {year}")));
        };

        let rows = sqlx::query_as::<_, MonthlyRow>(
            r#"
            SELECT
                CAST(MONTH(start_date) AS SIGNED) AS month,
                COUNT(*) AS total_requests,
                CAST(COALESCE(SUM(status = 'approved'), 0) AS SIGNED) AS approved_requests,
                CAST(COALESCE(SUM(status = 'pending'), 0) AS SIGNED) AS pending_requests,
                CAST(COALESCE(SUM(status = 'rejected'), 0) AS SIGNED) AS rejected_requests
            FROM leave_requests
            WHERE start_date >= ? AND start_date < ?
            GROUP BY month
            ORDER BY month
            "#,
        )
        .bind(from)
        .bind(until)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let month = u32::try_from(row.month).map_err(|_| {
                    LeaveError::Storage(format!("unexpected month {} in leave report", row.month))
                })?;
                Ok(MonthlyLeaveCounts {
                    year,
                    month,
                    total_requests: row.total_requests,
                    approved_requests: row.approved_requests,
                    pending_requests: row.pending_requests,
                    rejected_requests: row.rejected_requests,
                })
            })
            .collect()
    }
}

#[derive(Clone)]
pub struct MySqlLeaveTypeCatalog {
    pool: MySqlPool,
}

impl MySqlLeaveTypeCatalog {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LeaveTypeCatalog for MySqlLeaveTypeCatalog {
    async fn find_by_code(&self, code: &str) -> LeaveResult<Option<LeaveType>> {
        let leave_type = sqlx::query_as::<_, LeaveType>(
            "SELECT id, code, name, default_annual_quota_days FROM leave_types WHERE UPPER(code) = UPPER(?)",
        )
        .bind(code.trim())
        .fetch_optional(&self.pool)
        .await?;
        Ok(leave_type)
    }

    async fn all(&self) -> LeaveResult<Vec<LeaveType>> {
        let types = sqlx::query_as::<_, LeaveType>(
            "SELECT id, code, name, default_annual_quota_days FROM leave_types ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(types)
    }
}
