use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "id": 1,
    "code": "ANNUAL",
    "name": "Annual Leave",
    "defaultAnnualQuotaDays": 14
}))]
pub struct LeaveType {
    pub id: u64,
    /// Unique, matched case-insensitively
    pub code: String,
    pub name: String,
    /// 0 or absent means the type is not quota-limited
    pub default_annual_quota_days: Option<i32>,
}

impl LeaveType {
    pub fn has_code(&self, code: &str) -> bool {
        self.code.eq_ignore_ascii_case(code.trim())
    }

    /// Configured quota when it is a positive number of days.
    pub fn quota_days(&self) -> Option<i64> {
        self.default_annual_quota_days
            .filter(|days| *days > 0)
            .map(i64::from)
    }
}
