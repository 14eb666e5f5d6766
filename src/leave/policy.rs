//! Leave-request state machine with overlap and annual-quota enforcement.
//!
//! Every status change is a one-way Pending -> terminal edge. Approval re-runs
//! the overlap and quota checks against the current state of the employee's
//! other requests, and create/approve for one employee are serialized in-process.

use super::explain::{DecisionFacts, looks_like_failure};
use super::locks::EmployeeLocks;
use super::repository::{LeaveListFilter, LeaveRepository, LeaveTypeCatalog, StatusChange};
use super::rules::{days_within_year, inclusive_days, ranges_overlap, years_touched};
use crate::ai::AiAugmentationGateway;
use crate::ai::types::{AiInsights, DecisionExplanation, ReasonNormalization};
use crate::config::LeavePolicyConfig;
use crate::error::{BusinessRule, LeaveError, LeaveResult};
use crate::model::leave_request::{LeaveRequest, LeaveStatus, NewLeaveRequest};
use crate::model::leave_type::LeaveType;
use crate::model::report::MonthlyLeaveCounts;
use chrono::{Datelike, NaiveDate, Utc};
use std::ops::RangeInclusive;
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;
pub const REPORT_YEARS: RangeInclusive<i32> = 2000..=2100;

/// Who is acting, as far as the engine cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: u64,
    pub employee_id: Option<u64>,
    /// HR or Admin
    pub privileged: bool,
}

impl Actor {
    fn can_access(&self, request: &LeaveRequest) -> bool {
        self.privileged || request.is_owned_by(self.employee_id)
    }

    fn require_privileged(&self) -> LeaveResult<()> {
        if self.privileged {
            Ok(())
        } else {
            Err(LeaveError::forbidden())
        }
    }

    fn require_employee(&self) -> LeaveResult<u64> {
        self.employee_id.ok_or_else(|| {
            LeaveError::Forbidden("No employee profile is linked to this account.".to_string())
        })
    }
}

#[derive(Debug, Clone)]
pub struct CreateLeave {
    pub leave_type_code: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct LeaveQuery {
    pub status: Option<LeaveStatus>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct LeavePage {
    pub items: Vec<LeaveRequest>,
    pub page: u32,
    pub page_size: u32,
    pub total: i64,
}

/// Maps the current status to the error for a requested transition, if any.
fn check_transition(current: LeaveStatus, target: LeaveStatus) -> LeaveResult<()> {
    if !current.is_terminal() {
        return Ok(());
    }
    let rule = match (current, target) {
        (LeaveStatus::Approved, LeaveStatus::Approved) => BusinessRule::AlreadyApproved,
        (LeaveStatus::Rejected, LeaveStatus::Rejected) => BusinessRule::AlreadyRejected,
        (LeaveStatus::Cancelled, LeaveStatus::Cancelled) => BusinessRule::AlreadyCancelled,
        (from, to) => BusinessRule::InvalidStatusTransition { from, to },
    };
    Err(rule.into())
}

pub struct LeaveRequestPolicyEngine {
    requests: Arc<dyn LeaveRepository>,
    leave_types: Arc<dyn LeaveTypeCatalog>,
    ai: Arc<AiAugmentationGateway>,
    policy: LeavePolicyConfig,
    locks: EmployeeLocks,
}

impl LeaveRequestPolicyEngine {
    pub fn new(
        requests: Arc<dyn LeaveRepository>,
        leave_types: Arc<dyn LeaveTypeCatalog>,
        ai: Arc<AiAugmentationGateway>,
        policy: LeavePolicyConfig,
    ) -> Self {
        Self {
            requests,
            leave_types,
            ai,
            policy,
            locks: EmployeeLocks::default(),
        }
    }

    async fn load(&self, id: u64) -> LeaveResult<LeaveRequest> {
        self.requests
            .find(id)
            .await?
            .ok_or_else(|| LeaveError::not_found(id))
    }

    async fn ensure_no_overlap(
        &self,
        employee_id: u64,
        start: NaiveDate,
        end: NaiveDate,
        exclude_id: Option<u64>,
    ) -> LeaveResult<()> {
        let active = self
            .requests
            .active_for_employee(employee_id, exclude_id)
            .await?;

        if active
            .iter()
            .filter(|r| r.status.is_active())
            .any(|r| ranges_overlap(start, end, r.start_date, r.end_date))
        {
            return Err(BusinessRule::LeaveOverlap.into());
        }
        Ok(())
    }

    async fn ensure_annual_quota(
        &self,
        employee_id: u64,
        leave_type: &LeaveType,
        start: NaiveDate,
        end: NaiveDate,
        exclude_id: Option<u64>,
    ) -> LeaveResult<()> {
        if !leave_type.has_code(&self.policy.annual_leave_type_code) {
            return Ok(());
        }

        let quota = leave_type
            .quota_days()
            .unwrap_or_else(|| self.policy.effective_quota());

        let (Some(window_start), Some(window_end)) = (
            NaiveDate::from_ymd_opt(start.year(), 1, 1),
            NaiveDate::from_ymd_opt(end.year(), 12, 31),
        ) else {
            return Err(LeaveError::validation("Leave dates are out of range."));
        };

        let approved = self
            .requests
            .approved_of_type(employee_id, leave_type.id, window_start, window_end, exclude_id)
            .await?;

        for year in years_touched(start, end) {
            let used: i64 = approved
                .iter()
                .map(|r| days_within_year(r.start_date, r.end_date, year))
                .sum();
            let requested = days_within_year(start, end, year);

            if used + requested > quota {
                return Err(BusinessRule::AnnualQuotaExceeded {
                    year,
                    used,
                    requested,
                    quota,
                }
                .into());
            }
        }
        Ok(())
    }

    #[instrument(skip(self, input), fields(leave_type = %input.leave_type_code))]
    pub async fn create(&self, actor: Actor, input: CreateLeave) -> LeaveResult<LeaveRequest> {
        let employee_id = actor.require_employee()?;

        let reason = input.reason.trim();
        if reason.is_empty() {
            return Err(LeaveError::validation("Reason is required."));
        }
        if input.leave_type_code.trim().is_empty() {
            return Err(LeaveError::validation("Leave type code is required."));
        }
        if input.start_date > input.end_date {
            return Err(LeaveError::validation("Start date cannot be after end date."));
        }

        let leave_type = self
            .leave_types
            .find_by_code(&input.leave_type_code)
            .await?
            .ok_or_else(|| {
                LeaveError::validation(format!(
                    "Unknown leave type: {}",
                    input.leave_type_code.trim()
                ))
            })?;

        let days = inclusive_days(input.start_date, input.end_date);

        let _guard = self.locks.lock(employee_id).await;

        self.ensure_no_overlap(employee_id, input.start_date, input.end_date, None)
            .await?;
        self.ensure_annual_quota(employee_id, &leave_type, input.start_date, input.end_date, None)
            .await?;

        let created = self
            .requests
            .insert(&NewLeaveRequest {
                employee_id,
                leave_type,
                start_date: input.start_date,
                end_date: input.end_date,
                days,
                reason: reason.to_string(),
                created_by: Some(actor.user_id),
                created_at: Utc::now(),
            })
            .await?;

        info!(leave_id = created.id, employee_id, days, "Leave request created");
        Ok(created)
    }

    /// Writes a Pending -> `change.status` edge; a lost race reports the row's new status.
    async fn commit(&self, change: StatusChange) -> LeaveResult<LeaveRequest> {
        if !self.requests.apply_status_change(&change).await? {
            let current = self.load(change.id).await?;
            check_transition(current.status, change.status)?;
            return Err(BusinessRule::InvalidStatusTransition {
                from: current.status,
                to: change.status,
            }
            .into());
        }
        self.load(change.id).await
    }

    #[instrument(skip(self))]
    pub async fn approve(&self, actor: Actor, id: u64) -> LeaveResult<LeaveRequest> {
        actor.require_privileged()?;

        let request = self.load(id).await?;
        check_transition(request.status, LeaveStatus::Approved)?;

        let _guard = self.locks.lock(request.employee_id).await;

        let leave_type = self
            .leave_types
            .find_by_code(&request.leave_type_code)
            .await?
            .unwrap_or_else(|| LeaveType {
                id: request.leave_type_id,
                code: request.leave_type_code.clone(),
                name: request.leave_type_name.clone(),
                default_annual_quota_days: None,
            });

        self.ensure_no_overlap(request.employee_id, request.start_date, request.end_date, Some(id))
            .await?;
        self.ensure_annual_quota(
            request.employee_id,
            &leave_type,
            request.start_date,
            request.end_date,
            Some(id),
        )
        .await?;

        let now = Utc::now();
        let approved = self
            .commit(StatusChange {
                id,
                status: LeaveStatus::Approved,
                approved_by: Some(actor.user_id),
                approved_at: Some(now),
                reject_reason: None,
                updated_by: actor.user_id,
                updated_at: now,
            })
            .await?;

        info!(leave_id = id, approver = actor.user_id, "Leave request approved");
        Ok(approved)
    }

    #[instrument(skip(self, reject_reason))]
    pub async fn reject(
        &self,
        actor: Actor,
        id: u64,
        reject_reason: &str,
    ) -> LeaveResult<LeaveRequest> {
        actor.require_privileged()?;

        let reject_reason = reject_reason.trim();
        if reject_reason.is_empty() {
            return Err(LeaveError::validation("Reject reason is required."));
        }

        let request = self.load(id).await?;
        check_transition(request.status, LeaveStatus::Rejected)?;

        let rejected = self
            .commit(StatusChange {
                id,
                status: LeaveStatus::Rejected,
                approved_by: None,
                approved_at: None,
                reject_reason: Some(reject_reason.to_string()),
                updated_by: actor.user_id,
                updated_at: Utc::now(),
            })
            .await?;

        info!(leave_id = id, "Leave request rejected");
        Ok(rejected)
    }

    #[instrument(skip(self))]
    pub async fn cancel(&self, actor: Actor, id: u64) -> LeaveResult<LeaveRequest> {
        let request = self.load(id).await?;
        if !actor.can_access(&request) {
            return Err(LeaveError::forbidden());
        }
        check_transition(request.status, LeaveStatus::Cancelled)?;

        let cancelled = self
            .commit(StatusChange {
                id,
                status: LeaveStatus::Cancelled,
                approved_by: None,
                approved_at: None,
                reject_reason: None,
                updated_by: actor.user_id,
                updated_at: Utc::now(),
            })
            .await?;

        info!(leave_id = id, "Leave request cancelled");
        Ok(cancelled)
    }

    pub async fn get(&self, actor: Actor, id: u64) -> LeaveResult<LeaveRequest> {
        let request = self.load(id).await?;
        if !actor.can_access(&request) {
            return Err(LeaveError::forbidden());
        }
        Ok(request)
    }

    /// Non-privileged callers only ever see their own requests.
    pub async fn list(&self, actor: Actor, query: LeaveQuery) -> LeaveResult<LeavePage> {
        let employee_id = if actor.privileged {
            None
        } else {
            Some(actor.require_employee()?)
        };

        let filter = LeaveListFilter {
            status: query.status,
            employee_id,
            page: query.page.unwrap_or(1).max(1),
            page_size: query
                .page_size
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
        };

        let (items, total) = self.requests.list(&filter).await?;
        Ok(LeavePage {
            items,
            page: filter.page,
            page_size: filter.page_size,
            total,
        })
    }

    pub async fn leave_types(&self) -> LeaveResult<Vec<LeaveType>> {
        self.leave_types.all().await
    }

    /// Always answers: provider output is used only when it came from the
    /// provider and does not read like a failure message.
    #[instrument(skip(self))]
    pub async fn explain_decision(&self, actor: Actor, id: u64) -> LeaveResult<DecisionExplanation> {
        let request = self.get(actor, id).await?;
        let facts = DecisionFacts::from(&request);
        let facts_json = serde_json::to_string(&facts)
            .map_err(|e| LeaveError::Storage(format!("could not encode decision facts: {e}")))?;

        let explanation = match self.ai.explain_decision(&facts_json).await {
            Ok(outcome)
                if !outcome.is_fallback() && !looks_like_failure(&outcome.value.explanation) =>
            {
                outcome.value.explanation
            }
            Ok(outcome) => {
                info!(leave_id = id, source = ?outcome.source, "Using fact-based explanation");
                facts.explain()
            }
            Err(timeout) => {
                warn!(leave_id = id, error = %timeout, "Explanation timed out, using fact-based explanation");
                facts.explain()
            }
        };

        Ok(DecisionExplanation { explanation })
    }

    /// The suggested code is always one of the catalog's codes (or empty when the catalog is).
    #[instrument(skip(self, text))]
    pub async fn normalize_reason(&self, text: &str) -> LeaveResult<ReasonNormalization> {
        let text = text.trim();
        if text.is_empty() {
            return Err(LeaveError::validation("Text is required."));
        }

        let allowed: Vec<String> = self
            .leave_types
            .all()
            .await?
            .into_iter()
            .map(|t| t.code)
            .collect();

        let mut normalized = self.ai.normalize_leave_reason(text, &allowed).await?.value;

        let suggested = normalized.suggested_leave_type_code.trim();
        normalized.suggested_leave_type_code = allowed
            .iter()
            .find(|code| code.eq_ignore_ascii_case(suggested))
            .or_else(|| allowed.first())
            .cloned()
            .unwrap_or_default();

        Ok(normalized)
    }

    #[instrument(skip(self))]
    pub async fn monthly_report(&self, actor: Actor, year: i32) -> LeaveResult<Vec<MonthlyLeaveCounts>> {
        actor.require_privileged()?;
        if !REPORT_YEARS.contains(&year) {
            return Err(LeaveError::validation(format!(
                "Invalid year. Must be between {} and {}.",
                REPORT_YEARS.start(),
                REPORT_YEARS.end()
            )));
        }
        self.requests.monthly_counts(year).await
    }

    /// Only aggregated figures reach the provider, never individual requests.
    #[instrument(skip(self))]
    pub async fn insights(&self, actor: Actor, year: i32) -> LeaveResult<AiInsights> {
        let monthly = self.monthly_report(actor, year).await?;
        let total: i64 = monthly.iter().map(|m| m.total_requests).sum();

        let figures = serde_json::json!({
            "year": year,
            "leaveRequestsMonthly": monthly,
            "totalLeaveRequests": total,
        });

        let outcome = self.ai.generate_insights(&figures.to_string()).await?;
        info!(year, total, source = ?outcome.source, "Leave insights generated");
        Ok(outcome.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::{ProviderError, TextProvider};
    use crate::ai::rate_limiter::RateLimiter;
    use crate::ai::testing::ScriptedProvider;
    use crate::leave::memory::{MemoryLeaveRepository, MemoryLeaveTypeCatalog};
    use crate::model::report::MonthlyLeaveCounts;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::Mutex;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn employee(id: u64) -> Actor {
        Actor {
            user_id: id * 10,
            employee_id: Some(id),
            privileged: false,
        }
    }

    fn hr() -> Actor {
        Actor {
            user_id: 1,
            employee_id: None,
            privileged: true,
        }
    }

    fn leave(code: &str, start: NaiveDate, end: NaiveDate) -> CreateLeave {
        CreateLeave {
            leave_type_code: code.to_string(),
            start_date: start,
            end_date: end,
            reason: "Personal time".to_string(),
        }
    }

    fn engine_with(ai: AiAugmentationGateway) -> (LeaveRequestPolicyEngine, Arc<MemoryLeaveRepository>) {
        let requests = Arc::new(MemoryLeaveRepository::default());
        let engine = LeaveRequestPolicyEngine::new(
            requests.clone(),
            Arc::new(MemoryLeaveTypeCatalog::standard()),
            Arc::new(ai),
            LeavePolicyConfig::default(),
        );
        (engine, requests)
    }

    fn disabled_engine() -> (LeaveRequestPolicyEngine, Arc<MemoryLeaveRepository>) {
        engine_with(AiAugmentationGateway::disabled())
    }

    fn scripted(provider: ScriptedProvider) -> AiAugmentationGateway {
        AiAugmentationGateway::new(
            true,
            Some(Arc::new(provider) as Arc<dyn TextProvider>),
            Arc::new(RateLimiter::per_minute(0)),
        )
    }

    fn business(err: LeaveError) -> BusinessRule {
        match err {
            LeaveError::Business(rule) => rule,
            other => panic!("expected a business rule violation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn end_to_end_overlap_cancel_and_quota() {
        let (engine, _) = disabled_engine();
        let alice = employee(7);

        let first = engine
            .create(alice, leave("ANNUAL", d(2026, 1, 10), d(2026, 1, 15)))
            .await
            .unwrap();
        assert_eq!(first.days, 6);
        assert_eq!(first.status, LeaveStatus::Pending);
        assert_eq!(first.leave_type_code, "ANNUAL");

        let overlapping = engine
            .create(alice, leave("ANNUAL", d(2026, 1, 14), d(2026, 1, 20)))
            .await
            .unwrap_err();
        assert_eq!(business(overlapping), BusinessRule::LeaveOverlap);

        let cancelled = engine.cancel(alice, first.id).await.unwrap();
        assert_eq!(cancelled.status, LeaveStatus::Cancelled);

        let ten_days = engine
            .create(alice, leave("ANNUAL", d(2026, 2, 1), d(2026, 2, 10)))
            .await
            .unwrap();
        assert_eq!(ten_days.days, 10);
        engine.approve(hr(), ten_days.id).await.unwrap();

        let over = engine
            .create(alice, leave("ANNUAL", d(2026, 3, 1), d(2026, 3, 5)))
            .await
            .unwrap_err();
        assert_eq!(
            business(over),
            BusinessRule::AnnualQuotaExceeded {
                year: 2026,
                used: 10,
                requested: 5,
                quota: 14
            }
        );

        let exactly_fits = engine
            .create(alice, leave("annual", d(2026, 3, 1), d(2026, 3, 4)))
            .await
            .unwrap();
        engine.approve(hr(), exactly_fits.id).await.unwrap();
    }

    #[tokio::test]
    async fn year_end_request_is_checked_against_both_years() {
        let (engine, _) = disabled_engine();
        let bob = employee(8);

        let december = engine
            .create(bob, leave("ANNUAL", d(2025, 12, 1), d(2025, 12, 12)))
            .await
            .unwrap();
        engine.approve(hr(), december.id).await.unwrap();

        let err = engine
            .create(bob, leave("ANNUAL", d(2025, 12, 28), d(2026, 1, 3)))
            .await
            .unwrap_err();
        assert_eq!(
            business(err),
            BusinessRule::AnnualQuotaExceeded {
                year: 2025,
                used: 12,
                requested: 4,
                quota: 14
            }
        );

        let (engine, _) = disabled_engine();
        let january = engine
            .create(bob, leave("ANNUAL", d(2026, 1, 5), d(2026, 1, 16)))
            .await
            .unwrap();
        engine.approve(hr(), january.id).await.unwrap();

        let err = engine
            .create(bob, leave("ANNUAL", d(2025, 12, 28), d(2026, 1, 3)))
            .await
            .unwrap_err();
        assert_eq!(
            business(err),
            BusinessRule::AnnualQuotaExceeded {
                year: 2026,
                used: 12,
                requested: 3,
                quota: 14
            }
        );
    }

    #[tokio::test]
    async fn only_the_annual_type_is_quota_limited() {
        let (engine, _) = disabled_engine();
        let sick = engine
            .create(employee(9), leave("SICK", d(2026, 4, 1), d(2026, 5, 10)))
            .await
            .unwrap();
        assert_eq!(sick.days, 40);
        engine.approve(hr(), sick.id).await.unwrap();
    }

    #[tokio::test]
    async fn configured_quota_applies_when_the_type_has_none() {
        let requests = Arc::new(MemoryLeaveRepository::default());
        let catalog = MemoryLeaveTypeCatalog::new(vec![LeaveType {
            id: 1,
            code: "VACATION".into(),
            name: "Vacation".into(),
            default_annual_quota_days: Some(0),
        }]);
        let engine = LeaveRequestPolicyEngine::new(
            requests,
            Arc::new(catalog),
            Arc::new(AiAugmentationGateway::disabled()),
            LeavePolicyConfig {
                annual_leave_type_code: "VACATION".into(),
                annual_quota_days: 5,
                ..LeavePolicyConfig::default()
            },
        );

        let err = engine
            .create(employee(3), leave("VACATION", d(2026, 6, 1), d(2026, 6, 6)))
            .await
            .unwrap_err();
        assert!(matches!(
            business(err),
            BusinessRule::AnnualQuotaExceeded { quota: 5, requested: 6, .. }
        ));
    }

    #[tokio::test]
    async fn approval_rechecks_quota_against_newer_approvals() {
        let (engine, _) = disabled_engine();
        let carol = employee(11);

        let first = engine
            .create(carol, leave("ANNUAL", d(2026, 5, 1), d(2026, 5, 8)))
            .await
            .unwrap();
        let second = engine
            .create(carol, leave("ANNUAL", d(2026, 6, 1), d(2026, 6, 8)))
            .await
            .unwrap();

        engine.approve(hr(), first.id).await.unwrap();
        let err = engine.approve(hr(), second.id).await.unwrap_err();
        assert_eq!(
            business(err),
            BusinessRule::AnnualQuotaExceeded {
                year: 2026,
                used: 8,
                requested: 8,
                quota: 14
            }
        );
    }

    #[tokio::test]
    async fn approval_rechecks_overlap_excluding_itself() {
        let (engine, requests) = disabled_engine();
        let dave = employee(12);

        let mine = engine
            .create(dave, leave("SICK", d(2026, 7, 1), d(2026, 7, 3)))
            .await
            .unwrap();
        engine.approve(hr(), mine.id).await.unwrap();

        // A row that slipped past the create-time check.
        let mut racing = mine.clone();
        racing.id = 99;
        racing.status = LeaveStatus::Pending;
        racing.approved_by = None;
        racing.approved_at = None;
        requests.put(racing);

        let err = engine.approve(hr(), 99).await.unwrap_err();
        assert_eq!(business(err), BusinessRule::LeaveOverlap);
    }

    #[tokio::test]
    async fn state_machine_distinguishes_retries_from_misuse() {
        let (engine, _) = disabled_engine();
        let erin = employee(13);

        let approved = engine
            .create(erin, leave("SICK", d(2026, 8, 1), d(2026, 8, 2)))
            .await
            .unwrap();
        let approved = engine.approve(hr(), approved.id).await.unwrap();
        assert_eq!(approved.status, LeaveStatus::Approved);
        assert_eq!(approved.approved_by, Some(1));
        assert!(approved.approved_at.is_some());

        let again = engine.approve(hr(), approved.id).await.unwrap_err();
        assert_eq!(business(again), BusinessRule::AlreadyApproved);

        let reject = engine.reject(hr(), approved.id, "late").await.unwrap_err();
        assert_eq!(
            business(reject),
            BusinessRule::InvalidStatusTransition {
                from: LeaveStatus::Approved,
                to: LeaveStatus::Rejected
            }
        );

        let cancel = engine.cancel(erin, approved.id).await.unwrap_err();
        assert!(matches!(business(cancel), BusinessRule::InvalidStatusTransition { .. }));

        let rejected = engine
            .create(erin, leave("SICK", d(2026, 9, 1), d(2026, 9, 2)))
            .await
            .unwrap();
        engine.reject(hr(), rejected.id, "Coverage").await.unwrap();
        let again = engine.reject(hr(), rejected.id, "Coverage").await.unwrap_err();
        assert_eq!(business(again), BusinessRule::AlreadyRejected);

        let cancelled = engine
            .create(erin, leave("SICK", d(2026, 10, 1), d(2026, 10, 2)))
            .await
            .unwrap();
        engine.cancel(erin, cancelled.id).await.unwrap();
        let again = engine.cancel(erin, cancelled.id).await.unwrap_err();
        assert_eq!(business(again), BusinessRule::AlreadyCancelled);
        let approve = engine.approve(hr(), cancelled.id).await.unwrap_err();
        assert_eq!(
            business(approve),
            BusinessRule::InvalidStatusTransition {
                from: LeaveStatus::Cancelled,
                to: LeaveStatus::Approved
            }
        );
    }

    #[tokio::test]
    async fn reject_requires_a_reason_and_clears_stale_approval() {
        let (engine, requests) = disabled_engine();
        let frank = employee(14);

        let created = engine
            .create(frank, leave("SICK", d(2026, 11, 1), d(2026, 11, 1)))
            .await
            .unwrap();

        let err = engine.reject(hr(), created.id, "   ").await.unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");

        let mut stale = created.clone();
        stale.approved_by = Some(5);
        stale.approved_at = Some(Utc::now());
        requests.put(stale);

        let rejected = engine.reject(hr(), created.id, " Busy week ").await.unwrap();
        assert_eq!(rejected.status, LeaveStatus::Rejected);
        assert_eq!(rejected.reject_reason.as_deref(), Some("Busy week"));
        assert_eq!(rejected.approved_by, None);
        assert_eq!(rejected.approved_at, None);
        assert_eq!(rejected.updated_by, Some(1));
    }

    #[tokio::test]
    async fn input_validation() {
        let (engine, _) = disabled_engine();
        let gina = employee(15);

        let backwards = engine
            .create(gina, leave("ANNUAL", d(2026, 1, 5), d(2026, 1, 4)))
            .await
            .unwrap_err();
        assert_eq!(backwards.code(), "VALIDATION_ERROR");

        let unknown = engine
            .create(gina, leave("BEREAVEMENT", d(2026, 1, 5), d(2026, 1, 6)))
            .await
            .unwrap_err();
        assert_eq!(unknown.to_string(), "Unknown leave type: BEREAVEMENT");

        let mut blank = leave("ANNUAL", d(2026, 1, 5), d(2026, 1, 6));
        blank.reason = " ".into();
        assert_eq!(engine.create(gina, blank).await.unwrap_err().code(), "VALIDATION_ERROR");

        let no_profile = Actor {
            user_id: 2,
            employee_id: None,
            privileged: true,
        };
        let err = engine
            .create(no_profile, leave("ANNUAL", d(2026, 1, 5), d(2026, 1, 6)))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "FORBIDDEN");

        assert_eq!(engine.approve(hr(), 404).await.unwrap_err().code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn ownership_and_roles_are_enforced() {
        let (engine, _) = disabled_engine();
        let owner = employee(20);
        let stranger = employee(21);

        let request = engine
            .create(owner, leave("SICK", d(2026, 3, 1), d(2026, 3, 2)))
            .await
            .unwrap();
        engine
            .create(stranger, leave("SICK", d(2026, 3, 1), d(2026, 3, 2)))
            .await
            .unwrap();

        assert_eq!(engine.approve(owner, request.id).await.unwrap_err().code(), "FORBIDDEN");
        assert_eq!(engine.get(stranger, request.id).await.unwrap_err().code(), "FORBIDDEN");
        assert_eq!(engine.cancel(stranger, request.id).await.unwrap_err().code(), "FORBIDDEN");
        assert_eq!(engine.get(owner, request.id).await.unwrap().id, request.id);

        let own = engine.list(owner, LeaveQuery::default()).await.unwrap();
        assert_eq!(own.total, 1);
        assert!(own.items.iter().all(|r| r.employee_id == 20));

        let all = engine.list(hr(), LeaveQuery::default()).await.unwrap();
        assert_eq!(all.total, 2);
        assert_eq!(all.page, 1);
        assert_eq!(all.page_size, DEFAULT_PAGE_SIZE);

        engine.cancel(hr(), request.id).await.unwrap();
        let pending = engine
            .list(
                hr(),
                LeaveQuery {
                    status: Some(LeaveStatus::Pending),
                    page: Some(0),
                    page_size: Some(500),
                },
            )
            .await
            .unwrap();
        assert_eq!(pending.total, 1);
        assert_eq!(pending.page, 1);
        assert_eq!(pending.page_size, MAX_PAGE_SIZE);
    }

    #[tokio::test]
    async fn explanation_survives_a_provider_timeout() {
        let provider = ScriptedProvider::new([Err(ProviderError::timeout("15s"))]);
        let (engine, _) = engine_with(scripted(provider));

        let request = engine
            .create(employee(30), leave("ANNUAL", d(2026, 1, 10), d(2026, 1, 15)))
            .await
            .unwrap();
        engine
            .reject(hr(), request.id, "Project deadline that week.")
            .await
            .unwrap();

        let explained = engine.explain_decision(hr(), request.id).await.unwrap();
        assert!(explained.explanation.contains("Project deadline that week."));
        assert!(explained.explanation.contains("2026-01-10"));
    }

    #[tokio::test]
    async fn explanation_includes_the_exact_approval_time_when_ai_is_off() {
        let (engine, requests) = disabled_engine();
        let request = engine
            .create(employee(31), leave("SICK", d(2026, 2, 2), d(2026, 2, 2)))
            .await
            .unwrap();

        let mut approved = request.clone();
        approved.status = LeaveStatus::Approved;
        approved.approved_by = Some(1);
        approved.approved_at = Some(Utc.with_ymd_and_hms(2026, 1, 30, 14, 5, 9).unwrap());
        requests.put(approved);

        let explained = engine.explain_decision(employee(31), request.id).await.unwrap();
        assert!(explained.explanation.contains("2026-01-30T14:05:09Z"));
        assert!(explained.explanation.contains("(1 day)"));
    }

    #[tokio::test]
    async fn provider_explanation_is_used_unless_it_reads_like_a_failure() {
        let provider = ScriptedProvider::replying(&[
            r#"{"explanation": "Your sick leave is still waiting for HR review."}"#,
        ]);
        let (engine, _) = engine_with(scripted(provider));
        let request = engine
            .create(employee(32), leave("SICK", d(2026, 2, 2), d(2026, 2, 3)))
            .await
            .unwrap();
        let explained = engine.explain_decision(hr(), request.id).await.unwrap();
        assert_eq!(explained.explanation, "Your sick leave is still waiting for HR review.");

        let provider = ScriptedProvider::replying(&[
            r#"{"explanation": "The AI service is currently unavailable."}"#,
        ]);
        let (engine, _) = engine_with(scripted(provider));
        let request = engine
            .create(employee(32), leave("SICK", d(2026, 2, 2), d(2026, 2, 3)))
            .await
            .unwrap();
        let explained = engine.explain_decision(hr(), request.id).await.unwrap();
        assert!(explained.explanation.contains("pending review"));
    }

    #[tokio::test]
    async fn normalized_reason_never_leaves_the_allowed_codes() {
        let provider = ScriptedProvider::replying(&[
            r#"{"category": "Travel", "summary": "Holiday abroad.", "suggestedLeaveTypeCode": "VACATION"}"#,
        ]);
        let (engine, _) = engine_with(scripted(provider));
        let normalized = engine.normalize_reason("going to spain").await.unwrap();
        assert_eq!(normalized.category, "Travel");
        assert_eq!(normalized.suggested_leave_type_code, "ANNUAL");

        let provider = ScriptedProvider::replying(&[
            r#"{"category": "Health", "summary": "Flu.", "suggestedLeaveTypeCode": "sick"}"#,
        ]);
        let (engine, _) = engine_with(scripted(provider));
        let normalized = engine.normalize_reason("flu").await.unwrap();
        assert_eq!(normalized.suggested_leave_type_code, "SICK");

        let (engine, _) = disabled_engine();
        let normalized = engine.normalize_reason("something").await.unwrap();
        assert_eq!(normalized.category, "Other");
        assert_eq!(normalized.suggested_leave_type_code, "ANNUAL");

        assert_eq!(engine.normalize_reason("  ").await.unwrap_err().code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn normalize_reason_surfaces_timeouts() {
        let provider = ScriptedProvider::new([Err(ProviderError::timeout("15s"))]);
        let (engine, _) = engine_with(scripted(provider));
        let err = engine.normalize_reason("flu").await.unwrap_err();
        assert_eq!(err.code(), "AI_TIMEOUT");
    }

    /// Lets one competing status change land between the engine's read and its write.
    #[derive(Default)]
    struct Interleaved {
        inner: MemoryLeaveRepository,
        competing: Mutex<Option<StatusChange>>,
    }

    #[async_trait]
    impl LeaveRepository for Interleaved {
        async fn find(&self, id: u64) -> LeaveResult<Option<LeaveRequest>> {
            self.inner.find(id).await
        }

        async fn list(&self, filter: &LeaveListFilter) -> LeaveResult<(Vec<LeaveRequest>, i64)> {
            self.inner.list(filter).await
        }

        async fn active_for_employee(
            &self,
            employee_id: u64,
            exclude_id: Option<u64>,
        ) -> LeaveResult<Vec<LeaveRequest>> {
            self.inner.active_for_employee(employee_id, exclude_id).await
        }

        async fn approved_of_type(
            &self,
            employee_id: u64,
            leave_type_id: u64,
            from: NaiveDate,
            to: NaiveDate,
            exclude_id: Option<u64>,
        ) -> LeaveResult<Vec<LeaveRequest>> {
            self.inner
                .approved_of_type(employee_id, leave_type_id, from, to, exclude_id)
                .await
        }

        async fn insert(&self, new: &NewLeaveRequest) -> LeaveResult<LeaveRequest> {
            self.inner.insert(new).await
        }

        async fn apply_status_change(&self, change: &StatusChange) -> LeaveResult<bool> {
            let competing = self.competing.lock().unwrap().take();
            if let Some(competing) = competing {
                assert!(self.inner.apply_status_change(&competing).await?);
            }
            self.inner.apply_status_change(change).await
        }

        async fn monthly_counts(&self, year: i32) -> LeaveResult<Vec<MonthlyLeaveCounts>> {
            self.inner.monthly_counts(year).await
        }
    }

    fn rejected_by_someone_else(id: u64) -> StatusChange {
        StatusChange {
            id,
            status: LeaveStatus::Rejected,
            approved_by: None,
            approved_at: None,
            reject_reason: Some("Rejected in another session.".to_string()),
            updated_by: 2,
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn write_after_a_concurrent_change_reports_the_new_status() {
        let requests = Arc::new(Interleaved::default());
        let engine = LeaveRequestPolicyEngine::new(
            requests.clone(),
            Arc::new(MemoryLeaveTypeCatalog::standard()),
            Arc::new(AiAugmentationGateway::disabled()),
            LeavePolicyConfig::default(),
        );

        let first = engine
            .create(employee(40), leave("ANNUAL", d(2026, 8, 3), d(2026, 8, 4)))
            .await
            .unwrap();
        *requests.competing.lock().unwrap() = Some(rejected_by_someone_else(first.id));
        let err = engine.approve(hr(), first.id).await.unwrap_err();
        assert_eq!(
            business(err),
            BusinessRule::InvalidStatusTransition {
                from: LeaveStatus::Rejected,
                to: LeaveStatus::Approved
            }
        );

        let second = engine
            .create(employee(40), leave("ANNUAL", d(2026, 9, 7), d(2026, 9, 7)))
            .await
            .unwrap();
        *requests.competing.lock().unwrap() = Some(rejected_by_someone_else(second.id));
        let err = engine
            .reject(hr(), second.id, "Team coverage is too low.")
            .await
            .unwrap_err();
        assert_eq!(business(err), BusinessRule::AlreadyRejected);

        let stored = engine.get(hr(), second.id).await.unwrap();
        assert_eq!(stored.reject_reason.as_deref(), Some("Rejected in another session."));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_rejects_let_exactly_one_through() {
        let (engine, _) = disabled_engine();
        let engine = Arc::new(engine);

        for round in 0..50u32 {
            let day = d(2026, 1, 1) + chrono::Duration::days(i64::from(round) * 2);
            let request = engine
                .create(employee(41), leave("UNPAID", day, day))
                .await
                .unwrap();

            let id = request.id;
            let tasks = [0, 1].map(|_| {
                let engine = Arc::clone(&engine);
                tokio::spawn(async move { engine.reject(hr(), id, "Busy period.").await })
            });
            let mut ok = 0;
            for task in tasks {
                match task.await.unwrap() {
                    Ok(rejected) => {
                        assert_eq!(rejected.status, LeaveStatus::Rejected);
                        ok += 1;
                    }
                    Err(err) => assert_eq!(err.code(), "LEAVE_ALREADY_REJECTED"),
                }
            }
            assert_eq!(ok, 1);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_approve_and_reject_let_exactly_one_through() {
        let (engine, _) = disabled_engine();
        let engine = Arc::new(engine);

        for round in 0..50u32 {
            let day = d(2026, 1, 1) + chrono::Duration::days(i64::from(round) * 2);
            let request = engine
                .create(employee(42), leave("UNPAID", day, day))
                .await
                .unwrap();

            let id = request.id;
            let approving = {
                let engine = Arc::clone(&engine);
                tokio::spawn(async move { engine.approve(hr(), id).await })
            };
            let rejecting = {
                let engine = Arc::clone(&engine);
                tokio::spawn(async move { engine.reject(hr(), id, "Busy period.").await })
            };

            let outcomes = [approving.await.unwrap(), rejecting.await.unwrap()];
            assert_eq!(outcomes.iter().filter(|o| o.is_ok()).count(), 1);
            for outcome in outcomes {
                if let Err(err) = outcome {
                    assert_eq!(err.code(), "INVALID_STATUS_TRANSITION");
                }
            }
        }
    }

    #[tokio::test]
    async fn insights_receive_only_aggregated_figures() {
        let provider = Arc::new(ScriptedProvider::replying(&[
            r#"{"summary": "March is busy.", "insights": ["Two requests start in March."], "recommendedActions": ["Plan coverage for March."]}"#,
        ]));
        let (engine, _) = engine_with(AiAugmentationGateway::new(
            true,
            Some(provider.clone() as Arc<dyn TextProvider>),
            Arc::new(RateLimiter::per_minute(0)),
        ));

        for (start, end) in [(d(2026, 3, 2), d(2026, 3, 3)), (d(2026, 3, 20), d(2026, 3, 20))] {
            engine
                .create(employee(43), CreateLeave {
                    reason: "Trip to Rome".to_string(),
                    ..leave("ANNUAL", start, end)
                })
                .await
                .unwrap();
        }

        let report = engine.monthly_report(hr(), 2026).await.unwrap();
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].month, 3);
        assert_eq!(report[0].pending_requests, 2);

        let insights = engine.insights(hr(), 2026).await.unwrap();
        assert_eq!(insights.summary, "March is busy.");

        let prompt = &provider.prompts()[0];
        assert!(prompt.contains(r#""totalLeaveRequests":2"#));
        assert!(!prompt.contains("Rome"));
    }

    #[tokio::test]
    async fn reports_require_hr_and_a_plausible_year() {
        let (engine, _) = disabled_engine();

        let err = engine.insights(employee(44), 2026).await.unwrap_err();
        assert!(matches!(err, LeaveError::Forbidden(_)));

        for year in [1999, 2101] {
            let err = engine.monthly_report(hr(), year).await.unwrap_err();
            assert_eq!(err.code(), "VALIDATION_ERROR");
        }
        assert!(engine.monthly_report(hr(), 2100).await.unwrap().is_empty());

        let insights = engine.insights(hr(), 2026).await.unwrap();
        assert_eq!(insights.summary, "AI insights are disabled.");
    }
}
