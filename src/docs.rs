use crate::ai::types::{AiInsights, DecisionExplanation, JobDescriptionDraft, ReasonNormalization};
use crate::api::job_description::DraftJobDescriptionRequest;
use crate::api::report::ReportQuery;
use crate::api::leave_request::{
    CreateLeaveRequest, LeaveListQuery, LeaveListResponse, LeaveRequestResponse,
    NormalizeReasonRequest, RejectLeaveRequest,
};
use crate::model::leave_request::LeaveStatus;
use crate::model::leave_type::LeaveType;
use crate::model::report::MonthlyLeaveCounts;
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HRM Leave API",
        version = "1.0.0",
        description = r#"
## Leave Requests with AI Assistance

Leave requests move one way from **Pending** to **Approved**, **Rejected** or **Cancelled**.

### 🔹 Rules
- Overlapping Pending/Approved requests of the same employee are refused (`LEAVE_OVERLAP`)
- The annual leave type is capped per calendar year (`ANNUAL_QUOTA_EXCEEDED`)
- Approving re-runs both checks

### 🤖 AI endpoints
Reason normalization, decision explanations, job-description drafts and report insights use an external
text-generation provider when configured, and deterministic fallbacks otherwise.

### 🔐 Security
All endpoints require a **JWT Bearer** access token. Approve/reject are **HR/Admin** only.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::leave_request::list_leave_requests,
        crate::api::leave_request::get_leave_request,
        crate::api::leave_request::create_leave_request,
        crate::api::leave_request::approve_leave_request,
        crate::api::leave_request::reject_leave_request,
        crate::api::leave_request::cancel_leave_request,
        crate::api::leave_request::normalize_reason,
        crate::api::leave_request::explain_decision,

        crate::api::leave_type::list_leave_types,

        crate::api::job_description::draft_job_description,

        crate::api::report::leave_requests_monthly,
        crate::api::report::ai_insights
    ),
    components(
        schemas(
            CreateLeaveRequest,
            RejectLeaveRequest,
            NormalizeReasonRequest,
            LeaveListQuery,
            LeaveRequestResponse,
            LeaveListResponse,
            LeaveStatus,
            LeaveType,
            ReasonNormalization,
            DecisionExplanation,
            DraftJobDescriptionRequest,
            JobDescriptionDraft,
            ReportQuery,
            MonthlyLeaveCounts,
            AiInsights
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Leave", description = "Leave request workflow"),
        (name = "Leave AI", description = "AI-assisted leave endpoints"),
        (name = "Job Description AI", description = "Job-description drafting"),
        (name = "Reports", description = "Aggregated leave figures and AI insights"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
