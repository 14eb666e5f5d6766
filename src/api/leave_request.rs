use crate::auth::auth::AuthUser;
use crate::error::LeaveError;
use crate::leave::LeaveRequestPolicyEngine;
use crate::leave::policy::{CreateLeave, LeaveQuery};
use crate::model::leave_request::{LeaveRequest, LeaveStatus};
use actix_web::{HttpResponse, Responder, web};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeaveRequest {
    #[schema(example = "ANNUAL")]
    pub leave_type_code: String,
    #[schema(example = "2026-01-10", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-15", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "Family trip")]
    pub reason: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RejectLeaveRequest {
    #[schema(example = "Team coverage is too low that week.")]
    pub reject_reason: String,
}

#[derive(Deserialize, ToSchema)]
pub struct NormalizeReasonRequest {
    #[schema(example = "doctor said i need to rest for two days")]
    pub text: String,
}

#[derive(Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct LeaveListQuery {
    #[schema(example = "Pending")]
    /// Filter by status (Pending, Approved, Rejected, Cancelled)
    pub status: Option<String>,
    #[schema(example = 1)]
    /// Page number, starting at 1
    pub page: Option<u32>,
    #[schema(example = 10)]
    /// Items per page (max 100)
    pub page_size: Option<u32>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRequestResponse {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1000)]
    pub employee_id: u64,
    pub leave_type_id: u64,
    #[schema(example = "ANNUAL")]
    pub leave_type_code: String,
    #[schema(example = "Annual Leave")]
    pub leave_type_name: String,
    #[schema(example = "2026-01-10", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-15", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = 6)]
    pub days: i64,
    pub reason: String,
    pub status: LeaveStatus,
    pub approved_by: Option<u64>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub approved_at: Option<DateTime<Utc>>,
    pub reject_reason: Option<String>,
    #[schema(example = "2026-01-01T00:00:00Z", format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
    pub created_by: Option<u64>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<u64>,
}

impl From<LeaveRequest> for LeaveRequestResponse {
    fn from(r: LeaveRequest) -> Self {
        Self {
            id: r.id,
            employee_id: r.employee_id,
            leave_type_id: r.leave_type_id,
            leave_type_code: r.leave_type_code,
            leave_type_name: r.leave_type_name,
            start_date: r.start_date,
            end_date: r.end_date,
            days: r.days,
            reason: r.reason,
            status: r.status,
            approved_by: r.approved_by,
            approved_at: r.approved_at,
            reject_reason: r.reject_reason,
            created_at: r.created_at,
            created_by: r.created_by,
            updated_at: r.updated_at,
            updated_by: r.updated_by,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaveListResponse {
    pub data: Vec<LeaveRequestResponse>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub page_size: u32,
    #[schema(example = 1)]
    pub total: i64,
}

/* =========================
List leave requests
========================= */
#[utoipa::path(
    get,
    path = "/api/leave-requests",
    params(LeaveListQuery),
    responses(
        (status = 200, description = "Paged leave requests; employees only see their own", body = LeaveListResponse),
        (status = 400, description = "Unknown status filter"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn list_leave_requests(
    auth: AuthUser,
    engine: web::Data<LeaveRequestPolicyEngine>,
    query: web::Query<LeaveListQuery>,
) -> actix_web::Result<impl Responder> {
    let query = query.into_inner();

    let status = query
        .status
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            LeaveStatus::from_str(s)
                .map_err(|_| LeaveError::validation(format!("Unknown status filter: {s}")))
        })
        .transpose()?;

    let page = engine
        .list(
            auth.actor(),
            LeaveQuery {
                status,
                page: query.page,
                page_size: query.page_size,
            },
        )
        .await?;

    Ok(HttpResponse::Ok().json(LeaveListResponse {
        data: page.items.into_iter().map(Into::into).collect(),
        page: page.page,
        page_size: page.page_size,
        total: page.total,
    }))
}

/* =========================
Get one leave request
========================= */
#[utoipa::path(
    get,
    path = "/api/leave-requests/{id}",
    params(("id" = u64, Path, description = "Leave request id")),
    responses(
        (status = 200, description = "Leave request", body = LeaveRequestResponse),
        (status = 403, description = "Neither owner nor HR/Admin"),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn get_leave_request(
    auth: AuthUser,
    engine: web::Data<LeaveRequestPolicyEngine>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let request = engine.get(auth.actor(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(LeaveRequestResponse::from(request)))
}

/* =========================
Create leave request
========================= */
#[utoipa::path(
    post,
    path = "/api/leave-requests",
    request_body(content = CreateLeaveRequest, content_type = "application/json"),
    responses(
        (status = 201, description = "Created as Pending", body = LeaveRequestResponse),
        (status = 400, description = "Invalid input or unknown leave type"),
        (status = 409, description = "LEAVE_OVERLAP or ANNUAL_QUOTA_EXCEEDED")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn create_leave_request(
    auth: AuthUser,
    engine: web::Data<LeaveRequestPolicyEngine>,
    payload: web::Json<CreateLeaveRequest>,
) -> actix_web::Result<impl Responder> {
    let payload = payload.into_inner();
    let created = engine
        .create(
            auth.actor(),
            CreateLeave {
                leave_type_code: payload.leave_type_code,
                start_date: payload.start_date,
                end_date: payload.end_date,
                reason: payload.reason,
            },
        )
        .await?;

    Ok(HttpResponse::Created().json(LeaveRequestResponse::from(created)))
}

/* =========================
Approve (HR/Admin)
========================= */
#[utoipa::path(
    post,
    path = "/api/leave-requests/{id}/approve",
    params(("id" = u64, Path, description = "Leave request id")),
    responses(
        (status = 200, description = "Approved", body = LeaveRequestResponse),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Already approved, invalid transition, overlap or quota")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn approve_leave_request(
    auth: AuthUser,
    engine: web::Data<LeaveRequestPolicyEngine>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let approved = engine.approve(auth.actor(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(LeaveRequestResponse::from(approved)))
}

/* =========================
Reject (HR/Admin)
========================= */
#[utoipa::path(
    post,
    path = "/api/leave-requests/{id}/reject",
    params(("id" = u64, Path, description = "Leave request id")),
    request_body(content = RejectLeaveRequest, content_type = "application/json"),
    responses(
        (status = 200, description = "Rejected", body = LeaveRequestResponse),
        (status = 400, description = "Reject reason missing"),
        (status = 403, description = "HR/Admin only"),
        (status = 409, description = "Already rejected or invalid transition")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn reject_leave_request(
    auth: AuthUser,
    engine: web::Data<LeaveRequestPolicyEngine>,
    path: web::Path<u64>,
    payload: web::Json<RejectLeaveRequest>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let rejected = engine
        .reject(auth.actor(), path.into_inner(), &payload.reject_reason)
        .await?;
    Ok(HttpResponse::Ok().json(LeaveRequestResponse::from(rejected)))
}

/* =========================
Cancel (owner or HR/Admin)
========================= */
#[utoipa::path(
    post,
    path = "/api/leave-requests/{id}/cancel",
    params(("id" = u64, Path, description = "Leave request id")),
    responses(
        (status = 200, description = "Cancelled", body = LeaveRequestResponse),
        (status = 403, description = "Neither owner nor HR/Admin"),
        (status = 409, description = "Already cancelled or invalid transition")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn cancel_leave_request(
    auth: AuthUser,
    engine: web::Data<LeaveRequestPolicyEngine>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let cancelled = engine.cancel(auth.actor(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(LeaveRequestResponse::from(cancelled)))
}

/* =========================
AI: normalize a free-text reason
========================= */
#[utoipa::path(
    post,
    path = "/api/leave-requests/ai/normalize-reason",
    request_body(content = NormalizeReasonRequest, content_type = "application/json"),
    responses(
        (status = 200, description = "Category, summary and an allowed leave-type code", body = crate::ai::types::ReasonNormalization),
        (status = 400, description = "Text missing"),
        (status = 504, description = "AI_TIMEOUT")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave AI"
)]
pub async fn normalize_reason(
    _auth: AuthUser,
    engine: web::Data<LeaveRequestPolicyEngine>,
    payload: web::Json<NormalizeReasonRequest>,
) -> actix_web::Result<impl Responder> {
    let normalized = engine.normalize_reason(&payload.text).await?;
    Ok(HttpResponse::Ok().json(normalized))
}

/* =========================
AI: explain a decision
========================= */
#[utoipa::path(
    post,
    path = "/api/leave-requests/{id}/ai/explain-decision",
    params(("id" = u64, Path, description = "Leave request id")),
    responses(
        (status = 200, description = "Always answers, falling back to a fact-based explanation", body = crate::ai::types::DecisionExplanation),
        (status = 403, description = "Neither owner nor HR/Admin"),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave AI"
)]
pub async fn explain_decision(
    auth: AuthUser,
    engine: web::Data<LeaveRequestPolicyEngine>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let explanation = engine
        .explain_decision(auth.actor(), path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(explanation))
}
