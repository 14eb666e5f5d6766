use crate::ai::AiAugmentationGateway;
use crate::auth::auth::AuthUser;
use crate::error::LeaveError;
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct DraftJobDescriptionRequest {
    #[schema(example = "Backend Developer")]
    pub role: String,
    /// Blank means a general position
    #[schema(example = "Engineering")]
    #[serde(default)]
    pub department: String,
}

#[utoipa::path(
    post,
    path = "/api/job-descriptions/ai/draft",
    request_body(content = DraftJobDescriptionRequest, content_type = "application/json"),
    responses(
        (status = 200, description = "Draft from the provider, or the template when AI is off or unusable", body = crate::ai::types::JobDescriptionDraft),
        (status = 400, description = "Role missing"),
        (status = 403, description = "HR/Admin only"),
        (status = 504, description = "AI_TIMEOUT")
    ),
    security(("bearer_auth" = [])),
    tag = "Job Description AI"
)]
pub async fn draft_job_description(
    auth: AuthUser,
    gateway: web::Data<AiAugmentationGateway>,
    payload: web::Json<DraftJobDescriptionRequest>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let role = payload.role.trim();
    if role.is_empty() {
        return Err(LeaveError::validation("Role is required.").into());
    }

    let outcome = gateway
        .draft_job_description(role, payload.department.trim())
        .await
        .map_err(LeaveError::from)?;

    info!(user = %auth.username, source = ?outcome.source, "Job description drafted");
    Ok(HttpResponse::Ok().json(outcome.value))
}
