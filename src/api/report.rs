use crate::auth::auth::AuthUser;
use crate::leave::LeaveRequestPolicyEngine;
use actix_web::{HttpResponse, Responder, web};
use chrono::{Datelike, Utc};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ReportQuery {
    #[schema(example = 2026)]
    /// Calendar year between 2000 and 2100, defaults to the current year
    pub year: Option<i32>,
}

impl ReportQuery {
    fn year(&self) -> i32 {
        self.year.unwrap_or_else(|| Utc::now().year())
    }
}

/* =========================
Monthly leave figures (HR/Admin)
========================= */
#[utoipa::path(
    get,
    path = "/api/reports/leave-requests-monthly",
    params(ReportQuery),
    responses(
        (status = 200, description = "Requests per start month, by status", body = Vec<crate::model::report::MonthlyLeaveCounts>),
        (status = 400, description = "Invalid year"),
        (status = 403, description = "HR/Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn leave_requests_monthly(
    auth: AuthUser,
    engine: web::Data<LeaveRequestPolicyEngine>,
    query: web::Query<ReportQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let months = engine.monthly_report(auth.actor(), query.year()).await?;
    Ok(HttpResponse::Ok().json(months))
}

/* =========================
AI: insights over the monthly figures (HR/Admin)
========================= */
#[utoipa::path(
    post,
    path = "/api/reports/ai/insights",
    params(ReportQuery),
    responses(
        (status = 200, description = "Summary, insights and recommended actions", body = crate::ai::types::AiInsights),
        (status = 400, description = "Invalid year"),
        (status = 403, description = "HR/Admin only"),
        (status = 504, description = "AI_TIMEOUT")
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn ai_insights(
    auth: AuthUser,
    engine: web::Data<LeaveRequestPolicyEngine>,
    query: web::Query<ReportQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let insights = engine.insights(auth.actor(), query.year()).await?;
    Ok(HttpResponse::Ok().json(insights))
}
