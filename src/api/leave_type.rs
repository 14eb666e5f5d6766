use crate::auth::auth::AuthUser;
use crate::leave::LeaveRequestPolicyEngine;
use actix_web::{HttpResponse, Responder, web};

#[utoipa::path(
    get,
    path = "/api/leave-types",
    responses(
        (status = 200, description = "Leave types ordered by id", body = Vec<crate::model::leave_type::LeaveType>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn list_leave_types(
    _auth: AuthUser,
    engine: web::Data<LeaveRequestPolicyEngine>,
) -> actix_web::Result<impl Responder> {
    let types = engine.leave_types().await?;
    Ok(HttpResponse::Ok().json(types))
}
