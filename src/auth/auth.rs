use crate::{error::LeaveError, leave::Actor, model::role::Role};
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload};
use futures::future::{Ready, ready};

/// Set by `auth_middleware` once the bearer token has been verified.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

impl FromRequest for AuthUser {
    type Error = LeaveError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthUser>()
                .cloned()
                .ok_or_else(|| LeaveError::Unauthorized("Missing or invalid token.".to_string())),
        )
    }
}

impl AuthUser {
    pub fn require_hr_or_admin(&self) -> Result<(), LeaveError> {
        if self.role.is_privileged() {
            Ok(())
        } else {
            Err(LeaveError::Forbidden("HR/Admin only".to_string()))
        }
    }

    pub fn actor(&self) -> Actor {
        Actor {
            user_id: self.user_id,
            employee_id: self.employee_id,
            privileged: self.role.is_privileged(),
        }
    }
}
