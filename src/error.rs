use crate::model::leave_request::LeaveStatus;
use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;
use uuid::Uuid;

/// Policy violations callers can branch on; each maps to a stable sub-code.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum BusinessRule {
    #[display(fmt = "Leave request dates overlap with an existing pending/approved request.")]
    LeaveOverlap,
    #[display(
        fmt = "Annual leave quota exceeded for year {}. Used: {}, Requested: {}, Quota: {}.",
        year,
        used,
        requested,
        quota
    )]
    AnnualQuotaExceeded {
        year: i32,
        used: i64,
        requested: i64,
        quota: i64,
    },
    #[display(fmt = "Leave request already approved.")]
    AlreadyApproved,
    #[display(fmt = "Leave request already rejected.")]
    AlreadyRejected,
    #[display(fmt = "Leave request already cancelled.")]
    AlreadyCancelled,
    #[display(fmt = "Leave request cannot be {} from status: {}", to, from)]
    InvalidStatusTransition { from: LeaveStatus, to: LeaveStatus },
}

impl BusinessRule {
    pub fn code(&self) -> &'static str {
        match self {
            BusinessRule::LeaveOverlap => "LEAVE_OVERLAP",
            BusinessRule::AnnualQuotaExceeded { .. } => "ANNUAL_QUOTA_EXCEEDED",
            BusinessRule::AlreadyApproved => "LEAVE_ALREADY_APPROVED",
            BusinessRule::AlreadyRejected => "LEAVE_ALREADY_REJECTED",
            BusinessRule::AlreadyCancelled => "LEAVE_ALREADY_CANCELLED",
            BusinessRule::InvalidStatusTransition { .. } => "INVALID_STATUS_TRANSITION",
        }
    }

    fn details(&self) -> Vec<String> {
        match self {
            BusinessRule::AnnualQuotaExceeded {
                year,
                used,
                requested,
                quota,
            } => vec![
                format!("year: {year}"),
                format!("used: {used}"),
                format!("requested: {requested}"),
                format!("quota: {quota}"),
            ],
            BusinessRule::InvalidStatusTransition { from, to } => {
                vec![format!("from: {from}"), format!("to: {to}")]
            }
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Display)]
pub enum LeaveError {
    #[display(fmt = "{}", _0)]
    Validation(String),
    #[display(fmt = "{}", _0)]
    NotFound(String),
    #[display(fmt = "{}", _0)]
    Unauthorized(String),
    #[display(fmt = "{}", _0)]
    Forbidden(String),
    #[display(fmt = "{}", _0)]
    Business(BusinessRule),
    #[display(fmt = "AI request timed out.")]
    AiTimeout,
    #[display(fmt = "Storage failure: {}", _0)]
    Storage(String),
}

impl std::error::Error for LeaveError {}

pub type LeaveResult<T> = Result<T, LeaveError>;

impl From<BusinessRule> for LeaveError {
    fn from(rule: BusinessRule) -> Self {
        LeaveError::Business(rule)
    }
}

impl From<sqlx::Error> for LeaveError {
    fn from(e: sqlx::Error) -> Self {
        LeaveError::Storage(e.to_string())
    }
}

impl LeaveError {
    pub fn validation(message: impl Into<String>) -> Self {
        LeaveError::Validation(message.into())
    }

    pub fn not_found(id: u64) -> Self {
        LeaveError::NotFound(format!("Leave request not found. Id: {id}"))
    }

    pub fn forbidden() -> Self {
        LeaveError::Forbidden("You do not have permission to access this resource.".to_string())
    }

    pub fn code(&self) -> &'static str {
        match self {
            LeaveError::Validation(_) => "VALIDATION_ERROR",
            LeaveError::NotFound(_) => "NOT_FOUND",
            LeaveError::Unauthorized(_) => "UNAUTHORIZED",
            LeaveError::Forbidden(_) => "FORBIDDEN",
            LeaveError::Business(rule) => rule.code(),
            LeaveError::AiTimeout => "AI_TIMEOUT",
            LeaveError::Storage(_) => "INTERNAL_ERROR",
        }
    }
}

impl ResponseError for LeaveError {
    fn status_code(&self) -> StatusCode {
        match self {
            LeaveError::Validation(_) => StatusCode::BAD_REQUEST,
            LeaveError::NotFound(_) => StatusCode::NOT_FOUND,
            LeaveError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            LeaveError::Forbidden(_) => StatusCode::FORBIDDEN,
            LeaveError::Business(_) => StatusCode::CONFLICT,
            LeaveError::AiTimeout => StatusCode::GATEWAY_TIMEOUT,
            LeaveError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let correlation_id = Uuid::new_v4().to_string();
        let status = self.status_code();

        let (message, details) = match self {
            LeaveError::Storage(e) => {
                tracing::error!(error = %e, correlation_id = %correlation_id, "Storage failure");
                ("Internal Server Error".to_string(), Vec::new())
            }
            LeaveError::Business(rule) => {
                tracing::warn!(code = rule.code(), correlation_id = %correlation_id, "{}", rule);
                (rule.to_string(), rule.details())
            }
            other => {
                tracing::warn!(code = other.code(), correlation_id = %correlation_id, "{}", other);
                (other.to_string(), Vec::new())
            }
        };

        HttpResponse::build(status).json(json!({
            "success": false,
            "error": {
                "code": self.code(),
                "message": message,
                "details": details,
            },
            "correlationId": correlation_id,
        }))
    }
}
