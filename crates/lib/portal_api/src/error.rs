//! Application error types.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use portal_core::auth::AuthError;
use portal_core::auth::guard::GuardError;
use portal_core::auth::sessions::SessionError;
use portal_core::store::StoreError;
use portal_core::tickets::TicketError;
use portal_core::validation::FieldErrors;
use thiserror::Error;
use tracing::{error, warn};

use crate::models::ErrorResponse;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {message}")]
    Validation { message: String, fields: FieldErrors },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Account is awaiting approval")]
    PendingApproval,

    #[error("Account is inactive")]
    AccountInactive,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Directory unavailable: {0}")]
    DirectoryUnavailable(String),

    #[error("Helpdesk unavailable: {0}")]
    ExternalUnavailable(String),

    #[error("Partial sync failure for helpdesk ticket {external_id}")]
    PartialSyncFailure { external_id: String },

    #[error("Internal server error")]
    Internal(String),
}

impl AppError {
    /// A validation error not tied to particular fields.
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            fields: FieldErrors::new(),
        }
    }
}

impl From<FieldErrors> for AppError {
    fn from(fields: FieldErrors) -> Self {
        AppError::Validation {
            message: fields.to_string(),
            fields,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            AppError::Validation { message, .. } => {
                (StatusCode::BAD_REQUEST, "validation_error", message.clone())
            }
            AppError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, "unauthorized", m.clone()),
            AppError::Forbidden(m) => (StatusCode::FORBIDDEN, "forbidden", m.clone()),
            AppError::PendingApproval => (
                StatusCode::FORBIDDEN,
                "pending_approval",
                "Account is awaiting approval".to_string(),
            ),
            AppError::AccountInactive => (
                StatusCode::FORBIDDEN,
                "account_inactive",
                "Account is inactive".to_string(),
            ),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m.clone()),
            AppError::DirectoryUnavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "directory_unavailable",
                "Directory service is unavailable".to_string(),
            ),
            AppError::ExternalUnavailable(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "external_unavailable",
                "Helpdesk request failed".to_string(),
            ),
            AppError::PartialSyncFailure { external_id } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "partial_sync_failure",
                format!(
                    "Helpdesk ticket {external_id} was written but the portal copy was not; retry to resynchronise"
                ),
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Internal server error".to_string(),
            ),
        };
        let fields = match self {
            AppError::Validation { fields, .. } if !fields.is_empty() => Some(fields),
            _ => None,
        };
        let body = Json(ErrorResponse {
            error: error.to_string(),
            message,
            fields,
        });
        (status, body).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::validation(rejection.body_text())
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        error!(error = %e, "storage failure");
        AppError::Internal(e.to_string())
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials => AppError::Unauthorized("Invalid credentials".into()),
            AuthError::PendingApproval => AppError::PendingApproval,
            AuthError::AccountInactive => AppError::AccountInactive,
            AuthError::DirectoryUnavailable(m) => AppError::DirectoryUnavailable(m),
            AuthError::Validation(fields) => AppError::from(fields),
            AuthError::NotFound(m) => AppError::NotFound(m),
            AuthError::Store(e) => AppError::from(e),
            AuthError::Internal(m) => {
                error!(error = %m, "authentication failure");
                AppError::Internal(m)
            }
        }
    }
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::Invalid => AppError::Unauthorized("Invalid or expired session".into()),
            SessionError::Store(e) => AppError::from(e),
            SessionError::Config(m) => {
                error!(error = %m, "session configuration");
                AppError::Internal(m)
            }
        }
    }
}

impl From<GuardError> for AppError {
    fn from(e: GuardError) -> Self {
        match e {
            GuardError::Unauthenticated => AppError::Unauthorized("Authentication required".into()),
            GuardError::Forbidden(m) => AppError::Forbidden(m),
        }
    }
}

impl From<TicketError> for AppError {
    fn from(e: TicketError) -> Self {
        match e {
            TicketError::Validation(fields) => AppError::from(fields),
            TicketError::NotFound(id) => AppError::NotFound(format!("Ticket {id} not found")),
            TicketError::Forbidden(id) => {
                AppError::Forbidden(format!("Ticket {id} belongs to another account"))
            }
            TicketError::ExternalUnavailable(cause) => {
                warn!(error = %cause, "helpdesk call failed");
                AppError::ExternalUnavailable(cause.to_string())
            }
            TicketError::PartialSyncFailure {
                external_id,
                reason,
            } => {
                error!(external_id = %external_id, reason = %reason, "partial ticket sync");
                AppError::PartialSyncFailure { external_id }
            }
            TicketError::Store(e) => AppError::from(e),
        }
    }
}
