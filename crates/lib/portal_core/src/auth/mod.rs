//! Authentication and authorization logic.
//!
//! Provides the identity store (local and directory logins), the session
//! manager with its expiry sweeper, and the authorization guard shared by the
//! HTTP layer.

pub mod directory;
pub mod guard;
pub mod identity;
pub mod password;
pub mod sessions;

use thiserror::Error;

use crate::store::StoreError;
use crate::validation::FieldErrors;

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account is awaiting approval")]
    PendingApproval,

    #[error("Account is inactive")]
    AccountInactive,

    #[error("Directory unavailable: {0}")]
    DirectoryUnavailable(String),

    #[error("Validation error: {0}")]
    Validation(FieldErrors),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}
