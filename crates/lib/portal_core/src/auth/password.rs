//! Local password policy and bcrypt hashing.
//!
//! Customer passwords and static directory accounts share one hash format so
//! an accounts file can be produced with any bcrypt tool.

use super::AuthError;

/// Minimum length for locally stored passwords.
pub const MIN_PASSWORD_LEN: usize = 6;

const BCRYPT_COST: u32 = 10;

/// Why `password` may not be stored, if it may not.
pub fn password_problem(password: &str) -> Option<String> {
    (password.chars().count() < MIN_PASSWORD_LEN)
        .then(|| format!("Password must be at least {MIN_PASSWORD_LEN} characters"))
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    bcrypt::hash(password, BCRYPT_COST)
        .map_err(|e| AuthError::Internal(format!("bcrypt hash: {e}")))
}

/// Check `password` against a stored bcrypt hash.
///
/// A hash that does not parse is an error, not a mismatch: it means the
/// stored record is corrupt.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    bcrypt::verify(password, hash).map_err(|e| AuthError::Internal(format!("bcrypt verify: {e}")))
}
