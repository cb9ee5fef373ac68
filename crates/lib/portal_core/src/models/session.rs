//! Session records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::identity::IdentityRef;

/// A persisted login session.
///
/// `id` is the SHA-256 digest of the opaque token held in the client's cookie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub owner: IdentityRef,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Expired sessions are invalid from the instant `expires_at` is reached.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
