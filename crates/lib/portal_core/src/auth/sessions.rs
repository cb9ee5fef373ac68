//! Session manager: opaque tokens with expiry, plus the periodic sweeper.
//!
//! The client holds a random 64-character token; only its SHA-256 digest is
//! stored, as the session id. Every session names exactly one owner through
//! [`IdentityRef`].

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::models::{AccountStatus, Identity, IdentityRef, Session};
use crate::store::{Store, StoreError};

/// Default session lifetime (24 hours).
pub const DEFAULT_SESSION_TTL_SECS: i64 = 24 * 60 * 60;

/// Default interval between expiry sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

const TOKEN_LEN: usize = 64;

#[derive(Debug, Error)]
pub enum SessionError {
    /// Missing, unknown, expired, or owned by an account that may no longer log in.
    #[error("Invalid or expired session")]
    Invalid,

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// A lifetime or sweep interval the manager cannot work with.
    #[error("Session configuration error: {0}")]
    Config(String),
}

/// A freshly created session and the token to hand to the client.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub session: Session,
}

/// A valid session together with its owner's current record.
#[derive(Debug, Clone)]
pub struct ResolvedSession {
    pub session: Session,
    pub identity: Identity,
}

#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn Store>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Create a session for `owner`, valid for `ttl` from now.
    pub async fn create(
        &self,
        owner: IdentityRef,
        ttl: chrono::Duration,
    ) -> Result<IssuedSession, SessionError> {
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| SessionError::Config(format!("session ttl {ttl} out of range")))?;
        let token = generate_token();
        let session = Session {
            id: hash_token(&token),
            owner,
            expires_at,
            created_at: now,
        };
        self.store.insert_session(&session).await?;
        debug!(owner = ?session.owner, expires_at = %session.expires_at, "session created");
        Ok(IssuedSession { token, session })
    }

    pub async fn create_for(
        &self,
        identity: &Identity,
        ttl: chrono::Duration,
    ) -> Result<IssuedSession, SessionError> {
        self.create(identity.reference(), ttl).await
    }

    /// Resolve a client token to its session and owner.
    pub async fn resolve(&self, token: &str) -> Result<ResolvedSession, SessionError> {
        if token.is_empty() {
            return Err(SessionError::Invalid);
        }
        let session = self
            .store
            .session_by_id(&hash_token(token))
            .await?
            .ok_or(SessionError::Invalid)?;
        if session.is_expired_at(Utc::now()) {
            debug!(expires_at = %session.expires_at, "session expired");
            return Err(SessionError::Invalid);
        }

        let identity = match session.owner {
            IdentityRef::Local(id) => {
                let user = self
                    .store
                    .user_by_id(id)
                    .await?
                    .ok_or(SessionError::Invalid)?;
                if user.status != AccountStatus::Active {
                    debug!(user_id = id, status = %user.status, "session owner no longer active");
                    return Err(SessionError::Invalid);
                }
                Identity::Local(user)
            }
            IdentityRef::Directory(id) => Identity::Directory(
                self.store
                    .directory_user_by_id(id)
                    .await?
                    .ok_or(SessionError::Invalid)?,
            ),
        };
        Ok(ResolvedSession { session, identity })
    }

    /// Remove the session for `token`. Unknown tokens are not an error.
    pub async fn destroy(&self, token: &str) -> Result<(), SessionError> {
        if token.is_empty() {
            return Ok(());
        }
        if self.store.delete_session(&hash_token(token)).await? {
            debug!("session destroyed");
        }
        Ok(())
    }

    /// Delete every expired session, returning how many were removed.
    pub async fn sweep_expired(&self) -> Result<u64, SessionError> {
        Ok(self.store.delete_expired_sessions(Utc::now()).await?)
    }
}

/// Background task that periodically deletes expired sessions.
pub struct SessionSweeper {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl SessionSweeper {
    /// Spawn the sweeper. The first sweep runs immediately.
    ///
    /// `every` must be non-zero.
    pub fn start(manager: SessionManager, every: Duration) -> Result<Self, SessionError> {
        if every.is_zero() {
            return Err(SessionError::Config(
                "sweep interval must be non-zero".to_string(),
            ));
        }
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(sweep_loop(manager, every, cancel.clone()));
        info!(interval_secs = every.as_secs(), "session sweeper started");
        Ok(Self { cancel, handle })
    }

    /// Stop the sweeper and wait for it to finish.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            warn!(error = %e, "session sweeper task failed");
        }
    }
}

async fn sweep_loop(manager: SessionManager, every: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                info!("session sweeper shutting down");
                break;
            }
            _ = interval.tick() => {
                match manager.sweep_expired().await {
                    Ok(0) => {}
                    Ok(removed) => info!(removed, "expired sessions swept"),
                    Err(e) => warn!(error = %e, "session sweep failed"),
                }
            }
        }
    }
}

/// Generate a random token (64 alphanumeric chars).
fn generate_token() -> String {
    rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// SHA-256 hash a token for storage.
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
