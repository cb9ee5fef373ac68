//! Persistence traits and backends.
//!
//! Each component depends only on the slice of storage it needs
//! (`TicketStore` for the ticket adapter, `SessionStore` for sessions, ...).
//! [`Store`] bundles all of them for callers that wire the whole system.

pub mod memory;
pub mod pg;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{
    AccountStatus, ApplicationLink, DirectoryUser, LocalUser, NewApplicationLink,
    NewDirectoryUser, NewLocalUser, NewTicket, Session, Ticket, TicketChanges,
};

pub use memory::MemoryStore;
pub use pg::PgStore;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Profile fields a local account may change. `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub full_name: Option<String>,
    pub company_name: Option<String>,
    pub phone: Option<String>,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn user_by_id(&self, id: i64) -> StoreResult<Option<LocalUser>>;

    async fn user_by_username(&self, username: &str) -> StoreResult<Option<LocalUser>>;

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<LocalUser>>;

    /// Look a user up by username first, then by email.
    async fn user_by_login(&self, identifier: &str) -> StoreResult<Option<LocalUser>> {
        if let Some(user) = self.user_by_username(identifier).await? {
            return Ok(Some(user));
        }
        self.user_by_email(identifier).await
    }

    /// Fails with [`StoreError::Conflict`] on a duplicate username or email.
    async fn insert_user(&self, user: NewLocalUser) -> StoreResult<LocalUser>;

    async fn set_user_status(
        &self,
        id: i64,
        status: AccountStatus,
    ) -> StoreResult<Option<LocalUser>>;

    async fn update_user_profile(
        &self,
        id: i64,
        changes: &ProfileChanges,
    ) -> StoreResult<Option<LocalUser>>;

    /// Users with the given status, oldest first.
    async fn users_with_status(&self, status: AccountStatus) -> StoreResult<Vec<LocalUser>>;
}

#[async_trait]
pub trait DirectoryUserStore: Send + Sync {
    async fn directory_user_by_id(&self, id: i64) -> StoreResult<Option<DirectoryUser>>;

    async fn directory_user_by_username(
        &self,
        username: &str,
    ) -> StoreResult<Option<DirectoryUser>>;

    async fn insert_directory_user(&self, user: NewDirectoryUser) -> StoreResult<DirectoryUser>;

    /// Stamp `last_login` and refresh the profile fields copied from the directory.
    async fn record_directory_login(
        &self,
        id: i64,
        email: Option<&str>,
        full_name: Option<&str>,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<DirectoryUser>>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert_session(&self, session: &Session) -> StoreResult<()>;

    async fn session_by_id(&self, id: &str) -> StoreResult<Option<Session>>;

    /// Returns whether a row was removed.
    async fn delete_session(&self, id: &str) -> StoreResult<bool>;

    /// Delete every session with `expires_at <= now`, returning how many went.
    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> StoreResult<u64>;
}

#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Fails with [`StoreError::Conflict`] if the external id is already shadowed.
    async fn insert_ticket(&self, ticket: NewTicket) -> StoreResult<Ticket>;

    async fn ticket_by_id(&self, id: i64) -> StoreResult<Option<Ticket>>;

    async fn ticket_by_external_id(&self, external_id: &str) -> StoreResult<Option<Ticket>>;

    async fn update_ticket(&self, id: i64, changes: &TicketChanges) -> StoreResult<Option<Ticket>>;

    async fn count_tickets(&self) -> StoreResult<i64>;
}

#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Active links ordered by their `order` column.
    async fn active_links(&self) -> StoreResult<Vec<ApplicationLink>>;

    async fn insert_link(&self, link: NewApplicationLink) -> StoreResult<ApplicationLink>;

    async fn link_count(&self) -> StoreResult<i64>;
}

/// Every storage capability the portal uses.
pub trait Store:
    UserStore + DirectoryUserStore + SessionStore + TicketStore + LinkStore
{
}

impl<T> Store for T where
    T: UserStore + DirectoryUserStore + SessionStore + TicketStore + LinkStore
{
}
