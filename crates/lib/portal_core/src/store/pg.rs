//! PostgreSQL store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{
    DirectoryUserStore, LinkStore, ProfileChanges, SessionStore, StoreError, StoreResult,
    TicketStore, UserStore,
};
use crate::models::{
    AccountStatus, ApplicationLink, DirectoryUser, IdentityRef, LocalUser, NewApplicationLink,
    NewDirectoryUser, NewLocalUser, NewTicket, Session, Ticket, TicketChanges,
};

const USER_COLUMNS: &str = "id, username, email, password_hash, full_name, company_name, phone, \
                            role, status, created_at, updated_at";

const AD_USER_COLUMNS: &str = "id, username, email, full_name, role, last_login, created_at, updated_at";

const TICKET_COLUMNS: &str = "id, external_ticket_id, subject, description, status, priority, \
                              user_id, ad_user_id, assigned_to, created_at, updated_at";

const LINK_COLUMNS: &str = r#"id, name, url, description, icon, is_active, "order""#;

/// Store backed by a PostgreSQL pool. Run [`crate::db::migrate`] first.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Map unique violations to [`StoreError::Conflict`].
fn conflict_or(e: sqlx::Error, what: &str) -> StoreError {
    match e.as_database_error() {
        Some(db) if db.is_unique_violation() => StoreError::Conflict(format!("{what} already exists")),
        _ => StoreError::Database(e),
    }
}

fn parse_column<T>(value: &str) -> StoreResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse::<T>()
        .map_err(|e| StoreError::Corrupt(e.to_string()))
}

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: Option<String>,
    password_hash: Option<String>,
    full_name: Option<String>,
    company_name: Option<String>,
    phone: Option<String>,
    role: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for LocalUser {
    type Error = StoreError;

    fn try_from(r: UserRow) -> StoreResult<Self> {
        Ok(LocalUser {
            id: r.id,
            username: r.username,
            email: r.email,
            password_hash: r.password_hash,
            full_name: r.full_name,
            company_name: r.company_name,
            phone: r.phone,
            role: parse_column(&r.role)?,
            status: parse_column(&r.status)?,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AdUserRow {
    id: i64,
    username: String,
    email: Option<String>,
    full_name: Option<String>,
    role: String,
    last_login: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AdUserRow> for DirectoryUser {
    type Error = StoreError;

    fn try_from(r: AdUserRow) -> StoreResult<Self> {
        Ok(DirectoryUser {
            id: r.id,
            username: r.username,
            email: r.email,
            full_name: r.full_name,
            role: parse_column(&r.role)?,
            last_login: r.last_login,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: String,
    user_id: Option<i64>,
    ad_user_id: Option<i64>,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl TryFrom<SessionRow> for Session {
    type Error = StoreError;

    fn try_from(r: SessionRow) -> StoreResult<Self> {
        let owner = IdentityRef::from_columns(r.user_id, r.ad_user_id).ok_or_else(|| {
            StoreError::Corrupt(format!("session {} does not have exactly one owner", r.id))
        })?;
        Ok(Session {
            id: r.id,
            owner,
            expires_at: r.expires_at,
            created_at: r.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TicketRow {
    id: i64,
    external_ticket_id: String,
    subject: String,
    description: Option<String>,
    status: String,
    priority: String,
    user_id: Option<i64>,
    ad_user_id: Option<i64>,
    assigned_to: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TicketRow> for Ticket {
    type Error = StoreError;

    fn try_from(r: TicketRow) -> StoreResult<Self> {
        Ok(Ticket {
            id: r.id,
            external_ticket_id: r.external_ticket_id,
            subject: r.subject,
            description: r.description,
            status: parse_column(&r.status)?,
            priority: parse_column(&r.priority)?,
            owner: IdentityRef::from_columns(r.user_id, r.ad_user_id),
            assigned_to: r.assigned_to,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct LinkRow {
    id: i64,
    name: String,
    url: String,
    description: Option<String>,
    icon: String,
    is_active: bool,
    order: i32,
}

impl From<LinkRow> for ApplicationLink {
    fn from(r: LinkRow) -> Self {
        ApplicationLink {
            id: r.id,
            name: r.name,
            url: r.url,
            description: r.description,
            icon: r.icon,
            is_active: r.is_active,
            order: r.order,
        }
    }
}

fn convert<R, T>(row: Option<R>) -> StoreResult<Option<T>>
where
    T: TryFrom<R, Error = StoreError>,
{
    row.map(T::try_from).transpose()
}

fn convert_all<R, T>(rows: Vec<R>) -> StoreResult<Vec<T>>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

// ---------------------------------------------------------------------------
// Local users
// ---------------------------------------------------------------------------

#[async_trait]
impl UserStore for PgStore {
    async fn user_by_id(&self, id: i64) -> StoreResult<Option<LocalUser>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        convert(row)
    }

    async fn user_by_username(&self, username: &str) -> StoreResult<Option<LocalUser>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        convert(row)
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<LocalUser>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        convert(row)
    }

    async fn insert_user(&self, user: NewLocalUser) -> StoreResult<LocalUser> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users \
             (username, email, password_hash, full_name, company_name, phone, role, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(&user.company_name)
        .bind(&user.phone)
        .bind(user.role.as_str())
        .bind(user.status.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or(e, "username or email"))?;
        LocalUser::try_from(row)
    }

    async fn set_user_status(
        &self,
        id: i64,
        status: AccountStatus,
    ) -> StoreResult<Option<LocalUser>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET status = $2, updated_at = now() WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?;
        convert(row)
    }

    async fn update_user_profile(
        &self,
        id: i64,
        changes: &ProfileChanges,
    ) -> StoreResult<Option<LocalUser>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET \
               full_name = COALESCE($2, full_name), \
               company_name = COALESCE($3, company_name), \
               phone = COALESCE($4, phone), \
               updated_at = now() \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(&changes.full_name)
        .bind(&changes.company_name)
        .bind(&changes.phone)
        .fetch_optional(&self.pool)
        .await?;
        convert(row)
    }

    async fn users_with_status(&self, status: AccountStatus) -> StoreResult<Vec<LocalUser>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE status = $1 ORDER BY created_at, id"
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }
}

// ---------------------------------------------------------------------------
// Directory users
// ---------------------------------------------------------------------------

#[async_trait]
impl DirectoryUserStore for PgStore {
    async fn directory_user_by_id(&self, id: i64) -> StoreResult<Option<DirectoryUser>> {
        let row = sqlx::query_as::<_, AdUserRow>(&format!(
            "SELECT {AD_USER_COLUMNS} FROM ad_users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        convert(row)
    }

    async fn directory_user_by_username(
        &self,
        username: &str,
    ) -> StoreResult<Option<DirectoryUser>> {
        let row = sqlx::query_as::<_, AdUserRow>(&format!(
            "SELECT {AD_USER_COLUMNS} FROM ad_users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        convert(row)
    }

    async fn insert_directory_user(&self, user: NewDirectoryUser) -> StoreResult<DirectoryUser> {
        let row = sqlx::query_as::<_, AdUserRow>(&format!(
            "INSERT INTO ad_users (username, email, full_name, role, last_login) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {AD_USER_COLUMNS}"
        ))
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(user.role.as_str())
        .bind(user.last_login)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or(e, "directory username"))?;
        DirectoryUser::try_from(row)
    }

    async fn record_directory_login(
        &self,
        id: i64,
        email: Option<&str>,
        full_name: Option<&str>,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<DirectoryUser>> {
        let row = sqlx::query_as::<_, AdUserRow>(&format!(
            "UPDATE ad_users SET \
               last_login = $2, \
               email = COALESCE($3, email), \
               full_name = COALESCE($4, full_name), \
               updated_at = now() \
             WHERE id = $1 \
             RETURNING {AD_USER_COLUMNS}"
        ))
        .bind(id)
        .bind(at)
        .bind(email)
        .bind(full_name)
        .fetch_optional(&self.pool)
        .await?;
        convert(row)
    }
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

#[async_trait]
impl SessionStore for PgStore {
    async fn insert_session(&self, session: &Session) -> StoreResult<()> {
        let (user_id, ad_user_id) = session.owner.to_columns();
        sqlx::query(
            "INSERT INTO sessions (id, user_id, ad_user_id, expires_at, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&session.id)
        .bind(user_id)
        .bind(ad_user_id)
        .bind(session.expires_at)
        .bind(session.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_or(e, "session"))?;
        Ok(())
    }

    async fn session_by_id(&self, id: &str) -> StoreResult<Option<Session>> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT id, user_id, ad_user_id, expires_at, created_at FROM sessions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        convert(row)
    }

    async fn delete_session(&self, id: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

// ---------------------------------------------------------------------------
// Tickets
// ---------------------------------------------------------------------------

#[async_trait]
impl TicketStore for PgStore {
    async fn insert_ticket(&self, ticket: NewTicket) -> StoreResult<Ticket> {
        let (user_id, ad_user_id) = match ticket.owner {
            Some(owner) => owner.to_columns(),
            None => (None, None),
        };
        let row = sqlx::query_as::<_, TicketRow>(&format!(
            "INSERT INTO tickets \
             (external_ticket_id, subject, description, status, priority, user_id, ad_user_id, assigned_to) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {TICKET_COLUMNS}"
        ))
        .bind(&ticket.external_ticket_id)
        .bind(&ticket.subject)
        .bind(&ticket.description)
        .bind(ticket.status.as_str())
        .bind(ticket.priority.as_str())
        .bind(user_id)
        .bind(ad_user_id)
        .bind(ticket.assigned_to)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or(e, "ticket shadow"))?;
        Ticket::try_from(row)
    }

    async fn ticket_by_id(&self, id: i64) -> StoreResult<Option<Ticket>> {
        let row = sqlx::query_as::<_, TicketRow>(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        convert(row)
    }

    async fn ticket_by_external_id(&self, external_id: &str) -> StoreResult<Option<Ticket>> {
        let row = sqlx::query_as::<_, TicketRow>(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE external_ticket_id = $1"
        ))
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;
        convert(row)
    }

    async fn update_ticket(&self, id: i64, changes: &TicketChanges) -> StoreResult<Option<Ticket>> {
        let row = sqlx::query_as::<_, TicketRow>(&format!(
            "UPDATE tickets SET \
               subject = COALESCE($2, subject), \
               description = COALESCE($3, description), \
               status = COALESCE($4, status), \
               priority = COALESCE($5, priority), \
               updated_at = now() \
             WHERE id = $1 \
             RETURNING {TICKET_COLUMNS}"
        ))
        .bind(id)
        .bind(&changes.subject)
        .bind(&changes.description)
        .bind(changes.status.map(|s| s.as_str()))
        .bind(changes.priority.map(|p| p.as_str()))
        .fetch_optional(&self.pool)
        .await?;
        convert(row)
    }

    async fn count_tickets(&self) -> StoreResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tickets")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// ---------------------------------------------------------------------------
// Application links
// ---------------------------------------------------------------------------

#[async_trait]
impl LinkStore for PgStore {
    async fn active_links(&self) -> StoreResult<Vec<ApplicationLink>> {
        let rows = sqlx::query_as::<_, LinkRow>(&format!(
            r#"SELECT {LINK_COLUMNS} FROM application_links WHERE is_active ORDER BY "order", id"#
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(ApplicationLink::from).collect())
    }

    async fn insert_link(&self, link: NewApplicationLink) -> StoreResult<ApplicationLink> {
        let row = sqlx::query_as::<_, LinkRow>(&format!(
            r#"INSERT INTO application_links (name, url, description, icon, is_active, "order")
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING {LINK_COLUMNS}"#
        ))
        .bind(&link.name)
        .bind(&link.url)
        .bind(&link.description)
        .bind(&link.icon)
        .bind(link.is_active)
        .bind(link.order)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn link_count(&self) -> StoreResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM application_links")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
