//! In-memory store for tests and local development.
//!
//! Mirrors the constraints the PostgreSQL schema enforces (unique usernames,
//! emails and external ticket ids) so both backends fail the same way.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{
    DirectoryUserStore, LinkStore, ProfileChanges, SessionStore, StoreError, StoreResult,
    TicketStore, UserStore,
};
use crate::models::{
    AccountStatus, ApplicationLink, DirectoryUser, LocalUser, NewApplicationLink,
    NewDirectoryUser, NewLocalUser, NewTicket, Session, Ticket, TicketChanges,
};

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<i64, LocalUser>,
    ad_users: BTreeMap<i64, DirectoryUser>,
    sessions: BTreeMap<String, Session>,
    tickets: BTreeMap<i64, Ticket>,
    links: BTreeMap<i64, ApplicationLink>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

fn same_email(a: Option<&str>, b: &str) -> bool {
    a.is_some_and(|a| a.eq_ignore_ascii_case(b))
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions, expired or not.
    pub async fn session_count(&self) -> usize {
        self.tables.read().await.sessions.len()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn user_by_id(&self, id: i64) -> StoreResult<Option<LocalUser>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn user_by_username(&self, username: &str) -> StoreResult<Option<LocalUser>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<LocalUser>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| same_email(u.email.as_deref(), email))
            .cloned())
    }

    async fn insert_user(&self, user: NewLocalUser) -> StoreResult<LocalUser> {
        let mut tables = self.tables.write().await;
        let taken = tables.users.values().any(|u| {
            u.username == user.username
                || user
                    .email
                    .as_deref()
                    .is_some_and(|e| same_email(u.email.as_deref(), e))
        });
        if taken {
            return Err(StoreError::Conflict("username or email already exists".into()));
        }
        let now = Utc::now();
        let id = tables.next_id();
        let record = LocalUser {
            id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            full_name: user.full_name,
            company_name: user.company_name,
            phone: user.phone,
            role: user.role,
            status: user.status,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(id, record.clone());
        Ok(record)
    }

    async fn set_user_status(
        &self,
        id: i64,
        status: AccountStatus,
    ) -> StoreResult<Option<LocalUser>> {
        let mut tables = self.tables.write().await;
        Ok(tables.users.get_mut(&id).map(|u| {
            u.status = status;
            u.updated_at = Utc::now();
            u.clone()
        }))
    }

    async fn update_user_profile(
        &self,
        id: i64,
        changes: &ProfileChanges,
    ) -> StoreResult<Option<LocalUser>> {
        let mut tables = self.tables.write().await;
        Ok(tables.users.get_mut(&id).map(|u| {
            if let Some(v) = &changes.full_name {
                u.full_name = Some(v.clone());
            }
            if let Some(v) = &changes.company_name {
                u.company_name = Some(v.clone());
            }
            if let Some(v) = &changes.phone {
                u.phone = Some(v.clone());
            }
            u.updated_at = Utc::now();
            u.clone()
        }))
    }

    async fn users_with_status(&self, status: AccountStatus) -> StoreResult<Vec<LocalUser>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .filter(|u| u.status == status)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl DirectoryUserStore for MemoryStore {
    async fn directory_user_by_id(&self, id: i64) -> StoreResult<Option<DirectoryUser>> {
        Ok(self.tables.read().await.ad_users.get(&id).cloned())
    }

    async fn directory_user_by_username(
        &self,
        username: &str,
    ) -> StoreResult<Option<DirectoryUser>> {
        let tables = self.tables.read().await;
        Ok(tables
            .ad_users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn insert_directory_user(&self, user: NewDirectoryUser) -> StoreResult<DirectoryUser> {
        let mut tables = self.tables.write().await;
        if tables.ad_users.values().any(|u| u.username == user.username) {
            return Err(StoreError::Conflict("directory username already exists".into()));
        }
        let now = Utc::now();
        let id = tables.next_id();
        let record = DirectoryUser {
            id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            role: user.role,
            last_login: Some(user.last_login),
            created_at: now,
            updated_at: now,
        };
        tables.ad_users.insert(id, record.clone());
        Ok(record)
    }

    async fn record_directory_login(
        &self,
        id: i64,
        email: Option<&str>,
        full_name: Option<&str>,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<DirectoryUser>> {
        let mut tables = self.tables.write().await;
        Ok(tables.ad_users.get_mut(&id).map(|u| {
            u.last_login = Some(at);
            if let Some(email) = email {
                u.email = Some(email.to_string());
            }
            if let Some(full_name) = full_name {
                u.full_name = Some(full_name.to_string());
            }
            u.updated_at = Utc::now();
            u.clone()
        }))
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn insert_session(&self, session: &Session) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.sessions.contains_key(&session.id) {
            return Err(StoreError::Conflict("session already exists".into()));
        }
        tables.sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn session_by_id(&self, id: &str) -> StoreResult<Option<Session>> {
        Ok(self.tables.read().await.sessions.get(id).cloned())
    }

    async fn delete_session(&self, id: &str) -> StoreResult<bool> {
        Ok(self.tables.write().await.sessions.remove(id).is_some())
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.sessions.len();
        tables.sessions.retain(|_, s| !s.is_expired_at(now));
        Ok((before - tables.sessions.len()) as u64)
    }
}

#[async_trait]
impl TicketStore for MemoryStore {
    async fn insert_ticket(&self, ticket: NewTicket) -> StoreResult<Ticket> {
        let mut tables = self.tables.write().await;
        if tables
            .tickets
            .values()
            .any(|t| t.external_ticket_id == ticket.external_ticket_id)
        {
            return Err(StoreError::Conflict("ticket shadow already exists".into()));
        }
        let now = Utc::now();
        let id = tables.next_id();
        let record = Ticket {
            id,
            external_ticket_id: ticket.external_ticket_id,
            subject: ticket.subject,
            description: ticket.description,
            status: ticket.status,
            priority: ticket.priority,
            owner: ticket.owner,
            assigned_to: ticket.assigned_to,
            created_at: now,
            updated_at: now,
        };
        tables.tickets.insert(id, record.clone());
        Ok(record)
    }

    async fn ticket_by_id(&self, id: i64) -> StoreResult<Option<Ticket>> {
        Ok(self.tables.read().await.tickets.get(&id).cloned())
    }

    async fn ticket_by_external_id(&self, external_id: &str) -> StoreResult<Option<Ticket>> {
        let tables = self.tables.read().await;
        Ok(tables
            .tickets
            .values()
            .find(|t| t.external_ticket_id == external_id)
            .cloned())
    }

    async fn update_ticket(&self, id: i64, changes: &TicketChanges) -> StoreResult<Option<Ticket>> {
        let mut tables = self.tables.write().await;
        Ok(tables.tickets.get_mut(&id).map(|t| {
            changes.apply(t);
            t.updated_at = Utc::now();
            t.clone()
        }))
    }

    async fn count_tickets(&self) -> StoreResult<i64> {
        Ok(self.tables.read().await.tickets.len() as i64)
    }
}

#[async_trait]
impl LinkStore for MemoryStore {
    async fn active_links(&self) -> StoreResult<Vec<ApplicationLink>> {
        let tables = self.tables.read().await;
        let mut links: Vec<_> = tables.links.values().filter(|l| l.is_active).cloned().collect();
        links.sort_by_key(|l| (l.order, l.id));
        Ok(links)
    }

    async fn insert_link(&self, link: NewApplicationLink) -> StoreResult<ApplicationLink> {
        let mut tables = self.tables.write().await;
        let id = tables.next_id();
        let record = ApplicationLink {
            id,
            name: link.name,
            url: link.url,
            description: link.description,
            icon: link.icon,
            is_active: link.is_active,
            order: link.order,
        };
        tables.links.insert(id, record.clone());
        Ok(record)
    }

    async fn link_count(&self) -> StoreResult<i64> {
        Ok(self.tables.read().await.links.len() as i64)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::models::{IdentityRef, LocalRole, TicketPriority, TicketStatus};

    fn customer(username: &str, email: Option<&str>) -> NewLocalUser {
        NewLocalUser {
            username: username.into(),
            email: email.map(str::to_string),
            password_hash: None,
            full_name: None,
            company_name: None,
            phone: None,
            role: LocalRole::Customer,
            status: AccountStatus::Pending,
        }
    }

    #[tokio::test]
    async fn duplicate_username_or_email_conflicts() {
        let store = MemoryStore::new();
        store.insert_user(customer("alice", Some("alice@example.com"))).await.unwrap();

        let dup_name = store.insert_user(customer("alice", None)).await;
        assert!(matches!(dup_name, Err(StoreError::Conflict(_))));

        let dup_email = store.insert_user(customer("alice2", Some("ALICE@example.com"))).await;
        assert!(matches!(dup_email, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn login_lookup_matches_username_then_email() {
        let store = MemoryStore::new();
        let user = store.insert_user(customer("bob", Some("bob@example.com"))).await.unwrap();

        let by_name = store.user_by_login("bob").await.unwrap().unwrap();
        let by_email = store.user_by_login("Bob@Example.com").await.unwrap().unwrap();
        assert_eq!(by_name.id, user.id);
        assert_eq!(by_email.id, user.id);
        assert!(store.user_by_login("carol").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_sessions_are_swept_at_the_boundary() {
        let store = MemoryStore::new();
        let now = Utc::now();
        for (id, offset) in [("past", -1), ("edge", 0), ("future", 60)] {
            store
                .insert_session(&Session {
                    id: id.into(),
                    owner: IdentityRef::Local(1),
                    expires_at: now + Duration::seconds(offset),
                    created_at: now,
                })
                .await
                .unwrap();
        }

        assert_eq!(store.delete_expired_sessions(now).await.unwrap(), 2);
        assert!(store.session_by_id("future").await.unwrap().is_some());
        assert!(!store.delete_session("past").await.unwrap());
    }

    #[tokio::test]
    async fn ticket_external_id_is_unique() {
        let store = MemoryStore::new();
        let shadow = || NewTicket {
            external_ticket_id: "42".into(),
            subject: "Printer".into(),
            description: None,
            status: TicketStatus::Open,
            priority: TicketPriority::Medium,
            owner: None,
            assigned_to: None,
        };
        store.insert_ticket(shadow()).await.unwrap();
        assert!(matches!(
            store.insert_ticket(shadow()).await,
            Err(StoreError::Conflict(_))
        ));
        assert_eq!(store.count_tickets().await.unwrap(), 1);
    }
}
