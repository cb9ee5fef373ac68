//! Request and response bodies.

use chrono::{DateTime, Utc};
use portal_core::models::{
    AccountStatus, ApplicationLink, Identity, IdentityKind, IdentityRef, LocalUser, Ticket,
    TicketChanges, TicketPriority, TicketStatus,
};
use portal_core::store::ProfileChanges;
use portal_core::tickets::TicketRequest;
use portal_core::validation::FieldErrors;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldErrors>,
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct EmployeeLoginRequest {
    pub username: String,
    pub password: String,
}

/// `username` may also be the account email.
#[derive(Debug, Deserialize)]
pub struct CustomerLoginRequest {
    #[serde(alias = "email")]
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub company_name: Option<String>,
    pub phone: Option<String>,
}

impl From<UpdateProfileRequest> for ProfileChanges {
    fn from(body: UpdateProfileRequest) -> Self {
        ProfileChanges {
            full_name: body.full_name,
            company_name: body.company_name,
            phone: body.phone,
        }
    }
}

/// Public view of either account kind.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: i64,
    pub kind: IdentityKind,
    pub username: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub display_name: String,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AccountStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
}

impl From<&Identity> for UserView {
    fn from(identity: &Identity) -> Self {
        let display_name = identity.display_name().to_string();
        match identity {
            Identity::Local(u) => UserView {
                id: u.id,
                kind: IdentityKind::Local,
                username: u.username.clone(),
                email: u.email.clone(),
                full_name: u.full_name.clone(),
                display_name,
                role: u.role.to_string(),
                status: Some(u.status),
                company_name: u.company_name.clone(),
                phone: u.phone.clone(),
                last_login: None,
            },
            Identity::Directory(u) => UserView {
                id: u.id,
                kind: IdentityKind::Directory,
                username: u.username.clone(),
                email: u.email.clone(),
                full_name: u.full_name.clone(),
                display_name,
                role: u.role.to_string(),
                status: None,
                company_name: None,
                phone: None,
                last_login: u.last_login,
            },
        }
    }
}

impl From<LocalUser> for UserView {
    fn from(user: LocalUser) -> Self {
        UserView::from(&Identity::Local(user))
    }
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: UserView,
}

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub users: Vec<UserView>,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

// ---------------------------------------------------------------------------
// Tickets
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateTicketRequest {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: Option<TicketStatus>,
    #[serde(default)]
    pub priority: Option<TicketPriority>,
}

impl From<CreateTicketRequest> for TicketRequest {
    fn from(body: CreateTicketRequest) -> Self {
        TicketRequest {
            subject: body.subject,
            description: body.description,
            status: body.status,
            priority: body.priority,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateTicketRequest {
    pub subject: Option<String>,
    pub description: Option<String>,
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
}

impl From<UpdateTicketRequest> for TicketChanges {
    fn from(body: UpdateTicketRequest) -> Self {
        TicketChanges {
            subject: body.subject,
            description: body.description,
            status: body.status,
            priority: body.priority,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketView {
    pub id: i64,
    /// Helpdesk ticket id.
    pub ticket_id: String,
    pub subject: String,
    pub description: Option<String>,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub owner: Option<IdentityRef>,
    pub assigned_to: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Ticket> for TicketView {
    fn from(t: Ticket) -> Self {
        TicketView {
            id: t.id,
            ticket_id: t.external_ticket_id,
            subject: t.subject,
            description: t.description,
            status: t.status,
            priority: t.priority,
            owner: t.owner,
            assigned_to: t.assigned_to,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TicketResponse {
    pub ticket: TicketView,
}

#[derive(Debug, Serialize)]
pub struct TicketsResponse {
    pub tickets: Vec<TicketView>,
}

// ---------------------------------------------------------------------------
// Links
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct LinksResponse {
    pub links: Vec<ApplicationLink>,
}
