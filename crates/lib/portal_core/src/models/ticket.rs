//! Local shadow records of helpdesk tickets.
//!
//! The helpdesk owns ticket content; these rows cache what the portal last
//! wrote or read so tickets can be attributed to a portal identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::identity::{IdentityRef, text_enum};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    #[default]
    Open,
    InProgress,
    Pending,
    Resolved,
    Closed,
}

text_enum!(TicketStatus, "ticket status", {
    Open => "open",
    InProgress => "in_progress",
    Pending => "pending",
    Resolved => "resolved",
    Closed => "closed",
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketPriority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

text_enum!(TicketPriority, "ticket priority", {
    Low => "low",
    Medium => "medium",
    High => "high",
    Critical => "critical",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    /// Identifier of the authoritative ticket in the helpdesk.
    pub external_ticket_id: String,
    pub subject: String,
    pub description: Option<String>,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub owner: Option<IdentityRef>,
    /// Directory user the ticket is assigned to.
    pub assigned_to: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTicket {
    pub external_ticket_id: String,
    pub subject: String,
    pub description: Option<String>,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub owner: Option<IdentityRef>,
    pub assigned_to: Option<i64>,
}

/// Partial update applied to a shadow record. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketChanges {
    pub subject: Option<String>,
    pub description: Option<String>,
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
}

impl TicketChanges {
    pub fn is_empty(&self) -> bool {
        *self == TicketChanges::default()
    }

    pub fn apply(&self, ticket: &mut Ticket) {
        if let Some(subject) = &self.subject {
            ticket.subject = subject.clone();
        }
        if let Some(description) = &self.description {
            ticket.description = Some(description.clone());
        }
        if let Some(status) = self.status {
            ticket.status = status;
        }
        if let Some(priority) = self.priority {
            ticket.priority = priority;
        }
    }
}
