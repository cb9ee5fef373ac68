//! Ticket operations on behalf of an authenticated identity.

use std::sync::Arc;

use tracing::{debug, error, info};

use super::TicketError;
use super::mapping::{
    priority_from_external, priority_to_external, status_from_external, status_to_external,
};
use super::zammad::{ExternalTicket, Helpdesk, TicketDraft, TicketPatch};
use crate::models::{
    Identity, IdentityKind, NewTicket, Ticket, TicketChanges, TicketPriority, TicketStatus,
};
use crate::store::{StoreError, TicketStore};
use crate::validation::FieldErrors;

/// A new ticket as submitted by a portal user.
#[derive(Debug, Clone, Default)]
pub struct TicketRequest {
    pub subject: String,
    pub description: String,
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
}

#[derive(Clone)]
pub struct TicketService {
    store: Arc<dyn TicketStore>,
    helpdesk: Arc<dyn Helpdesk>,
}

impl TicketService {
    pub fn new(store: Arc<dyn TicketStore>, helpdesk: Arc<dyn Helpdesk>) -> Self {
        Self { store, helpdesk }
    }

    /// File a ticket in the helpdesk, then record its shadow.
    pub async fn create_ticket(
        &self,
        identity: &Identity,
        request: TicketRequest,
    ) -> Result<Ticket, TicketError> {
        let mut errors = FieldErrors::new();
        errors.require("subject", &request.subject, "Subject is required");
        errors.require("description", &request.description, "Description is required");
        let email = identity.email().filter(|e| !e.trim().is_empty());
        if email.is_none() {
            errors.add("email", "Account has no email address");
        }
        errors.into_result().map_err(TicketError::Validation)?;
        let email = email.unwrap_or_default();

        let status = request.status.unwrap_or_default();
        let priority = request.priority.unwrap_or_default();
        let customer = self
            .helpdesk
            .find_or_create_customer(email, identity.display_name())
            .await?;
        let external = self
            .helpdesk
            .create_ticket(
                customer.id,
                &TicketDraft {
                    title: request.subject.trim().to_string(),
                    body: request.description.clone(),
                    state_id: status_to_external(status),
                    priority_id: priority_to_external(priority),
                },
            )
            .await?;
        let external_id = external.external_id();

        let shadow = NewTicket {
            external_ticket_id: external_id.clone(),
            subject: request.subject.trim().to_string(),
            description: Some(request.description),
            status,
            priority,
            owner: Some(identity.reference()),
            assigned_to: None,
        };
        let partial = |reason: String| {
            error!(external_id = %external_id, reason = %reason, "ticket created in helpdesk but not recorded locally");
            TicketError::PartialSyncFailure {
                external_id: external_id.clone(),
                reason,
            }
        };
        let ticket = match self.store.insert_ticket(shadow).await {
            Ok(ticket) => ticket,
            // A concurrent listing refresh shadowed it first; both sides agree.
            Err(StoreError::Conflict(_)) => self
                .store
                .ticket_by_external_id(&external_id)
                .await
                .map_err(|e| partial(e.to_string()))?
                .ok_or_else(|| partial("shadow vanished after conflict".to_string()))?,
            Err(e) => return Err(partial(e.to_string())),
        };
        info!(ticket_id = ticket.id, external_id = %external_id, owner = ?ticket.owner, "ticket created");
        Ok(ticket)
    }

    /// Tickets the helpdesk holds for the identity's email, refreshed into
    /// local shadows. An email unknown to the helpdesk has no tickets.
    pub async fn tickets_for_identity(&self, identity: &Identity) -> Result<Vec<Ticket>, TicketError> {
        let Some(email) = identity.email().filter(|e| !e.trim().is_empty()) else {
            debug!(username = identity.username(), "no email, no helpdesk tickets");
            return Ok(Vec::new());
        };
        let Some(customer) = self.helpdesk.find_customer(email).await? else {
            debug!(email, "no helpdesk customer for email");
            return Ok(Vec::new());
        };

        let external = self.helpdesk.tickets_for_customer(customer.id).await?;
        let mut tickets = Vec::with_capacity(external.len());
        for ext in &external {
            tickets.push(self.refresh_shadow(identity, ext).await?);
        }
        Ok(tickets)
    }

    /// One ticket, refreshed from the helpdesk.
    pub async fn get_ticket(&self, identity: &Identity, id: i64) -> Result<Ticket, TicketError> {
        let local = self.accessible_ticket(identity, id).await?;
        let external = self.helpdesk.ticket(&local.external_ticket_id).await?;
        let refreshed = self
            .store
            .update_ticket(local.id, &changes_from_external(&external))
            .await?;
        Ok(refreshed.unwrap_or(local))
    }

    /// Write `changes` to the helpdesk, then to the shadow.
    ///
    /// A shadow write that fails after the helpdesk accepted the change is a
    /// [`TicketError::PartialSyncFailure`].
    pub async fn update_ticket(
        &self,
        identity: &Identity,
        id: i64,
        changes: TicketChanges,
    ) -> Result<Ticket, TicketError> {
        validate_changes(&changes)?;
        let local = self.accessible_ticket(identity, id).await?;
        let external_id = local.external_ticket_id.clone();

        let patch = TicketPatch {
            title: changes.subject.clone(),
            body: changes.description.clone(),
            state_id: changes.status.map(status_to_external),
            priority_id: changes.priority.map(priority_to_external),
        };
        self.helpdesk.update_ticket(&external_id, &patch).await?;

        let partial = |reason: String| {
            error!(ticket_id = id, external_id = %external_id, reason = %reason, "helpdesk updated but local record was not");
            TicketError::PartialSyncFailure {
                external_id: external_id.clone(),
                reason,
            }
        };
        match self.store.update_ticket(id, &changes).await {
            Ok(Some(ticket)) => {
                info!(ticket_id = id, external_id = %external_id, "ticket updated");
                Ok(ticket)
            }
            Ok(None) => Err(partial("local record disappeared".to_string())),
            Err(e) => Err(partial(e.to_string())),
        }
    }

    async fn accessible_ticket(&self, identity: &Identity, id: i64) -> Result<Ticket, TicketError> {
        let ticket = self
            .store
            .ticket_by_id(id)
            .await?
            .ok_or(TicketError::NotFound(id))?;
        if !can_access(identity, &ticket) {
            return Err(TicketError::Forbidden(id));
        }
        Ok(ticket)
    }

    async fn refresh_shadow(
        &self,
        identity: &Identity,
        external: &ExternalTicket,
    ) -> Result<Ticket, TicketError> {
        let external_id = external.external_id();
        let changes = changes_from_external(external);
        if let Some(existing) = self.store.ticket_by_external_id(&external_id).await? {
            return Ok(self
                .store
                .update_ticket(existing.id, &changes)
                .await?
                .unwrap_or(existing));
        }

        let shadow = NewTicket {
            external_ticket_id: external_id.clone(),
            subject: external.title.clone(),
            description: external.description().map(str::to_string),
            status: status_from_external(external.state_id),
            priority: priority_from_external(external.priority_id),
            owner: Some(identity.reference()),
            assigned_to: None,
        };
        match self.store.insert_ticket(shadow).await {
            Ok(ticket) => Ok(ticket),
            // Another request shadowed it first.
            Err(StoreError::Conflict(_)) => self
                .store
                .ticket_by_external_id(&external_id)
                .await?
                .ok_or_else(|| TicketError::Store(StoreError::Conflict(external_id))),
            Err(e) => Err(e.into()),
        }
    }
}

/// Employees and admins see every ticket; customers only their own.
fn can_access(identity: &Identity, ticket: &Ticket) -> bool {
    identity.kind() == IdentityKind::Directory
        || identity.is_admin()
        || ticket.owner == Some(identity.reference())
}

fn changes_from_external(external: &ExternalTicket) -> TicketChanges {
    TicketChanges {
        subject: Some(external.title.clone()),
        description: external.description().map(str::to_string),
        status: Some(status_from_external(external.state_id)),
        priority: Some(priority_from_external(external.priority_id)),
    }
}

fn validate_changes(changes: &TicketChanges) -> Result<(), TicketError> {
    let mut errors = FieldErrors::new();
    if changes.is_empty() {
        errors.add("body", "No changes supplied");
    }
    if let Some(subject) = &changes.subject {
        errors.require("subject", subject, "Subject must not be blank");
    }
    errors.into_result().map_err(TicketError::Validation)
}
