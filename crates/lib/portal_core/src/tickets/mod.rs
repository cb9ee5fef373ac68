//! Ticket proxy adapter.
//!
//! Tickets live in the helpdesk. The portal forwards create, read, and update
//! calls to it and keeps a local shadow row per ticket for attribution. The
//! helpdesk is always written first, so a failed external call never leaves a
//! local-only ticket behind.

pub mod mapping;
pub mod service;
pub mod zammad;

use thiserror::Error;

use crate::store::StoreError;
use crate::validation::FieldErrors;

pub use service::{TicketRequest, TicketService};
pub use zammad::{Helpdesk, HelpdeskAuth, HelpdeskConfig, HelpdeskError, ZammadClient};

#[derive(Debug, Error)]
pub enum TicketError {
    #[error("Validation error: {0}")]
    Validation(FieldErrors),

    #[error("Ticket {0} not found")]
    NotFound(i64),

    #[error("Ticket {0} belongs to another account")]
    Forbidden(i64),

    #[error("Helpdesk unavailable: {0}")]
    ExternalUnavailable(#[source] HelpdeskError),

    /// The helpdesk accepted a write the local shadow could not record.
    #[error("Helpdesk ticket {external_id} was written but the local record was not: {reason}")]
    PartialSyncFailure { external_id: String, reason: String },

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl From<HelpdeskError> for TicketError {
    fn from(e: HelpdeskError) -> Self {
        TicketError::ExternalUnavailable(e)
    }
}
