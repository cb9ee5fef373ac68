//! Domain models shared by the store, the services and the HTTP layer.

pub mod identity;
pub mod links;
pub mod session;
pub mod ticket;

pub use identity::{
    AccountStatus, DirectoryRole, DirectoryUser, Identity, IdentityKind, IdentityRef, LocalRole,
    LocalUser, NewDirectoryUser, NewLocalUser,
};
pub use links::{ApplicationLink, NewApplicationLink};
pub use session::Session;
pub use ticket::{NewTicket, Ticket, TicketChanges, TicketPriority, TicketStatus};
