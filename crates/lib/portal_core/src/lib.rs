//! # portal_core
//!
//! Domain logic for the business portal: identities, sessions, authorization,
//! and the helpdesk ticket adapter.

pub mod auth;
pub mod db;
pub mod links;
pub mod models;
pub mod store;
pub mod tickets;
pub mod validation;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
