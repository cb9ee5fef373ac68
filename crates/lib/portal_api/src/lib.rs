//! # portal_api
//!
//! HTTP API library for the business portal.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use portal_core::auth::identity::IdentityStore;
use portal_core::auth::sessions::SessionManager;
use portal_core::store::Store;
use portal_core::tickets::TicketService;
use tower_http::cors::{Any, CorsLayer};

use crate::config::ApiConfig;
use crate::handlers::{admin, auth, links, tickets};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// API configuration.
    pub config: ApiConfig,
    /// Persistence backend.
    pub store: Arc<dyn Store>,
    pub identities: IdentityStore,
    pub sessions: SessionManager,
    pub tickets: TicketService,
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no session required)
    let public = Router::new()
        .route(
            routes::POST_AUTH_EMPLOYEE_LOGIN,
            post(auth::employee_login_handler),
        )
        .route(
            routes::POST_AUTH_CUSTOMER_LOGIN,
            post(auth::customer_login_handler),
        )
        .route(
            routes::POST_AUTH_CUSTOMER_REGISTER,
            post(auth::register_handler),
        )
        .route(routes::POST_AUTH_LOGOUT, post(auth::logout_handler));

    let admin = Router::new()
        .route(
            routes::GET_ADMIN_PENDING_CUSTOMERS,
            get(admin::pending_customers_handler),
        )
        .route(
            routes::POST_ADMIN_APPROVE_CUSTOMER,
            post(admin::approve_customer_handler),
        )
        .route(
            routes::POST_ADMIN_DEACTIVATE_CUSTOMER,
            post(admin::deactivate_customer_handler),
        )
        .route_layer(axum::middleware::from_fn(middleware::auth::require_admin));

    let employee = Router::new()
        .route(routes::GET_LINKS, get(links::list_links_handler))
        .route_layer(axum::middleware::from_fn(
            middleware::auth::require_employee,
        ));

    // Session routes; role layers above run after the session is resolved.
    let protected = Router::new()
        .route(
            routes::AUTH_ME,
            get(auth::me_handler).patch(auth::update_me_handler),
        )
        .route(
            routes::TICKETS,
            get(tickets::list_tickets_handler).post(tickets::create_ticket_handler),
        )
        .route(
            routes::TICKETS_ID,
            get(tickets::get_ticket_handler).patch(tickets::update_ticket_handler),
        )
        .merge(admin)
        .merge(employee)
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_session,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(cors)
        .with_state(state)
}
