//! API server configuration.

use portal_core::auth::sessions::DEFAULT_SESSION_TTL_SECS;

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3100").
    pub bind_addr: String,
    /// Lifetime of a login session and its cookie.
    pub session_ttl: chrono::Duration,
    /// Mark the session cookie `Secure`. On in production.
    pub secure_cookies: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3100".into(),
            session_ttl: chrono::Duration::seconds(DEFAULT_SESSION_TTL_SECS),
            secure_cookies: false,
        }
    }
}
