//! Session middleware: resolves the session cookie and applies the
//! authorization guard.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use portal_core::auth::guard::{self, ROLE_ADMIN, ROLE_EMPLOYEE};
use portal_core::auth::sessions::ResolvedSession;

use crate::AppState;
use crate::error::AppError;
use crate::services::cookies::SESSION_COOKIE;

/// The resolved session, stored in request extensions.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub ResolvedSession);

/// Axum middleware: resolves the `sessionId` cookie and injects
/// `AuthenticatedUser` into request extensions.
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = jar
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or_else(|| AppError::Unauthorized("Authentication required".into()))?;

    let resolved = state.sessions.resolve(&token).await?;
    request.extensions_mut().insert(AuthenticatedUser(resolved));

    Ok(next.run(request).await)
}

/// Admin-only routes. Layer inside [`require_session`].
pub async fn require_admin(request: Request, next: Next) -> Result<Response, AppError> {
    check(&request, ROLE_ADMIN)?;
    Ok(next.run(request).await)
}

/// Employee routes; directory admins pass too.
pub async fn require_employee(request: Request, next: Next) -> Result<Response, AppError> {
    check(&request, ROLE_EMPLOYEE)?;
    Ok(next.run(request).await)
}

fn check(request: &Request, required: &str) -> Result<(), AppError> {
    let session = request
        .extensions()
        .get::<AuthenticatedUser>()
        .map(|u| &u.0);
    guard::authorize(session, required)?;
    Ok(())
}
