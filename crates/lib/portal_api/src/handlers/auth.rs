//! Authentication request handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use axum_extra::extract::WithRejection;
use axum_extra::extract::cookie::CookieJar;
use portal_core::auth::identity::CustomerRegistration;
use portal_core::models::Identity;
use tracing::info;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{
    CustomerLoginRequest, EmployeeLoginRequest, LogoutResponse, RegisterRequest,
    UpdateProfileRequest, UserResponse, UserView,
};
use crate::services::cookies::{SESSION_COOKIE, clear_session_cookie, session_cookie};

/// Open a session for `identity` and attach its cookie.
async fn start_session(
    state: &AppState,
    jar: CookieJar,
    identity: &Identity,
) -> AppResult<(CookieJar, Json<UserResponse>)> {
    let issued = state
        .sessions
        .create_for(identity, state.config.session_ttl)
        .await?;
    let cookie = session_cookie(
        &issued.token,
        state.config.session_ttl,
        state.config.secure_cookies,
    );
    Ok((
        jar.add(cookie),
        Json(UserResponse {
            user: UserView::from(identity),
        }),
    ))
}

/// `POST /auth/employee/login`: directory credentials.
pub async fn employee_login_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(body), _): WithRejection<Json<EmployeeLoginRequest>, AppError>,
) -> AppResult<(CookieJar, Json<UserResponse>)> {
    let user = state
        .identities
        .authenticate_directory(&body.username, &body.password)
        .await?;
    start_session(&state, jar, &Identity::Directory(user)).await
}

/// `POST /auth/customer/login`: username or email plus password.
pub async fn customer_login_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(body), _): WithRejection<Json<CustomerLoginRequest>, AppError>,
) -> AppResult<(CookieJar, Json<UserResponse>)> {
    let user = state
        .identities
        .authenticate_local(&body.username, &body.password)
        .await?;
    start_session(&state, jar, &Identity::Local(user)).await
}

/// `POST /auth/customer/register`: create a pending customer account.
pub async fn register_handler(
    State(state): State<AppState>,
    WithRejection(Json(body), _): WithRejection<Json<RegisterRequest>, AppError>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let user = state
        .identities
        .register_customer(CustomerRegistration {
            username: body.username,
            email: body.email,
            password: body.password,
            full_name: body.full_name,
            company_name: body.company_name,
            phone: body.phone,
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            user: UserView::from(user),
        }),
    ))
}

/// `GET /auth/me`: the caller's identity.
pub async fn me_handler(
    Extension(AuthenticatedUser(session)): Extension<AuthenticatedUser>,
) -> Json<UserResponse> {
    Json(UserResponse {
        user: UserView::from(&session.identity),
    })
}

/// `PATCH /auth/me`: update the caller's profile. Local accounts only.
pub async fn update_me_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(session)): Extension<AuthenticatedUser>,
    WithRejection(Json(body), _): WithRejection<Json<UpdateProfileRequest>, AppError>,
) -> AppResult<Json<UserResponse>> {
    let Identity::Local(user) = &session.identity else {
        return Err(AppError::Forbidden(
            "Directory profiles are managed by the directory".into(),
        ));
    };
    let updated = state
        .identities
        .update_profile(user.id, &body.into())
        .await?;
    Ok(Json(UserResponse {
        user: UserView::from(updated),
    }))
}

/// `POST /auth/logout`: destroy the session, if any, and clear the cookie.
pub async fn logout_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<LogoutResponse>)> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.destroy(cookie.value()).await?;
        info!("session logged out");
    }
    Ok((
        jar.add(clear_session_cookie(state.config.secure_cookies)),
        Json(LogoutResponse { success: true }),
    ))
}
