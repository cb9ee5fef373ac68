//! Admin request handlers. Routed behind `require_admin`.

use axum::Json;
use axum::extract::{Path, State};
use axum_extra::extract::WithRejection;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{UserResponse, UserView, UsersResponse};

/// `GET /admin/pending-customers`
pub async fn pending_customers_handler(
    State(state): State<AppState>,
) -> AppResult<Json<UsersResponse>> {
    let users = state.identities.pending_customers().await?;
    Ok(Json(UsersResponse {
        users: users.into_iter().map(UserView::from).collect(),
    }))
}

/// `POST /admin/approve-customer/{id}`
pub async fn approve_customer_handler(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
) -> AppResult<Json<UserResponse>> {
    let user = state.identities.approve_customer(id).await?;
    Ok(Json(UserResponse { user: user.into() }))
}

/// `POST /admin/deactivate-customer/{id}`
pub async fn deactivate_customer_handler(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
) -> AppResult<Json<UserResponse>> {
    let user = state.identities.deactivate_customer(id).await?;
    Ok(Json(UserResponse { user: user.into() }))
}
