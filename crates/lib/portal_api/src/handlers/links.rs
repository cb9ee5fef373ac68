//! Application link handlers.

use axum::Json;
use axum::extract::State;
use portal_core::store::LinkStore;

use crate::AppState;
use crate::error::AppResult;
use crate::models::LinksResponse;

/// `GET /links`: active links in display order.
pub async fn list_links_handler(State(state): State<AppState>) -> AppResult<Json<LinksResponse>> {
    let links = state.store.active_links().await?;
    Ok(Json(LinksResponse { links }))
}
