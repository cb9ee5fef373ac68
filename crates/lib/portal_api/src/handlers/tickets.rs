//! Ticket request handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use axum_extra::extract::WithRejection;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{
    CreateTicketRequest, TicketResponse, TicketView, TicketsResponse, UpdateTicketRequest,
};

/// `GET /tickets`: the caller's helpdesk tickets.
pub async fn list_tickets_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(session)): Extension<AuthenticatedUser>,
) -> AppResult<Json<TicketsResponse>> {
    let tickets = state.tickets.tickets_for_identity(&session.identity).await?;
    Ok(Json(TicketsResponse {
        tickets: tickets.into_iter().map(TicketView::from).collect(),
    }))
}

/// `POST /tickets`: file a ticket in the helpdesk.
pub async fn create_ticket_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(session)): Extension<AuthenticatedUser>,
    WithRejection(Json(body), _): WithRejection<Json<CreateTicketRequest>, AppError>,
) -> AppResult<(StatusCode, Json<TicketResponse>)> {
    let ticket = state
        .tickets
        .create_ticket(&session.identity, body.into())
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(TicketResponse {
            ticket: ticket.into(),
        }),
    ))
}

/// `GET /tickets/{id}`: one ticket, refreshed from the helpdesk.
pub async fn get_ticket_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(session)): Extension<AuthenticatedUser>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
) -> AppResult<Json<TicketResponse>> {
    let ticket = state.tickets.get_ticket(&session.identity, id).await?;
    Ok(Json(TicketResponse {
        ticket: ticket.into(),
    }))
}

/// `PATCH /tickets/{id}`: update in the helpdesk, then locally.
pub async fn update_ticket_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(session)): Extension<AuthenticatedUser>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
    WithRejection(Json(body), _): WithRejection<Json<UpdateTicketRequest>, AppError>,
) -> AppResult<Json<TicketResponse>> {
    let ticket = state
        .tickets
        .update_ticket(&session.identity, id, body.into())
        .await?;
    Ok(Json(TicketResponse {
        ticket: ticket.into(),
    }))
}
