use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;

use marg_booking::ticket::render_ticket;
use marg_shared::models::{Booking, BookingEvent};

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/tickets/{token}", get(lookup_ticket))
        .route("/v1/tickets/{token}/validate", post(validate_ticket))
        .route("/v1/tickets/{token}/issue", post(issue_ticket))
        .route("/v1/tickets/{token}/export", get(export_ticket))
}

/// GET /v1/tickets/{token}
///
/// The token is a booking id, a TKT code, or an id prefix of at least four
/// characters that matches exactly one booking.
async fn lookup_ticket(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<Booking>, AppError> {
    let booking = state.booking.find_by_token(&token).await?;
    Ok(Json(booking))
}

/// POST /v1/tickets/{token}/validate
async fn validate_ticket(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<Booking>, AppError> {
    let booking = state.booking.find_by_token(&token).await?;
    let validated = state.booking.validate(booking.id).await?;

    state.events.publish(BookingEvent::TicketValidated {
        route_id: validated.route_id,
        booking_id: validated.id,
        ticket_code: validated.ticket_code.clone(),
        validated_at: Utc::now().timestamp(),
    });

    Ok(Json(validated))
}

/// POST /v1/tickets/{token}/issue
async fn issue_ticket(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<Booking>, AppError> {
    let booking = state.booking.find_by_token(&token).await?;
    let issued = state.booking.issue_ticket(booking.id).await?;
    Ok(Json(issued))
}

/// GET /v1/tickets/{token}/export
async fn export_ticket(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let booking = state.booking.find_by_token(&token).await?;
    let body = render_ticket(&booking);
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    ))
}
