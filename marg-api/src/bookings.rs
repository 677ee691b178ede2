use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

use marg_shared::models::{Booking, BookingEvent, PaymentMethod};

use crate::error::AppError;
use crate::state::AppState;

// --- DTOs ---

#[derive(Debug, Deserialize)]
struct HoldSeatRequest {
    route_id: Uuid,
    travel_date: NaiveDate,
    seat_number: u16,
    passenger_name: String,
    passenger_contact: String,
}

#[derive(Debug, Serialize)]
struct HoldSeatResponse {
    attempt_id: Uuid,
    status: String,
    price: i64,
    hold_expires_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct ConfirmPaymentRequest {
    payment_method: String,
}

#[derive(Debug, Deserialize)]
struct CounterSaleRequest {
    route_id: Uuid,
    travel_date: NaiveDate,
    seat_number: u16,
    passenger_name: String,
    passenger_contact: String,
    payment_method: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings/hold", post(hold_seat))
        .route("/v1/bookings/{id}/confirm", post(confirm_payment))
        .route("/v1/bookings/{id}", delete(cancel_attempt))
        .route("/v1/bookings", get(list_bookings))
        .route("/v1/counter/bookings", post(counter_sale))
        .route("/v1/routes/{id}/stream", get(stream_route_events))
}

fn parse_method(raw: &str) -> Result<PaymentMethod, AppError> {
    PaymentMethod::parse(raw)
        .ok_or_else(|| AppError::ValidationError(format!("unknown payment method {}", raw)))
}

/// POST /v1/bookings/hold
async fn hold_seat(
    State(state): State<AppState>,
    Json(req): Json<HoldSeatRequest>,
) -> Result<Json<HoldSeatResponse>, AppError> {
    let attempt = state
        .booking
        .initiate(
            req.route_id,
            req.travel_date,
            req.seat_number,
            &req.passenger_name,
            &req.passenger_contact,
        )
        .await?;

    state.events.publish(BookingEvent::SeatHeld {
        route_id: attempt.route_id,
        travel_date: attempt.travel_date,
        seat_number: attempt.seat_number,
        attempt_id: attempt.id,
        held_at: Utc::now().timestamp(),
    });

    Ok(Json(HoldSeatResponse {
        attempt_id: attempt.id,
        status: "SEAT_HELD".to_string(),
        price: attempt.price,
        hold_expires_at: attempt.hold_expires_at,
    }))
}

/// POST /v1/bookings/{id}/confirm
async fn confirm_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ConfirmPaymentRequest>,
) -> Result<Json<Booking>, AppError> {
    let method = parse_method(&req.payment_method)?;
    let booking = state.booking.confirm_payment(id, method).await?;

    state.events.publish(BookingEvent::BookingPaid {
        route_id: booking.route_id,
        travel_date: booking.travel_date,
        seat_number: booking.seat_number,
        booking_id: booking.id,
        ticket_code: booking.ticket_code.clone(),
        paid_at: Utc::now().timestamp(),
    });

    Ok(Json(booking))
}

/// DELETE /v1/bookings/{id}
async fn cancel_attempt(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let attempt = state.booking.cancel(id).await?;

    state.events.publish(BookingEvent::HoldReleased {
        route_id: attempt.route_id,
        travel_date: attempt.travel_date,
        seat_number: attempt.seat_number,
        attempt_id: attempt.id,
        released_at: Utc::now().timestamp(),
    });

    Ok(Json(serde_json::json!({ "cancelled": id })))
}

/// GET /v1/bookings
async fn list_bookings(State(state): State<AppState>) -> Result<Json<Vec<Booking>>, AppError> {
    let bookings = state.booking.list_bookings().await?;
    Ok(Json(bookings))
}

/// POST /v1/counter/bookings
async fn counter_sale(
    State(state): State<AppState>,
    Json(req): Json<CounterSaleRequest>,
) -> Result<Json<Booking>, AppError> {
    let method = parse_method(&req.payment_method)?;
    let booking = state
        .booking
        .counter_sale(
            req.route_id,
            req.travel_date,
            req.seat_number,
            &req.passenger_name,
            &req.passenger_contact,
            method,
        )
        .await?;

    state.events.publish(BookingEvent::BookingPaid {
        route_id: booking.route_id,
        travel_date: booking.travel_date,
        seat_number: booking.seat_number,
        booking_id: booking.id,
        ticket_code: booking.ticket_code.clone(),
        paid_at: Utc::now().timestamp(),
    });

    Ok(Json(booking))
}

fn event_label(event: &BookingEvent) -> &'static str {
    match event {
        BookingEvent::SeatHeld { .. } => "seat_held",
        BookingEvent::HoldReleased { .. } => "hold_released",
        BookingEvent::BookingPaid { .. } => "booking_paid",
        BookingEvent::TicketValidated { .. } => "ticket_validated",
    }
}

/// GET /v1/routes/{id}/stream
///
/// Live booking events for one route, for seat maps that update without
/// polling. Slow consumers drop events rather than stall the bus.
async fn stream_route_events(
    State(state): State<AppState>,
    Path(route_id): Path<Uuid>,
) -> Sse<impl Stream<Item = Result<Event, std::convert::Infallible>>> {
    let rx = state.events.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(move |result| async move {
        match result {
            Ok(event) if event.route_id() == route_id => {
                let data = serde_json::to_string(&event).ok()?;
                Some(Ok(Event::default().event(event_label(&event)).data(data)))
            }
            _ => None,
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
