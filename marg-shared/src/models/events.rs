use chrono::NaiveDate;
use uuid::Uuid;

/// Events fanned out to seat-map and dashboard subscribers on every
/// ledger or booking change.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingEvent {
    SeatHeld {
        route_id: Uuid,
        travel_date: NaiveDate,
        seat_number: u16,
        attempt_id: Uuid,
        held_at: i64,
    },
    HoldReleased {
        route_id: Uuid,
        travel_date: NaiveDate,
        seat_number: u16,
        attempt_id: Uuid,
        released_at: i64,
    },
    BookingPaid {
        route_id: Uuid,
        travel_date: NaiveDate,
        seat_number: u16,
        booking_id: Uuid,
        ticket_code: String,
        paid_at: i64,
    },
    TicketValidated {
        route_id: Uuid,
        booking_id: Uuid,
        ticket_code: String,
        validated_at: i64,
    },
}

impl BookingEvent {
    /// Route the event concerns, used to filter per-route streams.
    pub fn route_id(&self) -> Uuid {
        match self {
            BookingEvent::SeatHeld { route_id, .. }
            | BookingEvent::HoldReleased { route_id, .. }
            | BookingEvent::BookingPaid { route_id, .. }
            | BookingEvent::TicketValidated { route_id, .. } => *route_id,
        }
    }
}
