use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use marg_shared::pii::Masked;

/// Booking attempt status in the lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptStatus {
    Initiated,
    SeatHeld,
    Paid,
    Issued,
    Released,
}

/// One passenger's checkout in flight: the seat is held, payment is not yet
/// confirmed. Scratch state owned by the BookingService; only a paid attempt
/// becomes a persisted Booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingAttempt {
    pub id: Uuid,
    pub route_id: Uuid,
    pub travel_date: NaiveDate,
    pub seat_number: u16,
    pub passenger_name: String,
    pub passenger_contact: Masked<String>,
    pub price: i64,
    pub status: AttemptStatus,
    pub hold_expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl BookingAttempt {
    pub fn hold_lapsed(&self, now: DateTime<Utc>) -> bool {
        self.status == AttemptStatus::SeatHeld && self.hold_expires_at <= now
    }
}
