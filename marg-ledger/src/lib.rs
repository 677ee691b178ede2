pub mod memory;

pub use memory::MemorySeatLedger;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The tuple identifying one bookable unit: a seat on a route on a travel day.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LedgerKey {
    pub route_id: Uuid,
    pub travel_date: NaiveDate,
    pub seat_number: u16,
}

impl LedgerKey {
    pub fn new(route_id: Uuid, travel_date: NaiveDate, seat_number: u16) -> Self {
        Self {
            route_id,
            travel_date,
            seat_number,
        }
    }
}

/// Outcome of a reservation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    Granted,
    Denied(Denial),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// The key is occupied by a different owner.
    AlreadyTaken,
    /// Seat number outside [1, total_seats].
    OutOfRange,
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Hold expired: seat was claimed by another booking")]
    HoldExpired,

    #[error("Ledger backend error: {0}")]
    Backend(String),
}

/// The single source of truth for seat occupancy. Every reservation attempt
/// in the system must pass through one of these operations; the occupancy
/// check and the write are a single atomic step on each key.
#[async_trait]
pub trait SeatLedger: Send + Sync {
    /// Attempt to claim a key with a time-bounded hold. Exactly one caller
    /// may observe Granted for a key while it is occupied; an expired hold
    /// counts as vacant. Re-reserving a key you already own refreshes the
    /// hold and is Granted.
    async fn try_reserve(
        &self,
        key: &LedgerKey,
        owner: Uuid,
        total_seats: u16,
        hold_seconds: u64,
    ) -> Result<Reservation, LedgerError>;

    /// Promote a hold to a permanent paid entry. A commit whose hold lapsed
    /// re-locks the key in the same atomic step when it is still free;
    /// fails with HoldExpired only when a different owner claimed it.
    async fn commit(&self, key: &LedgerKey, owner: Uuid) -> Result<(), LedgerError>;

    /// Remove the entry only if currently owned by `owner`; no-op otherwise.
    async fn release(&self, key: &LedgerKey, owner: Uuid) -> Result<(), LedgerError>;

    /// Seat numbers currently held or paid for a departure, for seat maps.
    async fn occupied(
        &self,
        route_id: Uuid,
        travel_date: NaiveDate,
    ) -> Result<Vec<u16>, LedgerError>;

    /// Drop lapsed holds; returns how many were removed. Correctness does
    /// not depend on this running: try_reserve treats lapsed holds as
    /// vacant on its own.
    async fn sweep_expired(&self) -> Result<usize, LedgerError>;
}
