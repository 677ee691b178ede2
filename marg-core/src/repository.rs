use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::BoxedError;
use marg_shared::models::{Booking, Route};

/// Repository trait for route catalog access
#[async_trait]
pub trait RouteRepository: Send + Sync {
    async fn create(&self, route: &Route) -> Result<(), BoxedError>;

    async fn get(&self, id: Uuid) -> Result<Option<Route>, BoxedError>;

    async fn list(&self) -> Result<Vec<Route>, BoxedError>;

    /// Returns false when no route with this id exists.
    async fn update_price(&self, id: Uuid, price: i64) -> Result<bool, BoxedError>;

    /// Returns false when no route with this id exists.
    async fn delete(&self, id: Uuid) -> Result<bool, BoxedError>;

    async fn find_by_endpoints(
        &self,
        origin: &str,
        destination: &str,
    ) -> Result<Option<Route>, BoxedError>;
}

/// Repository trait for persisted booking records
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn create(&self, booking: &Booking) -> Result<(), BoxedError>;

    async fn get(&self, id: Uuid) -> Result<Option<Booking>, BoxedError>;

    /// Marks the booking validated only if it is not already; the check and
    /// the write are one atomic step in the backing store. Returns false
    /// when the booking is absent or already validated.
    async fn mark_validated(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, BoxedError>;

    /// Marks the physical ticket as handed out only if it is not already;
    /// same atomicity contract as `mark_validated`.
    async fn mark_issued(&self, id: Uuid) -> Result<bool, BoxedError>;

    async fn list(&self) -> Result<Vec<Booking>, BoxedError>;

    async fn find_by_ticket_code(&self, code: &str) -> Result<Option<Booking>, BoxedError>;

    /// All bookings whose id (hyphenated lowercase form) starts with `prefix`.
    async fn find_by_id_prefix(&self, prefix: &str) -> Result<Vec<Booking>, BoxedError>;
}
