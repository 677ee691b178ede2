use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A bus route as sold to passengers. Mutated only by price updates;
/// deleted explicitly by an operator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub id: Uuid,
    pub name: String,
    pub origin: String,
    pub destination: String,
    pub total_seats: u16,
    pub price: i64,
    pub created_at: DateTime<Utc>,
}

impl Route {
    /// Whether a 1-based seat number falls inside this route's coach.
    pub fn seat_in_range(&self, seat_number: u16) -> bool {
        seat_number >= 1 && seat_number <= self.total_seats
    }
}
