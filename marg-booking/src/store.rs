use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use marg_core::repository::BookingRepository;
use marg_core::BoxedError;
use marg_shared::models::{Booking, ValidationStatus};

/// In-memory booking store, used by tests and single-node deployments.
pub struct MemoryBookingStore {
    bookings: RwLock<HashMap<Uuid, Booking>>,
}

impl MemoryBookingStore {
    pub fn new() -> Self {
        Self {
            bookings: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryBookingStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BookingRepository for MemoryBookingStore {
    async fn create(&self, booking: &Booking) -> Result<(), BoxedError> {
        let mut bookings = self.bookings.write().await;
        // Same uniqueness the Postgres schema enforces on ticket_code.
        if bookings
            .values()
            .any(|b| b.ticket_code == booking.ticket_code)
        {
            return Err(format!("duplicate ticket code {}", booking.ticket_code).into());
        }
        bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Booking>, BoxedError> {
        Ok(self.bookings.read().await.get(&id).cloned())
    }

    async fn mark_validated(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, BoxedError> {
        let mut bookings = self.bookings.write().await;
        match bookings.get_mut(&id) {
            Some(b) if !b.is_validated() => {
                b.validation_status = ValidationStatus::Validated;
                b.validated_at = Some(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_issued(&self, id: Uuid) -> Result<bool, BoxedError> {
        let mut bookings = self.bookings.write().await;
        match bookings.get_mut(&id) {
            Some(b) if !b.ticket_issued => {
                b.ticket_issued = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list(&self) -> Result<Vec<Booking>, BoxedError> {
        let mut all: Vec<Booking> = self.bookings.read().await.values().cloned().collect();
        all.sort_by_key(|b| b.created_at);
        Ok(all)
    }

    async fn find_by_ticket_code(&self, code: &str) -> Result<Option<Booking>, BoxedError> {
        Ok(self
            .bookings
            .read()
            .await
            .values()
            .find(|b| b.ticket_code == code)
            .cloned())
    }

    async fn find_by_id_prefix(&self, prefix: &str) -> Result<Vec<Booking>, BoxedError> {
        let needle = prefix.to_ascii_lowercase();
        Ok(self
            .bookings
            .read()
            .await
            .values()
            .filter(|b| b.id.to_string().starts_with(&needle))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use marg_shared::models::{PaymentMethod, PaymentStatus};
    use marg_shared::pii::Masked;

    fn booking(ticket_code: &str) -> Booking {
        Booking {
            id: Uuid::new_v4(),
            ticket_code: ticket_code.to_string(),
            route_id: Uuid::new_v4(),
            origin: "Patna".to_string(),
            destination: "Motihari".to_string(),
            travel_date: NaiveDate::from_ymd_opt(2026, 9, 14).unwrap(),
            seat_number: 1,
            passenger_name: "Asha".to_string(),
            passenger_contact: Masked("asha@example.com".to_string()),
            price: 450,
            payment_status: PaymentStatus::Paid,
            payment_method: PaymentMethod::Upi,
            validation_status: ValidationStatus::NotValidated,
            ticket_issued: false,
            created_at: Utc::now(),
            validated_at: None,
        }
    }

    #[tokio::test]
    async fn test_mark_validated_flips_exactly_once() {
        let store = MemoryBookingStore::new();
        let b = booking("TKT00000001");
        store.create(&b).await.unwrap();

        assert!(store.mark_validated(b.id, Utc::now()).await.unwrap());
        assert!(!store.mark_validated(b.id, Utc::now()).await.unwrap());
        assert!(!store.mark_validated(Uuid::new_v4(), Utc::now()).await.unwrap());

        let stored = store.get(b.id).await.unwrap().unwrap();
        assert!(stored.is_validated());
        assert!(stored.validated_at.is_some());
    }

    #[tokio::test]
    async fn test_mark_issued_flips_exactly_once() {
        let store = MemoryBookingStore::new();
        let b = booking("TKT00000002");
        store.create(&b).await.unwrap();

        assert!(store.mark_issued(b.id).await.unwrap());
        assert!(!store.mark_issued(b.id).await.unwrap());
        assert!(store.get(b.id).await.unwrap().unwrap().ticket_issued);
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_ticket_code() {
        let store = MemoryBookingStore::new();
        store.create(&booking("TKT00000003")).await.unwrap();

        let err = store.create(&booking("TKT00000003")).await.unwrap_err();
        assert!(err.to_string().contains("duplicate ticket code"));
        assert_eq!(store.list().await.unwrap().len(), 1);
    }
}
