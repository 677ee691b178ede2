use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use marg_core::payment::PaymentAdapter;
use marg_core::repository::{BookingRepository, RouteRepository};
use marg_core::BoxedError;
use marg_ledger::{Denial, LedgerError, LedgerKey, Reservation, SeatLedger};
use marg_shared::models::{Booking, PaymentMethod, PaymentStatus, ValidationStatus};
use marg_shared::pii::Masked;

use crate::models::{AttemptStatus, BookingAttempt};
use crate::ticket::next_ticket_code;

/// Minimum token length for booking-id prefix lookup, so a one-character
/// token cannot sweep the whole store.
const MIN_PREFIX_LEN: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Seat unavailable: {0}")]
    SeatUnavailable(String),

    #[error("Hold expired for attempt {0}")]
    HoldExpired(Uuid),

    #[error("Ticket already validated: {0}")]
    AlreadyValidated(Uuid),

    #[error("Ticket already issued: {0}")]
    AlreadyIssued(Uuid),

    #[error("Payment not completed for booking {0}")]
    PaymentRequired(Uuid),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Payment failed: {0}")]
    Payment(String),

    #[error("Storage error: {0}")]
    Store(String),
}

fn store_err(e: BoxedError) -> BookingError {
    BookingError::Store(e.to_string())
}

fn ledger_err(e: LedgerError) -> BookingError {
    match e {
        LedgerError::HoldExpired => BookingError::Store("unexpected ledger state".into()),
        LedgerError::Backend(msg) => BookingError::Store(msg),
    }
}

/// Orchestrates one passenger request into an atomic seat reservation plus
/// payment record. State machine per attempt:
/// Initiated -> SeatHeld -> Paid -> Issued, with SeatHeld -> Released on
/// cancel or hold expiry. All seat mutations go through the SeatLedger.
pub struct BookingService {
    routes: Arc<dyn RouteRepository>,
    ledger: Arc<dyn SeatLedger>,
    bookings: Arc<dyn BookingRepository>,
    payments: Arc<dyn PaymentAdapter>,
    attempts: Mutex<HashMap<Uuid, BookingAttempt>>,
    hold_seconds: u64,
}

impl BookingService {
    pub fn new(
        routes: Arc<dyn RouteRepository>,
        ledger: Arc<dyn SeatLedger>,
        bookings: Arc<dyn BookingRepository>,
        payments: Arc<dyn PaymentAdapter>,
        hold_seconds: u64,
    ) -> Self {
        Self {
            routes,
            ledger,
            bookings,
            payments,
            attempts: Mutex::new(HashMap::new()),
            hold_seconds,
        }
    }

    /// Validate the request against the catalog, then claim the seat with a
    /// time-bounded hold. The booking record itself is not created here.
    pub async fn initiate(
        &self,
        route_id: Uuid,
        travel_date: NaiveDate,
        seat_number: u16,
        passenger_name: &str,
        passenger_contact: &str,
    ) -> Result<BookingAttempt, BookingError> {
        let passenger_name = passenger_name.trim();
        let passenger_contact = passenger_contact.trim();
        if passenger_name.is_empty() {
            return Err(BookingError::Validation("passenger name is required".into()));
        }
        if passenger_contact.is_empty() {
            return Err(BookingError::Validation(
                "passenger contact is required".into(),
            ));
        }

        let route = self
            .routes
            .get(route_id)
            .await
            .map_err(store_err)?
            .ok_or_else(|| BookingError::NotFound(format!("route {}", route_id)))?;

        if !route.seat_in_range(seat_number) {
            return Err(BookingError::Validation(format!(
                "seat {} is outside 1..={}",
                seat_number, route.total_seats
            )));
        }

        let attempt_id = Uuid::new_v4();
        let key = LedgerKey::new(route_id, travel_date, seat_number);
        let reservation = self
            .ledger
            .try_reserve(&key, attempt_id, route.total_seats, self.hold_seconds)
            .await
            .map_err(ledger_err)?;

        match reservation {
            Reservation::Granted => {}
            Reservation::Denied(Denial::AlreadyTaken) => {
                return Err(BookingError::SeatUnavailable(format!(
                    "seat {} on {} is already taken",
                    seat_number, travel_date
                )));
            }
            Reservation::Denied(Denial::OutOfRange) => {
                return Err(BookingError::Validation(format!(
                    "seat {} is outside 1..={}",
                    seat_number, route.total_seats
                )));
            }
        }

        let now = Utc::now();
        let attempt = BookingAttempt {
            id: attempt_id,
            route_id,
            travel_date,
            seat_number,
            passenger_name: passenger_name.to_string(),
            passenger_contact: Masked(passenger_contact.to_string()),
            price: route.price,
            status: AttemptStatus::SeatHeld,
            hold_expires_at: now + Duration::seconds(self.hold_seconds as i64),
            created_at: now,
        };
        self.attempts.lock().await.insert(attempt_id, attempt.clone());

        info!(
            attempt_id = %attempt_id,
            route_id = %route_id,
            seat = seat_number,
            "seat held"
        );
        Ok(attempt)
    }

    /// Promote a held attempt to a paid booking. The ledger commit re-locks
    /// a lapsed hold when the seat is still free; only a seat claimed by a
    /// newer attempt fails the confirmation.
    pub async fn confirm_payment(
        &self,
        attempt_id: Uuid,
        method: PaymentMethod,
    ) -> Result<Booking, BookingError> {
        // The attempts table stays locked for the whole confirmation so two
        // racing confirms of the same attempt cannot both reach the charge.
        let mut attempts = self.attempts.lock().await;
        let attempt = attempts
            .get(&attempt_id)
            .cloned()
            .ok_or_else(|| BookingError::NotFound(format!("attempt {}", attempt_id)))?;

        match attempt.status {
            AttemptStatus::SeatHeld => {}
            AttemptStatus::Released => return Err(BookingError::HoldExpired(attempt_id)),
            status => {
                return Err(BookingError::InvalidTransition {
                    from: format!("{:?}", status),
                    to: "PAID".to_string(),
                })
            }
        }

        let key = LedgerKey::new(attempt.route_id, attempt.travel_date, attempt.seat_number);
        match self.ledger.commit(&key, attempt_id).await {
            Ok(()) => {}
            Err(LedgerError::HoldExpired) => {
                if let Some(a) = attempts.get_mut(&attempt_id) {
                    a.status = AttemptStatus::Released;
                }
                warn!(attempt_id = %attempt_id, "hold expired before payment");
                return Err(BookingError::HoldExpired(attempt_id));
            }
            Err(LedgerError::Backend(msg)) => return Err(BookingError::Store(msg)),
        }

        let receipt = match self.payments.charge(attempt_id, attempt.price, method).await {
            Ok(receipt) => receipt,
            Err(e) => {
                // Roll the seat back so the failure is scoped to this attempt.
                self.ledger.release(&key, attempt_id).await.map_err(ledger_err)?;
                if let Some(a) = attempts.get_mut(&attempt_id) {
                    a.status = AttemptStatus::Released;
                }
                return Err(BookingError::Payment(e.to_string()));
            }
        };

        let route = self
            .routes
            .get(attempt.route_id)
            .await
            .map_err(store_err)?
            .ok_or_else(|| BookingError::NotFound(format!("route {}", attempt.route_id)))?;

        let booking = Booking {
            id: attempt_id,
            ticket_code: next_ticket_code(),
            route_id: attempt.route_id,
            origin: route.origin,
            destination: route.destination,
            travel_date: attempt.travel_date,
            seat_number: attempt.seat_number,
            passenger_name: attempt.passenger_name.clone(),
            passenger_contact: attempt.passenger_contact.clone(),
            price: attempt.price,
            payment_status: PaymentStatus::Paid,
            payment_method: method,
            validation_status: ValidationStatus::NotValidated,
            ticket_issued: false,
            created_at: Utc::now(),
            validated_at: None,
        };

        if let Err(e) = self.bookings.create(&booking).await {
            self.ledger.release(&key, attempt_id).await.map_err(ledger_err)?;
            if let Some(a) = attempts.get_mut(&attempt_id) {
                a.status = AttemptStatus::Released;
            }
            // The charge already went through; surface the receipt so the
            // money can be compensated until a refund adapter exists.
            warn!(
                reference = %receipt.reference,
                attempt_id = %attempt_id,
                "charge captured but booking not persisted; refund required"
            );
            return Err(store_err(e));
        }

        if let Some(a) = attempts.get_mut(&attempt_id) {
            a.status = AttemptStatus::Paid;
        }

        info!(
            booking_id = %booking.id,
            ticket_code = %booking.ticket_code,
            seat = booking.seat_number,
            "booking confirmed"
        );
        Ok(booking)
    }

    /// Conductor-desk flow: hold and confirm in one call, so counter sales
    /// pass the same ledger gate as online bookings.
    pub async fn counter_sale(
        &self,
        route_id: Uuid,
        travel_date: NaiveDate,
        seat_number: u16,
        passenger_name: &str,
        passenger_contact: &str,
        method: PaymentMethod,
    ) -> Result<Booking, BookingError> {
        let attempt = self
            .initiate(
                route_id,
                travel_date,
                seat_number,
                passenger_name,
                passenger_contact,
            )
            .await?;
        self.confirm_payment(attempt.id, method).await
    }

    /// Abandon an attempt before payment; the seat becomes reservable again.
    /// Returns the released attempt so callers can fan out the release.
    pub async fn cancel(&self, attempt_id: Uuid) -> Result<BookingAttempt, BookingError> {
        let mut attempts = self.attempts.lock().await;
        let mut attempt = attempts
            .get(&attempt_id)
            .cloned()
            .ok_or_else(|| BookingError::NotFound(format!("attempt {}", attempt_id)))?;

        match attempt.status {
            AttemptStatus::SeatHeld | AttemptStatus::Initiated => {
                let key =
                    LedgerKey::new(attempt.route_id, attempt.travel_date, attempt.seat_number);
                self.ledger.release(&key, attempt_id).await.map_err(ledger_err)?;
                attempt.status = AttemptStatus::Released;
                attempts.insert(attempt_id, attempt.clone());
                debug!(attempt_id = %attempt_id, "attempt cancelled");
                Ok(attempt)
            }
            AttemptStatus::Released => Ok(attempt),
            status => Err(BookingError::InvalidTransition {
                from: format!("{:?}", status),
                to: "RELEASED".to_string(),
            }),
        }
    }

    /// One-shot conductor validation; irreversible. The store performs the
    /// status flip as a guarded write, so of any number of racing validates
    /// exactly one succeeds.
    pub async fn validate(&self, booking_id: Uuid) -> Result<Booking, BookingError> {
        let mut booking = self
            .bookings
            .get(booking_id)
            .await
            .map_err(store_err)?
            .ok_or_else(|| BookingError::NotFound(format!("booking {}", booking_id)))?;

        let now = Utc::now();
        let flipped = self
            .bookings
            .mark_validated(booking_id, now)
            .await
            .map_err(store_err)?;
        if !flipped {
            return Err(BookingError::AlreadyValidated(booking_id));
        }

        booking.validation_status = ValidationStatus::Validated;
        booking.validated_at = Some(now);
        info!(booking_id = %booking_id, "ticket validated");
        Ok(booking)
    }

    /// Mark the physical ticket as handed out. Requires a paid booking; the
    /// issued flag flips through the same guarded-write contract as validate.
    pub async fn issue_ticket(&self, booking_id: Uuid) -> Result<Booking, BookingError> {
        let mut booking = self
            .bookings
            .get(booking_id)
            .await
            .map_err(store_err)?
            .ok_or_else(|| BookingError::NotFound(format!("booking {}", booking_id)))?;

        if !booking.is_paid() {
            return Err(BookingError::PaymentRequired(booking_id));
        }

        let flipped = self.bookings.mark_issued(booking_id).await.map_err(store_err)?;
        if !flipped {
            return Err(BookingError::AlreadyIssued(booking_id));
        }

        booking.ticket_issued = true;
        info!(booking_id = %booking_id, "ticket issued");
        Ok(booking)
    }

    /// Look a booking up by exact id, exact ticket code, or an unambiguous
    /// booking-id prefix. An ambiguous prefix is NotFound, never resolved by
    /// picking one of the matches.
    pub async fn find_by_token(&self, token: &str) -> Result<Booking, BookingError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(BookingError::Validation("ticket token is required".into()));
        }

        if let Ok(id) = Uuid::parse_str(token) {
            return self
                .bookings
                .get(id)
                .await
                .map_err(store_err)?
                .ok_or_else(|| BookingError::NotFound(format!("ticket {}", token)));
        }

        if let Some(booking) = self
            .bookings
            .find_by_ticket_code(token)
            .await
            .map_err(store_err)?
        {
            return Ok(booking);
        }

        if token.len() >= MIN_PREFIX_LEN {
            let mut matches = self
                .bookings
                .find_by_id_prefix(&token.to_ascii_lowercase())
                .await
                .map_err(store_err)?;
            if matches.len() == 1 {
                return Ok(matches.remove(0));
            }
        }

        Err(BookingError::NotFound(format!("ticket {}", token)))
    }

    pub async fn list_bookings(&self) -> Result<Vec<Booking>, BookingError> {
        self.bookings.list().await.map_err(store_err)
    }

    /// Release every lapsed hold; returns the attempts released this pass.
    /// Invoked periodically by the API worker. Correctness never depends on
    /// it: the ledger treats lapsed holds as vacant on its own.
    ///
    /// Finished attempts (Paid, or Released on an earlier pass) are evicted
    /// here so the scratch table stays bounded; just-released ones survive
    /// one more interval so a late confirm still gets HoldExpired rather
    /// than NotFound.
    pub async fn sweep_holds(&self) -> Result<Vec<BookingAttempt>, BookingError> {
        self.ledger.sweep_expired().await.map_err(ledger_err)?;

        let mut attempts = self.attempts.lock().await;
        let now = Utc::now();

        attempts.retain(|_, attempt| {
            !matches!(
                attempt.status,
                AttemptStatus::Released | AttemptStatus::Paid | AttemptStatus::Issued
            )
        });

        let mut released = Vec::new();
        for attempt in attempts.values_mut() {
            if attempt.hold_lapsed(now) {
                attempt.status = AttemptStatus::Released;
                released.push(attempt.clone());
            }
        }
        if !released.is_empty() {
            info!(count = released.len(), "lapsed holds released");
        }
        Ok(released)
    }

    /// Number of attempts currently tracked in the scratch table.
    pub async fn attempt_count(&self) -> usize {
        self.attempts.lock().await.len()
    }
}
