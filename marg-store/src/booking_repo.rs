use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use marg_core::repository::BookingRepository;
use marg_core::{BoxedError, CoreError};
use marg_shared::models::{Booking, PaymentMethod, PaymentStatus, ValidationStatus};
use marg_shared::pii::Masked;

pub struct StoreBookingRepository {
    pool: PgPool,
}

impl StoreBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal struct for type-safe querying
#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    ticket_code: String,
    route_id: Uuid,
    origin: String,
    destination: String,
    travel_date: chrono::NaiveDate,
    seat_number: i32,
    passenger_name: String,
    passenger_contact: String,
    price: i64,
    payment_status: String,
    payment_method: String,
    validation_status: String,
    ticket_issued: bool,
    created_at: chrono::DateTime<chrono::Utc>,
    validated_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = BoxedError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let payment_status = PaymentStatus::parse(&row.payment_status).ok_or_else(|| {
            CoreError::InternalError(format!("unknown payment status {}", row.payment_status))
        })?;
        let payment_method = PaymentMethod::parse(&row.payment_method).ok_or_else(|| {
            CoreError::InternalError(format!("unknown payment method {}", row.payment_method))
        })?;
        let validation_status = ValidationStatus::parse(&row.validation_status).ok_or_else(|| {
            CoreError::InternalError(format!(
                "unknown validation status {}",
                row.validation_status
            ))
        })?;

        Ok(Booking {
            id: row.id,
            ticket_code: row.ticket_code,
            route_id: row.route_id,
            origin: row.origin,
            destination: row.destination,
            travel_date: row.travel_date,
            seat_number: row.seat_number as u16,
            passenger_name: row.passenger_name,
            passenger_contact: Masked(row.passenger_contact),
            price: row.price,
            payment_status,
            payment_method,
            validation_status,
            ticket_issued: row.ticket_issued,
            created_at: row.created_at,
            validated_at: row.validated_at,
        })
    }
}

const BOOKING_COLUMNS: &str = "id, ticket_code, route_id, origin, destination, travel_date, \
     seat_number, passenger_name, passenger_contact, price, payment_status, payment_method, \
     validation_status, ticket_issued, created_at, validated_at";

#[async_trait]
impl BookingRepository for StoreBookingRepository {
    async fn create(&self, booking: &Booking) -> Result<(), BoxedError> {
        sqlx::query(
            r#"
            INSERT INTO bookings (id, ticket_code, route_id, origin, destination, travel_date,
                seat_number, passenger_name, passenger_contact, price, payment_status,
                payment_method, validation_status, ticket_issued, created_at, validated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(booking.id)
        .bind(&booking.ticket_code)
        .bind(booking.route_id)
        .bind(&booking.origin)
        .bind(&booking.destination)
        .bind(booking.travel_date)
        .bind(booking.seat_number as i32)
        .bind(&booking.passenger_name)
        .bind(&booking.passenger_contact.0)
        .bind(booking.price)
        .bind(booking.payment_status.as_str())
        .bind(booking.payment_method.as_str())
        .bind(booking.validation_status.as_str())
        .bind(booking.ticket_issued)
        .bind(booking.created_at)
        .bind(booking.validated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Booking>, BoxedError> {
        let row: Option<BookingRow> = sqlx::query_as(&format!(
            "SELECT {} FROM bookings WHERE id = $1",
            BOOKING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Booking::try_from).transpose()
    }

    async fn mark_validated(
        &self,
        id: Uuid,
        at: chrono::DateTime<chrono::Utc>,
    ) -> Result<bool, BoxedError> {
        // The status guard rides in the WHERE clause so two racing calls
        // cannot both observe NOT_VALIDATED.
        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET validation_status = $1, validated_at = $2
            WHERE id = $3 AND validation_status = $4
            "#,
        )
        .bind(ValidationStatus::Validated.as_str())
        .bind(at)
        .bind(id)
        .bind(ValidationStatus::NotValidated.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_issued(&self, id: Uuid) -> Result<bool, BoxedError> {
        let result = sqlx::query(
            "UPDATE bookings SET ticket_issued = TRUE WHERE id = $1 AND NOT ticket_issued",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self) -> Result<Vec<Booking>, BoxedError> {
        let rows: Vec<BookingRow> = sqlx::query_as(&format!(
            "SELECT {} FROM bookings ORDER BY created_at",
            BOOKING_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Booking::try_from).collect()
    }

    async fn find_by_ticket_code(&self, code: &str) -> Result<Option<Booking>, BoxedError> {
        let row: Option<BookingRow> = sqlx::query_as(&format!(
            "SELECT {} FROM bookings WHERE ticket_code = $1",
            BOOKING_COLUMNS
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Booking::try_from).transpose()
    }

    async fn find_by_id_prefix(&self, prefix: &str) -> Result<Vec<Booking>, BoxedError> {
        // Uuid columns compare textually through their canonical form.
        let rows: Vec<BookingRow> = sqlx::query_as(&format!(
            "SELECT {} FROM bookings WHERE id::text LIKE $1",
            BOOKING_COLUMNS
        ))
        .bind(id_prefix_pattern(prefix))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Booking::try_from).collect()
    }
}

/// LIKE pattern matching ids that literally start with `prefix`. LIKE
/// metacharacters are escaped, otherwise a token like "deadbee_" would match
/// ids it is not a prefix of.
fn id_prefix_pattern(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.to_ascii_lowercase().chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
