use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

use marg_shared::models::Booking;

static TICKET_SEQ: AtomicU64 = AtomicU64::new(0);

/// Short externally-issued ticket code: "TKT" plus eight digits. Derived
/// from the clock like the counter-printed codes it replaces, with a
/// process-local sequence so two codes minted in the same millisecond
/// still differ.
pub fn next_ticket_code() -> String {
    let seq = TICKET_SEQ.fetch_add(1, Ordering::Relaxed);
    let stamp = Utc::now().timestamp_millis() as u64;
    format!("TKT{:08}", stamp.wrapping_add(seq) % 100_000_000)
}

/// Render the passenger-facing plain-text ticket. Pure formatting; consumes
/// a finalized booking record and nothing else.
pub fn render_ticket(booking: &Booking) -> String {
    format!(
        "\
═══════════════════════════════════════
         BUS TICKET
═══════════════════════════════════════

Ticket ID: {ticket_code}
Passenger: {name}
Contact: {contact}

Route: {origin} → {destination}
Journey Date: {date}
Seat Number: #{seat}

Price: ₹{price}
Payment: {method}
Status: {status}

═══════════════════════════════════════
    Thank you for choosing our service!
═══════════════════════════════════════
",
        ticket_code = booking.ticket_code,
        name = booking.passenger_name,
        contact = booking.passenger_contact.0,
        origin = booking.origin,
        destination = booking.destination,
        date = booking.travel_date,
        seat = booking.seat_number,
        price = booking.price,
        method = booking.payment_method.as_str().to_uppercase(),
        status = booking.payment_status.as_str(),
    )
}
