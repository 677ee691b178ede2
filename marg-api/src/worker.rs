use std::sync::Arc;

use chrono::Utc;
use tokio::time::{sleep, Duration};
use tracing::{error, info};

use marg_booking::BookingService;
use marg_shared::models::BookingEvent;
use marg_store::EventBus;

/// Periodically releases lapsed holds and fans the releases out to seat-map
/// subscribers. The ledger already treats lapsed holds as vacant, so this
/// only keeps the live views and attempt records tidy.
pub async fn start_hold_sweeper(
    service: Arc<BookingService>,
    events: EventBus,
    interval_seconds: u64,
) {
    info!(interval_seconds, "hold sweeper started");

    loop {
        sleep(Duration::from_secs(interval_seconds)).await;

        match service.sweep_holds().await {
            Ok(released) => {
                for attempt in released {
                    events.publish(BookingEvent::HoldReleased {
                        route_id: attempt.route_id,
                        travel_date: attempt.travel_date,
                        seat_number: attempt.seat_number,
                        attempt_id: attempt.id,
                        released_at: Utc::now().timestamp(),
                    });
                }
            }
            Err(e) => error!("hold sweep failed: {}", e),
        }
    }
}
