use tokio::sync::broadcast;
use tracing::debug;

use marg_shared::models::BookingEvent;

/// Fan-out of booking events to live subscribers (seat maps, dashboards).
/// Listeners that fall behind simply lose old events; the full record set is
/// always recoverable from the repositories.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<BookingEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, event: BookingEvent) {
        debug!(?event, "publishing booking event");
        // Send only fails when there are no subscribers, which is fine.
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BookingEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();

        bus.publish(BookingEvent::SeatHeld {
            route_id: Uuid::new_v4(),
            travel_date: NaiveDate::from_ymd_opt(2026, 9, 14).unwrap(),
            seat_number: 1,
            attempt_id: Uuid::new_v4(),
            held_at: 0,
        });

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, BookingEvent::SeatHeld { seat_number: 1, .. }));
    }
}
