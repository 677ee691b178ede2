use std::sync::Arc;

use marg_booking::BookingService;
use marg_core::repository::RouteRepository;
use marg_ledger::SeatLedger;
use marg_store::app_config::BusinessRules;
use marg_store::EventBus;

#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<dyn RouteRepository>,
    pub booking: Arc<BookingService>,
    pub ledger: Arc<dyn SeatLedger>,
    pub events: EventBus,
    pub business_rules: BusinessRules,
}
