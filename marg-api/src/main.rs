use std::net::SocketAddr;
use std::sync::Arc;

use marg_api::{app, state::AppState, worker};
use marg_booking::{BookingService, MockPaymentAdapter};
use marg_core::payment::PaymentAdapter;
use marg_core::repository::{BookingRepository, RouteRepository};
use marg_ledger::SeatLedger;
use marg_store::{DbClient, EventBus, RedisSeatLedger, StoreBookingRepository, StoreRouteRepository};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "marg_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = marg_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Marg API on port {}", config.server.port);

    // Postgres Connection
    let db = DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    // Redis Connection
    let ledger: Arc<dyn SeatLedger> = Arc::new(
        RedisSeatLedger::new(&config.redis.url).expect("Failed to create Redis client"),
    );

    let routes: Arc<dyn RouteRepository> = Arc::new(StoreRouteRepository::new(db.pool.clone()));
    let bookings: Arc<dyn BookingRepository> =
        Arc::new(StoreBookingRepository::new(db.pool.clone()));
    // Simulated gateway; swap for a real adapter when one is integrated.
    let payments: Arc<dyn PaymentAdapter> = Arc::new(MockPaymentAdapter::new());

    let events = EventBus::default();
    let booking = Arc::new(BookingService::new(
        routes.clone(),
        ledger.clone(),
        bookings,
        payments,
        config.business_rules.seat_hold_seconds,
    ));

    tokio::spawn(worker::start_hold_sweeper(
        booking.clone(),
        events.clone(),
        config.business_rules.sweep_interval_seconds,
    ));

    let app_state = AppState {
        routes,
        booking,
        ledger,
        events,
        business_rules: config.business_rules.clone(),
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
