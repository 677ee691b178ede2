pub mod app_config;
pub mod booking_repo;
pub mod database;
pub mod events;
pub mod redis_ledger;
pub mod route_repo;

pub use booking_repo::StoreBookingRepository;
pub use database::DbClient;
pub use events::EventBus;
pub use redis_ledger::RedisSeatLedger;
pub use route_repo::StoreRouteRepository;
