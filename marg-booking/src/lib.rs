pub mod models;
pub mod payment;
pub mod service;
pub mod store;
pub mod ticket;

pub use models::{AttemptStatus, BookingAttempt};
pub use payment::MockPaymentAdapter;
pub use service::{BookingError, BookingService};
pub use store::MemoryBookingStore;
