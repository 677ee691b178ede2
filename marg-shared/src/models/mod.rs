pub mod booking;
pub mod events;
pub mod route;

pub use booking::{Booking, PaymentMethod, PaymentStatus, ValidationStatus};
pub use events::BookingEvent;
pub use route::Route;
