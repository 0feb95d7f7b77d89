pub mod auth;
pub mod bookings;
pub mod health;
pub mod hotels;
pub mod payments;
pub mod reviews;
pub mod users;
pub mod webhooks;

pub use health::{api_index, health_check, not_found};
