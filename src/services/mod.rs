//! Domain services
//!
//! Each service owns a `Database` handle and enforces the access rules for
//! its resources; handlers stay thin.

pub mod access;
pub mod booking_service;
pub mod hotel_service;
pub mod review_service;
pub mod user_service;

pub use booking_service::BookingService;
pub use hotel_service::HotelService;
pub use review_service::ReviewService;
pub use user_service::UserService;
