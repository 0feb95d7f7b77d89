//! Payments: processor client, webhook signatures and the booking payment flow.

pub mod providers;
pub mod service;
pub mod signature;
pub mod types;

pub use providers::{PaymentProvider, StripeProvider};
pub use service::PaymentService;
pub use signature::SignatureVerifier;
