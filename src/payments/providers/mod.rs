pub mod stripe;
pub mod r#trait;

pub use r#trait::PaymentProvider;
pub use stripe::StripeProvider;
