//! Identity provider plug-ins

pub mod clerk;
pub mod r#trait;

pub use clerk::{ClerkProvider, ClerkUser};
pub use r#trait::IdentityProvider;
