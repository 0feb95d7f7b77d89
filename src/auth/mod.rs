//! Authentication
//!
//! ```text
//! auth/
//! ├── types.rs          request / response bodies
//! ├── service.rs        AuthService facade
//! ├── webhook.rs        identity webhook verification
//! ├── core/             token and password services
//! └── providers/        identity provider plug-ins (Clerk)
//! ```

pub mod core;
pub mod providers;
pub mod service;
pub mod types;
pub mod webhook;

pub use providers::{ClerkProvider, IdentityProvider};
pub use service::AuthService;
pub use types::{AuthResponse, LoginRequest, RegisterRequest};
pub use webhook::{IdentityEvent, WebhookVerifier};
