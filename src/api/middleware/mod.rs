pub mod auth;
pub mod rate_limit;

pub use auth::{bearer_token, AdminUser, AuthUser, MaybeAuthUser};
pub use rate_limit::rate_limit;
