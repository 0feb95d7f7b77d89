use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Secret keys shipped in sample `.env` files. Treated as "not configured".
const PLACEHOLDER_CLERK_KEY: &str = "sk_test_your_clerk_secret_key";
const PLACEHOLDER_STRIPE_KEY: &str = "sk_test_your_stripe_secret_key";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "ServerConfig::default_host")]
    pub host: String,

    #[serde(default = "ServerConfig::default_port")]
    pub port: u16,

    /// `development`, `production` or `test`
    #[serde(default = "ServerConfig::default_environment")]
    pub environment: String,

    /// Origin allowed by CORS
    #[serde(default = "ServerConfig::default_frontend_url")]
    pub frontend_url: String,
}

impl ServerConfig {
    fn default_host() -> String { "0.0.0.0".to_string() }
    fn default_port() -> u16 { 5000 }
    fn default_environment() -> String { "development".to_string() }
    fn default_frontend_url() -> String { "http://localhost:3000".to_string() }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            environment: Self::default_environment(),
            frontend_url: Self::default_frontend_url(),
        }
    }
}

/// Document store location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `memory://` or `sqlite://path/to/file.db`
    #[serde(default = "DatabaseConfig::default_url")]
    pub url: String,

    #[serde(default = "DatabaseConfig::default_max_connections")]
    pub max_connections: u32,
}

impl DatabaseConfig {
    fn default_url() -> String { "sqlite://smartlodge.db".to_string() }
    fn default_max_connections() -> u32 { 10 }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: Self::default_url(),
            max_connections: Self::default_max_connections(),
        }
    }
}

/// Self-issued token and password settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "AuthConfig::default_jwt_secret")]
    pub jwt_secret: String,

    /// Access token lifetime (seconds)
    #[serde(default = "AuthConfig::default_token_expiry")]
    pub token_expiry: u64,

    /// Refresh token lifetime (seconds)
    #[serde(default = "AuthConfig::default_refresh_token_expiry")]
    pub refresh_token_expiry: u64,

    #[serde(default = "AuthConfig::default_bcrypt_cost")]
    pub bcrypt_cost: u32,

    #[serde(default = "AuthConfig::default_password_min_length")]
    pub password_min_length: usize,
}

impl AuthConfig {
    fn default_jwt_secret() -> String { "dev_secret_key_change_in_production".to_string() }
    fn default_token_expiry() -> u64 { 7 * 86_400 }
    fn default_refresh_token_expiry() -> u64 { 30 * 86_400 }
    fn default_bcrypt_cost() -> u32 { 12 }
    fn default_password_min_length() -> usize { 6 }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: Self::default_jwt_secret(),
            token_expiry: Self::default_token_expiry(),
            refresh_token_expiry: Self::default_refresh_token_expiry(),
            bcrypt_cost: Self::default_bcrypt_cost(),
            password_min_length: Self::default_password_min_length(),
        }
    }
}

/// Hosted identity provider (Clerk)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    #[serde(default)]
    pub clerk_secret_key: Option<String>,

    #[serde(default)]
    pub clerk_webhook_secret: Option<String>,

    #[serde(default = "IdentityConfig::default_api_url")]
    pub clerk_api_url: String,
}

impl IdentityConfig {
    fn default_api_url() -> String { "https://api.clerk.com".to_string() }

    /// Session verification goes through Clerk only with a real key.
    pub fn is_enabled(&self) -> bool {
        is_real_secret(self.clerk_secret_key.as_deref(), PLACEHOLDER_CLERK_KEY)
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            clerk_secret_key: None,
            clerk_webhook_secret: None,
            clerk_api_url: Self::default_api_url(),
        }
    }
}

/// Payment processor (Stripe)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentsConfig {
    #[serde(default)]
    pub stripe_secret_key: Option<String>,

    #[serde(default)]
    pub stripe_webhook_secret: Option<String>,

    #[serde(default = "PaymentsConfig::default_api_url")]
    pub stripe_api_url: String,

    /// Upstream request timeout (seconds)
    #[serde(default = "PaymentsConfig::default_timeout")]
    pub timeout_secs: u64,
}

impl PaymentsConfig {
    fn default_api_url() -> String { "https://api.stripe.com".to_string() }
    fn default_timeout() -> u64 { 20 }

    pub fn is_enabled(&self) -> bool {
        is_real_secret(self.stripe_secret_key.as_deref(), PLACEHOLDER_STRIPE_KEY)
    }
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            stripe_secret_key: None,
            stripe_webhook_secret: None,
            stripe_api_url: Self::default_api_url(),
            timeout_secs: Self::default_timeout(),
        }
    }
}

/// Per-client request budget
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "RateLimitConfig::default_window_ms")]
    pub window_ms: u64,

    #[serde(default = "RateLimitConfig::default_max_requests")]
    pub max_requests: u32,

    #[serde(default = "RateLimitConfig::default_enabled")]
    pub enabled: bool,
}

impl RateLimitConfig {
    fn default_window_ms() -> u64 { 15 * 60 * 1000 }
    fn default_max_requests() -> u32 { 100 }
    fn default_enabled() -> bool { true }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_ms: Self::default_window_ms(),
            max_requests: Self::default_max_requests(),
            enabled: Self::default_enabled(),
        }
    }
}

/// Top-level application configuration.
///
/// Resolution order: built-in defaults, then the TOML file, then
/// environment variables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub payments: PaymentsConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

impl AppConfig {
    /// Load defaults, the optional TOML file at `path`, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) if path.exists() => Self::from_file(path)?,
            _ => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Ok(toml::from_str(&raw)?)
    }

    /// Overlay values found through `lookup` (normally `std::env::var`).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("HOST") {
            self.server.host = v;
        }
        if let Some(v) = lookup("PORT") {
            self.server.port = parse_value("PORT", &v)?;
        }
        if let Some(v) = lookup("APP_ENV") {
            self.server.environment = v;
        }
        if let Some(v) = lookup("FRONTEND_URL") {
            self.server.frontend_url = v;
        }
        if let Some(v) = lookup("DATABASE_URL") {
            self.database.url = v;
        }
        if let Some(v) = lookup("JWT_SECRET") {
            self.auth.jwt_secret = v;
        }
        if let Some(v) = lookup("JWT_EXPIRES_IN") {
            self.auth.token_expiry = parse_duration_secs("JWT_EXPIRES_IN", &v)?;
        }
        if let Some(v) = lookup("JWT_REFRESH_EXPIRES_IN") {
            self.auth.refresh_token_expiry = parse_duration_secs("JWT_REFRESH_EXPIRES_IN", &v)?;
        }
        if let Some(v) = lookup("BCRYPT_COST") {
            self.auth.bcrypt_cost = parse_value("BCRYPT_COST", &v)?;
        }
        if let Some(v) = lookup("CLERK_SECRET_KEY") {
            self.identity.clerk_secret_key = non_empty(v);
        }
        if let Some(v) = lookup("CLERK_WEBHOOK_SECRET") {
            self.identity.clerk_webhook_secret = non_empty(v);
        }
        if let Some(v) = lookup("CLERK_API_URL") {
            self.identity.clerk_api_url = v;
        }
        if let Some(v) = lookup("STRIPE_SECRET_KEY") {
            self.payments.stripe_secret_key = non_empty(v);
        }
        if let Some(v) = lookup("STRIPE_WEBHOOK_SECRET") {
            self.payments.stripe_webhook_secret = non_empty(v);
        }
        if let Some(v) = lookup("STRIPE_API_URL") {
            self.payments.stripe_api_url = v;
        }
        if let Some(v) = lookup("RATE_LIMIT_WINDOW_MS") {
            self.rate_limit.window_ms = parse_value("RATE_LIMIT_WINDOW_MS", &v)?;
        }
        if let Some(v) = lookup("RATE_LIMIT_MAX_REQUESTS") {
            self.rate_limit.max_requests = parse_value("RATE_LIMIT_MAX_REQUESTS", &v)?;
        }
        Ok(())
    }

    /// Configuration for tests: memory store, fast hashing, no rate limit.
    pub fn for_test() -> Self {
        let mut config = Self::default();
        config.server.environment = "test".to_string();
        config.database.url = "memory://".to_string();
        config.auth.jwt_secret = "test_secret_key_for_unit_tests".to_string();
        config.auth.bcrypt_cost = 4;
        config.rate_limit.enabled = false;
        config
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn is_real_secret(value: Option<&str>, placeholder: &str) -> bool {
    matches!(value, Some(v) if !v.is_empty() && v != placeholder)
}

/// Parse `"7d"`, `"12h"`, `"30m"`, `"45s"` or a bare number of seconds.
pub fn parse_duration_secs(key: &str, value: &str) -> Result<u64, ConfigError> {
    let invalid = || ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    };
    let value = value.trim();
    let (digits, multiplier) = match value.chars().last() {
        Some('d') => (&value[..value.len() - 1], 86_400),
        Some('h') => (&value[..value.len() - 1], 3_600),
        Some('m') => (&value[..value.len() - 1], 60),
        Some('s') => (&value[..value.len() - 1], 1),
        Some(_) => (value, 1),
        None => return Err(invalid()),
    };
    let amount: u64 = digits.parse().map_err(|_| invalid())?;
    Ok(amount * multiplier)
}
