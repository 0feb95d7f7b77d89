//! Shared application state handed to every handler.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use tracing::{info, warn};

use crate::auth::{AuthService, ClerkProvider, IdentityProvider, WebhookVerifier};
use crate::core::{AppConfig, AppResult};
use crate::network::RateLimiter;
use crate::payments::{PaymentProvider, PaymentService, StripeProvider};
use crate::services::{BookingService, HotelService, ReviewService, UserService};
use crate::storage::Database;

pub struct AppState {
    pub config: AppConfig,
    pub db: Database,
    pub auth: AuthService,
    pub hotels: HotelService,
    pub bookings: BookingService,
    pub users: UserService,
    pub reviews: ReviewService,
    pub payments: PaymentService,
    /// `None` when no identity webhook secret is configured.
    pub identity_webhook: Option<WebhookVerifier>,
    pub rate_limiter: Option<RateLimiter>,
    pub started_at: Instant,
}

impl AppState {
    /// Open the database and build the external clients named in `config`.
    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let db = Database::open(&config.database.url, config.database.max_connections)
            .await
            .with_context(|| format!("failed to open database {}", config.database.url))?;
        info!(backend = ?db.backend(), "database opened");

        let identity: Option<Arc<dyn IdentityProvider>> = match &config.identity.clerk_secret_key {
            Some(key) if config.identity.is_enabled() => {
                Some(Arc::new(ClerkProvider::new(&config.identity.clerk_api_url, key)?))
            }
            _ => None,
        };
        let payments: Option<Arc<dyn PaymentProvider>> = match &config.payments.stripe_secret_key {
            Some(key) if config.payments.is_enabled() => Some(Arc::new(StripeProvider::new(
                &config.payments.stripe_api_url,
                key,
                config.payments.timeout_secs,
            )?)),
            _ => {
                warn!("STRIPE_SECRET_KEY not set, payment endpoints will answer 503");
                None
            }
        };

        Ok(Self::with_parts(config, db, identity, payments)?)
    }

    /// Assemble the state from already built parts.
    pub fn with_parts(
        config: AppConfig,
        db: Database,
        identity: Option<Arc<dyn IdentityProvider>>,
        payments: Option<Arc<dyn PaymentProvider>>,
    ) -> AppResult<Self> {
        let expose_tokens = !config.server.is_production();
        let auth = AuthService::new(db.clone(), &config.auth, identity, expose_tokens)?;
        let payment_service = PaymentService::new(
            db.clone(),
            payments,
            config.payments.stripe_webhook_secret.as_deref(),
        );
        let identity_webhook = config
            .identity
            .clerk_webhook_secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(WebhookVerifier::new)
            .transpose()?;
        let rate_limiter = config
            .rate_limit
            .enabled
            .then(|| RateLimiter::from_config(&config.rate_limit));

        Ok(Self {
            hotels: HotelService::new(db.clone()),
            bookings: BookingService::new(db.clone()),
            users: UserService::new(db.clone()),
            reviews: ReviewService::new(db.clone()),
            payments: payment_service,
            auth,
            identity_webhook,
            rate_limiter,
            started_at: Instant::now(),
            db,
            config,
        })
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
