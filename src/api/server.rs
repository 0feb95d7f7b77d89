use axum::error_handling::HandleErrorLayer;
use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post, put};
use axum::{middleware, Json, Router};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::{limit::ConcurrencyLimitLayer, timeout::TimeoutLayer, BoxError, ServiceBuilder};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::api::handlers::{self, auth, bookings, hotels, payments, reviews, users, webhooks};
use crate::api::middleware::rate_limit;
use crate::api::server_config::*;
use crate::api::state::AppState;
use crate::core::AppError;

pub struct ApiServer {
    state: Arc<AppState>,
}

impl ApiServer {
    pub fn new(state: AppState) -> Self {
        Self { state: Arc::new(state) }
    }

    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    pub fn create_router(&self) -> Router {
        let state = self.state();

        let api = Router::new()
            .route("/", get(handlers::api_index))
            .nest("/auth", auth_routes())
            .nest("/hotels", hotel_routes())
            .nest("/bookings", booking_routes())
            .nest("/users", user_routes())
            .nest("/payments", payment_routes())
            .nest("/reviews", review_routes())
            .route("/webhooks/clerk", post(webhooks::clerk_webhook))
            .layer(middleware::from_fn_with_state(state.clone(), rate_limit));

        Router::new()
            .route("/health", get(handlers::health_check))
            .nest("/api", api)
            .fallback(handlers::not_found)
            .with_state(state.clone())
            .layer(
                ServiceBuilder::new()
                    // timeout and overload errors become HTTP responses
                    .layer(HandleErrorLayer::new(handle_layer_error))
                    .layer(ConcurrencyLimitLayer::new(MAX_CONCURRENCY))
                    .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
                    .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
                    .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
                    .layer(TraceLayer::new_for_http()),
            )
            .layer(cors_layer(&state.config.server.frontend_url))
    }

    pub async fn start(self) -> Result<(), anyhow::Error> {
        let app = self.create_router();
        let server = &self.state.config.server;
        let addr = format!("{}:{}", server.host, server.port);

        if let Some(limiter) = self.state.rate_limiter.clone() {
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(RATE_LIMIT_CLEANUP_INTERVAL);
                loop {
                    ticker.tick().await;
                    limiter.cleanup();
                }
            });
        }

        let listener = TcpListener::bind(&addr).await?;
        info!(environment = %server.environment, "SmartLodge API listening on {}", addr);
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        info!("server stopped");
        Ok(())
    }
}

fn auth_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/refresh-token", post(auth::refresh_token))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password))
        .route("/verify-email/:token", get(auth::verify_email))
        .route("/resend-verification", post(auth::resend_verification))
        .route("/clerk-webhook", post(webhooks::clerk_webhook))
        .route("/profile", get(auth::profile).put(auth::update_profile))
        .route("/change-password", post(auth::change_password))
        .route("/logout", post(auth::logout))
        .route("/account", axum::routing::delete(auth::delete_account))
        .route("/users", get(auth::list_users))
}

fn hotel_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(hotels::list).post(hotels::create))
        .route("/search", get(hotels::search))
        .route("/featured", get(hotels::featured))
        .route("/location/:city", get(hotels::by_city))
        .route("/location/:city/:country", get(hotels::by_city_and_country))
        .route(
            "/:id",
            get(hotels::get).put(hotels::update).delete(hotels::delete),
        )
        .route("/:id/amenities", get(hotels::amenities))
        .route(
            "/:id/room-types",
            get(hotels::room_types).post(hotels::add_room_type),
        )
        .route(
            "/:id/room-types/:room_type_id",
            put(hotels::update_room_type).delete(hotels::delete_room_type),
        )
        .route("/:id/reviews", get(hotels::reviews))
        .route("/:id/check-availability", post(hotels::check_availability))
        .route("/:id/images", post(hotels::add_images))
        .route("/:id/status", patch(hotels::update_status))
        .route("/:id/availability", put(hotels::update_availability))
}

fn booking_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(bookings::list_all).post(bookings::create))
        .route("/my-bookings", get(bookings::my_bookings))
        .route("/reports/generate", get(bookings::report))
        .route("/stats", get(bookings::stats))
        .route("/hotel/:hotel_id", get(bookings::hotel_bookings))
        .route("/hotel/:hotel_id/date/:date", get(bookings::hotel_bookings_on_date))
        .route("/:id", get(bookings::get).put(bookings::update))
        .route("/:id/cancel", post(bookings::cancel))
        .route("/:id/special-requests", post(bookings::add_special_request))
        .route(
            "/:id/special-requests/:request_id",
            put(bookings::update_special_request),
        )
        .route("/:id/confirm", post(bookings::confirm))
        .route("/:id/checkin", post(bookings::check_in))
        .route("/:id/checkout", post(bookings::check_out))
        .route("/:id/communication", post(bookings::add_communication))
}

fn user_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(users::list))
        .route(
            "/profile",
            get(users::profile).put(users::update_profile).delete(users::delete_account),
        )
        .route("/bookings", get(users::bookings))
        .route("/stats", get(users::stats))
        .route("/preferences", put(users::update_preferences))
        .route("/search", get(users::search))
        .route("/:id", get(users::get))
        .route("/:id/status", put(users::set_status))
        .route("/:id/loyalty-points", post(users::add_loyalty_points))
}

fn payment_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(payments::list_all))
        .route("/stripe/webhook", post(payments::stripe_webhook))
        .route("/create-intent", post(payments::create_intent))
        .route("/confirm", post(payments::confirm))
        .route("/history", get(payments::history))
        .route("/stats/overview", get(payments::stats))
        .route("/:id", get(payments::details))
        .route("/:id/refund", post(payments::refund))
        .route("/:id/refunds", get(payments::refunds))
        .route("/:id/admin-refund", post(payments::admin_refund))
}

fn review_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(reviews::create))
        .route("/hotel/:hotel_id", get(reviews::hotel_reviews))
        .route("/hotel/:hotel_id/stats", get(reviews::hotel_stats))
        .route("/my-reviews", get(reviews::my_reviews))
        .route("/eligible-bookings", get(reviews::eligible_bookings))
        .route("/:review_id", put(reviews::update).delete(reviews::delete))
        .route("/:review_id/helpful", post(reviews::mark_helpful))
        .route("/:review_id/status", patch(reviews::moderate))
}

async fn handle_layer_error(err: BoxError) -> Response {
    if err.is::<tower::timeout::error::Elapsed>() {
        (
            StatusCode::REQUEST_TIMEOUT,
            Json(json!({
                "success": false,
                "message": "Request timed out",
                "type": "ServerError",
            })),
        )
            .into_response()
    } else {
        AppError::Unavailable("Service overloaded, please retry".to_string()).into_response()
    }
}

/// CORS for the configured frontend origin(s), comma separated.
fn cors_layer(frontend_url: &str) -> CorsLayer {
    let origins: Vec<HeaderValue> = frontend_url
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
        .max_age(CORS_MAX_AGE)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for ctrl-c: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!("failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received, draining connections");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cors_layer_accepts_origin_list() {
        // invalid entries are skipped rather than panicking
        let _ = cors_layer("http://localhost:3000, https://app.example.com,\u{7f}bad");
    }
}
