//! Per-client rate limiting for `/api` routes

use axum::extract::{Request, State};
use axum::http::{header, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

use crate::api::state::AppState;
use crate::core::AppError;
use crate::network::rate_limit::client_key;

pub async fn rate_limit(State(state): State<Arc<AppState>>, req: Request, next: Next) -> Response {
    let Some(limiter) = &state.rate_limiter else {
        return next.run(req).await;
    };

    let key = client_key(req.headers());
    match limiter.check(&key) {
        Ok(()) => next.run(req).await,
        Err(retry_after) => {
            tracing::warn!(client = %key, retry_after, "rate limit exceeded");
            let mut response = AppError::RateLimited { retry_after }.into_response();
            if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
            response
        }
    }
}
