//! Health, index and fallback handlers

use axum::extract::{OriginalUri, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api::state::AppState;

/// Liveness plus database status.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    let database = state.db.status().await;
    Json(json!({
        "status": "OK",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime": state.uptime_secs(),
        "database": database,
        "environment": state.config.server.environment,
    }))
}

pub async fn api_index() -> Json<Value> {
    Json(json!({
        "message": "Welcome to SmartLodge API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "auth": "/api/auth",
            "hotels": "/api/hotels",
            "bookings": "/api/bookings",
            "users": "/api/users",
            "payments": "/api/payments",
            "reviews": "/api/reviews",
        }
    }))
}

pub async fn not_found(method: Method, OriginalUri(uri): OriginalUri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "message": format!("Route {} {} not found", method, uri),
            "type": "NotFoundError",
            "availableRoutes": {
                "auth": "/api/auth",
                "hotels": "/api/hotels",
                "bookings": "/api/bookings",
                "users": "/api/users",
                "payments": "/api/payments",
                "reviews": "/api/reviews",
                "health": "/health",
                "documentation": "/api",
            }
        })),
    )
}
