//! Identity provider webhook

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use std::sync::Arc;

use crate::api::state::AppState;
use crate::api::types::ApiResponse;
use crate::auth::IdentityEvent;
use crate::core::{AppError, AppResult};

fn header<'a>(headers: &'a HeaderMap, name: &str) -> AppResult<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing svix headers".to_string()))
}

pub async fn clerk_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<ApiResponse>> {
    let verifier = state.identity_webhook.as_ref().ok_or_else(|| {
        AppError::Unavailable("Identity webhooks are not configured".to_string())
    })?;

    let msg_id = header(&headers, "svix-id")?;
    let timestamp = header(&headers, "svix-timestamp")?;
    let signature = header(&headers, "svix-signature")?;
    if let Err(err) = verifier.verify(msg_id, timestamp, signature, &body, Utc::now().timestamp()) {
        tracing::warn!(msg_id, "identity webhook rejected: {}", err);
        return Err(err);
    }

    let event: IdentityEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid webhook payload: {e}")))?;
    state.auth.handle_identity_event(event).await?;
    Ok(Json(ApiResponse::message("Webhook processed successfully")))
}
