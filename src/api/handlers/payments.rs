//! `/api/payments` handlers

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::api::extract::{ApiJson, ApiPath, ApiQuery, OptionalJson};
use crate::api::middleware::{AdminUser, AuthUser};
use crate::api::state::AppState;
use crate::api::types::{keyed, paged, to_json, ApiResponse, PageQuery};
use crate::core::AppResult;
use crate::models::PaymentStatus;
use crate::payments::types::{ConfirmPaymentRequest, CreateIntentRequest, RefundRequest};

type Reply = AppResult<Json<ApiResponse>>;

pub const SIGNATURE_HEADER: &str = "stripe-signature";

#[derive(Debug, Default, Deserialize)]
pub struct PaymentListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub status: Option<PaymentStatus>,
}

pub async fn create_intent(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ApiJson(req): ApiJson<CreateIntentRequest>,
) -> Reply {
    let created = state.payments.create_intent(&user, req).await?;
    Ok(Json(ApiResponse::ok(to_json(&created)?)))
}

pub async fn confirm(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ApiJson(req): ApiJson<ConfirmPaymentRequest>,
) -> Reply {
    let booking = state.payments.confirm(&user, req).await?;
    Ok(Json(ApiResponse::with_message(
        "Payment confirmed successfully",
        keyed("booking", &booking)?,
    )))
}

pub async fn history(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Reply {
    let page = state
        .payments
        .history(&user, query.page(), query.limit(10))
        .await?;
    Ok(Json(ApiResponse::ok(paged("payments", page)?)))
}

pub async fn details(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<String>,
) -> Reply {
    let details = state.payments.details(&user, &id).await?;
    Ok(Json(ApiResponse::ok(keyed("payment", &details)?)))
}

pub async fn refund(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<String>,
    OptionalJson(req): OptionalJson<RefundRequest>,
) -> Reply {
    let outcome = state.payments.refund(&user, &id, req).await?;
    Ok(Json(ApiResponse::with_message(
        "Refund processed successfully",
        to_json(&outcome)?,
    )))
}

pub async fn refunds(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<String>,
) -> Reply {
    let refunds = state.payments.refunds(&user, &id).await?;
    Ok(Json(ApiResponse::ok(keyed("refunds", &refunds)?)))
}

pub async fn list_all(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    ApiQuery(query): ApiQuery<PaymentListQuery>,
) -> Reply {
    let paging = PageQuery { page: query.page, limit: query.limit };
    let page = state
        .payments
        .list_all(query.status, paging.page(), paging.limit(20))
        .await?;
    Ok(Json(ApiResponse::ok(paged("payments", page)?)))
}

pub async fn admin_refund(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<String>,
    OptionalJson(req): OptionalJson<RefundRequest>,
) -> Reply {
    let outcome = state.payments.admin_refund(&id, req, &admin).await?;
    Ok(Json(ApiResponse::with_message(
        "Refund processed successfully",
        to_json(&outcome)?,
    )))
}

pub async fn stats(State(state): State<Arc<AppState>>, AdminUser(_admin): AdminUser) -> Reply {
    let stats = state.payments.stats().await?;
    Ok(Json(ApiResponse::ok(keyed("stats", &stats)?)))
}

/// Processor webhook. The raw body is needed for the signature check.
pub async fn stripe_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<serde_json::Value>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    state
        .payments
        .handle_webhook(signature, &body, Utc::now().timestamp())
        .await?;
    Ok(Json(json!({ "received": true })))
}
