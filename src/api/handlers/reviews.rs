//! `/api/reviews` handlers

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::Value;
use std::sync::Arc;

use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::middleware::{AdminUser, AuthUser};
use crate::api::state::AppState;
use crate::api::types::{keyed, paged, to_json, ApiResponse, PageQuery};
use crate::core::AppResult;
use crate::services::review_service::{CreateReviewRequest, HotelReviewQuery, ModerationRequest};

type Reply = AppResult<Json<ApiResponse>>;

pub async fn hotel_reviews(
    State(state): State<Arc<AppState>>,
    ApiPath(hotel_id): ApiPath<String>,
    ApiQuery(query): ApiQuery<HotelReviewQuery>,
) -> Reply {
    let page = state.reviews.hotel_reviews(&hotel_id, query).await?;
    Ok(Json(ApiResponse::ok(paged("reviews", page)?)))
}

pub async fn hotel_stats(
    State(state): State<Arc<AppState>>,
    ApiPath(hotel_id): ApiPath<String>,
) -> Reply {
    let stats = state.reviews.hotel_stats(&hotel_id).await?;
    Ok(Json(ApiResponse::ok(keyed("stats", &stats)?)))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ApiJson(req): ApiJson<CreateReviewRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse>)> {
    let review = state.reviews.create(&user, req).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Review created successfully",
            keyed("review", &review)?,
        )),
    ))
}

pub async fn my_reviews(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Reply {
    let page = state
        .reviews
        .my_reviews(&user, query.page(), query.limit(10))
        .await?;
    Ok(Json(ApiResponse::ok(paged("reviews", page)?)))
}

pub async fn eligible_bookings(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Reply {
    let bookings = state.reviews.eligible_bookings(&user).await?;
    Ok(Json(ApiResponse::ok(keyed("bookings", &bookings)?)))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ApiPath(review_id): ApiPath<String>,
    ApiJson(changes): ApiJson<Value>,
) -> Reply {
    let review = state.reviews.update(&user, &review_id, changes).await?;
    Ok(Json(ApiResponse::with_message(
        "Review updated successfully",
        keyed("review", &review)?,
    )))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ApiPath(review_id): ApiPath<String>,
) -> Reply {
    state.reviews.delete(&user, &review_id).await?;
    Ok(Json(ApiResponse::message("Review deleted successfully")))
}

pub async fn mark_helpful(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ApiPath(review_id): ApiPath<String>,
) -> Reply {
    let count = state.reviews.mark_helpful(&user, &review_id).await?;
    Ok(Json(ApiResponse::with_message("Review marked as helpful", to_json(&count)?)))
}

pub async fn moderate(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    ApiPath(review_id): ApiPath<String>,
    ApiJson(req): ApiJson<ModerationRequest>,
) -> Reply {
    let review = state.reviews.moderate(&admin, &review_id, req).await?;
    Ok(Json(ApiResponse::with_message(
        "Review status updated successfully",
        keyed("review", &review)?,
    )))
}
