//! `/api/users` handlers

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;

use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::middleware::{AdminUser, AuthUser};
use crate::api::state::AppState;
use crate::api::types::{keyed, paged, to_json, ApiResponse, PageQuery};
use crate::core::AppResult;
use crate::services::booking_service::BookingListQuery;
use crate::services::user_service::{LoyaltyGrant, StatusUpdate, UserListQuery, UserSearchQuery};

type Reply = AppResult<Json<ApiResponse>>;

pub async fn profile(State(state): State<Arc<AppState>>, AuthUser(user): AuthUser) -> Reply {
    let user = state.users.profile(&user).await?;
    Ok(Json(ApiResponse::ok(keyed("user", &user)?)))
}

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ApiJson(changes): ApiJson<Value>,
) -> Reply {
    let user = state.users.update_profile(&user, changes).await?;
    Ok(Json(ApiResponse::with_message("Profile updated successfully", keyed("user", &user)?)))
}

pub async fn delete_account(State(state): State<Arc<AppState>>, AuthUser(user): AuthUser) -> Reply {
    state.users.delete_account(&user).await?;
    Ok(Json(ApiResponse::message("Account deactivated successfully")))
}

pub async fn bookings(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ApiQuery(query): ApiQuery<BookingListQuery>,
) -> Reply {
    let paging = PageQuery { page: query.page, limit: query.limit };
    let page = state
        .users
        .bookings(&user, query.status, paging.page(), paging.limit(10))
        .await?;
    Ok(Json(ApiResponse::ok(paged("bookings", page)?)))
}

pub async fn stats(State(state): State<Arc<AppState>>, AuthUser(user): AuthUser) -> Reply {
    let stats = state.users.stats(&user, Utc::now()).await?;
    Ok(Json(ApiResponse::ok(keyed("stats", &stats)?)))
}

pub async fn update_preferences(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ApiJson(changes): ApiJson<Value>,
) -> Reply {
    let preferences = state.users.update_preferences(&user, changes).await?;
    Ok(Json(ApiResponse::with_message(
        "Preferences updated successfully",
        keyed("preferences", &preferences)?,
    )))
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    ApiQuery(query): ApiQuery<UserListQuery>,
) -> Reply {
    let page = state.users.list(query).await?;
    Ok(Json(ApiResponse::ok(paged("users", page)?)))
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    ApiQuery(query): ApiQuery<UserSearchQuery>,
) -> Reply {
    let page = state.users.search(query).await?;
    Ok(Json(ApiResponse::ok(paged("users", page)?)))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    ApiPath(id): ApiPath<String>,
) -> Reply {
    let detail = state.users.get(&id).await?;
    Ok(Json(ApiResponse::ok(to_json(&detail)?)))
}

pub async fn set_status(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(update): ApiJson<StatusUpdate>,
) -> Reply {
    let user = state.users.set_status(&admin, &id, update).await?;
    let message = if user.is_active { "User activated" } else { "User deactivated" };
    Ok(Json(ApiResponse::with_message(message, keyed("user", &user)?)))
}

pub async fn add_loyalty_points(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(grant): ApiJson<LoyaltyGrant>,
) -> Reply {
    let user = state.users.add_loyalty_points(&admin, &id, grant).await?;
    Ok(Json(ApiResponse::with_message(
        "Loyalty points added successfully",
        keyed("loyaltyProgram", &user.loyalty_program)?,
    )))
}
