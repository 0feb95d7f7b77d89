//! `/api/hotels` handlers

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::middleware::{AdminUser, AuthUser, MaybeAuthUser};
use crate::api::state::AppState;
use crate::api::types::{keyed, paged, to_json, ApiResponse, PageQuery, Pagination};
use crate::core::AppResult;
use crate::models::hotel::HotelImage;
use crate::models::{HotelStatus, RoomType};
use crate::services::hotel_service::{
    AvailabilityRequest, AvailabilityUpdate, HotelListQuery, HotelSearchQuery,
};

type Reply = AppResult<Json<ApiResponse>>;

#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ImagesRequest {
    pub images: Vec<HotelImage>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: HotelStatus,
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<HotelListQuery>,
) -> Reply {
    let page = state.hotels.list(query).await?;
    Ok(Json(ApiResponse::ok(paged("hotels", page)?)))
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<HotelSearchQuery>,
) -> Reply {
    let page = state.hotels.search(query).await?;
    Ok(Json(ApiResponse::ok(paged("hotels", page)?)))
}

pub async fn featured(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<LimitQuery>,
) -> Reply {
    let hotels = state.hotels.featured(query.limit).await?;
    Ok(Json(ApiResponse::ok(keyed("hotels", &hotels)?)))
}

pub async fn by_city(
    State(state): State<Arc<AppState>>,
    ApiPath(city): ApiPath<String>,
    ApiQuery(query): ApiQuery<LimitQuery>,
) -> Reply {
    let hotels = state.hotels.by_location(&city, None, query.limit).await?;
    Ok(Json(ApiResponse::ok(keyed("hotels", &hotels)?)))
}

pub async fn by_city_and_country(
    State(state): State<Arc<AppState>>,
    ApiPath((city, country)): ApiPath<(String, String)>,
    ApiQuery(query): ApiQuery<LimitQuery>,
) -> Reply {
    let hotels = state
        .hotels
        .by_location(&city, Some(&country), query.limit)
        .await?;
    Ok(Json(ApiResponse::ok(keyed("hotels", &hotels)?)))
}

pub async fn get(State(state): State<Arc<AppState>>, ApiPath(id): ApiPath<String>) -> Reply {
    let hotel = state.hotels.get(&id).await?;
    Ok(Json(ApiResponse::ok(keyed("hotel", &hotel)?)))
}

pub async fn amenities(State(state): State<Arc<AppState>>, ApiPath(id): ApiPath<String>) -> Reply {
    let amenities = state.hotels.amenities(&id).await?;
    Ok(Json(ApiResponse::ok(keyed("amenities", &amenities)?)))
}

pub async fn room_types(State(state): State<Arc<AppState>>, ApiPath(id): ApiPath<String>) -> Reply {
    let room_types = state.hotels.room_types(&id).await?;
    Ok(Json(ApiResponse::ok(keyed("roomTypes", &room_types)?)))
}

pub async fn reviews(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<String>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Reply {
    let (page, rating) = state
        .hotels
        .reviews(&id, query.page(), query.limit(10))
        .await?;
    let pagination = Pagination::from(&page);
    Ok(Json(ApiResponse::ok(json!({
        "reviews": to_json(&page.items)?,
        "rating": to_json(&rating)?,
        "pagination": to_json(&pagination)?,
    }))))
}

pub async fn check_availability(
    State(state): State<Arc<AppState>>,
    MaybeAuthUser(user): MaybeAuthUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(req): ApiJson<AvailabilityRequest>,
) -> Reply {
    if let Some(user) = &user {
        tracing::debug!(hotel_id = %id, user_id = %user.id, "availability check");
    }
    let report = state.hotels.check_availability(&id, req).await?;
    Ok(Json(ApiResponse::ok(to_json(&report)?)))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    ApiJson(body): ApiJson<Value>,
) -> AppResult<(StatusCode, Json<ApiResponse>)> {
    let hotel = state.hotels.create(&admin, body).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Hotel created successfully", keyed("hotel", &hotel)?)),
    ))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(changes): ApiJson<Value>,
) -> Reply {
    let hotel = state.hotels.update(&id, changes, &admin).await?;
    Ok(Json(ApiResponse::with_message("Hotel updated successfully", keyed("hotel", &hotel)?)))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<String>,
) -> Reply {
    state.hotels.delete(&id, &admin).await?;
    Ok(Json(ApiResponse::message("Hotel deleted successfully")))
}

pub async fn add_images(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(req): ApiJson<ImagesRequest>,
) -> Reply {
    let hotel = state.hotels.add_images(&id, req.images).await?;
    Ok(Json(ApiResponse::with_message(
        "Images added successfully",
        keyed("images", &hotel.images)?,
    )))
}

pub async fn update_status(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(req): ApiJson<StatusRequest>,
) -> Reply {
    let hotel = state.hotels.update_status(&id, req.status, &admin).await?;
    Ok(Json(ApiResponse::with_message(
        "Hotel status updated successfully",
        keyed("hotel", &hotel)?,
    )))
}

pub async fn add_room_type(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(room): ApiJson<RoomType>,
) -> AppResult<(StatusCode, Json<ApiResponse>)> {
    let room = state.hotels.add_room_type(&user, &id, room).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Room type added successfully", keyed("roomType", &room)?)),
    ))
}

pub async fn update_room_type(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ApiPath((id, room_type_id)): ApiPath<(String, String)>,
    ApiJson(changes): ApiJson<Value>,
) -> Reply {
    let room = state
        .hotels
        .update_room_type(&user, &id, &room_type_id, changes)
        .await?;
    Ok(Json(ApiResponse::with_message(
        "Room type updated successfully",
        keyed("roomType", &room)?,
    )))
}

pub async fn delete_room_type(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ApiPath((id, room_type_id)): ApiPath<(String, String)>,
) -> Reply {
    state.hotels.delete_room_type(&user, &id, &room_type_id).await?;
    Ok(Json(ApiResponse::message("Room type deleted successfully")))
}

pub async fn update_availability(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(update): ApiJson<AvailabilityUpdate>,
) -> Reply {
    let room_types = state.hotels.update_availability(&user, &id, update).await?;
    Ok(Json(ApiResponse::with_message(
        "Availability updated successfully",
        keyed("roomTypes", &room_types)?,
    )))
}
