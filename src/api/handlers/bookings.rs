//! `/api/bookings` handlers

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use chrono::{NaiveDate, Utc};
use std::sync::Arc;

use crate::api::extract::{ApiJson, ApiPath, ApiQuery, OptionalJson};
use crate::api::middleware::{AdminUser, AuthUser};
use crate::api::state::AppState;
use crate::api::types::{keyed, paged, to_json, ApiResponse, PageQuery};
use crate::core::{AppError, AppResult};
use crate::models::booking::SpecialRequest;
use crate::network::rate_limit::{client_key, SHARED_KEY};
use crate::services::booking_service::{
    BookingListQuery, CancelRequest, CheckinRequest, CheckoutRequest, CommunicationRequest,
    ConfirmRequest, CreateBookingRequest, ReportQuery, RequestMeta, SpecialRequestUpdate,
    UpdateBookingRequest,
};

type Reply = AppResult<Json<ApiResponse>>;

fn request_meta(headers: &HeaderMap) -> RequestMeta {
    let header_str = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let ip = client_key(headers);
    RequestMeta {
        user_agent: header_str(header::USER_AGENT),
        ip_address: (ip != SHARED_KEY).then_some(ip),
        referrer: header_str(header::REFERER),
    }
}

fn parse_date(raw: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::validation(format!("Invalid date: {raw}")))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    headers: HeaderMap,
    ApiJson(req): ApiJson<CreateBookingRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse>)> {
    let booking = state.bookings.create(&user, req, request_meta(&headers)).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Booking created successfully",
            keyed("booking", &booking)?,
        )),
    ))
}

pub async fn my_bookings(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ApiQuery(query): ApiQuery<BookingListQuery>,
) -> Reply {
    let paging = PageQuery { page: query.page, limit: query.limit };
    let page = state
        .bookings
        .list_for_user(&user.id, query.status, paging.page(), paging.limit(10))
        .await?;
    Ok(Json(ApiResponse::ok(paged("bookings", page)?)))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<String>,
) -> Reply {
    let booking = state.bookings.get(&user, &id).await?;
    Ok(Json(ApiResponse::ok(keyed("booking", &booking)?)))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(req): ApiJson<UpdateBookingRequest>,
) -> Reply {
    let booking = state.bookings.update(&user, &id, req).await?;
    Ok(Json(ApiResponse::with_message(
        "Booking updated successfully",
        keyed("booking", &booking)?,
    )))
}

pub async fn cancel(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<String>,
    OptionalJson(req): OptionalJson<CancelRequest>,
) -> Reply {
    let booking = state.bookings.cancel(&user, &id, req, Utc::now()).await?;
    Ok(Json(ApiResponse::with_message(
        "Booking cancelled successfully",
        keyed("booking", &booking)?,
    )))
}

pub async fn add_special_request(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(request): ApiJson<SpecialRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse>)> {
    let added = state.bookings.add_special_request(&user, &id, request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Special request added successfully",
            keyed("specialRequest", &added)?,
        )),
    ))
}

pub async fn update_special_request(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ApiPath((id, request_id)): ApiPath<(String, String)>,
    ApiJson(update): ApiJson<SpecialRequestUpdate>,
) -> Reply {
    let updated = state
        .bookings
        .update_special_request(&user, &id, &request_id, update)
        .await?;
    Ok(Json(ApiResponse::with_message(
        "Special request updated successfully",
        keyed("specialRequest", &updated)?,
    )))
}

pub async fn confirm(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<String>,
    OptionalJson(req): OptionalJson<ConfirmRequest>,
) -> Reply {
    let booking = state.bookings.confirm(&user, &id, req).await?;
    Ok(Json(ApiResponse::with_message(
        "Booking confirmed successfully",
        keyed("booking", &booking)?,
    )))
}

pub async fn check_in(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<String>,
    OptionalJson(req): OptionalJson<CheckinRequest>,
) -> Reply {
    let booking = state.bookings.check_in(&user, &id, req).await?;
    Ok(Json(ApiResponse::with_message(
        "Guest checked in successfully",
        keyed("booking", &booking)?,
    )))
}

pub async fn check_out(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<String>,
    OptionalJson(req): OptionalJson<CheckoutRequest>,
) -> Reply {
    let booking = state.bookings.check_out(&user, &id, req).await?;
    Ok(Json(ApiResponse::with_message(
        "Guest checked out successfully",
        keyed("booking", &booking)?,
    )))
}

pub async fn add_communication(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(req): ApiJson<CommunicationRequest>,
) -> Reply {
    let booking = state.bookings.add_communication(&user, &id, req).await?;
    Ok(Json(ApiResponse::with_message(
        "Communication recorded",
        keyed("communication", &booking.communication)?,
    )))
}

pub async fn hotel_bookings(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ApiPath(hotel_id): ApiPath<String>,
    ApiQuery(query): ApiQuery<BookingListQuery>,
) -> Reply {
    let page = state.bookings.list_for_hotel(&user, &hotel_id, query).await?;
    Ok(Json(ApiResponse::ok(paged("bookings", page)?)))
}

pub async fn hotel_bookings_on_date(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ApiPath((hotel_id, date)): ApiPath<(String, String)>,
) -> Reply {
    let date = parse_date(&date)?;
    let daily = state.bookings.list_for_date(&user, &hotel_id, date).await?;
    Ok(Json(ApiResponse::ok(to_json(&daily)?)))
}

pub async fn list_all(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    ApiQuery(query): ApiQuery<BookingListQuery>,
) -> Reply {
    let page = state.bookings.list_all(query).await?;
    Ok(Json(ApiResponse::ok(paged("bookings", page)?)))
}

pub async fn report(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    ApiQuery(query): ApiQuery<ReportQuery>,
) -> Reply {
    let report = state.bookings.report(query, Utc::now()).await?;
    tracing::info!(by = %admin.email, "booking report generated");
    Ok(Json(ApiResponse::ok(keyed("report", &report)?)))
}

pub async fn stats(State(state): State<Arc<AppState>>, AdminUser(_admin): AdminUser) -> Reply {
    let stats = state.bookings.stats(Utc::now()).await?;
    Ok(Json(ApiResponse::ok(keyed("stats", &stats)?)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_request_meta_from_headers() {
        let mut headers = HeaderMap::new();
        assert!(request_meta(&headers).ip_address.is_none());

        headers.insert(header::USER_AGENT, HeaderValue::from_static("curl/8.0"));
        headers.insert("x-forwarded-for", HeaderValue::from_static("198.51.100.4"));
        let meta = request_meta(&headers);
        assert_eq!(meta.user_agent.as_deref(), Some("curl/8.0"));
        assert_eq!(meta.ip_address.as_deref(), Some("198.51.100.4"));
        assert!(meta.referrer.is_none());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2026-03-01").unwrap(),
            NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
        );
        assert!(matches!(parse_date("03/01/2026"), Err(AppError::Validation(_))));
    }
}
