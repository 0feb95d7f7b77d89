//! `/api/auth` handlers

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::Value;
use std::sync::Arc;

use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::middleware::{AdminUser, AuthUser};
use crate::api::state::AppState;
use crate::api::types::{keyed, paged, to_json, ApiResponse};
use crate::auth::types::{
    ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, RefreshTokenRequest,
    RegisterRequest, ResendVerificationRequest, ResetPasswordRequest,
};
use crate::core::AppResult;
use crate::services::user_service::UserListQuery;

type Reply = AppResult<Json<ApiResponse>>;

pub async fn register(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse>)> {
    let session = state.auth.register(req).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "User registered successfully",
            to_json(&session)?,
        )),
    ))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Reply {
    let session = state.auth.login(req).await?;
    Ok(Json(ApiResponse::with_message(
        "Login successful",
        to_json(&session)?,
    )))
}

pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<RefreshTokenRequest>,
) -> Reply {
    let session = state.auth.refresh(&req.refresh_token).await?;
    Ok(Json(ApiResponse::with_message(
        "Token refreshed",
        to_json(&session)?,
    )))
}

pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<ForgotPasswordRequest>,
) -> Reply {
    let issued = state.auth.forgot_password(&req.email).await?;
    Ok(Json(ApiResponse::with_message(
        "If an account exists for this email, a password reset link has been sent",
        to_json(&issued)?,
    )))
}

pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<ResetPasswordRequest>,
) -> Reply {
    state.auth.reset_password(req).await?;
    Ok(Json(ApiResponse::message("Password reset successfully")))
}

pub async fn verify_email(
    State(state): State<Arc<AppState>>,
    ApiPath(token): ApiPath<String>,
) -> Reply {
    let user = state.auth.verify_email(&token).await?;
    Ok(Json(ApiResponse::with_message("Email verified successfully", keyed("user", &user)?)))
}

pub async fn resend_verification(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<ResendVerificationRequest>,
) -> Reply {
    let issued = state.auth.resend_verification(&req.email).await?;
    Ok(Json(ApiResponse::with_message(
        "Verification email sent",
        to_json(&issued)?,
    )))
}

pub async fn profile(AuthUser(user): AuthUser) -> Reply {
    Ok(Json(ApiResponse::ok(keyed("user", &user)?)))
}

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ApiJson(changes): ApiJson<Value>,
) -> Reply {
    let user = state.auth.update_profile(&user, changes).await?;
    Ok(Json(ApiResponse::with_message("Profile updated successfully", keyed("user", &user)?)))
}

pub async fn change_password(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> Reply {
    state.auth.change_password(&user, req).await?;
    Ok(Json(ApiResponse::message("Password changed successfully")))
}

pub async fn logout(State(state): State<Arc<AppState>>, AuthUser(user): AuthUser) -> Reply {
    state.auth.logout(&user).await;
    Ok(Json(ApiResponse::message("Logout successful")))
}

pub async fn delete_account(State(state): State<Arc<AppState>>, AuthUser(user): AuthUser) -> Reply {
    state.auth.deactivate(&user.id).await?;
    Ok(Json(ApiResponse::message("Account deleted successfully")))
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    ApiQuery(query): ApiQuery<UserListQuery>,
) -> Reply {
    let page = state.users.list(query).await?;
    Ok(Json(ApiResponse::ok(paged("users", page)?)))
}
