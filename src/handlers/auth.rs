//! Authentication HTTP handlers
//!
//! Email/password registration and login.

use axum::{extract::State, http::StatusCode, Json};

use crate::error::ApiResult;
use crate::models::{ApiResponse, LoginRequest, LoginResponse, RegisterRequest, UserResponse};
use crate::state::AppState;

/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<UserResponse>>)> {
    let user = state.auth_service.register(req).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(user))))
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<ApiResponse<LoginResponse>>> {
    let response = state.auth_service.login(req).await?;
    Ok(Json(ApiResponse::ok(response)))
}
