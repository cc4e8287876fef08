//! Profile and user administration handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::{AdminUser, AuthenticatedUser};
use crate::error::ApiResult;
use crate::models::{
    ApiResponse, PaginatedResponse, PaginationParams, UpdateProfileRequest, UpdateRoleRequest,
    UpdateUserStatusRequest, UserResponse,
};
use crate::state::AppState;

/// GET /api/users/me
pub async fn get_me(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<ApiResponse<UserResponse>>> {
    let profile = state.user_service.profile(&user.actor()).await?;
    Ok(Json(ApiResponse::ok(profile)))
}

/// PUT /api/users/me
pub async fn update_me(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<ApiResponse<UserResponse>>> {
    let profile = state.user_service.update_profile(&user.actor(), req).await?;
    Ok(Json(ApiResponse::ok(profile)))
}

/// GET /api/admin/users
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Query(params): Query<PaginationParams>,
) -> ApiResult<Json<ApiResponse<PaginatedResponse<UserResponse>>>> {
    let users = state
        .user_service
        .list(&admin.actor(), params.normalize())
        .await?;
    Ok(Json(ApiResponse::ok(users)))
}

/// GET /api/admin/users/:id
pub async fn get_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<UserResponse>>> {
    let user = state.user_service.get(&admin.actor(), user_id).await?;
    Ok(Json(ApiResponse::ok(user)))
}

/// PATCH /api/admin/users/:id/role
pub async fn update_user_role(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(user_id): Path<Uuid>,
    Json(req): Json<UpdateRoleRequest>,
) -> ApiResult<Json<ApiResponse<UserResponse>>> {
    let user = state
        .user_service
        .update_role(&admin.actor(), user_id, req.role)
        .await?;
    Ok(Json(ApiResponse::ok(user)))
}

/// PATCH /api/admin/users/:id/status
pub async fn update_user_status(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(user_id): Path<Uuid>,
    Json(req): Json<UpdateUserStatusRequest>,
) -> ApiResult<Json<ApiResponse<UserResponse>>> {
    let user = state
        .user_service
        .set_status(&admin.actor(), user_id, req.is_active)
        .await?;
    Ok(Json(ApiResponse::ok(user)))
}

/// DELETE /api/admin/users/:id
pub async fn delete_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(user_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.user_service.delete(&admin.actor(), user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
