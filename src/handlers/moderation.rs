//! Partner application, review and dispute handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::{AdminUser, AuthenticatedUser};
use crate::error::ApiResult;
use crate::inventory::RejectRequest;
use crate::models::{ApiResponse, PageRequest, PaginatedResponse, PaginationParams};
use crate::moderation::{
    ApplicationListQuery, CreateDisputeRequest, CreateReviewRequest, Dispute, DisputeListQuery,
    PartnerApplication, PartnerApplicationRequest, Review, UpdateDisputeRequest,
};
use crate::state::AppState;

/// POST /api/bookings/:id/reviews
pub async fn create_review(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(booking_id): Path<Uuid>,
    Json(req): Json<CreateReviewRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Review>>)> {
    let review = state
        .moderation_service
        .create_review(&user.actor(), booking_id, req)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(review))))
}

/// POST /api/bookings/:id/disputes
pub async fn open_dispute(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(booking_id): Path<Uuid>,
    Json(req): Json<CreateDisputeRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Dispute>>)> {
    let dispute = state
        .moderation_service
        .open_dispute(&user.actor(), booking_id, req)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(dispute))))
}

/// GET /api/disputes/my
pub async fn list_my_disputes(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(params): Query<PaginationParams>,
) -> ApiResult<Json<ApiResponse<PaginatedResponse<Dispute>>>> {
    let disputes = state
        .moderation_service
        .my_disputes(&user.actor(), params.normalize())
        .await?;
    Ok(Json(ApiResponse::ok(disputes)))
}

/// POST /api/partner-applications
pub async fn submit_application(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<PartnerApplicationRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<PartnerApplication>>)> {
    let application = state
        .moderation_service
        .submit_application(&user.actor(), req)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(application))))
}

/// GET /api/partner-applications/me
pub async fn get_my_application(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<ApiResponse<PartnerApplication>>> {
    let application = state
        .moderation_service
        .my_application(&user.actor())
        .await?;
    Ok(Json(ApiResponse::ok(application)))
}

/// GET /api/admin/partner-applications
pub async fn list_applications(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Query(query): Query<ApplicationListQuery>,
) -> ApiResult<Json<ApiResponse<PaginatedResponse<PartnerApplication>>>> {
    let page = PageRequest::from_query(query.page, query.limit);
    let applications = state
        .moderation_service
        .list_applications(&admin.actor(), query.status, page)
        .await?;
    Ok(Json(ApiResponse::ok(applications)))
}

/// PATCH /api/admin/partner-applications/:id/approve
pub async fn approve_application(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(application_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<PartnerApplication>>> {
    let application = state
        .moderation_service
        .approve_application(&admin.actor(), application_id)
        .await?;
    Ok(Json(ApiResponse::ok(application)))
}

/// PATCH /api/admin/partner-applications/:id/reject
pub async fn reject_application(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(application_id): Path<Uuid>,
    Json(req): Json<RejectRequest>,
) -> ApiResult<Json<ApiResponse<PartnerApplication>>> {
    let application = state
        .moderation_service
        .reject_application(&admin.actor(), application_id, req)
        .await?;
    Ok(Json(ApiResponse::ok(application)))
}

/// GET /api/admin/disputes
pub async fn list_disputes(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Query(query): Query<DisputeListQuery>,
) -> ApiResult<Json<ApiResponse<PaginatedResponse<Dispute>>>> {
    let page = PageRequest::from_query(query.page, query.limit);
    let disputes = state
        .moderation_service
        .list_disputes(&admin.actor(), query.status, page)
        .await?;
    Ok(Json(ApiResponse::ok(disputes)))
}

/// PATCH /api/admin/disputes/:id/status
pub async fn update_dispute_status(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(dispute_id): Path<Uuid>,
    Json(req): Json<UpdateDisputeRequest>,
) -> ApiResult<Json<ApiResponse<Dispute>>> {
    let dispute = state
        .moderation_service
        .update_dispute(&admin.actor(), dispute_id, req)
        .await?;
    Ok(Json(ApiResponse::ok(dispute)))
}
