//! Booking handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::{AdminUser, AuthenticatedUser, PartnerUser};
use crate::booking::{
    Booking, BookingListQuery, CreateBookingRequest, UpdateBookingStatusRequest,
};
use crate::error::ApiResult;
use crate::models::{ApiResponse, PageRequest, PaginatedResponse, PaginationParams};
use crate::state::AppState;

/// POST /api/bookings
pub async fn create_booking(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<CreateBookingRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Booking>>)> {
    let booking = state.booking_service.create(&user.actor(), req).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(booking))))
}

/// GET /api/bookings/my
pub async fn list_my_bookings(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(params): Query<PaginationParams>,
) -> ApiResult<Json<ApiResponse<PaginatedResponse<Booking>>>> {
    let bookings = state
        .booking_service
        .list_mine(&user.actor(), params.normalize())
        .await?;
    Ok(Json(ApiResponse::ok(bookings)))
}

/// GET /api/bookings/:id
pub async fn get_booking(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(booking_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Booking>>> {
    let booking = state.booking_service.get(&user.actor(), booking_id).await?;
    Ok(Json(ApiResponse::ok(booking)))
}

/// PATCH /api/bookings/:id/cancel
pub async fn cancel_booking(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(booking_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Booking>>> {
    let booking = state
        .booking_service
        .cancel(&user.actor(), booking_id)
        .await?;
    Ok(Json(ApiResponse::ok(booking)))
}

/// GET /api/partner/bookings
pub async fn list_partner_bookings(
    State(state): State<AppState>,
    PartnerUser(partner): PartnerUser,
    Query(params): Query<PaginationParams>,
) -> ApiResult<Json<ApiResponse<PaginatedResponse<Booking>>>> {
    let bookings = state
        .booking_service
        .list_owned(&partner.actor(), params.normalize())
        .await?;
    Ok(Json(ApiResponse::ok(bookings)))
}

/// PATCH /api/partner/bookings/:id/handover
pub async fn confirm_handover(
    State(state): State<AppState>,
    PartnerUser(partner): PartnerUser,
    Path(booking_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Booking>>> {
    let booking = state
        .booking_service
        .confirm_handover(&partner.actor(), booking_id)
        .await?;
    Ok(Json(ApiResponse::ok(booking)))
}

/// PATCH /api/partner/bookings/:id/return
pub async fn confirm_return(
    State(state): State<AppState>,
    PartnerUser(partner): PartnerUser,
    Path(booking_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Booking>>> {
    let booking = state
        .booking_service
        .confirm_return(&partner.actor(), booking_id)
        .await?;
    Ok(Json(ApiResponse::ok(booking)))
}

/// GET /api/admin/bookings
pub async fn list_all_bookings(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Query(query): Query<BookingListQuery>,
) -> ApiResult<Json<ApiResponse<PaginatedResponse<Booking>>>> {
    let page = PageRequest::from_query(query.page, query.limit);
    let bookings = state
        .booking_service
        .list_all(&admin.actor(), query.status, page)
        .await?;
    Ok(Json(ApiResponse::ok(bookings)))
}

/// PATCH /api/admin/bookings/:id/status
pub async fn update_booking_status(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(booking_id): Path<Uuid>,
    Json(req): Json<UpdateBookingStatusRequest>,
) -> ApiResult<Json<ApiResponse<Booking>>> {
    let booking = state
        .booking_service
        .admin_update_status(&admin.actor(), booking_id, req.status)
        .await?;
    Ok(Json(ApiResponse::ok(booking)))
}
