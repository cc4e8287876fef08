//! Catalog handlers: public browsing, partner listings, admin moderation

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::{AdminUser, PartnerUser};
use crate::error::ApiResult;
use crate::inventory::{
    Category, CreateCategoryRequest, CreateItemRequest, Item, ItemQuery, RejectRequest,
    UpdateCategoryRequest, UpdateItemRequest, UpdateStockRequest,
};
use crate::models::{ApiResponse, PageRequest, PaginatedResponse, PaginationParams};
use crate::moderation::Review;
use crate::state::AppState;

/// GET /api/items
pub async fn list_items(
    State(state): State<AppState>,
    Query(query): Query<ItemQuery>,
) -> ApiResult<Json<ApiResponse<PaginatedResponse<Item>>>> {
    let page = PageRequest::from_query(query.page, query.limit);
    let items = state.catalog_service.list_public(&query, page).await?;
    Ok(Json(ApiResponse::ok(items)))
}

/// GET /api/items/:id
pub async fn get_item(
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Item>>> {
    let item = state.catalog_service.get_public(item_id).await?;
    Ok(Json(ApiResponse::ok(item)))
}

/// GET /api/items/:id/reviews
pub async fn list_item_reviews(
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
    Query(params): Query<PaginationParams>,
) -> ApiResult<Json<ApiResponse<PaginatedResponse<Review>>>> {
    let reviews = state
        .moderation_service
        .item_reviews(item_id, params.normalize())
        .await?;
    Ok(Json(ApiResponse::ok(reviews)))
}

/// GET /api/categories
pub async fn list_categories(
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<Vec<Category>>>> {
    let categories = state.catalog_service.list_categories().await?;
    Ok(Json(ApiResponse::ok(categories)))
}

/// GET /api/categories/:id
pub async fn get_category(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Category>>> {
    let category = state.catalog_service.get_category(category_id).await?;
    Ok(Json(ApiResponse::ok(category)))
}

/// GET /api/partner/items
pub async fn list_partner_items(
    State(state): State<AppState>,
    PartnerUser(partner): PartnerUser,
    Query(params): Query<PaginationParams>,
) -> ApiResult<Json<ApiResponse<PaginatedResponse<Item>>>> {
    let items = state
        .catalog_service
        .list_owned(&partner.actor(), params.normalize())
        .await?;
    Ok(Json(ApiResponse::ok(items)))
}

/// POST /api/partner/items
pub async fn create_partner_item(
    State(state): State<AppState>,
    PartnerUser(partner): PartnerUser,
    Json(req): Json<CreateItemRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Item>>)> {
    let item = state
        .catalog_service
        .create_listing(&partner.actor(), req)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(item))))
}

/// PUT /api/partner/items/:id
pub async fn update_partner_item(
    State(state): State<AppState>,
    PartnerUser(partner): PartnerUser,
    Path(item_id): Path<Uuid>,
    Json(req): Json<UpdateItemRequest>,
) -> ApiResult<Json<ApiResponse<Item>>> {
    let item = state
        .catalog_service
        .update_listing(&partner.actor(), item_id, req)
        .await?;
    Ok(Json(ApiResponse::ok(item)))
}

/// PATCH /api/partner/items/:id/stock
pub async fn update_partner_item_stock(
    State(state): State<AppState>,
    PartnerUser(partner): PartnerUser,
    Path(item_id): Path<Uuid>,
    Json(req): Json<UpdateStockRequest>,
) -> ApiResult<Json<ApiResponse<Item>>> {
    let item = state
        .catalog_service
        .restock(&partner.actor(), item_id, req)
        .await?;
    Ok(Json(ApiResponse::ok(item)))
}

/// GET /api/admin/items
pub async fn list_all_items(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Query(query): Query<ItemQuery>,
) -> ApiResult<Json<ApiResponse<PaginatedResponse<Item>>>> {
    let page = PageRequest::from_query(query.page, query.limit);
    let items = state
        .catalog_service
        .list_all(&admin.actor(), query.approval_status, page)
        .await?;
    Ok(Json(ApiResponse::ok(items)))
}

/// PATCH /api/admin/items/:id/approve
pub async fn approve_item(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(item_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Item>>> {
    let item = state.catalog_service.approve(&admin.actor(), item_id).await?;
    Ok(Json(ApiResponse::ok(item)))
}

/// PATCH /api/admin/items/:id/reject
pub async fn reject_item(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(item_id): Path<Uuid>,
    Json(req): Json<RejectRequest>,
) -> ApiResult<Json<ApiResponse<Item>>> {
    let item = state
        .catalog_service
        .reject(&admin.actor(), item_id, req)
        .await?;
    Ok(Json(ApiResponse::ok(item)))
}

/// POST /api/admin/categories
pub async fn create_category(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(req): Json<CreateCategoryRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Category>>)> {
    let category = state
        .catalog_service
        .create_category(&admin.actor(), req)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(category))))
}

/// PUT /api/admin/categories/:id
pub async fn update_category(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(category_id): Path<Uuid>,
    Json(req): Json<UpdateCategoryRequest>,
) -> ApiResult<Json<ApiResponse<Category>>> {
    let category = state
        .catalog_service
        .update_category(&admin.actor(), category_id, req)
        .await?;
    Ok(Json(ApiResponse::ok(category)))
}

/// DELETE /api/admin/categories/:id
pub async fn delete_category(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(category_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state
        .catalog_service
        .delete_category(&admin.actor(), category_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/admin/items/:id
///
/// Soft delete: the listing is switched off, history is kept.
pub async fn deactivate_item(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(item_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Item>>> {
    let item = state
        .catalog_service
        .deactivate(&admin.actor(), item_id)
        .await?;
    Ok(Json(ApiResponse::ok(item)))
}
