//! Payment handlers and the gateway webhook

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use super::{AdminUser, AuthenticatedUser};
use crate::error::{ApiError, ApiResult};
use crate::models::{ApiResponse, PageRequest, PaginatedResponse};
use crate::payment::{
    CreatePaymentRequest, GatewayNotification, Payment, PaymentCheckout, PaymentListQuery,
};
use crate::state::AppState;

/// POST /api/bookings/:id/payments
///
/// The body is optional; `payment_type` defaults to bank transfer.
pub async fn create_payment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(booking_id): Path<Uuid>,
    payload: Option<Json<CreatePaymentRequest>>,
) -> ApiResult<(StatusCode, Json<ApiResponse<PaymentCheckout>>)> {
    let req = payload.map(|Json(req)| req).unwrap_or_default();
    let checkout = state
        .payment_service
        .create_payment(&user.actor(), booking_id, req)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(checkout))))
}

/// GET /api/bookings/:id/payments
pub async fn get_booking_payment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(booking_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Payment>>> {
    let payment = state
        .payment_service
        .get_for_booking(&user.actor(), booking_id)
        .await?;
    Ok(Json(ApiResponse::ok(payment)))
}

/// GET /api/admin/payments
pub async fn list_payments(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Query(query): Query<PaymentListQuery>,
) -> ApiResult<Json<ApiResponse<PaginatedResponse<Payment>>>> {
    let page = PageRequest::from_query(query.page, query.limit);
    let payments = state
        .payment_service
        .list(&admin.actor(), query.status, page)
        .await?;
    Ok(Json(ApiResponse::ok(payments)))
}

/// GET /api/admin/payments/:id
pub async fn get_payment(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(payment_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Payment>>> {
    let payment = state
        .payment_service
        .get(&admin.actor(), payment_id)
        .await?;
    Ok(Json(ApiResponse::ok(payment)))
}

/// POST /webhooks/payments
///
/// Business-rule rejections are acknowledged with 200 so the gateway stops
/// retrying; only malformed, unsigned or infrastructure failures are errors.
pub async fn payment_webhook(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let notification: GatewayNotification = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid notification payload: {}", e)))?;

    if !state.payment_service.verify_notification(&notification) {
        tracing::warn!(
            order_id = %notification.order_id,
            transaction_id = %notification.transaction_id,
            "Rejected webhook with invalid signature"
        );
        return Err(ApiError::Unauthorized(
            "Invalid notification signature".to_string(),
        ));
    }

    let order_id = notification.order_id.clone();
    let outcome = notification
        .into_outcome()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let transaction_id = outcome.provider_txn_id.clone();

    match state.payment_service.process_outcome(outcome).await {
        Ok(disposition) => {
            tracing::info!(
                order_id = %order_id,
                transaction_id = %transaction_id,
                disposition = ?disposition,
                "Webhook processed"
            );
            Ok(Json(json!({ "status": "ok", "result": disposition })))
        }
        Err(e) if e.is_business() => {
            tracing::warn!(
                error = %e,
                order_id = %order_id,
                transaction_id = %transaction_id,
                "Webhook ignored"
            );
            Ok(Json(json!({ "status": "ignored", "reason": e.to_string() })))
        }
        Err(e) => Err(e.into()),
    }
}
