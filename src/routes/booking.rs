//! Renter booking and payment routes, plus the gateway webhook

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::handlers::{booking, payment};
use crate::state::AppState;

pub fn booking_routes() -> Router<AppState> {
    Router::new()
        .route("/api/bookings", post(booking::create_booking))
        .route("/api/bookings/my", get(booking::list_my_bookings))
        .route("/api/bookings/:id", get(booking::get_booking))
        .route("/api/bookings/:id/cancel", patch(booking::cancel_booking))
        .route(
            "/api/bookings/:id/payments",
            post(payment::create_payment).get(payment::get_booking_payment),
        )
        .route("/webhooks/payments", post(payment::payment_webhook))
}
