//! Admin routes

use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};

use crate::handlers::{booking, catalog, moderation, payment, user};
use crate::state::AppState;

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/items", get(catalog::list_all_items))
        .route("/api/admin/items/:id", delete(catalog::deactivate_item))
        .route("/api/admin/items/:id/approve", patch(catalog::approve_item))
        .route("/api/admin/items/:id/reject", patch(catalog::reject_item))
        .route("/api/admin/categories", post(catalog::create_category))
        .route(
            "/api/admin/categories/:id",
            put(catalog::update_category).delete(catalog::delete_category),
        )
        .route("/api/admin/bookings", get(booking::list_all_bookings))
        .route(
            "/api/admin/bookings/:id/status",
            patch(booking::update_booking_status),
        )
        .route("/api/admin/payments", get(payment::list_payments))
        .route("/api/admin/payments/:id", get(payment::get_payment))
        .route("/api/admin/users", get(user::list_users))
        .route(
            "/api/admin/users/:id",
            get(user::get_user).delete(user::delete_user),
        )
        .route("/api/admin/users/:id/role", patch(user::update_user_role))
        .route(
            "/api/admin/users/:id/status",
            patch(user::update_user_status),
        )
        .route(
            "/api/admin/partner-applications",
            get(moderation::list_applications),
        )
        .route(
            "/api/admin/partner-applications/:id/approve",
            patch(moderation::approve_application),
        )
        .route(
            "/api/admin/partner-applications/:id/reject",
            patch(moderation::reject_application),
        )
        .route("/api/admin/disputes", get(moderation::list_disputes))
        .route(
            "/api/admin/disputes/:id/status",
            patch(moderation::update_dispute_status),
        )
}
