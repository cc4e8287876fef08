//! Partner listing and fulfilment routes

use axum::{
    routing::{get, patch, put},
    Router,
};

use crate::handlers::{booking, catalog};
use crate::state::AppState;

pub fn partner_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/partner/items",
            get(catalog::list_partner_items).post(catalog::create_partner_item),
        )
        .route("/api/partner/items/:id", put(catalog::update_partner_item))
        .route(
            "/api/partner/items/:id/stock",
            patch(catalog::update_partner_item_stock),
        )
        .route("/api/partner/bookings", get(booking::list_partner_bookings))
        .route(
            "/api/partner/bookings/:id/handover",
            patch(booking::confirm_handover),
        )
        .route(
            "/api/partner/bookings/:id/return",
            patch(booking::confirm_return),
        )
}
