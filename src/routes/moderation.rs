//! Reviews, disputes and partner applications

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::moderation;
use crate::state::AppState;

pub fn moderation_routes() -> Router<AppState> {
    Router::new()
        .route("/api/bookings/:id/reviews", post(moderation::create_review))
        .route("/api/bookings/:id/disputes", post(moderation::open_dispute))
        .route("/api/disputes/my", get(moderation::list_my_disputes))
        .route(
            "/api/partner-applications",
            post(moderation::submit_application),
        )
        .route(
            "/api/partner-applications/me",
            get(moderation::get_my_application),
        )
}
