//! Route definitions for the rental marketplace API

mod admin;
mod auth;
mod booking;
mod catalog;
mod moderation;
mod partner;
mod user;

use axum::{routing::get, Router};

use crate::handlers::health;
use crate::middleware::request_tracing;
use crate::state::AppState;

pub use admin::admin_routes;
pub use auth::auth_routes;
pub use booking::booking_routes;
pub use catalog::catalog_routes;
pub use moderation::moderation_routes;
pub use partner::partner_routes;
pub use user::user_routes;

/// The full application router with request tracing applied.
///
/// CORS is left to the binary so tests can drive the router directly.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health_check))
        .merge(auth_routes())
        .merge(user_routes())
        .merge(catalog_routes())
        .merge(booking_routes())
        .merge(moderation_routes())
        .merge(partner_routes())
        .merge(admin_routes())
        .with_state(state)
        .layer(axum::middleware::from_fn(request_tracing))
}
