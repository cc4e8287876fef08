//! Public catalog routes

use axum::{routing::get, Router};

use crate::handlers::catalog;
use crate::state::AppState;

pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/api/items", get(catalog::list_items))
        .route("/api/items/:id", get(catalog::get_item))
        .route("/api/items/:id/reviews", get(catalog::list_item_reviews))
        .route("/api/categories", get(catalog::list_categories))
        .route("/api/categories/:id", get(catalog::get_category))
}
