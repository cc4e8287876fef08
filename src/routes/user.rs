//! Self-service profile routes

use axum::{routing::get, Router};

use crate::handlers::user::{get_me, update_me};
use crate::state::AppState;

pub fn user_routes() -> Router<AppState> {
    Router::new().route("/api/users/me", get(get_me).put(update_me))
}
