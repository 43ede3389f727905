pub mod health;
pub mod sessions;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/sessions", post(sessions::handle_create_session))
        .route("/api/v1/sessions/:id/query", post(sessions::handle_query))
        .route("/api/v1/sessions/:id/history", get(sessions::handle_history))
        .route(
            "/api/v1/sessions/:id/versions",
            get(sessions::handle_list_versions),
        )
        .route(
            "/api/v1/sessions/:id/versions/:v",
            get(sessions::handle_get_version),
        )
        .route("/api/v1/sessions/:id/revert", post(sessions::handle_revert))
        .route(
            "/api/v1/sessions/:id/download",
            get(sessions::handle_download),
        )
        .with_state(state)
}
