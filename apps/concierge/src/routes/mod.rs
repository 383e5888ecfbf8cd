pub mod health;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::conversation::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Catalog
        .route("/api/v1/personas", get(handlers::handle_list_personas))
        .route("/api/v1/categories", get(handlers::handle_list_categories))
        // Sessions
        .route("/api/v1/sessions", post(handlers::handle_create_session))
        .route(
            "/api/v1/sessions/:id",
            get(handlers::handle_get_session).delete(handlers::handle_close_session),
        )
        .route(
            "/api/v1/sessions/:id/persona",
            put(handlers::handle_set_persona),
        )
        .route("/api/v1/sessions/:id/draft", put(handlers::handle_set_draft))
        .route(
            "/api/v1/sessions/:id/location",
            put(handlers::handle_set_location),
        )
        .route("/api/v1/sessions/:id/submit", post(handlers::handle_submit))
        .route(
            "/api/v1/sessions/:id/suggestion",
            post(handlers::handle_select_suggestion),
        )
        .route(
            "/api/v1/sessions/:id/category",
            post(handlers::handle_select_category),
        )
        .route(
            "/api/v1/sessions/:id/load-more",
            post(handlers::handle_load_more),
        )
        .route("/api/v1/sessions/:id/reset", post(handlers::handle_reset))
        .with_state(state)
}
