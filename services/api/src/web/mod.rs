pub mod broadcast;
pub mod generation;
pub mod jobs;
pub mod protocol;
pub mod rest;
pub mod state;
pub mod ws_handler;

use axum::{
    routing::{get, post},
    Router,
};
use state::AppState;
use std::sync::Arc;

// Re-export the pieces the binary and integration tests assemble.
pub use broadcast::Broadcaster;
pub use jobs::JobRegistry;
pub use rest::{ApiDoc, DEFAULT_USER_ID};
pub use ws_handler::ws_handler;

/// Builds the API router. Kept separate from `main` so integration tests can
/// drive the exact routes the binary serves.
pub fn app_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/auth/user", get(rest::get_current_user_handler))
        .route(
            "/projects",
            get(rest::list_projects_handler).post(rest::create_project_handler),
        )
        .route(
            "/projects/{id}",
            get(rest::get_project_handler)
                .patch(rest::update_project_handler)
                .delete(rest::delete_project_handler),
        )
        .route("/generations", get(rest::list_generations_handler))
        .route(
            "/generations/active",
            get(rest::list_active_generations_handler),
        )
        .route("/generate/movie", post(rest::generate_movie_handler))
        .route("/generate/music", post(rest::generate_music_handler))
        .route("/generate/voice", post(rest::generate_voice_handler))
        .route("/generate/analysis", post(rest::generate_analysis_handler))
        .route("/ws", get(ws_handler))
        .with_state(app_state)
}
