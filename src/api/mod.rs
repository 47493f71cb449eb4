use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub mod common;
mod config;
mod logs;
mod therapy;

pub fn build_routes(state: Arc<AppState>) -> Router {
    Router::new()
        // Health
        .route("/", get(therapy::health))
        .route("/healthz", get(therapy::health))
        // Therapy
        .route("/context/generate", post(therapy::generate_exercise))
        .route("/spaced-retrieval/", post(therapy::spaced_retrieval))
        .route("/personalize-exercise/", post(therapy::personalize_exercise))
        .route("/profile/structure/", post(therapy::structure_profile))
        .route("/exercise/for-context/", post(therapy::exercise_for_context))
        .route("/api/exercises/:id", get(therapy::get_exercise))
        // Config
        .route(
            "/api/config",
            get(config::load_config).put(config::save_config),
        )
        // Model-call logs
        .route("/api/logs", get(logs::get_model_logs))
        .route("/api/logs/clear", post(logs::clear_model_logs))
        .with_state(state)
}
