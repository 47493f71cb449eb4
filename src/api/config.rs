use axum::{
    extract::{Json, State},
    response::Response,
};
use std::sync::Arc;

use super::common::into_response;
use crate::core::models::AppConfig;
use crate::core::storage::ConfigStorage;
use crate::state::AppState;

pub async fn load_config(State(state): State<Arc<AppState>>) -> Response {
    into_response(ConfigStorage::load(&state.db_pool).await)
}

pub async fn save_config(
    State(state): State<Arc<AppState>>,
    Json(config): Json<AppConfig>,
) -> Response {
    // Apply to the running client before persisting.
    if let Some(deployment) = &config.deployment {
        state.llm.set_deployment(deployment.clone());
    }
    state.llm.set_request_timeout(config.request_timeout);
    *state.config.write().await = config.clone();

    into_response(ConfigStorage::save(&state.db_pool, &config).await)
}
