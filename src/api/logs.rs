//! Pages through the model-call log kept by [`crate::llm::LogStore`].

use super::common::ApiResponse;
use crate::llm::ModelCallEntry;
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Deserialize)]
pub struct LogQueryParams {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Serialize)]
pub struct LogsResponse {
    pub logs: Vec<ModelCallEntry>,
    pub total: usize,
}

pub async fn get_model_logs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LogQueryParams>,
) -> Response {
    let (logs, total) = state.log_store.page(
        params.limit.unwrap_or(DEFAULT_PAGE_SIZE),
        params.offset.unwrap_or(0),
    );

    ApiResponse::ok(LogsResponse { logs, total }).into_response()
}

pub async fn clear_model_logs(State(state): State<Arc<AppState>>) -> Response {
    state.log_store.clear();
    ApiResponse::ok(()).into_response()
}
