use axum::{
    extract::{Json, Path, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use super::common::{into_response, ApiResponse};
use crate::state::AppState;
use crate::therapy::vnest::GenerateParams;
use crate::therapy::{assign, personalize, profile, sr, vnest};

pub async fn health() -> Response {
    ApiResponse::ok(json!({"status": "ok", "service": "rehabilitia-backend"})).into_response()
}

pub async fn generate_exercise(
    State(state): State<Arc<AppState>>,
    Json(params): Json<GenerateParams>,
) -> Response {
    into_response(vnest::run(&state, params).await)
}

#[derive(Deserialize)]
pub struct SpacedRetrievalRequest {
    pub user_id: String,
    pub patient_profile: Value,
}

pub async fn spaced_retrieval(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SpacedRetrievalRequest>,
) -> Response {
    into_response(sr::run(&state, &req.user_id, &req.patient_profile).await)
}

#[derive(Deserialize)]
pub struct PersonalizeRequest {
    pub user_id: String,
    pub exercise_id: String,
    pub patient_profile: Value,
}

pub async fn personalize_exercise(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PersonalizeRequest>,
) -> Response {
    into_response(
        personalize::run(&state, &req.user_id, &req.exercise_id, &req.patient_profile).await,
    )
}

#[derive(Deserialize)]
pub struct ProfileStructureRequest {
    pub user_id: String,
    pub raw_text: String,
}

pub async fn structure_profile(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ProfileStructureRequest>,
) -> Response {
    into_response(profile::run(&state, &req.user_id, &req.raw_text).await)
}

#[derive(Deserialize)]
pub struct ForContextRequest {
    pub email: String,
    pub contexto: String,
    pub verbo: String,
}

pub async fn exercise_for_context(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ForContextRequest>,
) -> Response {
    into_response(
        assign::get_exercise_for_context(&state.db_pool, &req.email, &req.contexto, &req.verbo)
            .await,
    )
}

pub async fn get_exercise(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    into_response(crate::core::store::get_exercise_base(&state.db_pool, &id).await)
}
