//! Spaced-retrieval card generation. One model call produces the cards;
//! each card is persisted with its schedule and assigned to the patient.

use crate::core::models::{ExerciseRecord, SrCardContent, Therapy};
use crate::core::store;
use crate::error::{AppError, AppResult};
use crate::llm::PromptOptions;
use crate::state::AppState;
use crate::therapy::prompts;
use serde_json::{json, Value};

const OPTS: PromptOptions = PromptOptions {
    system: prompts::SYSTEM_SR,
    temperature: 0.3,
    max_tokens: 1000,
};

pub async fn run(state: &AppState, user_id: &str, patient_profile: &Value) -> AppResult<Value> {
    let result = state
        .llm
        .chat_json(
            "sr.generate_cards",
            &prompts::sr_prompt(patient_profile),
            OPTS,
        )
        .await?;

    let cards = result
        .get("cards")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    if cards.is_empty() {
        return Err(AppError::ModelOutput(
            "the model produced no spaced-retrieval cards".to_string(),
        ));
    }

    let intervals = state.config.read().await.sr_intervals_sec.clone();

    for card in &cards {
        let doc_id = store::new_exercise_id();
        let stimulus = card
            .get("stimulus")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        let answer = card
            .get("answer")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();

        store::insert_exercise(
            &state.db_pool,
            &ExerciseRecord {
                id: doc_id.clone(),
                terapia: Therapy::Sr.as_str().to_string(),
                revisado: false,
                tipo: "privado".to_string(),
                creado_por: "IA".to_string(),
                personalizado: true,
                referencia_base: None,
                id_paciente: Some(user_id.to_string()),
                descripcion_adaptado: String::new(),
                contexto: None,
                fecha_creacion: store::now_ts(),
            },
        )
        .await?;

        store::insert_sr_card(
            &state.db_pool,
            &SrCardContent::new(doc_id.clone(), stimulus, answer, intervals.clone()),
        )
        .await?;

        store::assign_simple(&state.db_pool, user_id, &doc_id).await?;
    }

    Ok(json!({"user_id": user_id, "cards": cards}))
}
