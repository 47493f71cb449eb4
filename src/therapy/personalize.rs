//! Exercise personalization: adapt an existing exercise to one patient's
//! life and save the result as a new private exercise referencing the base.

use crate::core::models::{ExerciseRecord, SrCardContent, Therapy, VnestContent};
use crate::core::store;
use crate::error::{AppError, AppResult};
use crate::llm::PromptOptions;
use crate::state::AppState;
use crate::therapy::{assign, prompts};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::warn;

const OPTS: PromptOptions = PromptOptions {
    system: prompts::SYSTEM_PERSONALIZATION,
    temperature: 0.4,
    max_tokens: 3000,
};

pub async fn run(
    state: &AppState,
    user_id: &str,
    exercise_id: &str,
    patient_profile: &Value,
) -> AppResult<Value> {
    let base = store::get_exercise_base(&state.db_pool, exercise_id).await?;

    let mut result = state
        .llm
        .chat_json(
            "personalize.exercise",
            &prompts::personalization_prompt(&base, patient_profile, user_id),
            OPTS,
        )
        .await?;

    let contexto = base
        .get("contexto")
        .filter(|v| !v.is_null())
        .or_else(|| base.get("context_hint"))
        .cloned()
        .unwrap_or(Value::Null);

    {
        let obj = result.as_object_mut().ok_or_else(|| {
            AppError::ModelOutput("personalized exercise must be a JSON object".to_string())
        })?;
        obj.insert("id_paciente".to_string(), json!(user_id));
        obj.insert("referencia_base".to_string(), json!(exercise_id));
        obj.insert("creado_por".to_string(), json!("IA"));
        obj.insert("personalizado".to_string(), json!(true));
        obj.insert("contexto".to_string(), contexto);
    }

    let saved_id = save_personalized(&state.db_pool, &result).await?;

    // A failed assignment should not lose an already-saved exercise.
    if let Err(e) = assign::assign_exercise_to_patient(&state.db_pool, user_id, &saved_id).await {
        warn!("failed to assign personalized exercise {saved_id}: {e}");
    }

    Ok(json!({
        "ok": true,
        "saved_id": saved_id,
        "personalized": result,
    }))
}

/// Persists a personalized exercise under a fresh id, into the general
/// collection plus the therapy-specific one.
async fn save_personalized(pool: &SqlitePool, data: &Value) -> AppResult<String> {
    let therapy = data
        .get("terapia")
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::Invalid("personalized exercise missing 'terapia'".to_string()))
        .and_then(Therapy::from_str)?;

    let doc_id = store::new_exercise_id();

    store::insert_exercise(
        pool,
        &ExerciseRecord {
            id: doc_id.clone(),
            terapia: therapy.as_str().to_string(),
            revisado: false,
            tipo: "privado".to_string(),
            creado_por: str_field(data, "creado_por").unwrap_or_else(|| "IA".to_string()),
            personalizado: true,
            referencia_base: str_field(data, "referencia_base"),
            id_paciente: str_field(data, "id_paciente"),
            descripcion_adaptado: str_field(data, "descripcion_adaptado").unwrap_or_default(),
            contexto: str_field(data, "contexto"),
            fecha_creacion: store::now_ts(),
        },
    )
    .await?;

    match therapy {
        Therapy::Vnest => {
            store::insert_vnest(
                pool,
                &VnestContent {
                    id: doc_id.clone(),
                    nivel: str_field(data, "nivel"),
                    contexto: str_field(data, "contexto"),
                    verbo: str_field(data, "verbo").unwrap_or_default(),
                    pares: data.get("pares").cloned().unwrap_or_else(|| json!([])),
                    oraciones: data.get("oraciones").cloned().unwrap_or_else(|| json!([])),
                },
            )
            .await?;
        }
        Therapy::Sr => {
            let intervals = data
                .get("intervals_sec")
                .and_then(|v| serde_json::from_value(v.clone()).ok())
                .unwrap_or_else(|| crate::core::models::DEFAULT_SR_INTERVALS.to_vec());

            store::insert_sr_card(
                pool,
                &SrCardContent::new(
                    doc_id.clone(),
                    str_field(data, "pregunta").unwrap_or_default(),
                    str_field(data, "rta_correcta").unwrap_or_default(),
                    intervals,
                ),
            )
            .await?;
        }
    }

    Ok(doc_id)
}

fn str_field(data: &Value, key: &str) -> Option<String> {
    data.get(key).and_then(Value::as_str).map(str::to_string)
}
