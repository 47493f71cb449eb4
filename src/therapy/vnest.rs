//! VNeST exercise generation: a five-step pipeline over the model, ending
//! in a persisted exercise.

use crate::core::models::{ExerciseRecord, Therapy, VnestContent};
use crate::core::store;
use crate::error::{AppError, AppResult};
use crate::llm::PromptOptions;
use crate::state::AppState;
use crate::therapy::prompts;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

const OPTS: PromptOptions = PromptOptions {
    system: prompts::SYSTEM_VNEST,
    temperature: 0.4,
    max_tokens: 2100,
};

/// The exercise must end with exactly this many judgment sentences.
const FINAL_SENTENCE_COUNT: usize = 10;

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateParams {
    pub contexto: String,
    pub nivel: String,
    #[serde(default = "default_creator")]
    pub creado_por: String,
    #[serde(default = "default_visibility")]
    pub tipo: String,
}

fn default_creator() -> String {
    "terapeuta".to_string()
}

fn default_visibility() -> String {
    "privado".to_string()
}

pub async fn run(state: &AppState, params: GenerateParams) -> AppResult<Value> {
    // Step 1: candidate verbs for the context.
    let out1 = state
        .llm
        .chat_json(
            "vnest.generate_verbs",
            &prompts::vnest_verbs_prompt(&params.contexto),
            OPTS,
        )
        .await?;
    let verbos = string_list(&out1, "verbos")?;

    // Step 2: classify by difficulty.
    let out2 = state
        .llm
        .chat_json(
            "vnest.classify_verbs",
            &prompts::vnest_classify_prompt(&params.contexto, &verbos),
            OPTS,
        )
        .await?;
    let clasificados = required_field(&out2, "verbos_clasificados")?;

    // Step 3: pick a verb and draft SVO sentences for the level.
    let out3 = state
        .llm
        .chat_json(
            "vnest.select_pairs",
            &prompts::vnest_pairs_prompt(&params.contexto, &clasificados, &params.nivel, 3),
            OPTS,
        )
        .await?;
    let verbo_seleccionado = out3
        .get("verbo_seleccionado")
        .and_then(Value::as_str)
        .unwrap_or("")
        .trim()
        .to_string();
    let oraciones_svo = out3.get("oraciones").cloned().unwrap_or_else(|| json!([]));

    // Step 4: expand the sentences, then assemble the final exercise.
    let out4 = state
        .llm
        .chat_json(
            "vnest.expand_sentences",
            &prompts::vnest_expansion_prompt(&verbo_seleccionado, &oraciones_svo),
            OPTS,
        )
        .await?;
    let out5 = state
        .llm
        .chat_json("vnest.finalize", &prompts::vnest_final_prompt(&out4), OPTS)
        .await?;

    if let Err(e) = validate_final(&out5) {
        warn!("final VNeST output failed validation: {e}");
    }

    let verbo = out5
        .get("verbo")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or(verbo_seleccionado);

    if verbo.is_empty() {
        return Err(AppError::ModelOutput(
            "could not determine the final verb".to_string(),
        ));
    }

    let pares = out5.get("pares").cloned().unwrap_or_else(|| json!([]));
    let oraciones = out5.get("oraciones").cloned().unwrap_or_else(|| json!([]));

    // Step 5: persist general record + VNeST content.
    let doc_id = store::new_exercise_id();

    store::insert_exercise(
        &state.db_pool,
        &ExerciseRecord {
            id: doc_id.clone(),
            terapia: Therapy::Vnest.as_str().to_string(),
            revisado: false,
            tipo: params.tipo,
            creado_por: params.creado_por,
            personalizado: false,
            referencia_base: None,
            id_paciente: None,
            descripcion_adaptado: String::new(),
            contexto: Some(params.contexto.clone()),
            fecha_creacion: store::now_ts(),
        },
    )
    .await?;

    store::insert_vnest(
        &state.db_pool,
        &VnestContent {
            id: doc_id.clone(),
            nivel: Some(params.nivel.clone()),
            contexto: Some(params.contexto.clone()),
            verbo: verbo.clone(),
            pares: pares.clone(),
            oraciones: oraciones.clone(),
        },
    )
    .await?;

    Ok(json!({
        "id": doc_id,
        "verbo": verbo,
        "nivel": params.nivel,
        "context_hint": params.contexto,
        "reviewed": false,
        "pares": pares,
        "oraciones": oraciones,
    }))
}

/// The finished exercise needs a verb, a list of pairs, and exactly ten
/// judgment sentences.
pub fn validate_final(out: &Value) -> AppResult<()> {
    let verbo_ok = out
        .get("verbo")
        .and_then(Value::as_str)
        .is_some_and(|v| !v.trim().is_empty());
    if !verbo_ok {
        return Err(AppError::ModelOutput("missing 'verbo'".to_string()));
    }

    if !out.get("pares").is_some_and(Value::is_array) {
        return Err(AppError::ModelOutput("missing 'pares'".to_string()));
    }

    let n = out
        .get("oraciones")
        .and_then(Value::as_array)
        .map_or(0, Vec::len);
    if n != FINAL_SENTENCE_COUNT {
        return Err(AppError::ModelOutput(format!(
            "expected {FINAL_SENTENCE_COUNT} sentences, got {n}"
        )));
    }

    Ok(())
}

fn string_list(out: &Value, key: &str) -> AppResult<Vec<String>> {
    let list: Vec<String> = out
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    if list.is_empty() {
        return Err(AppError::ModelOutput(format!("missing '{key}'")));
    }

    Ok(list)
}

fn required_field(out: &Value, key: &str) -> AppResult<Value> {
    out.get(key)
        .cloned()
        .ok_or_else(|| AppError::ModelOutput(format!("missing '{key}'")))
}
