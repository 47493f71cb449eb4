//! Assignment and selection of exercises for a patient.

use crate::core::models::{Assignment, Therapy, VnestContent};
use crate::core::store;
use crate::error::{AppError, AppResult};
use rand::seq::SliceRandom;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::warn;

/// Assigns an exercise to a patient with full bookkeeping: context comes
/// from the therapy content, priority is one past the patient's current
/// maximum, and the personalization flag mirrors the general record.
pub async fn assign_exercise_to_patient(
    pool: &SqlitePool,
    patient_id: &str,
    exercise_id: &str,
) -> AppResult<()> {
    let base = store::get_exercise(pool, exercise_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("exercise '{exercise_id}'")))?;

    let therapy = Therapy::from_str(&base.terapia)?;

    let contexto = match therapy {
        Therapy::Vnest => store::get_vnest(pool, exercise_id)
            .await?
            .and_then(|c| c.contexto),
        // SR cards carry no context.
        Therapy::Sr => None,
    };

    let Some(contexto) = contexto else {
        return Err(AppError::Invalid(format!(
            "no context found for {exercise_id} ({therapy})"
        )));
    };

    let prioridad = store::max_priority(pool, patient_id).await? + 1;

    store::upsert_assignment(
        pool,
        patient_id,
        &Assignment {
            id_ejercicio: exercise_id.to_string(),
            contexto: Some(contexto),
            tipo: therapy.as_str().to_string(),
            estado: "pendiente".to_string(),
            prioridad,
            ultima_fecha_realizado: None,
            veces_realizado: 0,
            fecha_asignacion: store::now_ts(),
            personalizado: base.personalizado,
        },
    )
    .await?;

    Ok(())
}

struct Candidate {
    assignment: Assignment,
    personalizado: bool,
}

/// Selects the most suitable VNeST exercise for a patient in a context:
/// pending assignments first (personalized before priority), then a random
/// unassigned public exercise with the same verb, then the completed one
/// done longest ago.
pub async fn get_exercise_for_context(
    pool: &SqlitePool,
    email: &str,
    contexto: &str,
    verbo: &str,
) -> AppResult<Value> {
    let assigned = store::list_assignments_by_context(pool, email, contexto).await?;

    let mut pending: Vec<Candidate> = Vec::new();
    let mut completed: Vec<Candidate> = Vec::new();

    for item in &assigned {
        let Some(content) = store::get_vnest(pool, &item.id_ejercicio).await? else {
            continue;
        };
        if content.verbo != verbo {
            continue;
        }

        let personalizado = store::get_exercise(pool, &item.id_ejercicio)
            .await?
            .map(|r| r.personalizado)
            .unwrap_or(false);

        let candidate = Candidate {
            assignment: item.clone(),
            personalizado,
        };

        if item.estado == "pendiente" {
            pending.push(candidate);
        } else {
            completed.push(candidate);
        }
    }

    // Pending: personalized exercises win, then the lowest priority number.
    if !pending.is_empty() {
        pending.sort_by_key(|c| (!c.personalizado, c.assignment.prioridad));
        let chosen = &pending[0];
        return load_with_highlight(pool, &chosen.assignment.id_ejercicio, chosen.personalizado)
            .await;
    }

    // Nothing pending: look for an unassigned, non-private exercise with
    // the same verb in this context.
    let mut available: Vec<(VnestContent, bool)> = Vec::new();
    for content in store::list_vnest_by_context(pool, contexto).await? {
        if content.verbo != verbo {
            continue;
        }
        if assigned.iter().any(|a| a.id_ejercicio == content.id) {
            continue;
        }

        let (tipo, personalizado) = match store::get_exercise(pool, &content.id).await? {
            Some(record) => (record.tipo, record.personalizado),
            None => ("publico".to_string(), false),
        };

        if tipo != "privado" {
            available.push((content, personalizado));
        }
    }

    if !available.is_empty() {
        let (content, personalizado) = {
            let mut rng = rand::thread_rng();
            available
                .choose(&mut rng)
                .map(|(c, p)| (c.clone(), *p))
                .ok_or_else(|| AppError::Unknown("empty selection pool".to_string()))?
        };

        if let Err(e) = assign_exercise_to_patient(pool, email, &content.id).await {
            warn!("failed to assign selected exercise {}: {e}", content.id);
        }
        return load_with_highlight(pool, &content.id, personalizado).await;
    }

    // Last resort: the completed exercise done longest ago.
    let mut done: Vec<Candidate> = completed
        .into_iter()
        .filter(|c| c.assignment.ultima_fecha_realizado.is_some())
        .collect();

    if !done.is_empty() {
        done.sort_by_key(|c| c.assignment.ultima_fecha_realizado);
        let oldest = &done[0];
        return load_with_highlight(pool, &oldest.assignment.id_ejercicio, oldest.personalizado)
            .await;
    }

    Err(AppError::NotFound(format!(
        "exercise for verb '{verbo}' in context '{contexto}'"
    )))
}

async fn load_with_highlight(pool: &SqlitePool, id: &str, highlight: bool) -> AppResult<Value> {
    let content = store::get_vnest(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("exercise '{id}'")))?;

    let mut value = serde_json::to_value(content)?;
    value["highlight"] = json!(highlight);
    Ok(value)
}
