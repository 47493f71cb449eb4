//! Document-store operations. Collections from the original clinical store
//! map one-to-one onto SQLite tables; JSON-valued fields are stored as text.

use crate::core::models::{Assignment, ExerciseRecord, SrCardContent, Therapy, VnestContent};
use crate::error::{AppError, AppResult};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::str::FromStr;

/// Exercise ids look like `E3F9A01`: an `E` prefix plus six uppercase hex
/// characters of a fresh UUID.
pub fn new_exercise_id() -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("E{}", hex[..6].to_uppercase())
}

pub fn now_ts() -> i64 {
    chrono::Utc::now().timestamp()
}

// ------------------------------------------------------------------
// General exercise records
// ------------------------------------------------------------------

pub async fn insert_exercise(pool: &SqlitePool, record: &ExerciseRecord) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO ejercicios (
            id, terapia, revisado, tipo, creado_por, personalizado,
            referencia_base, id_paciente, descripcion_adaptado, contexto, fecha_creacion
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&record.id)
    .bind(&record.terapia)
    .bind(record.revisado)
    .bind(&record.tipo)
    .bind(&record.creado_por)
    .bind(record.personalizado)
    .bind(&record.referencia_base)
    .bind(&record.id_paciente)
    .bind(&record.descripcion_adaptado)
    .bind(&record.contexto)
    .bind(record.fecha_creacion)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_exercise(pool: &SqlitePool, id: &str) -> AppResult<Option<ExerciseRecord>> {
    let row = sqlx::query("SELECT * FROM ejercicios WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.map(|r| exercise_from_row(&r)).transpose()
}

fn exercise_from_row(row: &SqliteRow) -> AppResult<ExerciseRecord> {
    Ok(ExerciseRecord {
        id: row.get("id"),
        terapia: row.get("terapia"),
        revisado: row.get("revisado"),
        tipo: row.get("tipo"),
        creado_por: row.get("creado_por"),
        personalizado: row.get("personalizado"),
        referencia_base: row.get("referencia_base"),
        id_paciente: row.get("id_paciente"),
        descripcion_adaptado: row.get("descripcion_adaptado"),
        contexto: row.get("contexto"),
        fecha_creacion: row.get("fecha_creacion"),
    })
}

// ------------------------------------------------------------------
// VNeST content
// ------------------------------------------------------------------

pub async fn insert_vnest(pool: &SqlitePool, content: &VnestContent) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO ejercicios_vnest (id, nivel, contexto, verbo, pares, oraciones)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&content.id)
    .bind(&content.nivel)
    .bind(&content.contexto)
    .bind(&content.verbo)
    .bind(serde_json::to_string(&content.pares)?)
    .bind(serde_json::to_string(&content.oraciones)?)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_vnest(pool: &SqlitePool, id: &str) -> AppResult<Option<VnestContent>> {
    let row = sqlx::query("SELECT * FROM ejercicios_vnest WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.map(|r| vnest_from_row(&r)).transpose()
}

pub async fn list_vnest_by_context(
    pool: &SqlitePool,
    contexto: &str,
) -> AppResult<Vec<VnestContent>> {
    let rows = sqlx::query("SELECT * FROM ejercicios_vnest WHERE contexto = ?")
        .bind(contexto)
        .fetch_all(pool)
        .await?;

    rows.iter().map(vnest_from_row).collect()
}

fn vnest_from_row(row: &SqliteRow) -> AppResult<VnestContent> {
    let pares: String = row.get("pares");
    let oraciones: String = row.get("oraciones");

    Ok(VnestContent {
        id: row.get("id"),
        nivel: row.get("nivel"),
        contexto: row.get("contexto"),
        verbo: row.get("verbo"),
        pares: serde_json::from_str(&pares)?,
        oraciones: serde_json::from_str(&oraciones)?,
    })
}

// ------------------------------------------------------------------
// Spaced-retrieval cards
// ------------------------------------------------------------------

pub async fn insert_sr_card(pool: &SqlitePool, card: &SrCardContent) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO ejercicios_sr (
            id, pregunta, rta_correcta, interval_index, intervals_sec,
            success_streak, lapses, next_due, status
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&card.id)
    .bind(&card.pregunta)
    .bind(&card.rta_correcta)
    .bind(card.interval_index)
    .bind(serde_json::to_string(&card.intervals_sec)?)
    .bind(card.success_streak)
    .bind(card.lapses)
    .bind(card.next_due)
    .bind(&card.status)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_sr_card(pool: &SqlitePool, id: &str) -> AppResult<Option<SrCardContent>> {
    let row = sqlx::query("SELECT * FROM ejercicios_sr WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    let Some(row) = row else { return Ok(None) };
    let intervals: String = row.get("intervals_sec");

    Ok(Some(SrCardContent {
        id: row.get("id"),
        pregunta: row.get("pregunta"),
        rta_correcta: row.get("rta_correcta"),
        interval_index: row.get("interval_index"),
        intervals_sec: serde_json::from_str(&intervals)?,
        success_streak: row.get("success_streak"),
        lapses: row.get("lapses"),
        next_due: row.get("next_due"),
        status: row.get("status"),
    }))
}

// ------------------------------------------------------------------
// Merged view
// ------------------------------------------------------------------

/// Fetches the general record merged with its therapy-specific content,
/// as a single JSON document. Missing content is tolerated; a missing
/// general record is not.
pub async fn get_exercise_base(pool: &SqlitePool, id: &str) -> AppResult<serde_json::Value> {
    let record = get_exercise(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("exercise '{id}'")))?;

    let therapy = Therapy::from_str(&record.terapia)?;

    let mut merged = serde_json::to_value(&record)?;
    let extra = match therapy {
        Therapy::Vnest => get_vnest(pool, id).await?.map(serde_json::to_value),
        Therapy::Sr => get_sr_card(pool, id).await?.map(serde_json::to_value),
    };

    if let (Some(obj), Some(extra)) = (merged.as_object_mut(), extra.transpose()?) {
        if let Some(extra) = extra.as_object() {
            for (k, v) in extra {
                obj.insert(k.clone(), v.clone());
            }
        }
    }

    Ok(merged)
}

// ------------------------------------------------------------------
// Assignments
// ------------------------------------------------------------------

/// Minimal assignment used by the spaced-retrieval path: private, pending,
/// no context lookup.
pub async fn assign_simple(pool: &SqlitePool, patient_id: &str, exercise_id: &str) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO asignaciones (id_paciente, id_ejercicio, tipo, estado, fecha_asignacion)
         VALUES (?, ?, 'privado', 'pendiente', ?)
         ON CONFLICT(id_paciente, id_ejercicio) DO UPDATE SET
            estado = excluded.estado,
            fecha_asignacion = excluded.fecha_asignacion",
    )
    .bind(patient_id)
    .bind(exercise_id)
    .bind(now_ts())
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn max_priority(pool: &SqlitePool, patient_id: &str) -> AppResult<i64> {
    let row = sqlx::query("SELECT MAX(prioridad) AS max_prio FROM asignaciones WHERE id_paciente = ?")
        .bind(patient_id)
        .fetch_one(pool)
        .await?;

    Ok(row.get::<Option<i64>, _>("max_prio").unwrap_or(0))
}

/// Writes the full assignment row. Re-assigning an exercise replaces the
/// whole row, completion history included.
pub async fn upsert_assignment(
    pool: &SqlitePool,
    patient_id: &str,
    assignment: &Assignment,
) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO asignaciones (
            id_paciente, id_ejercicio, contexto, tipo, estado, prioridad,
            ultima_fecha_realizado, veces_realizado, fecha_asignacion, personalizado
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id_paciente, id_ejercicio) DO UPDATE SET
            contexto = excluded.contexto,
            tipo = excluded.tipo,
            estado = excluded.estado,
            prioridad = excluded.prioridad,
            ultima_fecha_realizado = excluded.ultima_fecha_realizado,
            veces_realizado = excluded.veces_realizado,
            fecha_asignacion = excluded.fecha_asignacion,
            personalizado = excluded.personalizado",
    )
    .bind(patient_id)
    .bind(&assignment.id_ejercicio)
    .bind(&assignment.contexto)
    .bind(&assignment.tipo)
    .bind(&assignment.estado)
    .bind(assignment.prioridad)
    .bind(assignment.ultima_fecha_realizado)
    .bind(assignment.veces_realizado)
    .bind(assignment.fecha_asignacion)
    .bind(assignment.personalizado)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn list_assignments_by_context(
    pool: &SqlitePool,
    patient_id: &str,
    contexto: &str,
) -> AppResult<Vec<Assignment>> {
    let rows = sqlx::query("SELECT * FROM asignaciones WHERE id_paciente = ? AND contexto = ?")
        .bind(patient_id)
        .bind(contexto)
        .fetch_all(pool)
        .await?;

    Ok(rows
        .iter()
        .map(|row| Assignment {
            id_ejercicio: row.get("id_ejercicio"),
            contexto: row.get("contexto"),
            tipo: row.get("tipo"),
            estado: row.get("estado"),
            // Assignments written by the simple path carry no priority;
            // they sort last during selection.
            prioridad: row.get::<Option<i64>, _>("prioridad").unwrap_or(999),
            ultima_fecha_realizado: row.get("ultima_fecha_realizado"),
            veces_realizado: row.get("veces_realizado"),
            fecha_asignacion: row.get("fecha_asignacion"),
            personalizado: row.get("personalizado"),
        })
        .collect())
}
