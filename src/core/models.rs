//! Persistence models. Field names follow the original document layout of
//! the clinical store, so wire payloads keep the Spanish keys existing
//! clients already consume.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default spaced-retrieval schedule, in seconds.
pub const DEFAULT_SR_INTERVALS: [i64; 5] = [15, 30, 60, 120, 300];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Therapy {
    Vnest,
    Sr,
}

impl Therapy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Therapy::Vnest => "VNEST",
            Therapy::Sr => "SR",
        }
    }
}

impl fmt::Display for Therapy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Therapy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "VNEST" => Ok(Therapy::Vnest),
            "SR" => Ok(Therapy::Sr),
            other => Err(AppError::Invalid(format!("unsupported therapy: {other}"))),
        }
    }
}

/// Row in `ejercicios`: the general record every exercise has, independent
/// of its therapy-specific content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExerciseRecord {
    pub id: String,
    pub terapia: String,
    pub revisado: bool,
    pub tipo: String,
    pub creado_por: String,
    pub personalizado: bool,
    pub referencia_base: Option<String>,
    pub id_paciente: Option<String>,
    pub descripcion_adaptado: String,
    pub contexto: Option<String>,
    pub fecha_creacion: i64,
}

/// Row in `ejercicios_vnest`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VnestContent {
    pub id: String,
    pub nivel: Option<String>,
    pub contexto: Option<String>,
    pub verbo: String,
    pub pares: serde_json::Value,
    pub oraciones: serde_json::Value,
}

/// Row in `ejercicios_sr`: one card plus its scheduling state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SrCardContent {
    pub id: String,
    pub pregunta: String,
    pub rta_correcta: String,
    pub interval_index: i64,
    pub intervals_sec: Vec<i64>,
    pub success_streak: i64,
    pub lapses: i64,
    pub next_due: i64,
    pub status: String,
}

impl SrCardContent {
    /// A freshly generated card starts at the first interval, in learning
    /// state, due immediately.
    pub fn new(id: String, stimulus: String, answer: String, intervals_sec: Vec<i64>) -> Self {
        Self {
            id,
            pregunta: stimulus,
            rta_correcta: answer,
            interval_index: 0,
            intervals_sec,
            success_streak: 0,
            lapses: 0,
            next_due: 0,
            status: "learning".to_string(),
        }
    }
}

/// Row in `asignaciones`: an exercise assigned to a patient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id_ejercicio: String,
    pub contexto: Option<String>,
    pub tipo: String,
    pub estado: String,
    pub prioridad: i64,
    pub ultima_fecha_realizado: Option<i64>,
    pub veces_realizado: i64,
    pub fecha_asignacion: i64,
    pub personalizado: bool,
}

/// Runtime configuration persisted in the `configs` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Overrides the deployment name given on the command line.
    pub deployment: Option<String>,
    /// Upstream request timeout in seconds.
    pub request_timeout: u64,
    /// Schedule applied to newly generated spaced-retrieval cards.
    pub sr_intervals_sec: Vec<i64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            deployment: None,
            request_timeout: 120,
            sr_intervals_sec: DEFAULT_SR_INTERVALS.to_vec(),
        }
    }
}
