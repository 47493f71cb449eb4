use crate::error::AppResult;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

pub async fn init_db(data_dir: &Path) -> AppResult<SqlitePool> {
    let db_path = data_dir.join("rehabilitia.db");
    let db_url = format!("sqlite:{}", db_path.to_string_lossy());

    let options = SqliteConnectOptions::from_str(&db_url)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

/// In-memory pool for tests. Single connection, otherwise every pooled
/// connection would see its own empty database.
pub async fn init_db_in_memory() -> AppResult<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

async fn run_migrations(pool: &SqlitePool) -> AppResult<()> {
    // General exercise records, one row per exercise whatever the therapy.
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS ejercicios (
            id TEXT PRIMARY KEY,
            terapia TEXT NOT NULL,
            revisado BOOLEAN NOT NULL DEFAULT FALSE,
            tipo TEXT NOT NULL,
            creado_por TEXT NOT NULL,
            personalizado BOOLEAN NOT NULL DEFAULT FALSE,
            referencia_base TEXT,
            id_paciente TEXT,
            descripcion_adaptado TEXT NOT NULL DEFAULT '',
            contexto TEXT,
            fecha_creacion INTEGER NOT NULL
        );",
    )
    .execute(pool)
    .await?;

    // VNeST content, keyed by the general exercise id.
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS ejercicios_vnest (
            id TEXT PRIMARY KEY,
            nivel TEXT,
            contexto TEXT,
            verbo TEXT NOT NULL,
            pares TEXT NOT NULL,
            oraciones TEXT NOT NULL
        );",
    )
    .execute(pool)
    .await?;

    // Spaced-retrieval cards with their scheduling state.
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS ejercicios_sr (
            id TEXT PRIMARY KEY,
            pregunta TEXT NOT NULL,
            rta_correcta TEXT NOT NULL,
            interval_index INTEGER NOT NULL,
            intervals_sec TEXT NOT NULL,
            success_streak INTEGER NOT NULL,
            lapses INTEGER NOT NULL,
            next_due INTEGER NOT NULL,
            status TEXT NOT NULL
        );",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS asignaciones (
            id_paciente TEXT NOT NULL,
            id_ejercicio TEXT NOT NULL,
            contexto TEXT,
            tipo TEXT NOT NULL,
            estado TEXT NOT NULL,
            prioridad INTEGER,
            ultima_fecha_realizado INTEGER,
            veces_realizado INTEGER NOT NULL DEFAULT 0,
            fecha_asignacion INTEGER NOT NULL,
            personalizado BOOLEAN NOT NULL DEFAULT FALSE,
            PRIMARY KEY (id_paciente, id_ejercicio)
        );",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS configs (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );",
    )
    .execute(pool)
    .await?;

    Ok(())
}
