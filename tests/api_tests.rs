//! End-to-end tests against the real router, with the upstream model
//! replaced by httpmock and the store on a temporary data directory.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use httpmock::prelude::*;
use rehabilitia_server::api::build_routes;
use rehabilitia_server::core::models::{ExerciseRecord, VnestContent};
use rehabilitia_server::core::store;
use rehabilitia_server::llm::LlmSettings;
use rehabilitia_server::state::AppState;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const CHAT_PATH: &str = "/openai/deployments/gpt-4.1/chat/completions";

async fn test_app(mock_base: &str) -> (Router, Arc<AppState>, TempDir) {
    let dir = TempDir::new().expect("temp dir");
    let settings = LlmSettings {
        endpoint: mock_base.to_string(),
        deployment: "gpt-4.1".to_string(),
        api_key: "test-key".to_string(),
        api_version: "2024-12-01-preview".to_string(),
    };
    let state = Arc::new(
        AppState::with_data_dir(dir.path().to_path_buf(), settings)
            .await
            .expect("state"),
    );
    (build_routes(state.clone()), state, dir)
}

fn completion(content: &Value) -> Value {
    json!({
        "choices": [{"message": {"content": content.to_string()}}],
        "usage": {"prompt_tokens": 42, "completion_tokens": 17},
    })
}

async fn send_json(app: &Router, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request");

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let value = serde_json::from_slice(&bytes).expect("json body");
    (status, value)
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let value = serde_json::from_slice(&bytes).expect("json body");
    (status, value)
}

async fn seed_vnest_exercise(state: &AppState, id: &str, verbo: &str, tipo: &str) {
    store::insert_exercise(
        &state.db_pool,
        &ExerciseRecord {
            id: id.to_string(),
            terapia: "VNEST".to_string(),
            revisado: false,
            tipo: tipo.to_string(),
            creado_por: "terapeuta".to_string(),
            personalizado: false,
            referencia_base: None,
            id_paciente: None,
            descripcion_adaptado: String::new(),
            contexto: Some("Un hospital".to_string()),
            fecha_creacion: store::now_ts(),
        },
    )
    .await
    .expect("seed general");

    store::insert_vnest(
        &state.db_pool,
        &VnestContent {
            id: id.to_string(),
            nivel: Some("facil".to_string()),
            contexto: Some("Un hospital".to_string()),
            verbo: verbo.to_string(),
            pares: json!([{"sujeto": "la médica", "objeto": "al paciente"}]),
            oraciones: json!([]),
        },
    )
    .await
    .expect("seed content");
}

#[tokio::test]
async fn health_endpoints_respond() {
    let server = MockServer::start_async().await;
    let (app, _state, _dir) = test_app(&server.base_url()).await;

    for uri in ["/", "/healthz"] {
        let (status, body) = get_json(&app, uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["status"], "ok");
    }
}

#[tokio::test]
async fn profile_structure_returns_model_output() {
    let server = MockServer::start_async().await;

    let structured = json!({
        "personal": {"nombre": "Juan Pérez", "edad": 65, "ciudad": "Bogotá"},
        "familia": {"pareja": "María"},
        "rutinas": {"actividad": "caminar por el parque"},
        "objetos": ["reloj antiguo", "gafas"],
    });
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path(CHAT_PATH);
            then.status(200).json_body(completion(&structured));
        })
        .await;

    let (app, _state, _dir) = test_app(&server.base_url()).await;
    let (status, body) = send_json(
        &app,
        "POST",
        "/profile/structure/",
        json!({"user_id": "user_12345", "raw_text": "Mi nombre es Juan Pérez."}),
    )
    .await;

    mock.assert_async().await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["ok"], true);
    assert_eq!(body["data"]["user_id"], "user_12345");
    assert_eq!(body["data"]["structured_profile"], structured);
}

#[tokio::test]
async fn spaced_retrieval_persists_and_logs() {
    let server = MockServer::start_async().await;

    let cards = json!({"cards": [
        {"stimulus": "¿Dónde nació María?", "answer": "En Bogotá"},
        {"stimulus": "¿Cómo se llama su pareja?", "answer": "Carlos"},
    ]});
    server
        .mock_async(|when, then| {
            when.method(POST).path(CHAT_PATH);
            then.status(200).json_body(completion(&cards));
        })
        .await;

    let (app, state, _dir) = test_app(&server.base_url()).await;
    let (status, body) = send_json(
        &app,
        "POST",
        "/spaced-retrieval/",
        json!({"user_id": "paciente123", "patient_profile": {"personal": {"nombre": "María"}}}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user_id"], "paciente123");
    assert_eq!(body["data"]["cards"].as_array().map(Vec::len), Some(2));

    // Both cards were assigned to the patient.
    let assignments = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM asignaciones WHERE id_paciente = 'paciente123'",
    )
    .fetch_one(&state.db_pool)
    .await
    .expect("count");
    assert_eq!(assignments, 2);

    // The upstream call landed in the model-call log.
    let (status, body) = get_json(&app, "/api/logs?limit=10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["logs"][0]["operation"], "sr.generate_cards");
    assert_eq!(body["data"]["logs"][0]["tokens_in"], 42);
}

/// Mocks pipeline steps 1 through 4, each matched by a distinctive phrase
/// of its prompt. The finalize step stays with the caller.
async fn mock_vnest_steps(server: &MockServer, verbo_seleccionado: &str) {
    server
        .mock_async(|when, then| {
            when.method(POST).path(CHAT_PATH).body_contains("verbos de acción");
            then.status(200)
                .json_body(completion(&json!({"verbos": ["curar", "operar", "vendar"]})));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path(CHAT_PATH)
                .body_contains("clasifica los siguientes verbos");
            then.status(200).json_body(completion(&json!({
                "verbos_clasificados": {"facil": ["curar"], "medio": ["vendar"], "dificil": ["operar"]}
            })));
        })
        .await;
    let seleccion = json!({
        "verbo_seleccionado": verbo_seleccionado,
        "oraciones": [
            {"sujeto": "la médica", "verbo": verbo_seleccionado, "objeto": "al paciente"},
            {"sujeto": "el enfermero", "verbo": verbo_seleccionado, "objeto": "la herida"},
            {"sujeto": "la abuela", "verbo": verbo_seleccionado, "objeto": "el resfriado"},
        ],
    });
    server
        .mock_async(|when, then| {
            when.method(POST).path(CHAT_PATH).body_contains("Selecciona UN verbo");
            then.status(200).json_body(completion(&seleccion));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(CHAT_PATH).body_contains("Expande cada");
            then.status(200).json_body(completion(&json!({
                "verbo": verbo_seleccionado,
                "expansiones": [{"sujeto": "la médica", "objeto": "al paciente",
                                 "donde": "en el hospital", "cuando": "por la mañana",
                                 "porque": "está enfermo"}],
            })));
        })
        .await;
}

#[tokio::test]
async fn spaced_retrieval_with_no_cards_is_bad_gateway() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(CHAT_PATH);
            then.status(200).json_body(completion(&json!({"cards": []})));
        })
        .await;

    let (app, state, _dir) = test_app(&server.base_url()).await;
    let (status, body) = send_json(
        &app,
        "POST",
        "/spaced-retrieval/",
        json!({"user_id": "paciente123", "patient_profile": {}}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["success"], false);

    // No card, no exercise, no assignment.
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM ejercicios")
        .fetch_one(&state.db_pool)
        .await
        .expect("count");
    assert_eq!(count, 0);
}

#[tokio::test]
async fn vnest_generation_runs_all_steps() {
    let server = MockServer::start_async().await;
    mock_vnest_steps(&server, "curar").await;

    let oraciones: Vec<Value> = (0..10)
        .map(|i| json!({"texto": format!("oración {i}"), "correcta": i % 2 == 0}))
        .collect();
    server
        .mock_async(|when, then| {
            when.method(POST).path(CHAT_PATH).body_contains("VNeST final");
            then.status(200).json_body(completion(&json!({
                "verbo": "curar",
                "pares": [{"sujeto": "la médica", "objeto": "al paciente"}],
                "oraciones": oraciones,
            })));
        })
        .await;

    let (app, _state, _dir) = test_app(&server.base_url()).await;
    let (status, body) = send_json(
        &app,
        "POST",
        "/context/generate",
        json!({"contexto": "Un hospital", "nivel": "facil"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["verbo"], "curar");
    assert_eq!(data["nivel"], "facil");
    assert_eq!(data["context_hint"], "Un hospital");
    assert_eq!(data["reviewed"], false);
    assert_eq!(data["oraciones"].as_array().map(Vec::len), Some(10));

    // The exercise is fetchable as a merged document.
    let id = data["id"].as_str().expect("id");
    let (status, body) = get_json(&app, &format!("/api/exercises/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["terapia"], "VNEST");
    assert_eq!(body["data"]["verbo"], "curar");
    assert_eq!(body["data"]["tipo"], "privado");
}

#[tokio::test]
async fn vnest_finalize_without_verb_falls_back_to_selected() {
    let server = MockServer::start_async().await;
    mock_vnest_steps(&server, "curar").await;

    // The finalize step drops the verb and comes up short on sentences.
    server
        .mock_async(|when, then| {
            when.method(POST).path(CHAT_PATH).body_contains("VNeST final");
            then.status(200).json_body(completion(&json!({
                "pares": [{"sujeto": "la médica", "objeto": "al paciente"}],
                "oraciones": [
                    {"texto": "La médica cura al paciente", "correcta": true},
                    {"texto": "El paciente cura la camilla", "correcta": false},
                ],
            })));
        })
        .await;

    let (app, _state, _dir) = test_app(&server.base_url()).await;
    let (status, body) = send_json(
        &app,
        "POST",
        "/context/generate",
        json!({"contexto": "Un hospital", "nivel": "facil"}),
    )
    .await;

    // The step-3 verb carries the exercise through.
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["verbo"], "curar");
    assert_eq!(body["data"]["oraciones"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn vnest_without_any_verb_is_bad_gateway() {
    let server = MockServer::start_async().await;
    mock_vnest_steps(&server, "").await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(CHAT_PATH).body_contains("VNeST final");
            then.status(200)
                .json_body(completion(&json!({"pares": [], "oraciones": []})));
        })
        .await;

    let (app, state, _dir) = test_app(&server.base_url()).await;
    let (status, body) = send_json(
        &app,
        "POST",
        "/context/generate",
        json!({"contexto": "Un hospital", "nivel": "facil"}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["success"], false);

    // Nothing was persisted.
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM ejercicios")
        .fetch_one(&state.db_pool)
        .await
        .expect("count");
    assert_eq!(count, 0);
}

#[tokio::test]
async fn personalization_saves_and_assigns() {
    let server = MockServer::start_async().await;

    let personalized = json!({
        "terapia": "VNEST",
        "nivel": "facil",
        "verbo": "curar",
        "pares": [{"sujeto": "su hija Laura", "objeto": "la rodilla"}],
        "oraciones": [{"texto": "Laura cura la rodilla de su padre", "correcta": true}],
        "descripcion_adaptado": "Usa a la familia del paciente",
    });
    server
        .mock_async(|when, then| {
            when.method(POST).path(CHAT_PATH);
            then.status(200).json_body(completion(&personalized));
        })
        .await;

    let (app, state, _dir) = test_app(&server.base_url()).await;
    seed_vnest_exercise(&state, "E000001", "curar", "publico").await;

    let (status, body) = send_json(
        &app,
        "POST",
        "/personalize-exercise/",
        json!({
            "user_id": "paciente123",
            "exercise_id": "E000001",
            "patient_profile": {"familia": {"hijos": ["Laura"]}},
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["ok"], true);
    assert_eq!(body["data"]["personalized"]["referencia_base"], "E000001");
    assert_eq!(body["data"]["personalized"]["creado_por"], "IA");
    assert_eq!(body["data"]["personalized"]["contexto"], "Un hospital");

    let saved_id = body["data"]["saved_id"].as_str().expect("saved id");
    let (status, body) = get_json(&app, &format!("/api/exercises/{saved_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["personalizado"], true);
    assert_eq!(body["data"]["tipo"], "privado");
    assert_eq!(body["data"]["id_paciente"], "paciente123");

    // And it was assigned with priority 1.
    let assignments = sqlx::query_scalar::<_, i64>(
        "SELECT prioridad FROM asignaciones WHERE id_paciente = 'paciente123'",
    )
    .fetch_one(&state.db_pool)
    .await
    .expect("priority");
    assert_eq!(assignments, 1);
}

#[tokio::test]
async fn personalizing_missing_exercise_is_404() {
    let server = MockServer::start_async().await;
    let (app, _state, _dir) = test_app(&server.base_url()).await;

    let (status, body) = send_json(
        &app,
        "POST",
        "/personalize-exercise/",
        json!({"user_id": "p1", "exercise_id": "E404404", "patient_profile": {}}),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap_or("").contains("E404404"));
}

#[tokio::test]
async fn exercise_selection_needs_no_model() {
    let server = MockServer::start_async().await;
    let (app, state, _dir) = test_app(&server.base_url()).await;
    seed_vnest_exercise(&state, "E000010", "curar", "publico").await;

    let (status, body) = send_json(
        &app,
        "POST",
        "/exercise/for-context/",
        json!({"email": "ana@x.co", "contexto": "Un hospital", "verbo": "curar"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], "E000010");
    assert_eq!(body["data"]["highlight"], false);

    // No exercise for an unknown verb.
    let (status, _body) = send_json(
        &app,
        "POST",
        "/exercise/for-context/",
        json!({"email": "ana@x.co", "contexto": "Un hospital", "verbo": "volar"}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn upstream_failure_maps_to_bad_gateway() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(CHAT_PATH);
            then.status(500).body("upstream exploded");
        })
        .await;

    let (app, _state, _dir) = test_app(&server.base_url()).await;
    let (status, body) = send_json(
        &app,
        "POST",
        "/profile/structure/",
        json!({"user_id": "p1", "raw_text": "texto"}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn config_roundtrip_through_api() {
    let server = MockServer::start_async().await;
    let (app, _state, _dir) = test_app(&server.base_url()).await;

    let (status, body) = get_json(&app, "/api/config").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["request_timeout"], 120);

    let (status, _body) = send_json(
        &app,
        "PUT",
        "/api/config",
        json!({"deployment": "gpt-4.1-mini", "request_timeout": 30, "sr_intervals_sec": [10, 20]}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_status, body) = get_json(&app, "/api/config").await;
    assert_eq!(body["data"]["deployment"], "gpt-4.1-mini");
    assert_eq!(body["data"]["request_timeout"], 30);
    assert_eq!(body["data"]["sr_intervals_sec"], json!([10, 20]));
}
