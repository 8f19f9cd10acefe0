// SPDX-FileCopyrightText: 2026 Masdif Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests wiring the production adapters together.
//!
//! Rasa and the TTS service are stood in for by wiremock servers; storage is
//! a real SQLite file in a temp directory. Requests go through the full axum
//! router.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use masdif_config::model::{MasdifConfig, StorageConfig};
use masdif_core::{StorageAdapter, TtsResult};
use masdif_dialog::RasaDialogEngine;
use masdif_gateway::{AuthConfig, GatewayState, router};
use masdif_pipeline::{CLEANUP_QUEUE, CleanupWorker, HealthChecker, JobsMonitor, QueueScheduler, TurnOrchestrator};
use masdif_storage::SqliteStorage;
use masdif_tts::TiroSynthesizer;

struct Stack {
    app: Router,
    storage: Arc<SqliteStorage>,
    worker: CleanupWorker,
    rasa: MockServer,
    _tts: MockServer,
    _dir: TempDir,
}

async fn stack(attachment_timeout_secs: u64) -> Stack {
    let rasa = MockServer::start().await;
    let tts = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    let mut config = MasdifConfig::default();
    config.storage = StorageConfig {
        database_path: dir.path().join("masdif.db").display().to_string(),
        wal_mode: true,
    };
    config.dialog.url = rasa.uri();
    config.tts.enabled = true;
    config.tts.url = tts.uri();
    config.tts.retry_backoff_ms = 10;
    config.tts.attachment_timeout_secs = attachment_timeout_secs;
    config.server.public_url = "https://bot.example.is/".into();
    let config = Arc::new(config);

    Mock::given(method("GET"))
        .and(path("/v0/voices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"VoiceId": "Dora", "LanguageCode": "is-IS"},
            {"VoiceId": "Joanna", "LanguageCode": "en-US"}
        ])))
        .mount(&tts)
        .await;
    Mock::given(method("POST"))
        .and(path("/v0/speech"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xffu8, 0xfb, 0x90]))
        .mount(&tts)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Hello from Rasa: 3.6.0"))
        .mount(&rasa)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/conversations/[^/]+/tracker/events$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "events": [{"event": "restart", "timestamp": 100.0}],
            "latest_event_time": 100.0
        })))
        .mount(&rasa)
        .await;

    let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
    storage.initialize().await.unwrap();
    let dialog = Arc::new(RasaDialogEngine::new(&config.dialog).unwrap());
    let synth = Arc::new(TiroSynthesizer::new(&config.tts).unwrap());

    let orchestrator = TurnOrchestrator::new(
        config.clone(),
        storage.clone(),
        dialog.clone(),
        Arc::new(QueueScheduler::new(storage.clone())),
    )
    .with_tts(synth.clone());
    let health = HealthChecker::new(storage.clone(), dialog).with_tts(synth);
    let worker = CleanupWorker::new(
        storage.clone(),
        Duration::from_millis(50),
        Duration::from_secs(attachment_timeout_secs),
        Arc::new(JobsMonitor::new()),
    );

    let app = router(GatewayState {
        orchestrator: Arc::new(orchestrator),
        health: Arc::new(health),
        auth: AuthConfig { admin_token: None },
        prometheus_render: None,
    });

    Stack {
        app,
        storage,
        worker,
        rasa,
        _tts: tts,
        _dir: dir,
    }
}

/// Tracker before the turn, then after it with this turn's events appended.
async fn mount_turn_tracker(rasa: &MockServer) {
    Mock::given(method("GET"))
        .and(path_regex(r"^/conversations/[^/]+/tracker$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "latest_event_time": 100.0,
            "events": [{"event": "restart", "timestamp": 100.0}]
        })))
        .up_to_n_times(1)
        .mount(rasa)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/conversations/[^/]+/tracker$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "latest_event_time": 102.0,
            "latest_message": {
                "intent": {"name": "greet", "confidence": 0.98},
                "text": "hæ",
                "message_id": "rasa-1",
                "metadata": {"language": "is-IS"}
            },
            "events": [
                {"event": "restart", "timestamp": 100.0},
                {"event": "user", "text": "hæ", "timestamp": 101.0,
                 "parse_data": {"intent": {"name": "greet"}}, "metadata": {}},
                {"event": "bot", "text": "Halló!", "timestamp": 102.0, "metadata": {}}
            ]
        })))
        .mount(rasa)
        .await;
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn create(app: &Router) -> String {
    let (status, body) = call(app, Method::POST, "/conversations", None).await;
    assert_eq!(status, StatusCode::OK);
    body["conversation_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn spoken_turn_round_trip() {
    let s = stack(60).await;
    let id = create(&s.app).await;
    mount_turn_tracker(&s.rasa).await;
    Mock::given(method("POST"))
        .and(path("/webhooks/rest/webhook"))
        .and(body_partial_json(json!({"sender": id, "message": "hæ"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"recipient_id": id, "text": "Halló!"}])),
        )
        .mount(&s.rasa)
        .await;

    let (status, reply) = call(
        &s.app,
        Method::PATCH,
        &format!("/conversations/{id}"),
        Some(json!({"text": "hæ", "metadata": {"language": "is-IS", "voice_id": "Dora"}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let first = &reply[0];
    assert_eq!(first["text"], json!("Halló!"));
    assert_eq!(first["recipient_id"], json!(id));
    assert_eq!(first["metadata"]["tts"], json!(true));
    assert_eq!(first["metadata"]["language"], json!("is-IS"));
    assert_eq!(first["data"]["attachment"][0]["type"], json!("audio"));
    let src = first["data"]["attachment"][0]["payload"]["src"]
        .as_str()
        .unwrap();
    assert!(src.starts_with("https://bot.example.is/attachments/"));
    assert!(src.ends_with(".mp3"));

    let message_id = first["message_id"].as_str().unwrap();
    let stored = s
        .storage
        .get_message(&id, message_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.text, "hæ");
    assert_eq!(stored.tts_result, TtsResult::Success);
    assert_eq!(stored.events.len(), 2);
    assert!(stored.events.iter().all(|e| e.get("timestamp").is_none()));
    assert!(stored.events.iter().all(|e| e.get("parse_data").is_none()));
    let nlu = stored.nlu.unwrap();
    assert_eq!(nlu["intent"]["name"], json!("greet"));
    assert!(nlu.get("message_id").is_none());
    assert!(stored.time_dialog.is_some());
    assert!(stored.time_tts.is_some());
    assert!(stored.time_overall.is_some());

    let path = &src["https://bot.example.is".len()..];
    let request = Request::builder().uri(path).body(Body::empty()).unwrap();
    let response = s.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "audio/mpeg"
    );
}

#[tokio::test]
async fn due_purge_job_removes_audio() {
    let s = stack(0).await;
    let id = create(&s.app).await;
    mount_turn_tracker(&s.rasa).await;
    Mock::given(method("POST"))
        .and(path("/webhooks/rest/webhook"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"recipient_id": id, "text": "Bless"}])),
        )
        .mount(&s.rasa)
        .await;

    let (_, reply) = call(
        &s.app,
        Method::PATCH,
        &format!("/conversations/{id}"),
        Some(json!({"text": "bless"})),
    )
    .await;
    let src = reply[0]["data"]["attachment"][0]["payload"]["src"]
        .as_str()
        .unwrap()
        .to_string();
    let path = src["https://bot.example.is".len()..].to_string();

    tokio::time::sleep(Duration::from_millis(20)).await;
    let processed = s.worker.run_once().await.unwrap();
    assert_eq!(processed, 1);
    assert_eq!(s.storage.queue_depth(CLEANUP_QUEUE).await.unwrap(), 0);

    let (status, body) = call(&s.app, Method::GET, &path, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("Attachment not found"));
}

#[tokio::test]
async fn rasa_outage_surfaces_as_dialog_error() {
    let s = stack(60).await;
    let id = create(&s.app).await;
    mount_turn_tracker(&s.rasa).await;
    Mock::given(method("POST"))
        .and(path("/webhooks/rest/webhook"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&s.rasa)
        .await;

    let (status, body) = call(
        &s.app,
        Method::PATCH,
        &format!("/conversations/{id}"),
        Some(json!({"text": "hæ"})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], json!("Dialog system error: Service Unavailable"));

    let (_, history) = call(&s.app, Method::GET, &format!("/conversations/{id}"), None).await;
    let messages = history["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1]["reply"], json!("Service Unavailable"));
}

#[tokio::test]
async fn health_reports_all_subsystems() {
    let s = stack(60).await;
    let (status, body) = call(&s.app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "database": "OK",
            "dialog_system": "OK",
            "tts": "OK",
            "jobs": "OK",
            "masdif": "OK"
        })
    );
}
