//! HTTP channel routes driven in-process with `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use reliefmate::comms::AssistantState;
use reliefmate::comms::axum_channel::router;
use reliefmate::llm::LlmProvider;
use reliefmate::llm::providers::dummy::DummyProvider;
use reliefmate::router::{FALLBACK_LABEL, FallbackTable, ResponseRouter, RouterOptions};
use reliefmate::session::SessionRegistry;

fn app_with(providers: Vec<LlmProvider>, options: RouterOptions) -> Router {
    let responder = ResponseRouter::new(providers, FallbackTable::builtin(), options);
    let sessions = Arc::new(SessionRegistry::new("You are a relief assistant."));
    let state = Arc::new(AssistantState::new("ReliefMate", 128, responder, sessions));
    router("http-test", state)
}

fn echo_app() -> Router {
    app_with(vec![LlmProvider::Dummy(DummyProvider::echo("Echo"))], RouterOptions::default())
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    call_raw(app, method, uri, body.map(|v| v.to_string())).await
}

async fn call_raw(app: &Router, method: Method, uri: &str, body: Option<String>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(raw) => builder
            .header("content-type", "application/json")
            .body(Body::from(raw))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn new_session(app: &Router) -> String {
    let (status, body) = call(app, Method::POST, "/api/message", Some(json!({"message": "hello"}))).await;
    assert_eq!(status, StatusCode::OK);
    body["session_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_lists_providers() {
    let app = echo_app();
    let (status, body) = call(&app, Method::GET, "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["name"], "ReliefMate");
    assert_eq!(body["providers"], json!(["Echo"]));
    assert_eq!(body["sessions"], 0);
}

#[tokio::test]
async fn message_starts_and_continues_a_session() {
    let app = echo_app();
    let (status, first) = call(&app, Method::POST, "/api/message", Some(json!({"message": "flood help"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["reply"], "[echo] flood help");
    assert_eq!(first["provider"], "Echo");
    assert_eq!(first["warnings"], json!([]));

    let id = first["session_id"].as_str().unwrap().to_string();
    let (_, second) = call(
        &app,
        Method::POST,
        "/api/message",
        Some(json!({"message": "more", "session_id": id})),
    )
    .await;
    assert_eq!(second["session_id"], id.as_str());

    let (status, detail) = call(&app, Method::GET, &format!("/api/session/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    // system + two user turns + two replies
    assert_eq!(detail["messages"].as_array().unwrap().len(), 5);
    assert_eq!(detail["messages"][1]["role"], "user");
}

#[tokio::test]
async fn fallback_reply_when_no_providers() {
    let app = app_with(Vec::new(), RouterOptions::default());
    let (status, body) = call(&app, Method::POST, "/api/message", Some(json!({"message": "Flood help"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["provider"], FALLBACK_LABEL);
    assert!(body["reply"].as_str().unwrap().starts_with("Flood safety"));
}

#[tokio::test]
async fn warnings_surface_when_enabled() {
    let app = app_with(
        vec![LlmProvider::Dummy(DummyProvider::failing("Broken", "connection refused"))],
        RouterOptions { warn_on_provider_failure: true, ..RouterOptions::default() },
    );
    let (_, body) = call(&app, Method::POST, "/api/message", Some(json!({"message": "hi"}))).await;
    assert_eq!(body["provider"], FALLBACK_LABEL);
    assert!(body["warnings"][0].as_str().unwrap().contains("connection refused"));
}

#[tokio::test]
async fn blank_message_is_bad_request() {
    let app = echo_app();
    let (status, body) = call(&app, Method::POST, "/api/message", Some(json!({"message": "  "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn missing_message_field_is_json_bad_request() {
    let app = echo_app();
    let (status, body) = call(&app, Method::POST, "/api/message", Some(json!({"text": "hi"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
    assert!(body["message"].as_str().unwrap().contains("message"));
}

#[tokio::test]
async fn broken_json_is_json_bad_request() {
    let app = echo_app();
    let (status, body) = call_raw(&app, Method::POST, "/api/message", Some(r#"{"message": "hi"#.into())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");

    let id = new_session(&app).await;
    let (status, body) = call_raw(
        &app,
        Method::POST,
        &format!("/api/session/{id}/reports"),
        Some("[1, 2".into()),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn reports_can_be_filed_without_chatting() {
    let app = app_with(Vec::new(), RouterOptions::default());
    let (status, session) = call(&app, Method::POST, "/api/session", None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(session["report_count"], 0);
    // Only the system prompt, no chat turns yet.
    assert_eq!(session["messages"].as_array().unwrap().len(), 1);
    let id = session["session_id"].as_str().unwrap().to_string();

    let uri = format!("/api/session/{id}/reports");
    let (status, report) = call(
        &app,
        Method::POST,
        &uri,
        Some(json!({"type": "Shelter", "location": "Ward 3", "details": "roof gone", "contact": "555"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(!report["id"].as_str().unwrap().is_empty());

    let (_, listed) = call(&app, Method::GET, &uri, None).await;
    assert_eq!(listed["reports"].as_array().unwrap().len(), 1);
    let (_, detail) = call(&app, Method::GET, &format!("/api/session/{id}"), None).await;
    assert_eq!(detail["report_count"], 1);
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let app = echo_app();
    let (status, body) = call(
        &app,
        Method::GET,
        "/api/session/7f1d4a1e-0000-4000-8000-000000000000",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, _) = call(&app, Method::GET, "/api/session/not-a-uuid/reports", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn report_round_trip() {
    let app = echo_app();
    let id = new_session(&app).await;
    let uri = format!("/api/session/{id}/reports");

    let (status, report) = call(
        &app,
        Method::POST,
        &uri,
        Some(json!({"type": "Medical", "location": "Ward 5", "details": "Injury", "contact": "123"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(report["type"], "Medical");
    assert_eq!(report["location"], "Ward 5");
    assert_eq!(report["details"], "Injury");
    assert_eq!(report["contact"], "123");
    assert!(!report["id"].as_str().unwrap().is_empty());
    assert!(!report["timestamp"].as_str().unwrap().is_empty());

    let (status, listed) = call(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    let reports = listed["reports"].as_array().unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0]["id"], report["id"]);
}

#[tokio::test]
async fn invalid_report_is_bad_request() {
    let app = echo_app();
    let id = new_session(&app).await;
    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/api/session/{id}/reports"),
        Some(json!({"type": "Food", "location": "", "details": "rice"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("location"));
}

#[tokio::test]
async fn report_listing_filters() {
    let app = echo_app();
    let id = new_session(&app).await;
    let uri = format!("/api/session/{id}/reports");
    for (kind, details) in [("Food", "rice"), ("Rescue", "family trapped on roof"), ("Other", "papers")] {
        let (status, _) = call(
            &app,
            Method::POST,
            &uri,
            Some(json!({"type": kind, "location": "Ward 1", "details": details})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, all) = call(&app, Method::GET, &uri, None).await;
    let all = all["reports"].as_array().unwrap().clone();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0]["priority"], "critical");
    assert_eq!(all[2]["priority"], "low");

    let (_, urgent) = call(&app, Method::GET, &format!("{uri}?min_priority=medium"), None).await;
    assert_eq!(urgent["reports"].as_array().unwrap().len(), 2);

    let (_, food) = call(&app, Method::GET, &format!("{uri}?type=food"), None).await;
    assert_eq!(food["reports"][0]["type"], "Food");

    let (status, _) = call(&app, Method::GET, &format!("{uri}?min_priority=urgent"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
