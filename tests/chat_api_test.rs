// Integration tests for POST /send
//
// The reply dependency is replaced with in-process providers so the tests
// exercise the success, failure and timeout paths without an external CLI.

use agent_hub::api::{create_chat_router, ChatAppState};
use agent_hub::chat::{ChatDispatcher, ReplyProvider};
use agent_hub::state::StateEngine;
use anyhow::{bail, Result};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

struct Echo;

#[async_trait]
impl ReplyProvider for Echo {
    async fn reply(&self, message: &str) -> Result<String> {
        Ok(format!("echo: {}", message))
    }
}

struct Unreachable;

#[async_trait]
impl ReplyProvider for Unreachable {
    async fn reply(&self, _message: &str) -> Result<String> {
        bail!("connection refused")
    }
}

struct Stalled;

#[async_trait]
impl ReplyProvider for Stalled {
    async fn reply(&self, _message: &str) -> Result<String> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(String::new())
    }
}

fn create_test_app(provider: Arc<dyn ReplyProvider>) -> (Router, Arc<StateEngine>) {
    let engine = Arc::new(StateEngine::default());
    let dispatcher = Arc::new(ChatDispatcher::new(
        Arc::clone(&engine),
        provider,
        "itombot",
        Duration::from_millis(100),
    ));
    let app = create_chat_router(Arc::new(ChatAppState { dispatcher }));
    (app, engine)
}

async fn post_send(app: Router, body: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/send")
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_send_returns_reply() {
    let (app, engine) = create_test_app(Arc::new(Echo));

    let (status, body) = post_send(app, r#"{"message":"status report"}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"response": "echo: status report", "ok": true}));

    let snapshot = engine.snapshot().await;
    assert_eq!(snapshot.activity_log.len(), 1);
    assert_eq!(snapshot.activity_log[0].agent, "itombot");
    assert_eq!(snapshot.activity_log[0].text, "Chat: \"status report\"");
    assert_eq!(snapshot.agents["itombot"].thought, None);
}

#[tokio::test]
async fn test_send_dependency_failure_returns_fallback() {
    let (app, engine) = create_test_app(Arc::new(Unreachable));

    let (status, body) = post_send(app, r#"{"message":"hi"}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"response": "[Tower Test Mode] Received: \"hi\"", "ok": true, "test": true})
    );
    assert!(engine.snapshot().await.activity_log.is_empty());
}

#[tokio::test]
async fn test_send_dependency_timeout_returns_fallback() {
    let (app, engine) = create_test_app(Arc::new(Stalled));

    let (status, body) = post_send(app, r#"{"message":"hi"}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["test"], true);
    assert_eq!(engine.snapshot().await.agents["itombot"].thought, None);
}

#[tokio::test]
async fn test_send_missing_message_returns_400() {
    let (app, engine) = create_test_app(Arc::new(Echo));
    let mut observer = engine.join().await.unwrap();

    let (status, body) = post_send(app, r#"{}"#).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing message");

    // Only the init frame
    assert!(observer.try_recv().is_some());
    assert!(observer.try_recv().is_none());
}
