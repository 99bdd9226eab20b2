mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use gleaner::api::create_router;
use gleaner::api::models::ErrorBody;

use gleaner::validator::ResponseValidator;

use common::{FakeFetcher, FakeLlm, FakeSearcher, pipeline, pipeline_within};

fn app(llm_reply: &str) -> axum::Router {
    let pipeline = pipeline(
        FakeSearcher::returning(&["https://itmo.ru/a"]),
        FakeFetcher::new(Duration::from_millis(200)).page("https://itmo.ru/a", "text"),
        FakeLlm::replying(llm_reply),
    );
    create_router(Arc::new(pipeline))
}

fn post(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/request")
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap()
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

const GOOD_REPLY: &str = r#"{"answer": 3, "reasoning": "Потому что.", "sources": ["https://itmo.ru/a"]}"#;

#[tokio::test]
async fn test_success_echoes_id() {
    let body = json!({"id": 42, "query": "Вопрос?\n1. a\n2. b\n3. c"}).to_string();
    let response = app(GOOD_REPLY).oneshot(post(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let value = read_json(response).await;
    assert_eq!(value["id"], json!(42));
    assert_eq!(value["answer"], json!(3));
    assert_eq!(
        value["reasoning"],
        json!("Потому что. Информация была получена с помощью YandexGPT.")
    );
    assert_eq!(value["sources"], json!(["https://itmo.ru/a"]));
}

#[tokio::test]
async fn test_string_id_and_null_answer() {
    let reply = r#"{"answer": 0, "reasoning": "r", "sources": []}"#;
    let body = json!({"id": "req-7", "query": "Где корпус?"}).to_string();
    let response = app(reply).oneshot(post(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let value = read_json(response).await;
    assert_eq!(value["id"], json!("req-7"));
    assert_eq!(value["answer"], Value::Null);
    assert_eq!(value["sources"], json!([]));
}

#[tokio::test]
async fn test_missing_query_is_bad_request() {
    let response = app(GOOD_REPLY)
        .oneshot(post(json!({"id": 1}).to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let value = read_json(response).await;
    let error: ErrorBody = serde_json::from_value(value).unwrap();
    assert!(error.detail.contains("query"), "{}", error.detail);
}

#[tokio::test]
async fn test_invalid_json_is_bad_request() {
    let response = app(GOOD_REPLY).oneshot(post("{not json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_blank_query_is_bad_request() {
    let response = app(GOOD_REPLY)
        .oneshot(post(json!({"id": 1, "query": "   "}).to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        read_json(response).await,
        json!({"detail": "Query cannot be empty"})
    );
}

#[tokio::test]
async fn test_malformed_model_output_is_internal_error() {
    let response = app("sorry, I cannot answer that")
        .oneshot(post(json!({"id": 2, "query": "q"}).to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        read_json(response).await,
        json!({"detail": "Internal server error"})
    );
}

#[tokio::test]
async fn test_request_timeout_is_internal_error() {
    let pipeline = pipeline_within(
        FakeSearcher::returning(&["https://itmo.ru/a"]).delayed(Duration::from_secs(5)),
        FakeFetcher::new(Duration::from_millis(200)).page("https://itmo.ru/a", "text"),
        FakeLlm::replying(GOOD_REPLY),
        ResponseValidator::default(),
        Duration::from_millis(200),
    );
    let response = create_router(Arc::new(pipeline))
        .oneshot(post(json!({"id": 3, "query": "q"}).to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        read_json(response).await,
        json!({"detail": "Internal server error"})
    );
}
