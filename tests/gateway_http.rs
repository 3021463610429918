//! HTTP boundary tests: routing, JSON shapes and status mapping.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use payment_ledger::InMemoryLedgerStore;
use payment_ledger::LedgerEngine;
use payment_ledger::gateway::{self, AppState};

fn test_router() -> Router {
    let store = Arc::new(InMemoryLedgerStore::new());
    store.create_wallet("alice", 1000).unwrap();
    store.create_wallet("bob", 200).unwrap();
    gateway::router(AppState::new(Arc::new(LedgerEngine::new(store))))
}

async fn send(router: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn get(router: &Router, path: &str) -> (StatusCode, Value) {
    let req = Request::builder().uri(path).body(Body::empty()).unwrap();
    send(router, req).await
}

async fn post_json(router: &Router, path: &str, body: Value) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();
    send(router, req).await
}

#[tokio::test]
async fn transfer_then_lookup() {
    let router = test_router();

    let (status, body) = post_json(
        &router,
        "/transfer",
        json!({"sender_id": "alice", "receiver_id": "bob", "amount": 300, "reference": "ref-1"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reference"], "ref-1");
    assert_eq!(body["amount"], 300);
    assert_eq!(body["status"], "completed");
    let transaction_id = body["transaction_id"].as_str().unwrap().to_string();

    let (status, body) = get(&router, "/transaction/ref-1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["transaction_id"], transaction_id.as_str());

    let (status, body) = get(&router, "/wallet/alice").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["balance"], 700);
    assert_eq!(body["user_id"], "alice");
    assert_eq!(body["version"], 1);
}

#[tokio::test]
async fn business_errors_are_400_with_message() {
    let router = test_router();

    let cases = [
        (
            json!({"sender_id": "alice", "receiver_id": "bob", "amount": 0, "reference": "r"}),
            "amount must be greater than zero",
        ),
        (
            json!({"sender_id": "alice", "receiver_id": "alice", "amount": 5, "reference": "r"}),
            "cannot transfer to the same user",
        ),
        (
            json!({"sender_id": "bob", "receiver_id": "alice", "amount": 5000, "reference": "r"}),
            "insufficient balance",
        ),
        (
            json!({"sender_id": "alice", "receiver_id": "carol", "amount": 5, "reference": "r"}),
            "wallet not found: carol",
        ),
    ];

    for (payload, message) in cases {
        let (status, body) = post_json(&router, "/transfer", payload).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], message);
    }
}

#[tokio::test]
async fn duplicate_reference_is_400() {
    let router = test_router();
    let payload =
        json!({"sender_id": "alice", "receiver_id": "bob", "amount": 10, "reference": "dup"});

    let (status, _) = post_json(&router, "/transfer", payload.clone()).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = post_json(&router, "/transfer", payload).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "reference ID already exists: dup");
}

#[tokio::test]
async fn malformed_body_is_400() {
    let router = test_router();
    let req = Request::builder()
        .method("POST")
        .uri("/transfer")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&router, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid request body");

    let (status, body) = post_json(&router, "/topup", json!({"user_id": "alice"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid request body");
}

#[tokio::test]
async fn top_up_credits_every_call() {
    let router = test_router();
    let payload = json!({"user_id": "alice", "amount": 500});

    let (status, body) = post_json(&router, "/topup", payload.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"user_id": "alice", "amount": 500, "new_balance": 1500}));

    let (_, body) = post_json(&router, "/topup", payload).await;
    assert_eq!(body["new_balance"], 2000);
}

#[tokio::test]
async fn top_up_unknown_wallet_is_400() {
    let router = test_router();
    let (status, body) = post_json(&router, "/topup", json!({"user_id": "zed", "amount": 1})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "wallet not found: zed");
}

#[tokio::test]
async fn read_paths_report_404() {
    let router = test_router();

    let (status, body) = get(&router, "/transaction/missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "transaction not found");

    let (status, body) = get(&router, "/wallet/nobody").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "wallet not found");
}
