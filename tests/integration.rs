use std::sync::Arc;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use rust_decimal::Decimal;
use tower::ServiceExt;

use wallet_ledger::ledger::Ledger;
use wallet_ledger::server;
use wallet_ledger::store::WalletStore;
use wallet_ledger::store::memory::MemoryStore;
use wallet_ledger::wallet::Wallet;

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();
    store.add_wallet(Wallet {
        id: 1,
        balance: dec("0"),
    });
    store.add_wallet(Wallet {
        id: 2,
        balance: dec("500"),
    });
    store
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_owned()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn full_wallet_lifecycle_over_http() {
    let app = server::router(Arc::new(Ledger::new(seeded_store())));

    // deposit with four fractional digits
    let response = app
        .clone()
        .oneshot(post_json("/wallets/1/deposit", r#"{"amount": "100.1111"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.clone().oneshot(get("/wallets/1/balance")).await.unwrap();
    assert_eq!(body_json(response).await["balance"], "100.1111");

    // withdraw part of it
    let response = app
        .clone()
        .oneshot(post_json("/wallets/1/withdraw", r#"{"amount": "0.1111"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // move half to the other wallet
    let response = app
        .clone()
        .oneshot(post_json(
            "/wallets/1/transfer",
            r#"{"target_wallet_id": 2, "amount": "50"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.clone().oneshot(get("/wallets/1/balance")).await.unwrap();
    assert_eq!(body_json(response).await["balance"], "50.0000");
    let response = app.clone().oneshot(get("/wallets/2/balance")).await.unwrap();
    assert_eq!(body_json(response).await["balance"], "550");

    // the source wallet saw all three movements, the destination only one
    let response = app
        .clone()
        .oneshot(get("/wallets/1/transactions"))
        .await
        .unwrap();
    let entries = body_json(response).await;
    let entries = entries.as_array().unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0]["method"], "deposit");
    assert_eq!(entries[1]["method"], "withdraw");
    assert_eq!(entries[2]["method"], "transfer");
    assert_eq!(entries[2]["from_wallet_id"], 1);
    assert_eq!(entries[2]["to_wallet_id"], 2);

    let response = app
        .oneshot(get("/wallets/2/transactions"))
        .await
        .unwrap();
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn failed_operations_leave_no_trace() {
    let app = server::router(Arc::new(Ledger::new(seeded_store())));

    let response = app
        .clone()
        .oneshot(post_json("/wallets/1/withdraw", r#"{"amount": "1"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(post_json("/wallets/999/deposit", r#"{"amount": "10"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.clone().oneshot(get("/wallets/1/balance")).await.unwrap();
    assert_eq!(body_json(response).await["balance"], "0");
    let response = app
        .oneshot(get("/wallets/1/transactions"))
        .await
        .unwrap();
    assert!(body_json(response).await.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_stale_writers_one_wins() {
    let store = MemoryStore::new();
    store.add_wallet(Wallet {
        id: 1,
        balance: dec("0"),
    });

    // both writers read the same state before either applies its delta
    let wallet_a = store.get(1).await.unwrap();
    let wallet_b = store.get(1).await.unwrap();

    let store_a = store.clone();
    let store_b = store.clone();
    let (a, b) = tokio::join!(
        tokio::spawn(async move { store_a.update_balance(&wallet_a, dec("1")).await }),
        tokio::spawn(async move { store_b.update_balance(&wallet_b, dec("1")).await }),
    );

    let outcomes = [a.unwrap(), b.unwrap()];
    let successes = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);

    // exactly one delta applied, never the sum of both
    assert_eq!(store.get(1).await.unwrap().balance, dec("1"));
}
