//! RPC client behavior against the mock engine and canned backends.

use std::time::{Duration, Instant};

use prism_sidecar::credentials::BearerToken;
use prism_sidecar::mock_engine::MockEngineState;
use prism_sidecar::rpc::{Endpoint, RpcClient, RpcError, TransportPhase, DEFAULT_STRATEGY};

mod common;
use common::MockServer;

#[tokio::test]
async fn test_shield_returns_transaction_reference() {
    let server = MockServer::unix(MockEngineState::new(common::token())).await;
    let client = server.client();

    let receipt = client
        .shield(50_000_000, "Vault1111111111111111111111111111", DEFAULT_STRATEGY, false)
        .await
        .unwrap();

    assert!(!receipt.tx_hash.is_empty());
    assert_eq!(receipt.provider, "Privacy Cash");
    assert!(receipt.note.is_some());

    server.stop().await;
}

#[tokio::test]
async fn test_empty_history_is_empty_sequence() {
    let server = MockServer::unix(MockEngineState::new(common::token())).await;

    let history = server.client().get_history().await.unwrap();
    assert!(history.is_empty());

    server.stop().await;
}

#[tokio::test]
async fn test_history_order_preserved() {
    let server = MockServer::unix(MockEngineState::new(common::token())).await;
    let client = server.client();

    let first = client.pay(1_000, "merchant-a").await.unwrap();
    let second = client.swap(2_000, "SOL", "USDC").await.unwrap();

    let history = client.get_history().await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].tx_hash, second.tx_hash);
    assert_eq!(history[1].tx_hash, first.tx_hash);
    assert_eq!(history, server.state.history());

    server.stop().await;
}

#[tokio::test]
async fn test_status_and_market() {
    let server = MockServer::unix(MockEngineState::new(common::token())).await;
    let client = server.client();

    let status = client.get_status().await.unwrap();
    assert_eq!(status.status, "ready");
    assert_eq!(status.protocol.as_deref(), Some("1"));
    assert_eq!(server.state.health_probes(), 1);

    let market = client.get_market().await.unwrap();
    assert_eq!(market.asset, "SOL");
    assert!(market.price_usd > 0.0);

    server.stop().await;
}

#[tokio::test]
async fn test_tcp_endpoint() {
    let server = MockServer::tcp(MockEngineState::new(common::token())).await;
    let client = server.client();

    let receipt = client.pay(10_000, "coffee-shop").await.unwrap();
    assert!(receipt.receipt_id.starts_with("rcpt_"));

    server.stop().await;
}

#[tokio::test]
async fn test_wrong_token_rejected() {
    let server = MockServer::unix(MockEngineState::new(common::token())).await;
    let client = RpcClient::new(server.endpoint.clone(), BearerToken::new("wrong"));

    let err = client.get_status().await.unwrap_err();
    assert!(err.is_unauthorized(), "got {err:?}");
    match err {
        RpcError::EngineRejected { message, .. } => assert_eq!(message, "Unauthorized"),
        other => panic!("expected EngineRejected, got {other:?}"),
    }

    server.stop().await;
}

#[tokio::test]
async fn test_risky_destination_needs_force() {
    let server = MockServer::unix(MockEngineState::new(common::token())).await;
    let client = server.client();

    let err = client
        .shield(1_000, "high-risk-wallet", DEFAULT_STRATEGY, false)
        .await
        .unwrap_err();
    match err {
        RpcError::EngineRejected { status, message } => {
            assert_eq!(status, 403);
            assert_eq!(message, "High risk destination address");
        }
        other => panic!("expected EngineRejected, got {other:?}"),
    }
    assert!(server.state.history().is_empty());

    let receipt = client
        .shield(1_000, "high-risk-wallet", DEFAULT_STRATEGY, true)
        .await
        .unwrap();
    assert!(!receipt.tx_hash.is_empty());

    server.stop().await;
}

#[tokio::test]
async fn test_malformed_health_is_protocol_mismatch() {
    let state = MockEngineState::with_malformed_health(common::token(), true);
    let server = MockServer::unix(state).await;

    let err = server.client().get_status().await.unwrap_err();
    match err {
        RpcError::ProtocolMismatch { resource, .. } => assert_eq!(resource, "health"),
        other => panic!("expected ProtocolMismatch, got {other:?}"),
    }
    assert_eq!(server.state.health_probes(), 1);

    server.stop().await;
}

#[tokio::test]
async fn test_wrong_shape_is_protocol_mismatch() {
    let addr = common::start_programmable_backend(|| async {
        (200, r#"{"items": []}"#.to_string())
    })
    .await;
    let client = RpcClient::new(Endpoint::loopback(addr.port()), common::token());

    let err = client.get_history().await.unwrap_err();
    assert!(matches!(err, RpcError::ProtocolMismatch { resource: "history", .. }));
}

#[tokio::test]
async fn test_oversized_body_is_protocol_mismatch() {
    let addr = common::start_programmable_backend(|| async {
        (200, format!(r#"{{"asset":"SOL","price_usd":150.0,"provider":"{}"}}"#, "x".repeat(4096)))
    })
    .await;
    let client = RpcClient::new(Endpoint::loopback(addr.port()), common::token())
        .with_max_response_bytes(1024);

    match client.get_market().await.unwrap_err() {
        RpcError::ProtocolMismatch { resource, reason } => {
            assert_eq!(resource, "market");
            assert!(reason.contains("1024"), "{reason}");
        }
        other => panic!("expected ProtocolMismatch, got {other:?}"),
    }
}

#[tokio::test]
async fn test_plain_text_error_body() {
    let addr = common::start_programmable_backend(|| async {
        (500, "keystore locked\n".to_string())
    })
    .await;
    let client = RpcClient::new(Endpoint::loopback(addr.port()), common::token());

    let err = client.pay(1, "m").await.unwrap_err();
    match err {
        RpcError::EngineRejected { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "keystore locked");
        }
        other => panic!("expected EngineRejected, got {other:?}"),
    }
}

#[tokio::test]
async fn test_no_engine_is_unreachable_on_connect() {
    let port = common::closed_port().await;
    let client = RpcClient::new(Endpoint::loopback(port), common::token());

    let err = client.shield(1, "d", DEFAULT_STRATEGY, false).await.unwrap_err();
    match &err {
        RpcError::Unreachable { phase, .. } => assert_eq!(*phase, TransportPhase::Connect),
        other => panic!("expected Unreachable, got {other:?}"),
    }
    assert!(!err.is_ambiguous());
}

#[tokio::test]
async fn test_silent_engine_times_out_ambiguously() {
    let addr = common::start_silent_backend().await;
    let client = RpcClient::new(Endpoint::loopback(addr.port()), common::token())
        .with_timeout(Duration::from_millis(300));

    let started = Instant::now();
    let err = client.swap(5, "SOL", "USDC").await.unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(2));
    match &err {
        RpcError::Unreachable { phase, .. } => assert_eq!(*phase, TransportPhase::Exchange),
        other => panic!("expected Unreachable, got {other:?}"),
    }
    assert!(err.is_ambiguous());
}

#[tokio::test]
async fn test_clients_are_independent() {
    let server = MockServer::unix(MockEngineState::new(common::token())).await;
    let client = server.client();
    let slow = RpcClient::new(
        Endpoint::loopback(common::start_silent_backend().await.port()),
        common::token(),
    )
    .with_timeout(Duration::from_millis(200));

    let (stalled, ok) = tokio::join!(slow.get_status(), client.get_status());
    assert!(stalled.is_err());
    assert!(ok.is_ok());

    server.stop().await;
}
