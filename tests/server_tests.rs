//! Tests against a real server on an ephemeral port.
//!
//! The router is served exactly as `main` serves it, including peer
//! addresses from `ConnectInfo`, and driven with `reqwest`.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::net::SocketAddr;
use std::sync::Arc;

use audit_gate::clock::FixedClock;
use audit_gate::{AppState, Config, MemoryAuditSink, build_router};
use chrono::{Local, TimeZone};
use reqwest::StatusCode;
use tokio::net::TcpListener;

struct TestServer {
    base_url: String,
    sink: Arc<MemoryAuditSink>,
}

async fn start_server(hour: u32) -> TestServer {
    let sink = Arc::new(MemoryAuditSink::new());
    let clock = Arc::new(FixedClock::new(
        Local.with_ymd_and_hms(2025, 1, 15, hour, 0, 0).unwrap(),
    ));
    let state = AppState::new(Config::default(), sink.clone(), clock).unwrap();
    let app = build_router(state).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    TestServer {
        base_url: format!("http://{addr}"),
        sink,
    }
}

#[tokio::test]
async fn test_peer_address_used_without_forwarding_headers() {
    let server = start_server(10).await;

    let response = reqwest::get(format!("{}/home", server.base_url))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "Welcome, Anonymous.");

    let records = server.sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].source_address, "127.0.0.1");
    assert_eq!(records[0].actor, "Anonymous");
}

#[tokio::test]
async fn test_forwarded_headers_and_identity() {
    let server = start_server(10).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/whoami", server.base_url))
        .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
        .header("x-authenticated-user", "alice")
        .header("x-request-id", "trace-42")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "trace-42");
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["actor"], "alice");
    assert_eq!(body["source_address"], "203.0.113.7");

    let records = server.sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].actor, "alice");
    assert_eq!(records[0].source_address, "203.0.113.7");
    assert_eq!(records[0].request_id, "trace-42");
}

#[tokio::test]
async fn test_real_ip_header() {
    let server = start_server(10).await;
    let client = reqwest::Client::new();

    client
        .get(format!("{}/home", server.base_url))
        .header("x-real-ip", "198.51.100.4")
        .send()
        .await
        .unwrap();

    assert_eq!(server.sink.records()[0].source_address, "198.51.100.4");
}

#[tokio::test]
async fn test_denied_outside_window() {
    let server = start_server(22).await;

    let response = reqwest::get(format!("{}/home", server.base_url))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        response.headers()["content-type"],
        "text/plain; charset=utf-8"
    );
    assert_eq!(
        response.text().await.unwrap(),
        "Access restricted: requests are only accepted between 08:00 and 18:00."
    );
    assert_eq!(server.sink.records()[0].status, 403);
}

#[tokio::test]
async fn test_health_bypasses_window() {
    let server = start_server(22).await;

    let health = reqwest::get(format!("{}/health", server.base_url))
        .await
        .unwrap();
    assert_eq!(health.status(), StatusCode::OK);
    let body: serde_json::Value = health.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["allowed_window"], "08:00-18:00");

    let ready = reqwest::get(format!("{}/ready", server.base_url))
        .await
        .unwrap();
    assert_eq!(ready.status(), StatusCode::OK);

    let records = server.sink.records();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.status == 200));
}

#[tokio::test]
async fn test_unknown_route_outside_window_is_denied() {
    let server = start_server(22).await;

    let response = reqwest::get(format!("{}/missing", server.base_url))
        .await
        .unwrap();

    // Restriction runs before routing resolves to the fallback
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(server.sink.len(), 1);
}
