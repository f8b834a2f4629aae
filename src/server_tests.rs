// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `server.rs`

use crate::config::MutationConfig;
use crate::metrics::{record_admission, AdmissionOutcome};
use crate::server::{metrics_router, run, shutdown_on_signal, wait_for_signal, ServerConfig};
use crate::webhook::WebhookState;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::sync::Arc;
use axum_server::Handle;
use std::time::Duration;
use tokio::time::timeout;
use tower::ServiceExt;

#[tokio::test]
async fn test_metrics_endpoint_serves_registry() {
    record_admission(AdmissionOutcome::Mutated, Duration::from_millis(1));

    let request = Request::builder()
        .method("GET")
        .uri("/metrics")
        .body(Body::empty())
        .unwrap();

    let response = metrics_router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("env_injector_admission_requests_total"));
}

#[tokio::test]
async fn test_run_fails_without_certificates() {
    let dir = tempfile::tempdir().unwrap();
    let config = ServerConfig {
        addr: "127.0.0.1:0".parse().unwrap(),
        cert_file: dir.path().join("cert.pem"),
        key_file: dir.path().join("key.pem"),
        reload_interval: None,
        metrics_addr: None,
    };
    let state = Arc::new(WebhookState::new(
        Arc::new(MutationConfig::default()),
        Vec::new(),
    ));

    let err = run(config, state).await.unwrap_err();

    assert!(err.to_string().contains("failed to load TLS certificate"));
}

#[tokio::test]
async fn test_wait_for_signal_blocks_without_signal() {
    let result = timeout(Duration::from_millis(100), wait_for_signal()).await;

    assert!(result.is_err(), "no signal was sent, so waiting should time out");
}

#[tokio::test]
async fn test_servers_keep_running_until_signal() {
    let handle = Handle::new();
    let server = tokio::spawn(
        axum_server::bind("127.0.0.1:0".parse().unwrap())
            .handle(handle.clone())
            .serve(metrics_router().into_make_service()),
    );
    timeout(Duration::from_secs(5), handle.listening())
        .await
        .expect("server should start listening")
        .expect("server should report its address");

    let watcher = tokio::spawn(shutdown_on_signal(vec![handle.clone()]));
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(!server.is_finished());
    assert!(!watcher.is_finished());

    watcher.abort();
    handle.graceful_shutdown(Some(Duration::from_secs(1)));
    let result = timeout(Duration::from_secs(5), server)
        .await
        .expect("server should stop after graceful shutdown")
        .expect("server task should not panic");
    assert!(result.is_ok());
}
