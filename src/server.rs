// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! HTTPS serving for the admission webhook.
//!
//! The webhook router is served over TLS with `axum-server` and rustls. The
//! certificate pair can be re-read from disk periodically so rotated
//! certificates are picked up without a restart. Prometheus metrics are served
//! over plain HTTP on a separate port. SIGINT and SIGTERM drain both servers.

use crate::constants::{GRACEFUL_SHUTDOWN_TIMEOUT_SECS, METRICS_SERVER_PATH};
use crate::metrics::{gather_metrics, record_error};
use crate::webhook::{webhook_router, WebhookState};
use anyhow::{Context, Result};
use axum::{http::StatusCode, routing::get, Router};
use axum_server::{tls_rustls::RustlsConfig, Handle};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Listener settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address of the HTTPS admission endpoint
    pub addr: SocketAddr,
    /// PEM certificate chain
    pub cert_file: PathBuf,
    /// PEM private key
    pub key_file: PathBuf,
    /// How often to re-read the certificate pair; `None` disables reloading
    pub reload_interval: Option<Duration>,
    /// Address of the metrics endpoint; `None` disables it
    pub metrics_addr: Option<SocketAddr>,
}

/// Serve the webhook until a shutdown signal arrives.
///
/// # Errors
///
/// Returns an error if the certificate pair cannot be loaded or a listener
/// fails.
pub async fn run(config: ServerConfig, state: Arc<WebhookState>) -> Result<()> {
    let tls_config = RustlsConfig::from_pem_file(&config.cert_file, &config.key_file)
        .await
        .with_context(|| {
            format!(
                "failed to load TLS certificate {} and key {}",
                config.cert_file.display(),
                config.key_file.display()
            )
        })?;

    let webhook_handle = Handle::new();
    let metrics_handle = Handle::new();

    if let Some(interval) = config.reload_interval {
        tokio::spawn(reload_certificates(
            tls_config.clone(),
            config.cert_file.clone(),
            config.key_file.clone(),
            interval,
        ));
    }

    tokio::spawn(shutdown_on_signal(vec![
        webhook_handle.clone(),
        metrics_handle.clone(),
    ]));

    let webhook = async {
        info!(addr = %config.addr, "Starting admission webhook server");
        axum_server::bind_rustls(config.addr, tls_config)
            .handle(webhook_handle)
            .serve(webhook_router(state).into_make_service())
            .await
            .context("admission webhook server failed")
    };

    match config.metrics_addr {
        Some(metrics_addr) => {
            let metrics = async {
                info!(addr = %metrics_addr, path = METRICS_SERVER_PATH, "Starting metrics server");
                axum_server::bind(metrics_addr)
                    .handle(metrics_handle)
                    .serve(metrics_router().into_make_service())
                    .await
                    .context("metrics server failed")
            };
            tokio::try_join!(webhook, metrics)?;
        }
        None => webhook.await?,
    }

    info!("Servers stopped");
    Ok(())
}

/// Router exposing the Prometheus registry
pub fn metrics_router() -> Router {
    Router::new().route(METRICS_SERVER_PATH, get(metrics_handler))
}

async fn metrics_handler() -> (StatusCode, String) {
    match gather_metrics() {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// Re-read the certificate pair every `interval`.
///
/// A failed reload keeps the previous certificate in service.
async fn reload_certificates(
    tls_config: RustlsConfig,
    cert_file: PathBuf,
    key_file: PathBuf,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;
        match tls_config.reload_from_pem_file(&cert_file, &key_file).await {
            Ok(()) => debug!(cert = %cert_file.display(), "Reloaded TLS certificate"),
            Err(e) => {
                warn!(cert = %cert_file.display(), error = %e, "Failed to reload TLS certificate");
                record_error("tls_reload");
            }
        }
    }
}

/// Wait for SIGINT or SIGTERM, then drain every server.
async fn shutdown_on_signal(handles: Vec<Handle>) {
    wait_for_signal().await;
    info!(
        timeout_secs = GRACEFUL_SHUTDOWN_TIMEOUT_SECS,
        "Shutdown signal received, draining connections"
    );
    for handle in handles {
        handle.graceful_shutdown(Some(Duration::from_secs(GRACEFUL_SHUTDOWN_TIMEOUT_SECS)));
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            error!(error = %e, "Failed to install SIGTERM handler, only SIGINT will stop the server");
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for SIGINT");
            }
            return;
        }
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!(error = %e, "Failed to listen for SIGINT");
            }
            info!("Received SIGINT");
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM");
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for SIGINT");
    }
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod server_tests;
