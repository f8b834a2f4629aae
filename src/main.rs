// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::{Context, Result};
use clap::Parser;
use env_injector::{
    cli::Args, config::MutationConfig, constants::TOKIO_WORKER_THREADS, server,
    webhook::WebhookState,
};
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("env-injector")
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

/// Initialize logging
///
/// Respects RUST_LOG if set, otherwise defaults to INFO level.
/// RUST_LOG_FORMAT=json switches to JSON output.
fn init_logging() {
    let env_filter = log_filter(std::env::var("RUST_LOG").ok().as_deref());

    if json_format(std::env::var("RUST_LOG_FORMAT").ok().as_deref()) {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_file(true)
            .with_line_number(true)
            .with_thread_names(true)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_file(true)
            .with_line_number(true)
            .with_thread_names(true)
            .with_target(false)
            .with_ansi(true)
            .compact()
            .init();
    }
}

/// Filter from RUST_LOG directives, `info` when unset or invalid.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

/// Whether RUST_LOG_FORMAT selects JSON output.
fn json_format(format: Option<&str>) -> bool {
    format.is_some_and(|format| format.eq_ignore_ascii_case("json"))
}

async fn async_main() -> Result<()> {
    init_logging();

    let args = Args::parse();
    info!(version = env!("CARGO_PKG_VERSION"), "Starting env-injector webhook");
    debug!(?args, "Parsed arguments");

    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("a rustls crypto provider is already installed"))?;

    let config = MutationConfig::load(&args.env_cfg_file).with_context(|| {
        format!(
            "failed to load mutation configuration from {}",
            args.env_cfg_file.display()
        )
    })?;

    let state = Arc::new(WebhookState::new(
        Arc::new(config),
        args.ignored_namespaces.clone(),
    ));

    server::run(args.server_config()?, state).await
}
