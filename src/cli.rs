// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Command line arguments.

use crate::constants::{
    DEFAULT_ENV_CONFIG_FILE, DEFAULT_IGNORED_NAMESPACES, DEFAULT_TLS_CERT_FILE,
    DEFAULT_TLS_KEY_FILE, DEFAULT_WEBHOOK_PORT, METRICS_SERVER_PORT, SERVER_BIND_ADDRESS,
};
use crate::server::ServerConfig;
use anyhow::{Context, Result};
use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// env-injector - mutating admission webhook injecting operator defaults into Pods
#[derive(Parser, Debug, Clone)]
#[command(name = "env-injector", version, about, long_about = None)]
pub struct Args {
    /// HTTPS port of the admission endpoint
    #[arg(long, env = "WEBHOOK_PORT", default_value_t = DEFAULT_WEBHOOK_PORT)]
    pub port: u16,

    /// PEM certificate presented to the API server
    #[arg(long, alias = "tlsCertFile", env = "TLS_CERT_FILE", default_value = DEFAULT_TLS_CERT_FILE)]
    pub tls_cert_file: PathBuf,

    /// PEM private key of the certificate
    #[arg(long, alias = "tlsKeyFile", env = "TLS_KEY_FILE", default_value = DEFAULT_TLS_KEY_FILE)]
    pub tls_key_file: PathBuf,

    /// YAML file declaring the entries to inject
    #[arg(long, alias = "envCfgFile", env = "ENV_CFG_FILE", default_value = DEFAULT_ENV_CONFIG_FILE)]
    pub env_cfg_file: PathBuf,

    /// Namespaces whose Pods are never mutated
    #[arg(
        long,
        env = "IGNORED_NAMESPACES",
        value_delimiter = ',',
        default_values = DEFAULT_IGNORED_NAMESPACES.iter().copied()
    )]
    pub ignored_namespaces: Vec<String>,

    /// Seconds between certificate reloads (0 disables reloading)
    #[arg(long, env = "TLS_RELOAD_INTERVAL_SECS", default_value_t = 0)]
    pub tls_reload_interval_secs: u64,

    /// Plain HTTP port serving Prometheus metrics (0 disables it)
    #[arg(long, env = "METRICS_PORT", default_value_t = METRICS_SERVER_PORT)]
    pub metrics_port: u16,
}

impl Args {
    /// Listener settings derived from the arguments
    ///
    /// # Errors
    ///
    /// Returns an error if the bind address constant is not an IP address.
    pub fn server_config(&self) -> Result<ServerConfig> {
        let ip: IpAddr = SERVER_BIND_ADDRESS
            .parse()
            .with_context(|| format!("invalid bind address {SERVER_BIND_ADDRESS}"))?;

        Ok(ServerConfig {
            addr: SocketAddr::new(ip, self.port),
            cert_file: self.tls_cert_file.clone(),
            key_file: self.tls_key_file.clone(),
            reload_interval: (self.tls_reload_interval_secs > 0)
                .then(|| Duration::from_secs(self.tls_reload_interval_secs)),
            metrics_addr: (self.metrics_port > 0).then(|| SocketAddr::new(ip, self.metrics_port)),
        })
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod cli_tests;
