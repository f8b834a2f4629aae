// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `cli.rs`

use crate::cli::Args;
use crate::constants::DEFAULT_IGNORED_NAMESPACES;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[test]
fn test_defaults() {
    let args = Args::try_parse_from(["env-injector"]).unwrap();

    assert_eq!(args.port, 443);
    assert_eq!(args.tls_cert_file, PathBuf::from("/etc/webhook/certs/cert.pem"));
    assert_eq!(args.tls_key_file, PathBuf::from("/etc/webhook/certs/key.pem"));
    assert_eq!(
        args.env_cfg_file,
        PathBuf::from("/etc/webhook/config/envconfig.yaml")
    );
    assert_eq!(args.ignored_namespaces, DEFAULT_IGNORED_NAMESPACES);
    assert_eq!(args.tls_reload_interval_secs, 0);
    assert_eq!(args.metrics_port, 8080);
}

#[test]
fn test_flags_and_aliases() {
    let args = Args::try_parse_from([
        "env-injector",
        "--port",
        "8443",
        "--tlsCertFile",
        "/tmp/cert.pem",
        "--tls-key-file",
        "/tmp/key.pem",
        "--envCfgFile",
        "/tmp/config.yaml",
        "--ignored-namespaces",
        "kube-system,monitoring",
    ])
    .unwrap();

    assert_eq!(args.port, 8443);
    assert_eq!(args.tls_cert_file, PathBuf::from("/tmp/cert.pem"));
    assert_eq!(args.tls_key_file, PathBuf::from("/tmp/key.pem"));
    assert_eq!(args.env_cfg_file, PathBuf::from("/tmp/config.yaml"));
    assert_eq!(args.ignored_namespaces, vec!["kube-system", "monitoring"]);
}

#[test]
fn test_server_config() {
    let args = Args::try_parse_from([
        "env-injector",
        "--port",
        "8443",
        "--tls-reload-interval-secs",
        "30",
        "--metrics-port",
        "0",
    ])
    .unwrap();

    let config = args.server_config().unwrap();

    assert_eq!(config.addr.port(), 8443);
    assert_eq!(config.reload_interval, Some(Duration::from_secs(30)));
    assert!(config.metrics_addr.is_none());
}

#[test]
fn test_server_config_defaults() {
    let config = Args::try_parse_from(["env-injector"])
        .unwrap()
        .server_config()
        .unwrap();

    assert!(config.reload_interval.is_none());
    assert_eq!(config.metrics_addr.map(|addr| addr.port()), Some(8080));
}

#[test]
fn test_rejects_invalid_port() {
    assert!(Args::try_parse_from(["env-injector", "--port", "70000"]).is_err());
}
