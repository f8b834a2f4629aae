// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `errors.rs`

use crate::errors::{ConfigError, MergeError, WebhookError};
use crate::merge::FieldCategory;
use std::path::PathBuf;

#[test]
fn test_positional_mismatch_message() {
    let err = MergeError::PositionalMismatch {
        category: FieldCategory::RequiredNodeAffinity,
        nested: "matchExpressions",
        position: 2,
        target_len: 1,
        desired_len: 3,
    };

    let message = err.to_string();
    assert!(message.starts_with("requiredNodeAffinityTerms"));
    assert!(message.contains("matchExpressions"));
    assert!(message.contains("index 2"));
    assert!(message.contains("target has 1"));
    assert!(message.contains("desired has 3"));
}

#[test]
fn test_config_read_error_includes_path() {
    let err = ConfigError::Read {
        path: PathBuf::from("/etc/webhook/config/envconfig.yaml"),
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
    };

    let message = err.to_string();
    assert!(message.contains("/etc/webhook/config/envconfig.yaml"));
    assert!(message.contains("no such file"));
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn test_invalid_entry_message() {
    let err = ConfigError::InvalidEntry {
        category: FieldCategory::DnsOption,
        index: 1,
        reason: "missing name".to_string(),
    };

    assert_eq!(
        err.to_string(),
        "invalid dnsOptions entry at index 1: missing name"
    );
}

#[test]
fn test_webhook_error_messages() {
    let err = WebhookError::InvalidReview("request missing".to_string());
    assert_eq!(err.to_string(), "invalid admission review: request missing");

    let err = WebhookError::Patch("boom".to_string());
    assert!(err.to_string().contains("boom"));
}
