// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for env-injector.
//!
//! This module provides specialized error types for:
//! - List merging and patch construction ([`MergeError`])
//! - Loading and validating the mutation configuration ([`ConfigError`])
//! - Decoding admission reviews and encoding patches ([`WebhookError`])
//!
//! The merge engine is total over well-formed input, so every [`MergeError`]
//! describes either a precondition the caller should have checked or a
//! serialization failure that cannot happen for the `k8s-openapi` types.

use crate::merge::FieldCategory;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reconciling a desired list against a target list.
#[derive(Error, Debug)]
pub enum MergeError {
    /// Positional affinity comparison would read past the end of a nested list
    ///
    /// Only raised in `positional` node-affinity matching mode: the desired
    /// entry at `position` is compared against the `position`-th nested
    /// requirement of every target term, so both nested lists must be at
    /// least `position + 1` long.
    #[error(
        "{category}: nested {nested} list too short for positional comparison at index {position} (target has {target_len}, desired has {desired_len})"
    )]
    PositionalMismatch {
        /// The field category being merged
        category: FieldCategory,
        /// Which nested list was being compared (`matchExpressions` or `matchFields`)
        nested: &'static str,
        /// Index of the desired entry within its batch
        position: usize,
        /// Length of the target term's nested list
        target_len: usize,
        /// Length of the desired term's nested list
        desired_len: usize,
    },

    /// An entry could not be converted into a JSON patch value
    #[error("failed to serialize patch value: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised while loading the mutation configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("failed to read configuration file {path}: {source}")]
    Read {
        /// Path that was read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid YAML for the expected schema
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// An entry is missing its identity attribute or is otherwise unusable
    #[error("invalid {category} entry at index {index}: {reason}")]
    InvalidEntry {
        /// The field category containing the entry
        category: FieldCategory,
        /// Index of the entry in the configured list
        index: usize,
        /// What is wrong with it
        reason: String,
    },
}

/// Errors raised while handling a single admission request.
#[derive(Error, Debug)]
pub enum WebhookError {
    /// The admission review did not carry a request
    #[error("invalid admission review: {0}")]
    InvalidReview(String),

    /// The admitted object could not be decoded as a Pod
    #[error("could not decode admitted object as a Pod: {0}")]
    Object(#[source] serde_json::Error),

    /// The generated patch could not be attached to the response
    #[error("failed to encode JSON patch: {0}")]
    Patch(String),
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
