// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#![allow(unexpected_cfgs)]

//! # env-injector - Pod defaults admission webhook
//!
//! env-injector is a Kubernetes mutating admission webhook that injects
//! operator-declared defaults into Pods as they are created: environment
//! variables, DNS resolver options, tolerations, topology spread constraints
//! and node-affinity terms. Pod anti-affinity can optionally be stripped.
//!
//! ## Overview
//!
//! Each configurable Pod list is reconciled against the configured entries
//! by one generic list merge, producing an RFC 6902 JSON Patch that only adds
//! or replaces what is missing or different. Re-admitting an already patched
//! Pod yields no list operations.
//!
//! ## Modules
//!
//! - [`equality`] - Structural comparison of entry attributes
//! - [`patch`] - JSON Patch operations
//! - [`merge`] - Merge rule trait and the list merge algorithm
//! - [`rules`] - Merge rules for the six Pod list fields
//! - [`assembly`] - Ordered patch assembly for a whole Pod
//! - [`gate`] - Namespace and annotation checks deciding whether to mutate
//! - [`config`] - Mutation configuration loading and validation
//! - [`webhook`] - axum handlers for `AdmissionReview` requests
//! - [`server`] - TLS serving, certificate reload and graceful shutdown
//! - [`metrics`] - Prometheus metrics
//!
//! ## Example
//!
//! ```rust
//! use env_injector::assembly::assemble_patch;
//! use env_injector::config::MutationConfig;
//! use k8s_openapi::api::core::v1::{Container, Pod, PodSpec};
//! use std::collections::BTreeMap;
//!
//! let config = MutationConfig::from_yaml(
//!     "env:\n  - name: CLUSTER_NAME\n    value: aks-test-01\n",
//! )
//! .unwrap();
//!
//! let pod = Pod {
//!     spec: Some(PodSpec {
//!         containers: vec![Container {
//!             name: "app".to_string(),
//!             ..Default::default()
//!         }],
//!         ..Default::default()
//!     }),
//!     ..Default::default()
//! };
//!
//! let ops = assemble_patch(&pod, &config, &BTreeMap::new()).unwrap();
//! assert_eq!(ops[0].path(), "/spec/containers/0/env");
//! ```

pub mod assembly;
pub mod cli;
pub mod config;
pub mod constants;
pub mod equality;
pub mod errors;
pub mod gate;
pub mod merge;
pub mod metrics;
pub mod patch;
pub mod rules;
pub mod server;
pub mod webhook;
