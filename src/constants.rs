// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the env-injector webhook.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// Annotation Constants
// ============================================================================

/// Annotation a workload sets to opt out of injection (`n`, `no`, `false`, `off`)
pub const ANNOTATION_INJECT: &str = "env-injector-webhook-inject";

/// Annotation written by the webhook once a Pod has been processed
pub const ANNOTATION_STATUS: &str = "env-injector-webhook-status";

/// Value of [`ANNOTATION_STATUS`] marking a processed Pod
pub const STATUS_INJECTED: &str = "injected";

/// Values of [`ANNOTATION_INJECT`] that disable injection (compared case-insensitively)
pub const INJECT_DISABLED_VALUES: &[&str] = &["n", "no", "false", "off"];

/// Namespaces skipped unless overridden on the command line
pub const DEFAULT_IGNORED_NAMESPACES: &[&str] = &["kube-system", "kube-public"];

// ============================================================================
// JSON Pointer Paths
// ============================================================================

/// Pod annotations map
pub const PATH_ANNOTATIONS: &str = "/metadata/annotations";

/// Pod containers list; env lists live at `/spec/containers/<i>/env`
pub const PATH_CONTAINERS: &str = "/spec/containers";

/// Pod DNS config object
pub const PATH_DNS_CONFIG: &str = "/spec/dnsConfig";

/// Pod DNS resolver options
pub const PATH_DNS_OPTIONS: &str = "/spec/dnsConfig/options";

/// Pod tolerations
pub const PATH_TOLERATIONS: &str = "/spec/tolerations";

/// Pod topology spread constraints
pub const PATH_TOPOLOGY_SPREAD_CONSTRAINTS: &str = "/spec/topologySpreadConstraints";

/// Pod affinity object
pub const PATH_AFFINITY: &str = "/spec/affinity";

/// Pod anti-affinity object
pub const PATH_POD_ANTI_AFFINITY: &str = "/spec/affinity/podAntiAffinity";

/// Node affinity object
pub const PATH_NODE_AFFINITY: &str = "/spec/affinity/nodeAffinity";

/// Required node selector
pub const PATH_REQUIRED_NODE_SELECTOR: &str =
    "/spec/affinity/nodeAffinity/requiredDuringSchedulingIgnoredDuringExecution";

/// Required node selector terms
pub const PATH_REQUIRED_NODE_SELECTOR_TERMS: &str =
    "/spec/affinity/nodeAffinity/requiredDuringSchedulingIgnoredDuringExecution/nodeSelectorTerms";

/// Preferred scheduling terms
pub const PATH_PREFERRED_SCHEDULING_TERMS: &str =
    "/spec/affinity/nodeAffinity/preferredDuringSchedulingIgnoredDuringExecution";

// ============================================================================
// Webhook Server Constants
// ============================================================================

/// Default HTTPS port for the admission endpoint
pub const DEFAULT_WEBHOOK_PORT: u16 = 443;

/// Default TLS certificate path
pub const DEFAULT_TLS_CERT_FILE: &str = "/etc/webhook/certs/cert.pem";

/// Default TLS private key path
pub const DEFAULT_TLS_KEY_FILE: &str = "/etc/webhook/certs/key.pem";

/// Default mutation configuration path
pub const DEFAULT_ENV_CONFIG_FILE: &str = "/etc/webhook/config/envconfig.yaml";

/// Path of the mutating admission endpoint
pub const WEBHOOK_MUTATE_PATH: &str = "/mutate";

/// Path of the liveness endpoint
pub const WEBHOOK_HEALTH_PATH: &str = "/healthz";

/// Bind address for the webhook and metrics servers
pub const SERVER_BIND_ADDRESS: &str = "0.0.0.0";

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

/// Seconds in-flight requests get to finish after a shutdown signal
pub const GRACEFUL_SHUTDOWN_TIMEOUT_SECS: u64 = 10;

// ============================================================================
// Metrics Server Constants
// ============================================================================

/// Port for Prometheus metrics HTTP server
pub const METRICS_SERVER_PORT: u16 = 8080;

/// Path for Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";
