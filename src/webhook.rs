// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Mutating admission webhook for Pods.
//!
//! `POST /mutate` accepts an `AdmissionReview`, runs the admission gate and,
//! when the Pod should be mutated, answers with the JSON Patch computed by
//! [`assemble_patch`]. `GET /healthz` answers `ok`.

use crate::assembly::assemble_patch;
use crate::config::MutationConfig;
use crate::constants::{ANNOTATION_STATUS, STATUS_INJECTED, WEBHOOK_HEALTH_PATH, WEBHOOK_MUTATE_PATH};
use crate::errors::WebhookError;
use crate::gate;
use crate::metrics::{record_admission, record_error, AdmissionOutcome};
use crate::patch::to_json_patch;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use k8s_openapi::api::core::v1::Pod;
use kube::core::{
    admission::{AdmissionRequest, AdmissionResponse, AdmissionReview},
    DynamicObject,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Shared state for webhook handlers
#[derive(Debug, Clone)]
pub struct WebhookState {
    /// Entries injected into admitted Pods
    pub config: Arc<MutationConfig>,
    /// Namespaces whose Pods are never mutated
    pub ignored_namespaces: Vec<String>,
    /// Annotations written on every mutated Pod
    pub annotations: BTreeMap<String, String>,
}

impl WebhookState {
    /// State that marks mutated Pods with the `injected` status annotation
    #[must_use]
    pub fn new(config: Arc<MutationConfig>, ignored_namespaces: Vec<String>) -> Self {
        Self {
            config,
            ignored_namespaces,
            annotations: BTreeMap::from([(
                ANNOTATION_STATUS.to_string(),
                STATUS_INJECTED.to_string(),
            )]),
        }
    }
}

/// Create the webhook router
///
/// - `POST /mutate` - Pod mutation
/// - `GET /healthz` - liveness
pub fn webhook_router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route(WEBHOOK_MUTATE_PATH, post(mutate_handler))
        .route(WEBHOOK_HEALTH_PATH, get(health_handler))
        .with_state(state)
}

async fn health_handler() -> &'static str {
    "ok"
}

/// Handle a mutating admission review
pub async fn mutate_handler(
    State(state): State<Arc<WebhookState>>,
    Json(review): Json<AdmissionReview<DynamicObject>>,
) -> Json<AdmissionReview<DynamicObject>> {
    let started = Instant::now();

    let request: AdmissionRequest<DynamicObject> = match review.try_into() {
        Ok(request) => request,
        Err(e) => {
            let err = WebhookError::InvalidReview(format!("{e}"));
            error!(error = %err, "Failed to parse admission request");
            record_error("invalid_review");
            record_admission(AdmissionOutcome::Invalid, started.elapsed());
            return Json(AdmissionResponse::invalid(err.to_string()).into_review());
        }
    };

    let (response, outcome) = mutate(&state, &request);
    record_admission(outcome, started.elapsed());
    Json(response.into_review())
}

/// Compute the admission response for one request.
///
/// Requests without an object are allowed unchanged. An object that is not a
/// Pod, or a Pod the merge engine cannot patch, is refused with the error
/// message.
pub fn mutate(
    state: &WebhookState,
    request: &AdmissionRequest<DynamicObject>,
) -> (AdmissionResponse, AdmissionOutcome) {
    let uid = request.uid.as_str();

    let Some(object) = request.object.as_ref() else {
        debug!(uid, "No object in request, allowing unchanged");
        return (AdmissionResponse::from(request), AdmissionOutcome::Skipped);
    };

    let pod = match decode_pod(object) {
        Ok(pod) => pod,
        Err(e) => {
            warn!(uid, error = %e, "Rejecting undecodable object");
            record_error("invalid_object");
            return (
                AdmissionResponse::from(request).deny(e.to_string()),
                AdmissionOutcome::Invalid,
            );
        }
    };

    let namespace = request
        .namespace
        .as_deref()
        .or(pod.metadata.namespace.as_deref())
        .unwrap_or_default();
    let name = pod
        .metadata
        .name
        .as_deref()
        .or(pod.metadata.generate_name.as_deref())
        .unwrap_or(request.name.as_str());

    info!(
        uid,
        kind = %request.kind.kind,
        namespace,
        name,
        operation = ?request.operation,
        user = ?request.user_info.username,
        "Admission review"
    );

    if !gate::should_mutate(
        namespace,
        pod.metadata.annotations.as_ref(),
        &state.ignored_namespaces,
    ) {
        info!(uid, namespace, name, "Skipping mutation");
        return (AdmissionResponse::from(request), AdmissionOutcome::Skipped);
    }

    let operations = match assemble_patch(&pod, &state.config, &state.annotations) {
        Ok(operations) => operations,
        Err(e) => {
            error!(uid, namespace, name, error = %e, "Failed to compute patch");
            record_error("merge");
            return (
                AdmissionResponse::from(request).deny(e.to_string()),
                AdmissionOutcome::Denied,
            );
        }
    };

    if operations.is_empty() {
        info!(uid, namespace, name, "Nothing to patch");
        return (AdmissionResponse::from(request), AdmissionOutcome::Skipped);
    }

    if let Ok(encoded) = serde_json::to_string(&operations) {
        debug!(uid, patch = %encoded, "Admission response patch");
    }

    let patched = to_json_patch(&operations)
        .map_err(|e| WebhookError::Patch(e.to_string()))
        .and_then(|patch| {
            AdmissionResponse::from(request)
                .with_patch(patch)
                .map_err(|e| WebhookError::Patch(e.to_string()))
        });

    match patched {
        Ok(response) => {
            info!(uid, namespace, name, operations = operations.len(), "Mutating Pod");
            (response, AdmissionOutcome::Mutated)
        }
        Err(e) => {
            error!(uid, error = %e, "Failed to attach patch");
            record_error("patch_encoding");
            (
                AdmissionResponse::from(request).deny(e.to_string()),
                AdmissionOutcome::Denied,
            )
        }
    }
}

/// Convert the admitted object into a typed Pod.
fn decode_pod(object: &DynamicObject) -> Result<Pod, WebhookError> {
    serde_json::to_value(object)
        .and_then(serde_json::from_value)
        .map_err(WebhookError::Object)
}

#[cfg(test)]
#[path = "webhook_tests.rs"]
mod webhook_tests;
