// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Admission gate: decides whether a Pod is mutated at all.

use crate::constants::{ANNOTATION_INJECT, ANNOTATION_STATUS, INJECT_DISABLED_VALUES, STATUS_INJECTED};
use std::collections::BTreeMap;
use tracing::info;

/// Why the gate declined or accepted a Pod.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Mutate the Pod
    Mutate,
    /// Namespace is in the ignore list
    IgnoredNamespace,
    /// Status annotation says the Pod was already processed
    AlreadyInjected,
    /// Inject annotation opts the Pod out
    OptedOut,
}

impl GateDecision {
    /// `true` for [`GateDecision::Mutate`]
    #[must_use]
    pub fn is_mutate(&self) -> bool {
        matches!(self, Self::Mutate)
    }

    /// Short description for logs
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Mutate => "mutation required",
            Self::IgnoredNamespace => "namespace is ignored",
            Self::AlreadyInjected => "already injected",
            Self::OptedOut => "opted out by annotation",
        }
    }
}

/// Evaluate the gate for a Pod in `namespace` carrying `annotations`.
///
/// Checks run in order: ignored namespace, status annotation equal to
/// `injected`, then an inject annotation of `n`, `no`, `false` or `off`.
/// Annotation values are compared case-insensitively.
#[must_use]
pub fn evaluate<S: AsRef<str>>(
    namespace: &str,
    annotations: Option<&BTreeMap<String, String>>,
    ignored_namespaces: &[S],
) -> GateDecision {
    if ignored_namespaces.iter().any(|ns| ns.as_ref() == namespace) {
        return GateDecision::IgnoredNamespace;
    }

    let Some(annotations) = annotations else {
        return GateDecision::Mutate;
    };

    if annotations
        .get(ANNOTATION_STATUS)
        .is_some_and(|status| status.eq_ignore_ascii_case(STATUS_INJECTED))
    {
        return GateDecision::AlreadyInjected;
    }

    if annotations.get(ANNOTATION_INJECT).is_some_and(|inject| {
        INJECT_DISABLED_VALUES
            .iter()
            .any(|disabled| inject.eq_ignore_ascii_case(disabled))
    }) {
        return GateDecision::OptedOut;
    }

    GateDecision::Mutate
}

/// `true` when the orchestrator should run for this Pod.
#[must_use]
pub fn should_mutate<S: AsRef<str>>(
    namespace: &str,
    annotations: Option<&BTreeMap<String, String>>,
    ignored_namespaces: &[S],
) -> bool {
    let decision = evaluate(namespace, annotations, ignored_namespaces);
    info!(namespace, required = decision.is_mutate(), reason = decision.reason(), "Mutation policy");
    decision.is_mutate()
}

#[cfg(test)]
#[path = "gate_tests.rs"]
mod gate_tests;
