// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Patch assembly.
//!
//! [`assemble_patch`] composes the output of every merge rule into the one
//! ordered JSON Patch returned for a Pod. Steps run in a fixed order, each
//! only when the configuration has entries for it:
//!
//! 1. environment variables, once per container
//! 2. DNS options, after scaffolding `spec.dnsConfig`
//! 3. tolerations, after scaffolding an empty list
//! 4. topology spread constraints, after scaffolding an empty list
//! 5. removal of `spec.affinity.podAntiAffinity` when requested and present
//! 6. required node-affinity terms, after scaffolding `affinity`,
//!    `nodeAffinity` and the required node selector
//! 7. preferred node-affinity terms, after scaffolding `affinity`,
//!    `nodeAffinity` and an empty preferred list
//! 8. the status annotations
//!
//! JSON Patch applies operations sequentially, so every scaffold comes before
//! the operations that write beneath it.

use crate::config::MutationConfig;
use crate::constants::{
    PATH_AFFINITY, PATH_ANNOTATIONS, PATH_DNS_CONFIG, PATH_NODE_AFFINITY,
    PATH_POD_ANTI_AFFINITY, PATH_PREFERRED_SCHEDULING_TERMS, PATH_REQUIRED_NODE_SELECTOR,
    PATH_TOLERATIONS, PATH_TOPOLOGY_SPREAD_CONSTRAINTS,
};
use crate::errors::MergeError;
use crate::merge::{merge_list, FieldCategory, MergeRule};
use crate::metrics::record_patch_operations;
use crate::patch::{escape_pointer_token, PatchOperation};
use crate::rules::{
    DnsOptionRule, EnvVarRule, PreferredNodeAffinityRule, RequiredNodeAffinityRule,
    TolerationRule, TopologySpreadConstraintRule,
};
use k8s_openapi::api::core::v1::{
    Affinity, NodeAffinity, NodeSelector, Pod, PodDNSConfig, PodSpec,
};
use std::collections::BTreeMap;
use tracing::debug;

/// Metrics label for scaffold operations
const SCAFFOLD_LABEL: &str = "scaffold";

/// Metrics label for the annotation update
const ANNOTATIONS_LABEL: &str = "annotations";

/// Metrics label for the anti-affinity removal
const POD_ANTI_AFFINITY_LABEL: &str = "podAntiAffinity";

/// Compute the JSON Patch that applies `config` to `pod` and sets `annotations`.
///
/// The Pod is only read. The result may be applied to the Pod's JSON form
/// with any RFC 6902 implementation.
///
/// # Errors
///
/// Returns [`MergeError`] when a rule cannot compare two entries (positional
/// node-affinity matching) or an entry cannot be serialized.
pub fn assemble_patch(
    pod: &Pod,
    config: &MutationConfig,
    annotations: &BTreeMap<String, String>,
) -> Result<Vec<PatchOperation>, MergeError> {
    let default_spec;
    let spec = if let Some(spec) = pod.spec.as_ref() {
        spec
    } else {
        default_spec = PodSpec::default();
        &default_spec
    };

    let mut assembly = Assembly {
        config,
        operations: Vec::new(),
        has_affinity: spec.affinity.is_some(),
        has_node_affinity: spec
            .affinity
            .as_ref()
            .is_some_and(|affinity| affinity.node_affinity.is_some()),
    };

    assembly.env(spec)?;
    assembly.dns_options(spec)?;
    assembly.tolerations(spec)?;
    assembly.topology_constraints(spec)?;
    assembly.pod_anti_affinity(spec);
    assembly.required_node_affinity(spec)?;
    assembly.preferred_node_affinity(spec)?;
    assembly.annotations(pod.metadata.annotations.as_ref(), annotations)?;

    debug!(operations = assembly.operations.len(), "Assembled patch");
    Ok(assembly.operations)
}

/// Patch under construction plus which optional parents exist so far.
struct Assembly<'c> {
    config: &'c MutationConfig,
    operations: Vec<PatchOperation>,
    /// `spec.affinity` exists on the Pod or has been scaffolded
    has_affinity: bool,
    /// `spec.affinity.nodeAffinity` exists on the Pod or has been scaffolded
    has_node_affinity: bool,
}

impl Assembly<'_> {
    fn push(&mut self, label: &str, operation: PatchOperation) {
        record_patch_operations(label, operation.op(), 1);
        self.operations.push(operation);
    }

    fn scaffold<T: serde::Serialize>(&mut self, path: &str, value: &T) -> Result<(), MergeError> {
        debug!(path, "Scaffolding parent");
        self.push(SCAFFOLD_LABEL, PatchOperation::add(path, value)?);
        Ok(())
    }

    fn merge<R: MergeRule>(
        &mut self,
        rule: &R,
        target: &[R::Entry],
        desired: &[R::Entry],
    ) -> Result<(), MergeError> {
        let category: FieldCategory = rule.category();
        let operations = merge_list(rule, target, desired, self.config.satisfied_policy)?;
        for operation in operations {
            self.push(category.as_str(), operation);
        }
        Ok(())
    }

    fn env(&mut self, spec: &PodSpec) -> Result<(), MergeError> {
        let config = self.config;
        if config.env.is_empty() {
            return Ok(());
        }
        for (container, definition) in spec.containers.iter().enumerate() {
            let target = definition.env.as_deref().unwrap_or_default();
            self.merge(&EnvVarRule { container }, target, &config.env)?;
        }
        Ok(())
    }

    fn dns_options(&mut self, spec: &PodSpec) -> Result<(), MergeError> {
        let config = self.config;
        if config.dns_options.is_empty() {
            return Ok(());
        }
        if spec.dns_config.is_none() {
            self.scaffold(PATH_DNS_CONFIG, &PodDNSConfig::default())?;
        }
        let target = spec
            .dns_config
            .as_ref()
            .and_then(|dns| dns.options.as_deref())
            .unwrap_or_default();
        self.merge(&DnsOptionRule, target, &config.dns_options)
    }

    fn tolerations(&mut self, spec: &PodSpec) -> Result<(), MergeError> {
        let config = self.config;
        if config.tolerations.is_empty() {
            return Ok(());
        }
        if spec.tolerations.is_none() {
            self.scaffold(PATH_TOLERATIONS, &Vec::<()>::new())?;
        }
        let target = spec.tolerations.as_deref().unwrap_or_default();
        self.merge(&TolerationRule, target, &config.tolerations)
    }

    fn topology_constraints(&mut self, spec: &PodSpec) -> Result<(), MergeError> {
        let config = self.config;
        if config.topology_constraints.is_empty() {
            return Ok(());
        }
        if spec.topology_spread_constraints.is_none() {
            self.scaffold(PATH_TOPOLOGY_SPREAD_CONSTRAINTS, &Vec::<()>::new())?;
        }
        let target = spec.topology_spread_constraints.as_deref().unwrap_or_default();
        self.merge(
            &TopologySpreadConstraintRule,
            target,
            &config.topology_constraints,
        )
    }

    fn pod_anti_affinity(&mut self, spec: &PodSpec) {
        if !self.config.remove_pod_anti_affinity {
            return;
        }
        let present = spec
            .affinity
            .as_ref()
            .is_some_and(|affinity| affinity.pod_anti_affinity.is_some());
        if present {
            debug!("Removing pod anti-affinity");
            self.push(
                POD_ANTI_AFFINITY_LABEL,
                PatchOperation::remove(PATH_POD_ANTI_AFFINITY),
            );
        }
    }

    /// Scaffold `spec.affinity` and `spec.affinity.nodeAffinity` when missing.
    fn node_affinity_parents(&mut self) -> Result<(), MergeError> {
        if !self.has_affinity {
            self.scaffold(PATH_AFFINITY, &Affinity::default())?;
            self.has_affinity = true;
        }
        if !self.has_node_affinity {
            self.scaffold(PATH_NODE_AFFINITY, &NodeAffinity::default())?;
            self.has_node_affinity = true;
        }
        Ok(())
    }

    fn required_node_affinity(&mut self, spec: &PodSpec) -> Result<(), MergeError> {
        let config = self.config;
        if config.required_node_affinity_terms.is_empty() {
            return Ok(());
        }
        self.node_affinity_parents()?;

        let selector = node_affinity(spec)
            .and_then(|node| node.required_during_scheduling_ignored_during_execution.as_ref());
        if selector.is_none() {
            self.scaffold(PATH_REQUIRED_NODE_SELECTOR, &NodeSelector::default())?;
        }
        let target = selector
            .map(|selector| selector.node_selector_terms.as_slice())
            .unwrap_or_default();

        let rule = RequiredNodeAffinityRule {
            matching: config.node_affinity_matching,
        };
        self.merge(&rule, target, &config.required_node_affinity_terms)
    }

    fn preferred_node_affinity(&mut self, spec: &PodSpec) -> Result<(), MergeError> {
        let config = self.config;
        if config.preferred_node_affinity_terms.is_empty() {
            return Ok(());
        }
        self.node_affinity_parents()?;

        let preferred = node_affinity(spec)
            .and_then(|node| node.preferred_during_scheduling_ignored_during_execution.as_deref());
        if preferred.is_none() {
            self.scaffold(PATH_PREFERRED_SCHEDULING_TERMS, &Vec::<()>::new())?;
        }

        let rule = PreferredNodeAffinityRule {
            matching: config.node_affinity_matching,
        };
        self.merge(
            &rule,
            preferred.unwrap_or_default(),
            &config.preferred_node_affinity_terms,
        )
    }

    /// Set each annotation: `add` the whole map when the Pod has none, `add`
    /// a key that is unset or empty, `replace` one that has a value.
    fn annotations(
        &mut self,
        current: Option<&BTreeMap<String, String>>,
        wanted: &BTreeMap<String, String>,
    ) -> Result<(), MergeError> {
        if wanted.is_empty() {
            return Ok(());
        }
        let Some(current) = current else {
            self.push(ANNOTATIONS_LABEL, PatchOperation::add(PATH_ANNOTATIONS, wanted)?);
            return Ok(());
        };

        for (key, value) in wanted {
            let path = format!("{PATH_ANNOTATIONS}/{}", escape_pointer_token(key));
            let operation = if current.get(key).is_some_and(|existing| !existing.is_empty()) {
                PatchOperation::replace(path, value)?
            } else {
                PatchOperation::add(path, value)?
            };
            self.push(ANNOTATIONS_LABEL, operation);
        }
        Ok(())
    }
}

fn node_affinity(spec: &PodSpec) -> Option<&NodeAffinity> {
    spec.affinity
        .as_ref()
        .and_then(|affinity| affinity.node_affinity.as_ref())
}

#[cfg(test)]
#[path = "assembly_tests.rs"]
mod assembly_tests;
