// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Mutation configuration.
//!
//! The operator declares the entries to inject in a YAML document:
//!
//! ```yaml
//! env:
//!   - name: CLUSTER_NAME
//!     value: aks-test-01
//! dnsOptions:
//!   - name: ndots
//!     value: "3"
//! tolerations:
//!   - key: kubernetes.io/os
//!     operator: Equal
//!     value: Windows
//!     effect: PreferNoSchedule
//! removePodAntiAffinity: false
//! ```
//!
//! Every list is optional. The document is loaded once at startup, validated,
//! and shared read-only by all requests.

use crate::errors::ConfigError;
use crate::merge::{FieldCategory, SatisfiedPolicy};
use crate::metrics::record_config_entries;
use crate::rules::NestedMatching;
use k8s_openapi::api::core::v1::{
    EnvVar, NodeSelectorRequirement, NodeSelectorTerm, PodDNSConfigOption,
    PreferredSchedulingTerm, Toleration, TopologySpreadConstraint,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::{debug, info};

/// Entries injected into every admitted Pod.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MutationConfig {
    /// Environment variables added to every container
    pub env: Vec<EnvVar>,

    /// DNS resolver options
    pub dns_options: Vec<PodDNSConfigOption>,

    /// Required node-affinity selector terms
    pub required_node_affinity_terms: Vec<NodeSelectorTerm>,

    /// Preferred node-affinity terms
    pub preferred_node_affinity_terms: Vec<PreferredSchedulingTerm>,

    /// Tolerations
    pub tolerations: Vec<Toleration>,

    /// Topology spread constraints
    pub topology_constraints: Vec<TopologySpreadConstraint>,

    /// Drop `spec.affinity.podAntiAffinity` from admitted Pods
    pub remove_pod_anti_affinity: bool,

    /// Batch policy once an entry is already present
    pub satisfied_policy: SatisfiedPolicy,

    /// How node-affinity terms are matched
    pub node_affinity_matching: NestedMatching,
}

impl MutationConfig {
    /// Parse a YAML document and validate it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed YAML and
    /// [`ConfigError::InvalidEntry`] for entries without a usable identity.
    pub fn from_yaml(document: &str) -> Result<Self, ConfigError> {
        // An empty file deserializes as YAML null
        if document.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(document)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, hash, parse and validate the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read, otherwise the
    /// errors of [`MutationConfig::from_yaml`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let document = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let sha256 = config_hash(&document);
        info!(path = %path.display(), %sha256, "Loaded mutation configuration");

        let config = Self::from_yaml(&document)?;
        config.log_summary();
        Ok(config)
    }

    /// Check that every entry carries the attributes it is identified by.
    ///
    /// Tolerations are not checked: an absent key tolerates every taint.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEntry`] for the first offending entry.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (index, var) in self.env.iter().enumerate() {
            if var.name.is_empty() {
                return Err(invalid(FieldCategory::EnvVar, index, "name is empty"));
            }
        }

        for (index, option) in self.dns_options.iter().enumerate() {
            if option.name.as_deref().unwrap_or_default().is_empty() {
                return Err(invalid(FieldCategory::DnsOption, index, "name is missing"));
            }
        }

        for (index, constraint) in self.topology_constraints.iter().enumerate() {
            if constraint.topology_key.is_empty() {
                return Err(invalid(
                    FieldCategory::TopologySpreadConstraint,
                    index,
                    "topologyKey is empty",
                ));
            }
        }

        for (index, term) in self.required_node_affinity_terms.iter().enumerate() {
            validate_term(FieldCategory::RequiredNodeAffinity, index, term)?;
        }

        for (index, term) in self.preferred_node_affinity_terms.iter().enumerate() {
            validate_term(FieldCategory::PreferredNodeAffinity, index, &term.preference)?;
        }

        Ok(())
    }

    /// Number of configured entries per category
    #[must_use]
    pub fn entry_counts(&self) -> [(FieldCategory, usize); 6] {
        [
            (FieldCategory::EnvVar, self.env.len()),
            (FieldCategory::DnsOption, self.dns_options.len()),
            (FieldCategory::Toleration, self.tolerations.len()),
            (
                FieldCategory::TopologySpreadConstraint,
                self.topology_constraints.len(),
            ),
            (
                FieldCategory::RequiredNodeAffinity,
                self.required_node_affinity_terms.len(),
            ),
            (
                FieldCategory::PreferredNodeAffinity,
                self.preferred_node_affinity_terms.len(),
            ),
        ]
    }

    fn log_summary(&self) {
        for (category, count) in self.entry_counts() {
            record_config_entries(category.as_str(), count);
            debug!(%category, count, "Configured entries");
        }
        info!(
            env = self.env.len(),
            dns_options = self.dns_options.len(),
            tolerations = self.tolerations.len(),
            topology_constraints = self.topology_constraints.len(),
            required_node_affinity_terms = self.required_node_affinity_terms.len(),
            preferred_node_affinity_terms = self.preferred_node_affinity_terms.len(),
            remove_pod_anti_affinity = self.remove_pod_anti_affinity,
            satisfied_policy = ?self.satisfied_policy,
            node_affinity_matching = ?self.node_affinity_matching,
            "Mutation configuration ready"
        );
    }
}

fn invalid(category: FieldCategory, index: usize, reason: &str) -> ConfigError {
    ConfigError::InvalidEntry {
        category,
        index,
        reason: reason.to_string(),
    }
}

fn validate_term(
    category: FieldCategory,
    index: usize,
    term: &NodeSelectorTerm,
) -> Result<(), ConfigError> {
    let expressions = term.match_expressions.as_deref().unwrap_or_default();
    let fields = term.match_fields.as_deref().unwrap_or_default();

    if expressions.is_empty() && fields.is_empty() {
        return Err(invalid(
            category,
            index,
            "term has neither matchExpressions nor matchFields",
        ));
    }
    if expressions
        .iter()
        .chain(fields)
        .any(|requirement: &NodeSelectorRequirement| requirement.key.is_empty())
    {
        return Err(invalid(category, index, "requirement key is empty"));
    }
    Ok(())
}

/// SHA-256 of a configuration document as lowercase hex.
#[must_use]
pub fn config_hash(document: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(document.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
