// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Merge rules for the six configurable Pod list fields.
//!
//! | Rule | Identity | Compared attributes | Base path |
//! |------|----------|---------------------|-----------|
//! | [`EnvVarRule`] | `name` | `value`, `valueFrom` | `/spec/containers/<i>/env` |
//! | [`DnsOptionRule`] | `name` | `value` | `/spec/dnsConfig/options` |
//! | [`TolerationRule`] | `key` | `operator`, `effect`, `value` | `/spec/tolerations` |
//! | [`TopologySpreadConstraintRule`] | `topologyKey` | `maxSkew`, `nodeAffinityPolicy`, `nodeTaintsPolicy`, `whenUnsatisfiable`, `labelSelector`, `matchLabelKeys` | `/spec/topologySpreadConstraints` |
//! | [`RequiredNodeAffinityRule`] | requirement keys | `operator`, `values` | `.../requiredDuringSchedulingIgnoredDuringExecution/nodeSelectorTerms` |
//! | [`PreferredNodeAffinityRule`] | requirement keys | `operator`, `values`, `weight` | `.../preferredDuringSchedulingIgnoredDuringExecution` |

use crate::constants::{
    PATH_CONTAINERS, PATH_DNS_OPTIONS, PATH_PREFERRED_SCHEDULING_TERMS,
    PATH_REQUIRED_NODE_SELECTOR_TERMS, PATH_TOLERATIONS, PATH_TOPOLOGY_SPREAD_CONSTRAINTS,
};
use crate::equality::Attribute;
use crate::errors::MergeError;
use crate::merge::{compare_attributes, Comparison, FieldCategory, IdentityKey, MergeRule};
use k8s_openapi::api::core::v1::{
    EnvVar, NodeSelectorRequirement, NodeSelectorTerm, PodDNSConfigOption,
    PreferredSchedulingTerm, Toleration, TopologySpreadConstraint,
};
use serde::{Deserialize, Serialize};

/// How node-affinity terms are matched against existing terms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NestedMatching {
    /// Terms match when they select the same set of requirement keys
    #[default]
    ByKey,
    /// The desired entry at batch index `n` is compared through the `n`-th
    /// requirement of each term; nested lists shorter than `n + 1` are an error
    Positional,
}

/// Environment variables of one container.
#[derive(Debug, Clone, Copy)]
pub struct EnvVarRule {
    /// Index of the container in `spec.containers`
    pub container: usize,
}

impl MergeRule for EnvVarRule {
    type Entry = EnvVar;

    fn category(&self) -> FieldCategory {
        FieldCategory::EnvVar
    }

    fn base_path(&self) -> String {
        format!("{PATH_CONTAINERS}/{}/env", self.container)
    }

    fn identity<'e>(&self, entry: &'e EnvVar) -> IdentityKey<'e> {
        IdentityKey::single("name", Some(entry.name.as_str()))
    }

    fn attributes<'e>(&self, entry: &'e EnvVar) -> Vec<Attribute<'e>> {
        vec![
            Attribute::new("value", &entry.value),
            Attribute::new("valueFrom", &entry.value_from),
        ]
    }
}

/// Pod DNS resolver options.
#[derive(Debug, Clone, Copy, Default)]
pub struct DnsOptionRule;

impl MergeRule for DnsOptionRule {
    type Entry = PodDNSConfigOption;

    fn category(&self) -> FieldCategory {
        FieldCategory::DnsOption
    }

    fn base_path(&self) -> String {
        PATH_DNS_OPTIONS.to_string()
    }

    fn identity<'e>(&self, entry: &'e PodDNSConfigOption) -> IdentityKey<'e> {
        IdentityKey::single("name", entry.name.as_deref())
    }

    fn attributes<'e>(&self, entry: &'e PodDNSConfigOption) -> Vec<Attribute<'e>> {
        vec![Attribute::new("value", &entry.value)]
    }
}

/// Pod tolerations.
///
/// An absent key is a valid identity: it tolerates every taint.
#[derive(Debug, Clone, Copy, Default)]
pub struct TolerationRule;

impl MergeRule for TolerationRule {
    type Entry = Toleration;

    fn category(&self) -> FieldCategory {
        FieldCategory::Toleration
    }

    fn base_path(&self) -> String {
        PATH_TOLERATIONS.to_string()
    }

    fn identity<'e>(&self, entry: &'e Toleration) -> IdentityKey<'e> {
        IdentityKey::single("key", entry.key.as_deref())
    }

    fn attributes<'e>(&self, entry: &'e Toleration) -> Vec<Attribute<'e>> {
        vec![
            Attribute::new("operator", &entry.operator),
            Attribute::new("effect", &entry.effect),
            Attribute::new("value", &entry.value),
        ]
    }
}

/// Pod topology spread constraints.
#[derive(Debug, Clone, Copy, Default)]
pub struct TopologySpreadConstraintRule;

impl MergeRule for TopologySpreadConstraintRule {
    type Entry = TopologySpreadConstraint;

    fn category(&self) -> FieldCategory {
        FieldCategory::TopologySpreadConstraint
    }

    fn base_path(&self) -> String {
        PATH_TOPOLOGY_SPREAD_CONSTRAINTS.to_string()
    }

    fn identity<'e>(&self, entry: &'e TopologySpreadConstraint) -> IdentityKey<'e> {
        IdentityKey::single("topologyKey", Some(entry.topology_key.as_str()))
    }

    fn attributes<'e>(&self, entry: &'e TopologySpreadConstraint) -> Vec<Attribute<'e>> {
        vec![
            Attribute::new("maxSkew", &entry.max_skew),
            Attribute::new("nodeAffinityPolicy", &entry.node_affinity_policy),
            Attribute::new("nodeTaintsPolicy", &entry.node_taints_policy),
            Attribute::new("whenUnsatisfiable", &entry.when_unsatisfiable),
            Attribute::new("labelSelector", &entry.label_selector),
            Attribute::new("matchLabelKeys", &entry.match_label_keys),
        ]
    }
}

/// Required node-affinity selector terms.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequiredNodeAffinityRule {
    /// Term matching mode
    pub matching: NestedMatching,
}

impl MergeRule for RequiredNodeAffinityRule {
    type Entry = NodeSelectorTerm;

    fn category(&self) -> FieldCategory {
        FieldCategory::RequiredNodeAffinity
    }

    fn base_path(&self) -> String {
        PATH_REQUIRED_NODE_SELECTOR_TERMS.to_string()
    }

    fn identity<'e>(&self, entry: &'e NodeSelectorTerm) -> IdentityKey<'e> {
        term_identity(entry)
    }

    fn attributes<'e>(&self, entry: &'e NodeSelectorTerm) -> Vec<Attribute<'e>> {
        term_attributes(entry)
    }

    fn compare(
        &self,
        target: &NodeSelectorTerm,
        desired: &NodeSelectorTerm,
        position: usize,
    ) -> Result<Comparison, MergeError> {
        match self.matching {
            NestedMatching::ByKey => {
                if term_identity(target) != term_identity(desired) {
                    return Ok(Comparison::Unrelated);
                }
                Ok(compare_attributes(
                    &term_attributes(target),
                    &term_attributes(desired),
                ))
            }
            NestedMatching::Positional => {
                compare_positional(self.category(), target, desired, position, &[], &[])
            }
        }
    }
}

/// Preferred (weighted) node-affinity terms.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreferredNodeAffinityRule {
    /// Term matching mode
    pub matching: NestedMatching,
}

impl MergeRule for PreferredNodeAffinityRule {
    type Entry = PreferredSchedulingTerm;

    fn category(&self) -> FieldCategory {
        FieldCategory::PreferredNodeAffinity
    }

    fn base_path(&self) -> String {
        PATH_PREFERRED_SCHEDULING_TERMS.to_string()
    }

    fn identity<'e>(&self, entry: &'e PreferredSchedulingTerm) -> IdentityKey<'e> {
        term_identity(&entry.preference)
    }

    fn attributes<'e>(&self, entry: &'e PreferredSchedulingTerm) -> Vec<Attribute<'e>> {
        let mut attributes = term_attributes(&entry.preference);
        attributes.push(Attribute::new("weight", &entry.weight));
        attributes
    }

    fn compare(
        &self,
        target: &PreferredSchedulingTerm,
        desired: &PreferredSchedulingTerm,
        position: usize,
    ) -> Result<Comparison, MergeError> {
        match self.matching {
            NestedMatching::ByKey => {
                if self.identity(target) != self.identity(desired) {
                    return Ok(Comparison::Unrelated);
                }
                Ok(compare_attributes(
                    &self.attributes(target),
                    &self.attributes(desired),
                ))
            }
            NestedMatching::Positional => compare_positional(
                self.category(),
                &target.preference,
                &desired.preference,
                position,
                &[Attribute::new("weight", &target.weight)],
                &[Attribute::new("weight", &desired.weight)],
            ),
        }
    }
}

/// Requirements of a nested list, sorted by key.
fn sorted_requirements(list: Option<&Vec<NodeSelectorRequirement>>) -> Vec<&NodeSelectorRequirement> {
    let mut requirements: Vec<&NodeSelectorRequirement> = list.into_iter().flatten().collect();
    requirements.sort_by(|a, b| a.key.cmp(&b.key));
    requirements
}

/// Identity of a term: the sorted keys of its expressions, then of its fields.
fn term_identity(term: &NodeSelectorTerm) -> IdentityKey<'_> {
    let mut identity = IdentityKey::default();
    for requirement in sorted_requirements(term.match_expressions.as_ref()) {
        identity = identity.with("matchExpressions", Some(requirement.key.as_str()));
    }
    for requirement in sorted_requirements(term.match_fields.as_ref()) {
        identity = identity.with("matchFields", Some(requirement.key.as_str()));
    }
    identity
}

fn term_attributes(term: &NodeSelectorTerm) -> Vec<Attribute<'_>> {
    sorted_requirements(term.match_expressions.as_ref())
        .into_iter()
        .chain(sorted_requirements(term.match_fields.as_ref()))
        .flat_map(requirement_attributes)
        .collect()
}

fn requirement_attributes(requirement: &NodeSelectorRequirement) -> [Attribute<'_>; 2] {
    [
        Attribute::new("operator", &requirement.operator),
        Attribute::new("values", &requirement.values),
    ]
}

/// Compare two terms through the requirement at `position` of each nested list.
///
/// A nested list is only consulted when the target term has one. Requirements
/// with different keys leave the terms unrelated; a changed requirement in
/// either list makes the whole term changed.
fn compare_positional(
    category: FieldCategory,
    target: &NodeSelectorTerm,
    desired: &NodeSelectorTerm,
    position: usize,
    target_extra: &[Attribute<'_>],
    desired_extra: &[Attribute<'_>],
) -> Result<Comparison, MergeError> {
    let nested_lists = [
        (
            "matchExpressions",
            target.match_expressions.as_deref(),
            desired.match_expressions.as_deref(),
        ),
        (
            "matchFields",
            target.match_fields.as_deref(),
            desired.match_fields.as_deref(),
        ),
    ];

    let mut outcome = Comparison::Unrelated;
    for (nested, target_list, desired_list) in nested_lists {
        let target_list = target_list.unwrap_or_default();
        if target_list.is_empty() {
            continue;
        }
        let desired_list = desired_list.unwrap_or_default();
        let (Some(current), Some(wanted)) = (target_list.get(position), desired_list.get(position))
        else {
            return Err(MergeError::PositionalMismatch {
                category,
                nested,
                position,
                target_len: target_list.len(),
                desired_len: desired_list.len(),
            });
        };
        if current.key != wanted.key {
            continue;
        }

        let mut current_attributes = requirement_attributes(current).to_vec();
        current_attributes.extend_from_slice(target_extra);
        let mut wanted_attributes = requirement_attributes(wanted).to_vec();
        wanted_attributes.extend_from_slice(desired_extra);

        outcome = combine(
            outcome,
            compare_attributes(&current_attributes, &wanted_attributes),
        );
    }
    Ok(outcome)
}

/// Merge the outcomes of the expression and field comparisons of one term pair.
fn combine(first: Comparison, second: Comparison) -> Comparison {
    match (first, second) {
        (Comparison::Changed { mut attributes }, Comparison::Changed { attributes: more }) => {
            attributes.extend(more);
            attributes.dedup();
            Comparison::Changed { attributes }
        }
        (changed @ Comparison::Changed { .. }, _) | (_, changed @ Comparison::Changed { .. }) => {
            changed
        }
        (Comparison::Identical, _) | (_, Comparison::Identical) => Comparison::Identical,
        (Comparison::Unrelated, Comparison::Unrelated) => Comparison::Unrelated,
    }
}

#[cfg(test)]
#[path = "rules_tests.rs"]
mod rules_tests;
