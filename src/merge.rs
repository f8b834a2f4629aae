// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Selector-based list merge.
//!
//! Every configurable Pod field (env vars, DNS options, tolerations, topology
//! spread constraints, required and preferred node-affinity terms) is merged by
//! the same routine, [`merge_list`], parameterized by a [`MergeRule`] that says
//! how to identify an entry and which of its attributes decide whether an
//! existing entry already matches.
//!
//! # Algorithm
//!
//! Desired entries are processed in order:
//!
//! 1. If the target list is empty, the first desired entry is written as a
//!    one-element array at the base path. This creates the list and inserts the
//!    entry in one step, since the array may not exist yet. Later entries in
//!    the batch are treated as going into a non-empty list.
//! 2. Otherwise the target is scanned for entries with the same identity that
//!    no earlier desired entry has matched:
//!    - one of them has the same attributes: nothing to do for this entry
//!    - the first of them differs: `replace` at `<base>/<index>`
//!    - none: `add` at `<base>/-`
//! 3. With [`SatisfiedPolicy::DiscardCategory`], one already-satisfied entry
//!    discards every operation computed for the batch.
//!
//! # Example
//!
//! ```rust
//! use env_injector::merge::{merge_list, SatisfiedPolicy};
//! use env_injector::rules::TolerationRule;
//! use k8s_openapi::api::core::v1::Toleration;
//!
//! let desired = vec![Toleration {
//!     key: Some("zone".to_string()),
//!     operator: Some("Exists".to_string()),
//!     effect: Some("NoSchedule".to_string()),
//!     ..Default::default()
//! }];
//!
//! let ops = merge_list(&TolerationRule, &[], &desired, SatisfiedPolicy::DiscardCategory).unwrap();
//! assert_eq!(ops.len(), 1);
//! assert_eq!(ops[0].path(), "/spec/tolerations");
//! ```

use crate::equality::{changed_attributes, Attribute};
use crate::errors::MergeError;
use crate::patch::PatchOperation;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// The configurable Pod list fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldCategory {
    /// Container environment variables
    EnvVar,
    /// Pod DNS resolver options
    DnsOption,
    /// Pod tolerations
    Toleration,
    /// Pod topology spread constraints
    TopologySpreadConstraint,
    /// Required node-affinity selector terms
    RequiredNodeAffinity,
    /// Preferred (weighted) node-affinity terms
    PreferredNodeAffinity,
}

impl FieldCategory {
    /// Name of the category as used in the configuration file and metrics labels
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EnvVar => "env",
            Self::DnsOption => "dnsOptions",
            Self::Toleration => "tolerations",
            Self::TopologySpreadConstraint => "topologyConstraints",
            Self::RequiredNodeAffinity => "requiredNodeAffinityTerms",
            Self::PreferredNodeAffinity => "preferredNodeAffinityTerms",
        }
    }
}

impl fmt::Display for FieldCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to do with a batch once one desired entry is found verbatim on the target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SatisfiedPolicy {
    /// Treat the whole category as already configured and emit nothing for it
    #[default]
    DiscardCategory,
    /// Skip only the satisfied entry and keep the other operations
    SkipEntry,
}

/// Outcome of comparing one target entry against one desired entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparison {
    /// Different identity: not the same configuration item
    Unrelated,
    /// Same identity, at least one attribute differs
    Changed {
        /// Names of the differing attributes
        attributes: Vec<&'static str>,
    },
    /// Same identity and attributes
    Identical,
}

/// Labelled parts of an entry's identity.
///
/// Two entries are the same configuration item when their keys are equal.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IdentityKey<'e>(Vec<(&'static str, Option<&'e str>)>);

impl<'e> IdentityKey<'e> {
    /// Key made of a single part
    #[must_use]
    pub fn single(label: &'static str, value: Option<&'e str>) -> Self {
        Self(vec![(label, value)])
    }

    /// Append a part
    #[must_use]
    pub fn with(mut self, label: &'static str, value: Option<&'e str>) -> Self {
        self.0.push((label, value));
        self
    }
}

impl fmt::Display for IdentityKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (label, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{label}={}", value.unwrap_or("<unset>"))?;
        }
        Ok(())
    }
}

/// How entries of one field category are identified and compared.
pub trait MergeRule {
    /// The list entry type
    type Entry: Serialize + fmt::Debug;

    /// Category this rule merges
    fn category(&self) -> FieldCategory;

    /// JSON pointer of the list on the Pod
    fn base_path(&self) -> String;

    /// Identity of an entry.
    fn identity<'e>(&self, entry: &'e Self::Entry) -> IdentityKey<'e>;

    /// Attributes compared once identities match, excluding the identity itself.
    fn attributes<'e>(&self, entry: &'e Self::Entry) -> Vec<Attribute<'e>>;

    /// Compare a target entry against the desired entry at `position` in its batch.
    ///
    /// The default compares [`MergeRule::identity`] and then
    /// [`MergeRule::attributes`]; `position` is unused.
    ///
    /// # Errors
    ///
    /// Rules whose comparison depends on nested list positions return
    /// [`MergeError::PositionalMismatch`] when a nested list is too short.
    fn compare(
        &self,
        target: &Self::Entry,
        desired: &Self::Entry,
        position: usize,
    ) -> Result<Comparison, MergeError> {
        let _ = position;
        if self.identity(target) != self.identity(desired) {
            return Ok(Comparison::Unrelated);
        }
        Ok(compare_attributes(
            &self.attributes(target),
            &self.attributes(desired),
        ))
    }
}

/// Turn an attribute comparison into a [`Comparison`] for entries known to share identity.
#[must_use]
pub fn compare_attributes(target: &[Attribute<'_>], desired: &[Attribute<'_>]) -> Comparison {
    let attributes = changed_attributes(target, desired);
    if attributes.is_empty() {
        Comparison::Identical
    } else {
        Comparison::Changed { attributes }
    }
}

/// Compute the patch operations that reconcile `target` with `desired`.
///
/// `target` is the list currently on the Pod (pass an empty slice when the
/// field is absent). Operations follow the order of `desired`.
///
/// # Errors
///
/// Returns [`MergeError::PositionalMismatch`] when the rule cannot compare a
/// pair of entries, or [`MergeError::Serialization`] if an entry cannot be
/// encoded as JSON.
pub fn merge_list<R: MergeRule>(
    rule: &R,
    target: &[R::Entry],
    desired: &[R::Entry],
    policy: SatisfiedPolicy,
) -> Result<Vec<PatchOperation>, MergeError> {
    let category = rule.category();
    let base_path = rule.base_path();
    let mut operations = Vec::with_capacity(desired.len());
    let mut satisfied = false;
    let mut first_insert = target.is_empty();
    let mut claimed = vec![false; target.len()];

    for (position, entry) in desired.iter().enumerate() {
        if first_insert {
            first_insert = false;
            debug!(%category, path = %base_path, identity = %rule.identity(entry), "Creating list with first entry");
            operations.push(PatchOperation::add(
                base_path.clone(),
                std::slice::from_ref(entry),
            )?);
            continue;
        }

        let found = find_match(rule, target, &claimed, entry, position)?;
        if let Some((index, _)) = &found {
            claimed[*index] = true;
        }

        match found {
            None => {
                debug!(%category, identity = %rule.identity(entry), "Appending entry");
                operations.push(PatchOperation::add(format!("{base_path}/-"), entry)?);
            }
            Some((index, Comparison::Changed { attributes })) => {
                debug!(%category, index, identity = %rule.identity(entry), changed = ?attributes, "Replacing entry");
                operations.push(PatchOperation::replace(
                    format!("{base_path}/{index}"),
                    entry,
                )?);
            }
            Some((index, _)) => {
                debug!(%category, index, identity = %rule.identity(entry), "Entry already satisfied");
                satisfied = true;
            }
        }
    }

    if satisfied && policy == SatisfiedPolicy::DiscardCategory {
        debug!(
            %category,
            discarded = operations.len(),
            "Category already configured, discarding its operations"
        );
        operations.clear();
    }

    Ok(operations)
}

/// Index and comparison of the unclaimed target entry `desired` settles on.
///
/// An identical entry anywhere in `target` wins over an earlier changed one.
fn find_match<R: MergeRule>(
    rule: &R,
    target: &[R::Entry],
    claimed: &[bool],
    desired: &R::Entry,
    position: usize,
) -> Result<Option<(usize, Comparison)>, MergeError> {
    let mut first_changed = None;
    for (index, existing) in target.iter().enumerate() {
        if claimed[index] {
            continue;
        }
        match rule.compare(existing, desired, position)? {
            Comparison::Unrelated => {}
            Comparison::Identical => return Ok(Some((index, Comparison::Identical))),
            changed @ Comparison::Changed { .. } => {
                if first_changed.is_none() {
                    first_changed = Some((index, changed));
                }
            }
        }
    }
    Ok(first_changed)
}

#[cfg(test)]
#[path = "merge_tests.rs"]
mod merge_tests;
