// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Structural equality over heterogeneous entry attributes.
//!
//! Merge rules describe the attributes that decide whether an existing entry
//! already matches a desired one as a list of named [`Attribute`]s. Each
//! attribute borrows a field of the entry through the object-safe
//! [`Comparable`] trait, so a single list can mix `String`, `Option<String>`,
//! `i32`, nested `k8s-openapi` structs and so on while still being compared
//! with the field type's own `PartialEq`.
//!
//! Optional values compare equal only when both are absent or both are
//! present and equal: `None` never equals `Some("")`.
//!
//! # Example
//!
//! ```rust
//! use env_injector::equality::{changed_attributes, Attribute};
//!
//! let current: Option<String> = Some("3".to_string());
//! let desired: Option<String> = Some("5".to_string());
//!
//! let changed = changed_attributes(
//!     &[Attribute::new("value", &current)],
//!     &[Attribute::new("value", &desired)],
//! );
//! assert_eq!(changed, vec!["value"]);
//! ```

use std::any::Any;
use std::fmt;

/// A value that can be compared for equality against another type-erased value.
///
/// Implemented for every `'static` type with `PartialEq + Debug`. Two values of
/// different concrete types are never equal.
pub trait Comparable: fmt::Debug {
    /// Upcast for downcasting in [`Comparable::equals`]
    fn as_any(&self) -> &dyn Any;

    /// Structural equality against another comparable value
    fn equals(&self, other: &dyn Comparable) -> bool;
}

impl<T> Comparable for T
where
    T: PartialEq + fmt::Debug + 'static,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn equals(&self, other: &dyn Comparable) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }
}

/// A named, borrowed attribute of a list entry.
#[derive(Debug, Clone, Copy)]
pub struct Attribute<'e> {
    /// Attribute name used in logs (e.g. `operator`, `maxSkew`)
    pub name: &'static str,
    value: &'e dyn Comparable,
}

impl<'e> Attribute<'e> {
    /// Wrap a borrowed field as a named attribute.
    #[must_use]
    pub fn new<T>(name: &'static str, value: &'e T) -> Self
    where
        T: PartialEq + fmt::Debug + 'static,
    {
        Self { name, value }
    }
}

/// Compare two type-erased values.
#[must_use]
pub fn equal(a: &dyn Comparable, b: &dyn Comparable) -> bool {
    a.equals(b)
}

/// Names of the attributes that differ between `current` and `desired`.
///
/// Attributes are compared pairwise by position. A length mismatch means the
/// two entries do not have the same shape; every attribute past the shorter
/// list counts as changed.
#[must_use]
pub fn changed_attributes(current: &[Attribute<'_>], desired: &[Attribute<'_>]) -> Vec<&'static str> {
    let mut changed: Vec<&'static str> = current
        .iter()
        .zip(desired)
        .filter(|(c, d)| !equal(c.value, d.value))
        .map(|(_, d)| d.name)
        .collect();

    let longer = if current.len() > desired.len() {
        current
    } else {
        desired
    };
    changed.extend(
        longer
            .iter()
            .skip(current.len().min(desired.len()))
            .map(|attr| attr.name),
    );
    changed.dedup();
    changed
}

#[cfg(test)]
#[path = "equality_tests.rs"]
mod equality_tests;
