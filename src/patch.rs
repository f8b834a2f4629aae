// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! RFC 6902 JSON Patch operations emitted by the merge engine.
//!
//! [`PatchOperation`] serializes directly to the wire form
//! `{"op": "add", "path": "/spec/tolerations", "value": [...]}` and converts
//! into a [`json_patch::Patch`] for attaching to a kube `AdmissionResponse`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single JSON Patch operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOperation {
    /// Insert `value` at `path` (or append when the last token is `-`)
    Add {
        /// JSON pointer
        path: String,
        /// Inserted value
        value: Value,
    },
    /// Overwrite the existing value at `path`
    Replace {
        /// JSON pointer
        path: String,
        /// New value
        value: Value,
    },
    /// Delete the value at `path`
    Remove {
        /// JSON pointer
        path: String,
    },
}

impl PatchOperation {
    /// Build an `add` operation, serializing `value`.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` cannot be represented as JSON.
    pub fn add<T: Serialize + ?Sized>(
        path: impl Into<String>,
        value: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::Add {
            path: path.into(),
            value: serde_json::to_value(value)?,
        })
    }

    /// Build a `replace` operation, serializing `value`.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` cannot be represented as JSON.
    pub fn replace<T: Serialize + ?Sized>(
        path: impl Into<String>,
        value: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::Replace {
            path: path.into(),
            value: serde_json::to_value(value)?,
        })
    }

    /// Build a `remove` operation.
    #[must_use]
    pub fn remove(path: impl Into<String>) -> Self {
        Self::Remove { path: path.into() }
    }

    /// Operation name as it appears on the wire
    #[must_use]
    pub fn op(&self) -> &'static str {
        match self {
            Self::Add { .. } => "add",
            Self::Replace { .. } => "replace",
            Self::Remove { .. } => "remove",
        }
    }

    /// Target JSON pointer
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Add { path, .. } | Self::Replace { path, .. } | Self::Remove { path } => path,
        }
    }

    /// Payload, absent for `remove`
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Add { value, .. } | Self::Replace { value, .. } => Some(value),
            Self::Remove { .. } => None,
        }
    }
}

/// Escape a single reference token for use inside a JSON pointer.
///
/// `~` becomes `~0` and `/` becomes `~1` (RFC 6901 §3), so annotation keys
/// like `example.com/status` address a single map entry.
#[must_use]
pub fn escape_pointer_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

/// Convert a list of operations into a [`json_patch::Patch`].
///
/// # Errors
///
/// Returns an error if a path is not a valid JSON pointer.
pub fn to_json_patch(operations: &[PatchOperation]) -> Result<json_patch::Patch, serde_json::Error> {
    serde_json::from_value(serde_json::to_value(operations)?)
}

#[cfg(test)]
#[path = "patch_tests.rs"]
mod patch_tests;
