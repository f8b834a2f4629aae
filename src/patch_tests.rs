// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `patch.rs`

use crate::patch::{escape_pointer_token, to_json_patch, PatchOperation};
use serde_json::json;

#[test]
fn test_add_serializes_to_rfc6902() {
    let op = PatchOperation::add("/spec/tolerations", &json!([{"key": "zone"}])).unwrap();

    assert_eq!(
        serde_json::to_value(&op).unwrap(),
        json!({"op": "add", "path": "/spec/tolerations", "value": [{"key": "zone"}]})
    );
}

#[test]
fn test_replace_serializes_to_rfc6902() {
    let op = PatchOperation::replace("/spec/containers/0/env/0", &json!({"name": "A"})).unwrap();

    assert_eq!(
        serde_json::to_value(&op).unwrap(),
        json!({"op": "replace", "path": "/spec/containers/0/env/0", "value": {"name": "A"}})
    );
}

#[test]
fn test_remove_omits_value() {
    let op = PatchOperation::remove("/spec/affinity/podAntiAffinity");
    let encoded = serde_json::to_value(&op).unwrap();

    assert_eq!(
        encoded,
        json!({"op": "remove", "path": "/spec/affinity/podAntiAffinity"})
    );
    assert!(op.value().is_none());
    assert_eq!(op.op(), "remove");
}

#[test]
fn test_accessors() {
    let op = PatchOperation::add("/metadata/annotations/x", &"injected").unwrap();

    assert_eq!(op.op(), "add");
    assert_eq!(op.path(), "/metadata/annotations/x");
    assert_eq!(op.value(), Some(&json!("injected")));
}

#[test]
fn test_deserialize_from_wire() {
    let op: PatchOperation =
        serde_json::from_value(json!({"op": "replace", "path": "/a", "value": 1})).unwrap();

    assert_eq!(
        op,
        PatchOperation::Replace {
            path: "/a".to_string(),
            value: json!(1)
        }
    );
}

#[test]
fn test_escape_pointer_token() {
    assert_eq!(escape_pointer_token("plain-key"), "plain-key");
    assert_eq!(escape_pointer_token("example.com/status"), "example.com~1status");
    assert_eq!(escape_pointer_token("a~b/c"), "a~0b~1c");
}

#[test]
fn test_to_json_patch_applies() {
    let ops = vec![
        PatchOperation::add("/spec/tolerations", &json!([])).unwrap(),
        PatchOperation::add("/spec/tolerations/-", &json!({"key": "zone"})).unwrap(),
        PatchOperation::remove("/spec/drop"),
    ];
    let patch = to_json_patch(&ops).unwrap();

    let mut doc = json!({"spec": {"drop": true}});
    json_patch::patch(&mut doc, &patch).unwrap();

    assert_eq!(doc, json!({"spec": {"tolerations": [{"key": "zone"}]}}));
}
