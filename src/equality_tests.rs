// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `equality.rs`

use crate::equality::{changed_attributes, equal, Attribute};
use k8s_openapi::api::core::v1::{ConfigMapKeySelector, EnvVarSource};

#[test]
fn test_equal_same_type() {
    assert!(equal(&"ndots".to_string(), &"ndots".to_string()));
    assert!(!equal(&"ndots".to_string(), &"use-vc".to_string()));
    assert!(equal(&3_i32, &3_i32));
}

#[test]
fn test_equal_different_types_never_match() {
    assert!(!equal(&3_i32, &3_i64));
    assert!(!equal(&Some("3".to_string()), &"3".to_string()));
}

#[test]
fn test_optional_values_equal_only_when_both_absent() {
    let none: Option<String> = None;
    let empty: Option<String> = Some(String::new());

    assert!(equal(&none, &None::<String>));
    assert!(!equal(&none, &empty));
    assert!(equal(&empty, &Some(String::new())));
}

#[test]
fn test_equal_nested_structs() {
    let source = |key: &str| EnvVarSource {
        config_map_key_ref: Some(ConfigMapKeySelector {
            key: key.to_string(),
            ..Default::default()
        }),
        ..Default::default()
    };

    assert!(equal(&Some(source("name")), &Some(source("name"))));
    assert!(!equal(&Some(source("name")), &Some(source("region"))));
}

#[test]
fn test_changed_attributes_none_changed() {
    let value = Some("3".to_string());
    let current = [Attribute::new("value", &value)];
    let desired = [Attribute::new("value", &value)];

    assert!(changed_attributes(&current, &desired).is_empty());
}

#[test]
fn test_changed_attributes_reports_names() {
    let op_a = "Equal".to_string();
    let op_b = "Exists".to_string();
    let effect = Some("NoSchedule".to_string());
    let value_a = Some("linux".to_string());
    let value_b: Option<String> = None;

    let current = [
        Attribute::new("operator", &op_a),
        Attribute::new("effect", &effect),
        Attribute::new("value", &value_a),
    ];
    let desired = [
        Attribute::new("operator", &op_b),
        Attribute::new("effect", &effect),
        Attribute::new("value", &value_b),
    ];

    assert_eq!(
        changed_attributes(&current, &desired),
        vec!["operator", "value"]
    );
}

#[test]
fn test_changed_attributes_length_mismatch() {
    let a = 1_i32;
    let b = 2_i32;
    let current = [Attribute::new("weight", &a)];
    let desired = [Attribute::new("weight", &a), Attribute::new("extra", &b)];

    assert_eq!(changed_attributes(&current, &desired), vec!["extra"]);
}
