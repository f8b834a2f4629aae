// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

// Common test utilities for integration tests

#![allow(dead_code)]

use env_injector::config::MutationConfig;
use env_injector::patch::{to_json_patch, PatchOperation};
use k8s_openapi::api::core::v1::Pod;
use serde_json::{json, Value};

/// Configuration exercising every field category
pub const FULL_CONFIG: &str = r#"
env:
  - name: CLUSTER_NAME
    value: aks-test-01
  - name: SUBSCRIPTION
    value: subscription-00
dnsOptions:
  - name: ndots
    value: "3"
  - name: single-request-reopen
tolerations:
  - key: kubernetes.io/os
    operator: Equal
    value: Windows
    effect: PreferNoSchedule
topologyConstraints:
  - maxSkew: 1
    topologyKey: topology.kubernetes.io/zone
    whenUnsatisfiable: ScheduleAnyway
    labelSelector:
      matchLabels:
        app.kubernetes.io/name: web
requiredNodeAffinityTerms:
  - matchExpressions:
      - key: agentpool
        operator: In
        values: ["ubuntu18", "ubuntu1804"]
preferredNodeAffinityTerms:
  - weight: 50
    preference:
      matchExpressions:
        - key: kubernetes.azure.com/scalesetpriority
          operator: In
          values: ["spot"]
removePodAntiAffinity: true
"#;

/// Parse a configuration document, panicking on error
pub fn config(document: &str) -> MutationConfig {
    MutationConfig::from_yaml(document).expect("test configuration should be valid")
}

/// A bare Pod with the given containers
pub fn bare_pod(containers: &[&str]) -> Value {
    let containers: Vec<Value> = containers
        .iter()
        .map(|name| json!({"name": name, "image": "nginx:1.27"}))
        .collect();
    json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": {"name": "web-0", "namespace": "default"},
        "spec": {"containers": containers}
    })
}

/// A Pod that already carries some of the configured fields
pub fn populated_pod() -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": {
            "name": "web-1",
            "namespace": "default",
            "annotations": {"example.com/owner": "team-a"}
        },
        "spec": {
            "containers": [
                {
                    "name": "web",
                    "image": "nginx:1.27",
                    "env": [{"name": "CLUSTER_NAME", "value": "old-cluster"}]
                },
                {"name": "sidecar", "image": "envoy:v1.31"}
            ],
            "dnsConfig": {"options": [{"name": "ndots", "value": "5"}]},
            "tolerations": [
                {"key": "node.kubernetes.io/not-ready", "operator": "Exists", "effect": "NoExecute"}
            ],
            "affinity": {
                "podAntiAffinity": {
                    "preferredDuringSchedulingIgnoredDuringExecution": [{
                        "weight": 100,
                        "podAffinityTerm": {
                            "topologyKey": "kubernetes.io/hostname",
                            "labelSelector": {"matchLabels": {"app": "web"}}
                        }
                    }]
                }
            }
        }
    })
}

/// Decode a Pod from JSON
pub fn typed(pod: &Value) -> Pod {
    serde_json::from_value(pod.clone()).expect("test Pod should decode")
}

/// Apply patch operations to a Pod document
pub fn apply(pod: &Value, operations: &[PatchOperation]) -> Value {
    let mut document = pod.clone();
    let patch = to_json_patch(operations).expect("operations should convert");
    json_patch::patch(&mut document, &patch).expect("patch should apply");
    document
}

/// Wrap a Pod document in an admission review
pub fn review(namespace: &str, pod: &Value) -> Value {
    json!({
        "apiVersion": "admission.k8s.io/v1",
        "kind": "AdmissionReview",
        "request": {
            "uid": "0df28fbd-5f5f-11e8-bc74-36e6bb280816",
            "kind": {"group": "", "version": "v1", "kind": "Pod"},
            "resource": {"group": "", "version": "v1", "resource": "pods"},
            "requestKind": {"group": "", "version": "v1", "kind": "Pod"},
            "requestResource": {"group": "", "version": "v1", "resource": "pods"},
            "name": pod["metadata"]["name"],
            "namespace": namespace,
            "operation": "CREATE",
            "userInfo": {"username": "system:serviceaccount:kube-system:replicaset-controller"},
            "dryRun": false,
            "object": pod
        }
    })
}
