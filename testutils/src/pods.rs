use pf_core::klabel;
use pf_core::prelude::*;
use rstest::fixture;
use serde_json::json;

use crate::constants::*;

#[fixture]
pub fn test_pod(#[default(TEST_POD_NAME)] name: &str, #[default(TEST_POD_IP)] ip: &str) -> corev1::Pod {
    corev1::Pod {
        metadata: metav1::ObjectMeta {
            name: Some(name.into()),
            namespace: Some(TEST_NAMESPACE.into()),
            labels: klabel!("app" => TEST_APP_LABEL),
            ..Default::default()
        },
        status: Some(corev1::PodStatus {
            phase: Some(if ip.is_empty() { "Pending" } else { "Running" }.into()),
            pod_ip: (!ip.is_empty()).then(|| ip.into()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[fixture]
pub fn test_pending_pod(#[default(TEST_POD_NAME)] name: &str) -> corev1::Pod {
    test_pod(name, "")
}

// JSON for a pod as the apiserver would return it, with the resource version it was last written at
pub fn pod_json(name: &str, ip: &str, resource_version: &str) -> serde_json::Value {
    let mut status = json!({"phase": "Pending"});
    if !ip.is_empty() {
        status = json!({"phase": "Running", "podIP": ip});
    }

    json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": {
            "name": name,
            "namespace": TEST_NAMESPACE,
            "labels": {"app": TEST_APP_LABEL},
            "resourceVersion": resource_version,
        },
        "status": status,
    })
}

pub fn pod_list_json(pods: Vec<serde_json::Value>, resource_version: &str) -> serde_json::Value {
    json!({
        "kind": "PodList",
        "apiVersion": "v1",
        "metadata": {"resourceVersion": resource_version},
        "items": pods,
    })
}

// A watch response body is a stream of newline-delimited WatchEvent objects
pub fn watch_body(events: Vec<(&str, serde_json::Value)>) -> String {
    events
        .into_iter()
        .map(|(kind, obj)| json!({"type": kind, "object": obj}).to_string() + "\n")
        .collect()
}

pub fn watch_bookmark_json(resource_version: &str) -> serde_json::Value {
    json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": {"resourceVersion": resource_version},
    })
}
