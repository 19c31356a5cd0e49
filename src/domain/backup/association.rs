// Copyright 2025 JiangLong.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Rules deciding which resources belong to a deployment.
//!
//! - Services: selector is non-empty and a subset of the pod template labels
//! - Ingresses: route to one of those services
//! - HPAs: `scaleTargetRef` names the deployment
//! - ConfigMaps, Secrets, PVCs and the ServiceAccount: referenced by name
//!   from the pod template
//!
//! Rules operate on the JSON form of the objects so they read the same
//! fields the backup files contain.

use crate::infrastructure::constants::{DEFAULT_SERVICE_ACCOUNT, KIND_DEPLOYMENT};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Names the pod template of a deployment refers to.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PodReferences {
    pub config_maps: BTreeSet<String>,
    pub secrets: BTreeSet<String>,
    pub persistent_volume_claims: BTreeSet<String>,
    pub service_account: Option<String>,
}

pub fn pod_template_labels(deployment: &Value) -> BTreeMap<String, String> {
    string_map(deployment.pointer("/spec/template/metadata/labels"))
}

pub fn service_selects(service: &Value, pod_labels: &BTreeMap<String, String>) -> bool {
    let selector = string_map(service.pointer("/spec/selector"));
    !selector.is_empty()
        && selector
            .iter()
            .all(|(k, v)| pod_labels.get(k).is_some_and(|label| label == v))
}

pub fn ingress_routes_to(ingress: &Value, services: &BTreeSet<String>) -> bool {
    let default_backend = ingress.pointer("/spec/defaultBackend/service/name");
    let rule_backends = items(ingress.pointer("/spec/rules"))
        .flat_map(|rule| items(rule.pointer("/http/paths")))
        .filter_map(|path| path.pointer("/backend/service/name"));

    default_backend
        .into_iter()
        .chain(rule_backends)
        .filter_map(Value::as_str)
        .any(|name| services.contains(name))
}

pub fn hpa_targets(hpa: &Value, deployment_name: &str) -> bool {
    let kind = hpa.pointer("/spec/scaleTargetRef/kind").and_then(Value::as_str);
    let name = hpa.pointer("/spec/scaleTargetRef/name").and_then(Value::as_str);
    kind == Some(KIND_DEPLOYMENT) && name == Some(deployment_name)
}

pub fn pod_references(deployment: &Value) -> PodReferences {
    let mut refs = PodReferences::default();
    let Some(pod_spec) = deployment.pointer("/spec/template/spec") else {
        return refs;
    };

    for volume in items(pod_spec.get("volumes")) {
        insert_str(&mut refs.config_maps, volume.pointer("/configMap/name"));
        insert_str(&mut refs.secrets, volume.pointer("/secret/secretName"));
        insert_str(
            &mut refs.persistent_volume_claims,
            volume.pointer("/persistentVolumeClaim/claimName"),
        );
        for source in items(volume.pointer("/projected/sources")) {
            insert_str(&mut refs.config_maps, source.pointer("/configMap/name"));
            insert_str(&mut refs.secrets, source.pointer("/secret/name"));
        }
    }

    let containers = items(pod_spec.get("containers")).chain(items(pod_spec.get("initContainers")));
    for container in containers {
        for env_from in items(container.get("envFrom")) {
            insert_str(&mut refs.config_maps, env_from.pointer("/configMapRef/name"));
            insert_str(&mut refs.secrets, env_from.pointer("/secretRef/name"));
        }
        for env in items(container.get("env")) {
            insert_str(
                &mut refs.config_maps,
                env.pointer("/valueFrom/configMapKeyRef/name"),
            );
            insert_str(&mut refs.secrets, env.pointer("/valueFrom/secretKeyRef/name"));
        }
    }

    for pull_secret in items(pod_spec.get("imagePullSecrets")) {
        insert_str(&mut refs.secrets, pull_secret.get("name"));
    }

    refs.service_account = pod_spec
        .get("serviceAccountName")
        .or_else(|| pod_spec.get("serviceAccount"))
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty() && *name != DEFAULT_SERVICE_ACCOUNT)
        .map(str::to_string);

    refs
}

fn items(value: Option<&Value>) -> impl Iterator<Item = &Value> {
    value
        .and_then(Value::as_array)
        .into_iter()
        .flat_map(|array| array.iter())
}

fn insert_str(set: &mut BTreeSet<String>, value: Option<&Value>) {
    if let Some(name) = value.and_then(Value::as_str).filter(|s| !s.is_empty()) {
        set.insert(name.to_string());
    }
}

fn string_map(value: Option<&Value>) -> BTreeMap<String, String> {
    value
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn deployment() -> Value {
        json!({
            "kind": "Deployment",
            "metadata": {"name": "web"},
            "spec": {
                "selector": {"matchLabels": {"app": "web"}},
                "template": {
                    "metadata": {"labels": {"app": "web", "tier": "frontend"}},
                    "spec": {
                        "serviceAccountName": "web-sa",
                        "imagePullSecrets": [{"name": "registry"}],
                        "volumes": [
                            {"name": "cfg", "configMap": {"name": "web-config"}},
                            {"name": "tls", "secret": {"secretName": "web-tls"}},
                            {"name": "data", "persistentVolumeClaim": {"claimName": "web-data"}},
                            {"name": "bundle", "projected": {"sources": [
                                {"configMap": {"name": "ca-bundle"}},
                                {"secret": {"name": "token"}}
                            ]}}
                        ],
                        "initContainers": [{
                            "name": "init",
                            "envFrom": [{"configMapRef": {"name": "init-env"}}]
                        }],
                        "containers": [{
                            "name": "web",
                            "envFrom": [{"secretRef": {"name": "web-env"}}],
                            "env": [
                                {"name": "A", "valueFrom": {"configMapKeyRef": {"name": "flags", "key": "a"}}},
                                {"name": "B", "valueFrom": {"secretKeyRef": {"name": "db", "key": "pw"}}},
                                {"name": "C", "value": "plain"}
                            ]
                        }]
                    }
                }
            }
        })
    }

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_pod_references() {
        let refs = pod_references(&deployment());
        assert_eq!(
            refs.config_maps,
            set(&["ca-bundle", "flags", "init-env", "web-config"])
        );
        assert_eq!(
            refs.secrets,
            set(&["db", "registry", "token", "web-env", "web-tls"])
        );
        assert_eq!(refs.persistent_volume_claims, set(&["web-data"]));
        assert_eq!(refs.service_account.as_deref(), Some("web-sa"));
    }

    #[test]
    fn test_default_service_account_is_ignored() {
        let dep = json!({"spec": {"template": {"spec": {"serviceAccountName": "default"}}}});
        assert_eq!(pod_references(&dep).service_account, None);

        let legacy = json!({"spec": {"template": {"spec": {"serviceAccount": "legacy"}}}});
        assert_eq!(
            pod_references(&legacy).service_account.as_deref(),
            Some("legacy")
        );
    }

    #[test]
    fn test_service_selector_subset() {
        let labels = pod_template_labels(&deployment());
        assert!(service_selects(
            &json!({"spec": {"selector": {"app": "web"}}}),
            &labels
        ));
        assert!(service_selects(
            &json!({"spec": {"selector": {"app": "web", "tier": "frontend"}}}),
            &labels
        ));
        assert!(!service_selects(
            &json!({"spec": {"selector": {"app": "web", "tier": "backend"}}}),
            &labels
        ));
        assert!(!service_selects(&json!({"spec": {"selector": {}}}), &labels));
        assert!(!service_selects(&json!({"spec": {}}), &labels));
    }

    #[test]
    fn test_ingress_backends() {
        let services = set(&["web-svc"]);
        let routed = json!({"spec": {"rules": [{"http": {"paths": [
            {"path": "/", "backend": {"service": {"name": "web-svc", "port": {"number": 80}}}}
        ]}}]}});
        let default_backend = json!({"spec": {"defaultBackend": {"service": {"name": "web-svc"}}}});
        let other = json!({"spec": {"rules": [{"http": {"paths": [
            {"backend": {"service": {"name": "api-svc"}}}
        ]}}]}});

        assert!(ingress_routes_to(&routed, &services));
        assert!(ingress_routes_to(&default_backend, &services));
        assert!(!ingress_routes_to(&other, &services));
        assert!(!ingress_routes_to(&routed, &BTreeSet::new()));
    }

    #[test]
    fn test_hpa_target() {
        let hpa = json!({"spec": {"scaleTargetRef": {"kind": "Deployment", "name": "web"}}});
        assert!(hpa_targets(&hpa, "web"));
        assert!(!hpa_targets(&hpa, "api"));

        let sts = json!({"spec": {"scaleTargetRef": {"kind": "StatefulSet", "name": "web"}}});
        assert!(!hpa_targets(&sts, "web"));
    }
}
