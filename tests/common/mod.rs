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

//! In-memory cluster shared by the integration tests

#![allow(dead_code)]

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscaler;
use k8s_openapi::api::core::v1::{
    ConfigMap, PersistentVolumeClaim, Secret, Service, ServiceAccount,
};
use k8s_openapi::api::networking::v1::Ingress;
use kbackup::{ClusterClient, KbackupError};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Objects keyed by namespace, stored as JSON and decoded on request.
#[derive(Default)]
pub struct InMemoryCluster {
    pub namespaces: Vec<String>,
    objects: BTreeMap<(String, String), Vec<Value>>,
    /// Namespace whose deployment listing fails
    pub failing_namespace: Option<String>,
    pub namespace_calls: AtomicUsize,
    pub api_calls: AtomicUsize,
}

impl InMemoryCluster {
    pub fn new(namespaces: &[&str]) -> Self {
        Self {
            namespaces: namespaces.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn with(mut self, namespace: &str, kind: &str, object: Value) -> Self {
        self.objects
            .entry((namespace.to_string(), kind.to_string()))
            .or_default()
            .push(object);
        self
    }

    pub fn failing_in(mut self, namespace: &str) -> Self {
        self.failing_namespace = Some(namespace.to_string());
        self
    }

    pub fn namespace_calls(&self) -> usize {
        self.namespace_calls.load(Ordering::SeqCst)
    }

    pub fn api_calls(&self) -> usize {
        self.api_calls.load(Ordering::SeqCst)
    }

    fn list<K: DeserializeOwned>(&self, namespace: &str, kind: &str) -> Vec<K> {
        self.api_calls.fetch_add(1, Ordering::SeqCst);
        self.objects
            .get(&(namespace.to_string(), kind.to_string()))
            .map(|items| {
                items
                    .iter()
                    .map(|v| serde_json::from_value(v.clone()).unwrap())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn get<K: DeserializeOwned>(&self, namespace: &str, kind: &str, name: &str) -> Option<K> {
        self.api_calls.fetch_add(1, Ordering::SeqCst);
        self.objects
            .get(&(namespace.to_string(), kind.to_string()))
            .and_then(|items| items.iter().find(|v| v["metadata"]["name"] == name))
            .map(|v| serde_json::from_value(v.clone()).unwrap())
    }
}

#[async_trait::async_trait]
impl ClusterClient for InMemoryCluster {
    async fn list_namespaces(&self) -> Result<Vec<String>, KbackupError> {
        self.namespace_calls.fetch_add(1, Ordering::SeqCst);
        self.api_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.namespaces.clone())
    }

    async fn list_deployments(&self, namespace: &str) -> Result<Vec<Deployment>, KbackupError> {
        if self.failing_namespace.as_deref() == Some(namespace) {
            return Err(KbackupError::enumeration(
                format!("list Deployment in namespace '{}'", namespace),
                api_error(500, "etcdserver: request timed out"),
            ));
        }
        Ok(self.list(namespace, "Deployment"))
    }

    async fn list_services(&self, namespace: &str) -> Result<Vec<Service>, KbackupError> {
        Ok(self.list(namespace, "Service"))
    }

    async fn list_ingresses(&self, namespace: &str) -> Result<Vec<Ingress>, KbackupError> {
        Ok(self.list(namespace, "Ingress"))
    }

    async fn list_hpas(
        &self,
        namespace: &str,
    ) -> Result<Vec<HorizontalPodAutoscaler>, KbackupError> {
        Ok(self.list(namespace, "HorizontalPodAutoscaler"))
    }

    async fn get_configmap(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ConfigMap>, KbackupError> {
        Ok(self.get(namespace, "ConfigMap", name))
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, KbackupError> {
        Ok(self.get(namespace, "Secret", name))
    }

    async fn get_pvc(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<PersistentVolumeClaim>, KbackupError> {
        Ok(self.get(namespace, "PersistentVolumeClaim", name))
    }

    async fn get_service_account(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ServiceAccount>, KbackupError> {
        Ok(self.get(namespace, "ServiceAccount", name))
    }
}

pub fn api_error(code: u16, message: &str) -> kube::Error {
    kube::Error::Api(kube::core::ErrorResponse {
        status: "Failure".to_string(),
        message: message.to_string(),
        reason: "InternalError".to_string(),
        code,
    })
}

pub fn deployment(namespace: &str, name: &str, pod_spec: Value) -> Value {
    let mut spec = json!({"containers": [{"name": name, "image": "nginx:1.27"}]});
    if let (Some(base), Some(extra)) = (spec.as_object_mut(), pod_spec.as_object()) {
        for (k, v) in extra {
            base.insert(k.clone(), v.clone());
        }
    }

    json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": {"name": name, "namespace": namespace, "uid": format!("uid-{name}")},
        "spec": {
            "replicas": 2,
            "selector": {"matchLabels": {"app": name}},
            "template": {
                "metadata": {"labels": {"app": name}},
                "spec": spec
            }
        },
        "status": {"replicas": 2, "readyReplicas": 2}
    })
}

pub fn service(namespace: &str, name: &str, app: &str) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Service",
        "metadata": {"name": name, "namespace": namespace},
        "spec": {"selector": {"app": app}, "ports": [{"port": 80}]},
        "status": {"loadBalancer": {}}
    })
}

pub fn ingress(namespace: &str, name: &str, service: &str) -> Value {
    json!({
        "apiVersion": "networking.k8s.io/v1",
        "kind": "Ingress",
        "metadata": {"name": name, "namespace": namespace},
        "spec": {"rules": [{"host": "example.com", "http": {"paths": [{
            "path": "/",
            "pathType": "Prefix",
            "backend": {"service": {"name": service, "port": {"number": 80}}}
        }]}}]}
    })
}

pub fn hpa(namespace: &str, name: &str, deployment: &str) -> Value {
    json!({
        "apiVersion": "autoscaling/v2",
        "kind": "HorizontalPodAutoscaler",
        "metadata": {"name": name, "namespace": namespace},
        "spec": {
            "scaleTargetRef": {"apiVersion": "apps/v1", "kind": "Deployment", "name": deployment},
            "minReplicas": 1,
            "maxReplicas": 5
        }
    })
}

pub fn named(namespace: &str, kind: &str, name: &str) -> Value {
    let mut object = json!({
        "apiVersion": "v1",
        "kind": kind,
        "metadata": {"name": name, "namespace": namespace}
    });
    if kind == "PersistentVolumeClaim" {
        object["spec"] = json!({"accessModes": ["ReadWriteOnce"]});
    }
    object
}
