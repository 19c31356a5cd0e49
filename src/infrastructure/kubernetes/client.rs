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

use crate::shared::error::KbackupError;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscaler;
use k8s_openapi::api::core::v1::{
    ConfigMap, Namespace, PersistentVolumeClaim, Secret, Service, ServiceAccount,
};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::NamespaceResourceScope;
use kube::api::ListParams;
use kube::{Api, Client, Resource};
use serde::de::DeserializeOwned;
use std::fmt::Debug;

/// Read-only view of a cluster, as needed by the resource enumerator.
///
/// `get_*` methods return `Ok(None)` when the object does not exist so that a
/// dangling reference from a pod template is not mistaken for an API failure.
#[async_trait::async_trait]
pub trait ClusterClient: Send + Sync {
    async fn list_namespaces(&self) -> Result<Vec<String>, KbackupError>;

    async fn list_deployments(&self, namespace: &str) -> Result<Vec<Deployment>, KbackupError>;

    async fn list_services(&self, namespace: &str) -> Result<Vec<Service>, KbackupError>;

    async fn list_ingresses(&self, namespace: &str) -> Result<Vec<Ingress>, KbackupError>;

    async fn list_hpas(
        &self,
        namespace: &str,
    ) -> Result<Vec<HorizontalPodAutoscaler>, KbackupError>;

    async fn get_configmap(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ConfigMap>, KbackupError>;

    async fn get_secret(&self, namespace: &str, name: &str)
        -> Result<Option<Secret>, KbackupError>;

    async fn get_pvc(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<PersistentVolumeClaim>, KbackupError>;

    async fn get_service_account(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ServiceAccount>, KbackupError>;
}

pub struct KubeClusterClient {
    client: Client,
}

impl KubeClusterClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn list_namespaced<K>(&self, namespace: &str) -> Result<Vec<K>, KbackupError>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
        <K as Resource>::DynamicType: Default,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        let kind = K::kind(&Default::default()).to_string();

        api.list(&ListParams::default())
            .await
            .map(|list| list.items)
            .map_err(|e| {
                KbackupError::enumeration(
                    format!("list {} in namespace '{}'", kind, namespace),
                    e,
                )
            })
    }

    async fn get_namespaced<K>(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<K>, KbackupError>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
        <K as Resource>::DynamicType: Default,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        let kind = K::kind(&Default::default()).to_string();

        api.get_opt(name).await.map_err(|e| {
            KbackupError::enumeration(
                format!("get {} '{}' in namespace '{}'", kind, name, namespace),
                e,
            )
        })
    }
}

#[async_trait::async_trait]
impl ClusterClient for KubeClusterClient {
    async fn list_namespaces(&self) -> Result<Vec<String>, KbackupError> {
        let api: Api<Namespace> = Api::all(self.client.clone());

        let namespaces = api
            .list(&ListParams::default())
            .await
            .map_err(|e| KbackupError::enumeration("list namespaces", e))?;

        Ok(namespaces
            .items
            .into_iter()
            .filter_map(|ns| ns.metadata.name)
            .collect())
    }

    async fn list_deployments(&self, namespace: &str) -> Result<Vec<Deployment>, KbackupError> {
        self.list_namespaced(namespace).await
    }

    async fn list_services(&self, namespace: &str) -> Result<Vec<Service>, KbackupError> {
        self.list_namespaced(namespace).await
    }

    async fn list_ingresses(&self, namespace: &str) -> Result<Vec<Ingress>, KbackupError> {
        self.list_namespaced(namespace).await
    }

    async fn list_hpas(
        &self,
        namespace: &str,
    ) -> Result<Vec<HorizontalPodAutoscaler>, KbackupError> {
        self.list_namespaced(namespace).await
    }

    async fn get_configmap(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ConfigMap>, KbackupError> {
        self.get_namespaced(namespace, name).await
    }

    async fn get_secret(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Secret>, KbackupError> {
        self.get_namespaced(namespace, name).await
    }

    async fn get_pvc(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<PersistentVolumeClaim>, KbackupError> {
        self.get_namespaced(namespace, name).await
    }

    async fn get_service_account(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ServiceAccount>, KbackupError> {
        self.get_namespaced(namespace, name).await
    }
}
