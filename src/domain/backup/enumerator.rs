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

use crate::domain::backup::association::{self, PodReferences};
use crate::domain::backup::manifest::Manifest;
use crate::infrastructure::constants::{
    KIND_CONFIGMAP, KIND_PVC, KIND_SECRET, KIND_SERVICE_ACCOUNT,
};
use crate::infrastructure::kubernetes::ClusterClient;
use crate::shared::error::KbackupError;
use futures::stream::{self, Stream};
use std::collections::{BTreeSet, HashSet, VecDeque};

/// Lazily walks the cluster, yielding one manifest per pull.
///
/// Namespaces are listed on the first pull. Each non-excluded namespace is
/// opened when reached: its deployments, services, ingresses and HPAs are
/// listed once, then every deployment is followed by the resources that
/// belong to it. Referenced ConfigMaps, Secrets, PVCs and ServiceAccounts
/// are fetched when they come up. A resource shared by several deployments
/// is yielded once per namespace.
pub struct ResourceEnumerator<'a> {
    client: &'a dyn ClusterClient,
    excluded: &'a BTreeSet<String>,
    namespaces: Option<VecDeque<String>>,
    current: Option<NamespaceCursor>,
    skipped: Vec<String>,
}

struct NamespaceCursor {
    namespace: String,
    deployments: VecDeque<Manifest>,
    services: Vec<Manifest>,
    ingresses: Vec<Manifest>,
    hpas: Vec<Manifest>,
    pending: VecDeque<Pending>,
    emitted: HashSet<(String, String)>,
}

enum Pending {
    Ready(Manifest),
    Lookup { kind: &'static str, name: String },
}

impl<'a> ResourceEnumerator<'a> {
    pub fn new(client: &'a dyn ClusterClient, excluded: &'a BTreeSet<String>) -> Self {
        Self {
            client,
            excluded,
            namespaces: None,
            current: None,
            skipped: Vec::new(),
        }
    }

    /// Excluded namespaces passed over so far, in listing order.
    pub fn skipped_namespaces(&self) -> &[String] {
        &self.skipped
    }

    /// Drops all progress; the next pull lists namespaces again.
    pub fn reset(&mut self) {
        self.namespaces = None;
        self.current = None;
        self.skipped.clear();
    }

    /// Returns the next manifest, `Ok(None)` once the cluster is exhausted.
    pub async fn next(&mut self) -> Result<Option<Manifest>, KbackupError> {
        let client = self.client;

        loop {
            if let Some(cursor) = self.current.as_mut() {
                if let Some(pending) = cursor.pending.pop_front() {
                    let manifest = match pending {
                        Pending::Ready(manifest) => Some(manifest),
                        Pending::Lookup { kind, name } => {
                            if cursor.emitted.contains(&(kind.to_string(), name.clone())) {
                                continue;
                            }
                            fetch_referenced(client, &cursor.namespace, kind, &name).await?
                        }
                    };

                    if let Some(manifest) = manifest {
                        if cursor
                            .emitted
                            .insert((manifest.kind.clone(), manifest.name.clone()))
                        {
                            return Ok(Some(manifest));
                        }
                    }
                    continue;
                }

                if let Some(deployment) = cursor.deployments.pop_front() {
                    cursor.expand(deployment);
                    continue;
                }

                tracing::debug!(
                    namespace = %cursor.namespace,
                    resources = cursor.emitted.len(),
                    "Namespace done"
                );
                self.current = None;
            }

            if self.namespaces.is_none() {
                let listed = client.list_namespaces().await?;
                tracing::info!(count = listed.len(), "Listed namespaces");
                self.namespaces = Some(listed.into());
            }

            let Some(namespace) = self.namespaces.as_mut().and_then(VecDeque::pop_front) else {
                return Ok(None);
            };

            if self.excluded.contains(&namespace) {
                tracing::info!(namespace = %namespace, "Skipping excluded namespace");
                self.skipped.push(namespace);
                continue;
            }

            self.current = Some(NamespaceCursor::open(client, namespace).await?);
        }
    }

    /// Stream adapter over [`ResourceEnumerator::next`].
    pub fn into_stream(self) -> impl Stream<Item = Result<Manifest, KbackupError>> + 'a {
        stream::try_unfold(self, |mut enumerator| async move {
            Ok(enumerator
                .next()
                .await?
                .map(|manifest| (manifest, enumerator)))
        })
    }
}

impl NamespaceCursor {
    async fn open(client: &dyn ClusterClient, namespace: String) -> Result<Self, KbackupError> {
        tracing::info!(namespace = %namespace, "Backing up namespace");

        let deployments = to_manifests(&namespace, client.list_deployments(&namespace).await?)?;
        let services = to_manifests(&namespace, client.list_services(&namespace).await?)?;
        let ingresses = to_manifests(&namespace, client.list_ingresses(&namespace).await?)?;
        let hpas = to_manifests(&namespace, client.list_hpas(&namespace).await?)?;

        tracing::debug!(
            namespace = %namespace,
            deployments = deployments.len(),
            services = services.len(),
            ingresses = ingresses.len(),
            hpas = hpas.len(),
            "Listed namespace resources"
        );

        Ok(Self {
            namespace,
            deployments: deployments.into(),
            services,
            ingresses,
            hpas,
            pending: VecDeque::new(),
            emitted: HashSet::new(),
        })
    }

    /// Queues a deployment followed by everything associated with it.
    fn expand(&mut self, deployment: Manifest) {
        let labels = association::pod_template_labels(&deployment.document);
        let refs = association::pod_references(&deployment.document);

        let services = self
            .services
            .iter()
            .filter(|svc| association::service_selects(&svc.document, &labels))
            .cloned()
            .collect::<Vec<_>>();
        let service_names = services
            .iter()
            .map(|svc| svc.name.clone())
            .collect::<BTreeSet<_>>();
        let ingresses = self
            .ingresses
            .iter()
            .filter(|ing| association::ingress_routes_to(&ing.document, &service_names))
            .cloned()
            .collect::<Vec<_>>();
        let hpas = self
            .hpas
            .iter()
            .filter(|hpa| association::hpa_targets(&hpa.document, &deployment.name))
            .cloned()
            .collect::<Vec<_>>();

        self.pending.push_back(Pending::Ready(deployment));
        self.pending.extend(
            services
                .into_iter()
                .chain(ingresses)
                .chain(hpas)
                .map(Pending::Ready),
        );
        self.pending.extend(lookups(refs));
    }
}

fn lookups(refs: PodReferences) -> impl Iterator<Item = Pending> {
    let lookup = |kind: &'static str| move |name: String| Pending::Lookup { kind, name };

    refs.config_maps
        .into_iter()
        .map(lookup(KIND_CONFIGMAP))
        .chain(refs.secrets.into_iter().map(lookup(KIND_SECRET)))
        .chain(
            refs.persistent_volume_claims
                .into_iter()
                .map(lookup(KIND_PVC)),
        )
        .chain(refs.service_account.into_iter().map(lookup(KIND_SERVICE_ACCOUNT)))
}

async fn fetch_referenced(
    client: &dyn ClusterClient,
    namespace: &str,
    kind: &'static str,
    name: &str,
) -> Result<Option<Manifest>, KbackupError> {
    let manifest = match kind {
        KIND_CONFIGMAP => client
            .get_configmap(namespace, name)
            .await?
            .map(|obj| Manifest::from_resource(namespace, &obj))
            .transpose()?,
        KIND_SECRET => client
            .get_secret(namespace, name)
            .await?
            .map(|obj| Manifest::from_resource(namespace, &obj))
            .transpose()?,
        KIND_PVC => client
            .get_pvc(namespace, name)
            .await?
            .map(|obj| Manifest::from_resource(namespace, &obj))
            .transpose()?,
        KIND_SERVICE_ACCOUNT => client
            .get_service_account(namespace, name)
            .await?
            .map(|obj| Manifest::from_resource(namespace, &obj))
            .transpose()?,
        _ => None,
    };

    if manifest.is_none() {
        tracing::warn!(
            namespace = %namespace,
            kind = %kind,
            name = %name,
            "Referenced resource not found, skipping"
        );
    }

    Ok(manifest)
}

fn to_manifests<K>(namespace: &str, items: Vec<K>) -> Result<Vec<Manifest>, KbackupError>
where
    K: kube::Resource<DynamicType = ()> + serde::Serialize,
{
    items
        .iter()
        .map(|item| Manifest::from_resource(namespace, item))
        .collect()
}
