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

use crate::infrastructure::kubernetes::client::KubeClusterClient;
use crate::shared::error::KbackupError;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::Client;
use std::path::PathBuf;

/// A kubeconfig context that was found and connected to.
pub struct ResolvedContext {
    pub name: String,
    pub cluster: Option<String>,
    pub server_version: String,
    pub client: KubeClusterClient,
}

/// Selects a context from kubeconfig and establishes a connection for it.
#[derive(Debug, Clone, Default)]
pub struct ContextResolver {
    kubeconfig_path: Option<PathBuf>,
}

impl ContextResolver {
    pub fn new(kubeconfig_path: Option<PathBuf>) -> Self {
        Self { kubeconfig_path }
    }

    pub async fn resolve(&self, context: &str) -> Result<ResolvedContext, KbackupError> {
        let kubeconfig = self.load_kubeconfig(context)?;
        let cluster = select_context(&kubeconfig, context)?;

        let options = KubeConfigOptions {
            context: Some(context.to_string()),
            cluster: None,
            user: None,
        };

        let config = kube::Config::from_custom_kubeconfig(kubeconfig, &options)
            .await
            .map_err(|e| KbackupError::connection(context, e))?;

        let client = Client::try_from(config).map_err(|e| KbackupError::connection(context, e))?;

        // Kubeconfig parsing succeeds offline; the version call is what proves
        // credentials and reachability.
        let info = client
            .apiserver_version()
            .await
            .map_err(|e| KbackupError::connection(context, e))?;

        tracing::info!(
            context = %context,
            server_version = %info.git_version,
            "Connected to cluster"
        );

        Ok(ResolvedContext {
            name: context.to_string(),
            cluster,
            server_version: info.git_version,
            client: KubeClusterClient::new(client),
        })
    }

    fn load_kubeconfig(&self, context: &str) -> Result<Kubeconfig, KbackupError> {
        let kubeconfig = match &self.kubeconfig_path {
            Some(path) => Kubeconfig::read_from(path),
            None => Kubeconfig::read(),
        };

        kubeconfig.map_err(|e| {
            KbackupError::context_not_found(context, format!("failed to load kubeconfig: {}", e))
        })
    }
}

/// Checks that `context` is one of the kubeconfig contexts and returns the
/// name of the cluster it points at.
pub fn select_context(
    kubeconfig: &Kubeconfig,
    context: &str,
) -> Result<Option<String>, KbackupError> {
    match kubeconfig.contexts.iter().find(|ctx| ctx.name == context) {
        Some(named) => Ok(named.context.as_ref().map(|c| c.cluster.clone())),
        None => {
            let available = kubeconfig
                .contexts
                .iter()
                .map(|ctx| ctx.name.as_str())
                .collect::<Vec<_>>();
            let reason = if available.is_empty() {
                "kubeconfig defines no contexts".to_string()
            } else {
                format!("available contexts: {}", available.join(", "))
            };
            Err(KbackupError::context_not_found(context, reason))
        }
    }
}
