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

use crate::domain::backup::enumerator::ResourceEnumerator;
use crate::domain::backup::report::BackupReport;
use crate::domain::backup::state::BackupState;
use crate::domain::config::BackupConfig;
use crate::domain::filter::ManifestFilter;
use crate::infrastructure::kubernetes::{ClusterClient, ContextResolver};
use crate::infrastructure::storage::BackupWriter;
use crate::shared::error::KbackupError;

/// Runs one backup: resolve the context, walk the cluster, filter each
/// manifest and write it out. Stops at the first error.
pub struct ClusterBackupService {
    config: BackupConfig,
    filter: ManifestFilter,
    writer: BackupWriter,
}

impl ClusterBackupService {
    /// Validates the configuration and compiles the filter. Nothing touches
    /// the cluster or the disk until [`ClusterBackupService::backup`].
    pub fn new(config: BackupConfig) -> Result<Self, KbackupError> {
        config.validate()?;
        let filter = ManifestFilter::compile(&config.filter)?;
        let writer = BackupWriter::new(&config.output_dir, config.dry_run);

        Ok(Self {
            config,
            filter,
            writer,
        })
    }

    pub fn config(&self) -> &BackupConfig {
        &self.config
    }

    pub async fn backup(&self) -> Result<BackupReport, KbackupError> {
        let mut run = Run::new();

        let resolver = ContextResolver::new(self.config.kubeconfig.clone());
        let resolved = resolver
            .resolve(&self.config.context)
            .await
            .map_err(|e| run.abort(e))?;

        tracing::info!(
            context = %resolved.name,
            cluster = resolved.cluster.as_deref().unwrap_or("<none>"),
            server_version = %resolved.server_version,
            "Context resolved"
        );
        run.advance(BackupState::ContextResolved);

        self.walk(&resolved.client, run).await
    }

    /// Backs up through an already connected client.
    pub async fn backup_with_client(
        &self,
        client: &dyn ClusterClient,
    ) -> Result<BackupReport, KbackupError> {
        let mut run = Run::new();
        run.advance(BackupState::ContextResolved);
        self.walk(client, run).await
    }

    async fn walk(
        &self,
        client: &dyn ClusterClient,
        mut run: Run,
    ) -> Result<BackupReport, KbackupError> {
        let mut report = BackupReport::new(
            &self.config.context,
            self.writer.root(),
            self.filter.source(),
            self.writer.is_dry_run(),
        );
        let mut enumerator = ResourceEnumerator::new(client, &self.config.exclude_namespaces);

        run.advance(BackupState::Enumerating);
        while let Some(manifest) = enumerator.next().await.map_err(|e| run.abort(e))? {
            run.advance(BackupState::Filtering);
            let document = self
                .filter
                .apply(&manifest.document)
                .map_err(|message| run.abort(KbackupError::filter(manifest.to_string(), message)))?;

            run.advance(BackupState::Writing);
            let outcome = self
                .writer
                .write(&manifest.namespace, &manifest.kind, &manifest.name, &document)
                .await
                .map_err(|e| run.abort(e))?;

            report.record(&manifest, outcome);
            run.processed += 1;
            run.advance(BackupState::Enumerating);
        }

        report.excluded_namespaces = enumerator.skipped_namespaces().to_vec();
        run.advance(BackupState::Completed);
        report.finish();

        tracing::info!(
            resources = report.total(),
            dry_run = report.dry_run,
            output_dir = %report.output_dir.display(),
            "Backup completed"
        );

        Ok(report)
    }
}

struct Run {
    state: BackupState,
    processed: usize,
}

impl Run {
    fn new() -> Self {
        Self {
            state: BackupState::Initializing,
            processed: 0,
        }
    }

    fn advance(&mut self, next: BackupState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "invalid transition {} -> {}",
            self.state,
            next
        );
        tracing::debug!(from = %self.state, to = %next, "Backup state");
        self.state = next;
    }

    fn abort(&mut self, err: KbackupError) -> KbackupError {
        let stage = self.state;
        self.advance(BackupState::Failed);
        tracing::error!(stage = %stage, processed = self.processed, error = %err, "Backup failed");

        KbackupError::Aborted {
            stage,
            processed: self.processed,
            source: Box::new(err),
        }
    }
}
