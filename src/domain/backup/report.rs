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

use crate::domain::backup::manifest::Manifest;
use crate::infrastructure::storage::WriteOutcome;
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// What a finished run processed. Only counts are kept, so memory stays
/// flat however many resources the cluster holds.
#[derive(Debug, Clone)]
pub struct BackupReport {
    pub context: String,
    pub output_dir: PathBuf,
    pub filter: String,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub by_kind: BTreeMap<String, usize>,
    pub by_namespace: BTreeMap<String, usize>,
    pub excluded_namespaces: Vec<String>,
    pub resources: usize,
    pub bytes: usize,
}

impl BackupReport {
    pub fn new(
        context: impl Into<String>,
        output_dir: impl Into<PathBuf>,
        filter: impl Into<String>,
        dry_run: bool,
    ) -> Self {
        Self {
            context: context.into(),
            output_dir: output_dir.into(),
            filter: filter.into(),
            dry_run,
            started_at: Utc::now(),
            finished_at: None,
            by_kind: BTreeMap::new(),
            by_namespace: BTreeMap::new(),
            excluded_namespaces: Vec::new(),
            resources: 0,
            bytes: 0,
        }
    }

    pub fn record(&mut self, manifest: &Manifest, outcome: WriteOutcome) {
        *self.by_kind.entry(manifest.kind.clone()).or_default() += 1;
        *self
            .by_namespace
            .entry(manifest.namespace.clone())
            .or_default() += 1;
        self.bytes += outcome.bytes;
        self.resources += 1;
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn total(&self) -> usize {
        self.resources
    }

    pub fn duration(&self) -> Duration {
        self.finished_at.unwrap_or_else(Utc::now) - self.started_at
    }
}
