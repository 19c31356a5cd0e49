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

use crate::infrastructure::constants::MANIFEST_EXTENSION;
use crate::shared::error::KbackupError;
use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Result of handing one manifest to the writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub path: PathBuf,
    /// False in dry-run mode.
    pub written: bool,
    pub bytes: usize,
}

/// Writes manifests to `<root>/<namespace>/<kind>/<name>.yaml`.
#[derive(Debug, Clone)]
pub struct BackupWriter {
    root: PathBuf,
    dry_run: bool,
}

impl BackupWriter {
    pub fn new(root: impl Into<PathBuf>, dry_run: bool) -> Self {
        Self {
            root: root.into(),
            dry_run,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn manifest_path(
        &self,
        namespace: &str,
        kind: &str,
        name: &str,
    ) -> Result<PathBuf, KbackupError> {
        for component in [namespace, kind, name] {
            validate_component(&self.root, component)?;
        }
        // Not set_extension: names like "app.config" must keep their dots.
        Ok(self
            .root
            .join(namespace)
            .join(kind)
            .join(format!("{}.{}", name, MANIFEST_EXTENSION)))
    }

    /// Serializes `document` and writes it, replacing whatever was there.
    pub async fn write(
        &self,
        namespace: &str,
        kind: &str,
        name: &str,
        document: &Value,
    ) -> Result<WriteOutcome, KbackupError> {
        let path = self.manifest_path(namespace, kind, name)?;
        let content =
            serde_yaml::to_string(document).map_err(|e| KbackupError::Serialization {
                resource: format!("{}/{}/{}", namespace, kind, name),
                source: e,
            })?;

        if self.dry_run {
            tracing::info!(path = %path.display(), "[dry-run] would write manifest");
            return Ok(WriteOutcome {
                path,
                written: false,
                bytes: content.len(),
            });
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| KbackupError::write(parent, e))?;
        }

        let mut file = fs::File::create(&path)
            .await
            .map_err(|e| KbackupError::write(&path, e))?;

        file.write_all(content.as_bytes())
            .await
            .map_err(|e| KbackupError::write(&path, e))?;

        file.flush()
            .await
            .map_err(|e| KbackupError::write(&path, e))?;

        tracing::debug!(path = %path.display(), bytes = content.len(), "Wrote manifest");

        Ok(WriteOutcome {
            path,
            written: true,
            bytes: content.len(),
        })
    }
}

fn validate_component(root: &Path, component: &str) -> Result<(), KbackupError> {
    let invalid = component.is_empty()
        || component == "."
        || component == ".."
        || component.contains('/')
        || component.contains('\\');

    if invalid {
        return Err(KbackupError::write(
            root.join(component),
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("'{}' is not a valid path component", component),
            ),
        ));
    }
    Ok(())
}
