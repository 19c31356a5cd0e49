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

use crate::domain::config::file::BackupFileConf;
use crate::infrastructure::constants::{DEFAULT_FILTER, DEFAULT_OUTPUT_DIR, NAMESPACE_NAME_PATTERN};
use crate::shared::error::KbackupError;
use regex::Regex;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Everything one backup run needs. Built once, then only read.
///
/// Defaults: filter `.`, no excluded namespaces, output under `./backup`,
/// real writes, kubeconfig from `KUBECONFIG` or `~/.kube/config`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupConfig {
    pub context: String,
    pub filter: String,
    pub exclude_namespaces: BTreeSet<String>,
    pub output_dir: PathBuf,
    pub dry_run: bool,
    pub kubeconfig: Option<PathBuf>,
}

impl BackupConfig {
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            filter: DEFAULT_FILTER.to_string(),
            exclude_namespaces: BTreeSet::new(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            dry_run: false,
            kubeconfig: None,
        }
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    pub fn with_excluded<I, S>(mut self, namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_namespaces
            .extend(namespaces.into_iter().map(Into::into));
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_kubeconfig(mut self, path: Option<PathBuf>) -> Self {
        self.kubeconfig = path;
        self
    }

    /// Fills in whatever the command line left unset from the config file.
    /// Excludes from both sources are merged.
    pub fn with_file_defaults(
        mut self,
        file: &BackupFileConf,
        filter_from_cli: bool,
        dir_from_cli: bool,
    ) -> Self {
        if !filter_from_cli {
            if let Some(filter) = &file.filter {
                self.filter = filter.clone();
            }
        }
        if !dir_from_cli {
            if let Some(dir) = &file.dir {
                self.output_dir = PathBuf::from(dir);
            }
        }
        if self.kubeconfig.is_none() {
            self.kubeconfig = file.kubeconfig.as_ref().map(PathBuf::from);
        }
        self.exclude_namespaces.extend(file.exclude.iter().cloned());
        self
    }

    pub fn is_excluded(&self, namespace: &str) -> bool {
        self.exclude_namespaces.contains(namespace)
    }

    pub fn validate(&self) -> Result<(), KbackupError> {
        if self.context.trim().is_empty() {
            return Err(KbackupError::config_error("context must not be empty"));
        }

        if self.output_dir.as_os_str().is_empty() {
            return Err(KbackupError::config_error(
                "output directory must not be empty",
            ));
        }

        let re = Regex::new(NAMESPACE_NAME_PATTERN)
            .map_err(|e| KbackupError::config_error(format!("Invalid namespace pattern: {}", e)))?;

        for namespace in self.unmatchable_excludes(&re) {
            tracing::warn!(
                namespace = %namespace,
                "Excluded namespace is not a valid namespace name and will never match"
            );
        }

        Ok(())
    }

    /// Exclude entries that no namespace can be named, such as `Kube-System`.
    fn unmatchable_excludes<'a>(&'a self, re: &'a Regex) -> impl Iterator<Item = &'a str> + 'a {
        self.exclude_namespaces
            .iter()
            .map(String::as_str)
            .filter(move |ns| !re.is_match(ns))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BackupConfig::new("prod");
        assert_eq!(config.filter, ".");
        assert!(config.exclude_namespaces.is_empty());
        assert_eq!(config.output_dir, PathBuf::from("backup"));
        assert!(!config.dry_run);
        assert!(config.kubeconfig.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_exclusion_is_exact_and_case_sensitive() {
        let config = BackupConfig::new("prod").with_excluded(["kube-system"]);
        assert!(config.is_excluded("kube-system"));
        assert!(!config.is_excluded("Kube-System"));
        assert!(!config.is_excluded("kube"));
    }

    #[test]
    fn test_file_defaults_precedence() {
        let file = BackupFileConf {
            filter: Some("del(.status)".to_string()),
            exclude: vec!["kube-public".to_string()],
            dir: Some("/srv/backup".to_string()),
            kubeconfig: Some("/etc/kube/config".to_string()),
        };

        let config = BackupConfig::new("prod")
            .with_filter(".spec")
            .with_excluded(["kube-system"])
            .with_file_defaults(&file, true, false);

        assert_eq!(config.filter, ".spec");
        assert_eq!(config.output_dir, PathBuf::from("/srv/backup"));
        assert_eq!(config.kubeconfig, Some(PathBuf::from("/etc/kube/config")));
        assert!(config.is_excluded("kube-system"));
        assert!(config.is_excluded("kube-public"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(BackupConfig::new("  ").validate().is_err());
        assert!(BackupConfig::new("prod")
            .with_output_dir("")
            .validate()
            .is_err());
    }

    #[test]
    fn test_unmatchable_excludes_are_accepted() {
        let config =
            BackupConfig::new("prod").with_excluded(["kube-system", "Kube-System", "bad name"]);
        assert!(config.validate().is_ok());
        assert!(config.is_excluded("Kube-System"));

        let re = Regex::new(NAMESPACE_NAME_PATTERN).unwrap();
        let unmatchable: Vec<&str> = config.unmatchable_excludes(&re).collect();
        assert_eq!(unmatchable, vec!["Kube-System", "bad name"]);
    }

    #[test]
    fn test_mixed_case_exclude_never_matches_lowercase() {
        let config = BackupConfig::new("prod").with_excluded(["Kube-System"]);
        assert!(config.validate().is_ok());
        assert!(!config.is_excluded("kube-system"));
    }
}
