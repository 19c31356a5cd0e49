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

//! Optional TOML file carrying defaults for the backup command

use crate::shared::error::KbackupError;
use serde::{Deserialize, Serialize};
use std::fs::read_to_string;

// ============================================================================
// File layout
// ============================================================================

/// Root of the config file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackupConf {
    pub backup: BackupFileConf,
}

/// `[backup]` section; every key is optional
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackupFileConf {
    pub filter: Option<String>,
    pub exclude: Vec<String>,
    pub dir: Option<String>,
    pub kubeconfig: Option<String>,
}

impl BackupConf {
    pub fn from<T: AsRef<str>>(path: T) -> Result<Self, KbackupError> {
        let content = read_to_string(path.as_ref()).map_err(|e| {
            KbackupError::config_error(format!(
                "Failed to read config file {}: {}",
                path.as_ref(),
                e
            ))
        })?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, KbackupError> {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_file() {
        let conf = BackupConf::parse(
            r#"
[backup]
filter = "del(.status)"
exclude = ["kube-system", "kube-public"]
dir = "/var/backups/k8s"
kubeconfig = "/etc/kube/config"
"#,
        )
        .unwrap();

        assert_eq!(conf.backup.filter.as_deref(), Some("del(.status)"));
        assert_eq!(conf.backup.exclude, vec!["kube-system", "kube-public"]);
        assert_eq!(conf.backup.dir.as_deref(), Some("/var/backups/k8s"));
        assert_eq!(conf.backup.kubeconfig.as_deref(), Some("/etc/kube/config"));
    }

    #[test]
    fn test_parse_empty_and_unknown_keys() {
        assert_eq!(BackupConf::parse("").unwrap(), BackupConf::default());

        let conf = BackupConf::parse("[backup]\nschedule = \"daily\"\n").unwrap();
        assert_eq!(conf, BackupConf::default());
    }

    #[test]
    fn test_parse_type_error() {
        let err = BackupConf::parse("[backup]\nexclude = \"kube-system\"\n").unwrap_err();
        assert!(matches!(err, KbackupError::TomlParse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = BackupConf::from("/nonexistent/kbackup.toml").unwrap_err();
        assert!(matches!(err, KbackupError::ConfigError(_)));
    }
}
