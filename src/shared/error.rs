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

use crate::domain::backup::BackupState;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, KbackupError>;

#[derive(Error, Debug)]
pub enum KbackupError {
    #[error("Context '{context}' not found: {reason}")]
    ContextNotFound { context: String, reason: String },

    #[error("Failed to connect to cluster for context '{context}': {source}")]
    Connection {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to {operation}: {source}")]
    Enumeration {
        operation: String,
        #[source]
        source: kube::Error,
    },

    #[error("Invalid filter expression at position {position}: {message}")]
    FilterSyntax { position: usize, message: String },

    #[error("Filter failed on {resource}: {message}")]
    Filter { resource: String, message: String },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Failed to serialize {resource}: {source}")]
    Serialization {
        resource: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Backup aborted while {stage} after {processed} resource(s): {source}")]
    Aborted {
        stage: BackupState,
        processed: usize,
        #[source]
        source: Box<KbackupError>,
    },

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("JSON conversion error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl KbackupError {
    pub fn config_error(context: impl Into<String>) -> Self {
        Self::ConfigError(context.into())
    }

    pub fn context_not_found(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ContextNotFound {
            context: context.into(),
            reason: reason.into(),
        }
    }

    pub fn connection(
        context: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Connection {
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn enumeration(operation: impl Into<String>, source: kube::Error) -> Self {
        Self::Enumeration {
            operation: operation.into(),
            source,
        }
    }

    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    pub fn filter(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Filter {
            resource: resource.into(),
            message: message.into(),
        }
    }

    /// The error that triggered an aborted run, or `self` otherwise.
    pub fn root(&self) -> &KbackupError {
        match self {
            Self::Aborted { source, .. } => source.root(),
            other => other,
        }
    }
}
