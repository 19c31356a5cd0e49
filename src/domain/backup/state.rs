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

use std::fmt;

/// Stage of a backup run.
///
/// ```text
/// Initializing -> ContextResolved -> Enumerating <-> Filtering -> Writing
///                                         |                         |
///                                         v                         |
///                                     Completed      Enumerating <--+
/// ```
///
/// Any stage may move to `Failed`. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackupState {
    Initializing,
    ContextResolved,
    Enumerating,
    Filtering,
    Writing,
    Completed,
    Failed,
}

impl BackupState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn can_advance_to(&self, next: BackupState) -> bool {
        use BackupState::*;

        match (self, next) {
            (Completed | Failed, _) => false,
            (_, Failed) => true,
            (Initializing, ContextResolved)
            | (ContextResolved, Enumerating)
            | (Enumerating, Filtering)
            | (Enumerating, Completed)
            | (Filtering, Writing)
            | (Writing, Enumerating) => true,
            _ => false,
        }
    }
}

impl fmt::Display for BackupState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Initializing => "initializing",
            Self::ContextResolved => "context-resolved",
            Self::Enumerating => "enumerating",
            Self::Filtering => "filtering",
            Self::Writing => "writing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}
