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

//! Manifest field filtering with jq syntax.
//!
//! Supports the part of jq that is useful for trimming and rewriting
//! manifests:
//!
//! - `.` identity, `.field`, `."quoted-field"`, `.["field"]`
//! - `.[n]` (negative counts from the end) and `.[]`
//! - `?` to suppress errors, `|`, `,`, `//` and parentheses
//! - `{a, b: .x, (expr): expr}` and `[expr]`
//! - literals, `==`, `!=`, `<`, `<=`, `>`, `>=`, `and`, `or`
//! - `+`, `-`, `*`, `/`, `%` and unary `-`
//! - `path = value` and `path |= update`
//! - `if ... then ... elif ... else ... end`
//! - `del`, `select`, `map`, `map_values`, `has`, `keys`, `length`, `not`,
//!   `empty`, `to_entries`, `from_entries`, `with_entries`, `type`, `add`,
//!   `sort`, `startswith`, `endswith`, `error`
//!
//! Expressions nested more than 128 levels deep are rejected at compile
//! time.
//!
//! # Examples
//!
//! ```text
//! del(.status, .metadata.uid, .metadata.resourceVersion)
//! {apiVersion, kind, metadata: {name: .metadata.name, labels: (.metadata.labels // {})}, spec}
//! .metadata.annotations |= with_entries(select(.key | startswith("kubectl.") | not))
//! ```

mod eval;
mod lexer;
mod parser;

use crate::infrastructure::constants::DEFAULT_FILTER;
use crate::shared::error::KbackupError;
use parser::Expr;
use serde_json::Value;
use std::fmt;

/// Parse failure with the byte offset it was detected at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub position: usize,
    pub message: String,
}

impl SyntaxError {
    fn new(position: usize, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

impl From<SyntaxError> for KbackupError {
    fn from(err: SyntaxError) -> Self {
        KbackupError::FilterSyntax {
            position: err.position,
            message: err.message,
        }
    }
}

/// A compiled filter expression.
#[derive(Debug, Clone)]
pub struct ManifestFilter {
    source: String,
    expr: Expr,
}

impl ManifestFilter {
    /// Compiles `source`, reporting syntax problems without touching any
    /// document.
    pub fn compile(source: &str) -> Result<Self, KbackupError> {
        let expr = parser::parse(source)?;
        Ok(Self {
            source: source.trim().to_string(),
            expr,
        })
    }

    pub fn identity() -> Self {
        Self {
            source: DEFAULT_FILTER.to_string(),
            expr: Expr::Identity,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.expr == Expr::Identity
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Applies the filter and returns its first output as a new document.
    pub fn apply(&self, document: &Value) -> Result<Value, String> {
        if self.is_identity() {
            return Ok(document.clone());
        }

        eval::eval(&self.expr, document)?
            .into_iter()
            .next()
            .ok_or_else(|| "filter produced no output".to_string())
    }
}

impl Default for ManifestFilter {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Display for ManifestFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
