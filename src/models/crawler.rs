// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where a task came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Seed URL supplied by the user
    Primary,
    /// URL discovered through a JS or meta redirect on a primary page
    Derived,
}

impl TaskKind {
    /// Only primary pages get redirect discovery and a favicon lookup
    pub fn is_primary(&self) -> bool {
        matches!(self, TaskKind::Primary)
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskKind::Primary => write!(f, "primary"),
            TaskKind::Derived => write!(f, "derived"),
        }
    }
}

/// A pending fetch in the frontier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub url: String,
    pub kind: TaskKind,
}

impl Task {
    pub fn primary(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind: TaskKind::Primary,
        }
    }

    pub fn derived(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind: TaskKind::Derived,
        }
    }
}

/// Normalized outcome of a single HTTP GET
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// The URL that was requested (after any https -> http fallback)
    pub url: String,
    /// Status line, headers and raw body bytes as received
    pub raw: Vec<u8>,
    /// Body transcoded to UTF-8
    pub body: String,
    /// Response headers keyed by canonical header name
    pub headers: BTreeMap<String, Vec<String>>,
    /// Contents of the first `<title>` tag
    pub title: String,
    /// `Server` header, falling back to `X-Powered-By`
    pub server: String,
    pub status_code: u16,
    /// Length in bytes of the normalized body
    pub length: usize,
    /// Absolute URLs found through redirect discovery (primary pages only)
    pub redirect_targets: Vec<String>,
}

impl FetchResult {
    /// Headers as a JSON object of name -> values, keys sorted.
    /// Structured rules with `location: header` match against this text.
    pub fn header_json(&self) -> String {
        serde_json::to_string(&self.headers).unwrap_or_default()
    }

    /// Headers as `Name: value` lines, one per value.
    /// Rule-string `header="..."` clauses match against this text.
    pub fn header_text(&self) -> String {
        let mut text = String::new();
        for (name, values) in &self.headers {
            for value in values {
                text.push_str(name);
                text.push_str(": ");
                text.push_str(value);
                text.push('\n');
            }
        }
        text
    }

    /// Get the first value of a header, case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .and_then(|(_, values)| values.first())
            .map(|v| v.as_str())
    }
}
