// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use crate::models::crawler::FetchResult;
use serde::{Deserialize, Serialize};

/// Per-URL outcome of a scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    pub url: String,
    /// Matched fingerprint names, comma-joined, de-duplicated
    pub cms: String,
    pub server: String,
    pub status_code: u16,
    pub length: usize,
    pub title: String,
}

impl ScanResult {
    /// Build a result from a fetched page and the names it matched
    pub fn from_fetch(fetch: &FetchResult, matched: &[String]) -> Self {
        Self {
            url: fetch.url.clone(),
            cms: matched.join(","),
            server: fetch.server.clone(),
            status_code: fetch.status_code,
            length: fetch.length,
            title: fetch.title.clone(),
        }
    }

    /// Whether any fingerprint matched
    pub fn is_hit(&self) -> bool {
        !self.cms.is_empty()
    }

    /// Matched names as a list
    pub fn matched_names(&self) -> Vec<&str> {
        self.cms.split(',').filter(|s| !s.is_empty()).collect()
    }
}

/// All results of a run, in completion order
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub all: Vec<ScanResult>,
    /// Subsequence of `all` with at least one match
    pub hits: Vec<ScanResult>,
}

impl ScanReport {
    pub fn record(&mut self, result: ScanResult) {
        if result.is_hit() {
            self.hits.push(result.clone());
        }
        self.all.push(result);
    }

    pub fn find(&self, url: &str) -> Option<&ScanResult> {
        self.all.iter().find(|r| r.url == url)
    }
}
