// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_THREADS: usize = 50;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const FAVICON_TIMEOUT_SECS: u64 = 5;

/// How results are written to stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// One line per URL, hits highlighted, summary at the end
    #[default]
    Plain,
    /// Only hits, as `URL [names]`
    Silent,
    /// One JSON object per line
    Json,
}

/// Settings for a scan run, threaded into every component that needs them
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Number of concurrent workers
    pub threads: usize,
    /// Page fetch timeout
    pub timeout: Duration,
    /// Favicon fetch timeout
    pub favicon_timeout: Duration,
    /// Proxy URL (http, https or socks5)
    pub proxy: Option<String>,
    pub output_mode: OutputMode,
    /// Where to persist the full result list
    pub output: Option<PathBuf>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            threads: DEFAULT_THREADS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            favicon_timeout: Duration::from_secs(FAVICON_TIMEOUT_SECS),
            proxy: None,
            output_mode: OutputMode::Plain,
            output: None,
        }
    }
}

impl ScanConfig {
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy.filter(|p| !p.trim().is_empty());
        self
    }

    pub fn with_output_mode(mut self, mode: OutputMode) -> Self {
        self.output_mode = mode;
        self
    }

    pub fn with_output(mut self, output: Option<PathBuf>) -> Self {
        self.output = output;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ScanConfig::default();
        assert_eq!(config.threads, 50);
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.favicon_timeout, Duration::from_secs(5));
        assert!(config.proxy.is_none());
        assert_eq!(config.output_mode, OutputMode::Plain);
    }

    #[test]
    fn test_threads_clamped_to_one() {
        let config = ScanConfig::default().with_threads(0);
        assert_eq!(config.threads, 1);
    }

    #[test]
    fn test_blank_proxy_ignored() {
        let config = ScanConfig::default().with_proxy(Some("  ".to_string()));
        assert!(config.proxy.is_none());
    }
}
