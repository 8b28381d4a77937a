// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use anyhow::{Context, Result};
use std::path::Path;

/// Turn user input into a fetchable URL. Bare hosts get `https://`.
pub fn normalize_target(target: &str) -> String {
    let target = target.trim();
    if target.contains("http") {
        target.to_string()
    } else {
        format!("https://{}", target)
    }
}

/// Read one target per line, skipping blank lines
pub fn load_targets(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read target list {}", path.display()))?;

    Ok(content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(normalize_target)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_target() {
        assert_eq!(normalize_target("example.com"), "https://example.com");
        assert_eq!(normalize_target("  10.0.0.1:8080 \r"), "https://10.0.0.1:8080");
        assert_eq!(normalize_target("http://example.com"), "http://example.com");
        assert_eq!(normalize_target("https://example.com/a"), "https://example.com/a");
    }

    #[test]
    fn test_load_targets_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("targets.txt");
        std::fs::write(&path, "a.example\n\n  \nhttp://b.example\r\na.example\n").unwrap();

        let targets = load_targets(&path).unwrap();
        assert_eq!(
            targets,
            vec!["https://a.example", "http://b.example", "https://a.example"]
        );
    }

    #[test]
    fn test_load_targets_missing_file() {
        assert!(load_targets("/nonexistent/targets.txt").is_err());
    }
}
