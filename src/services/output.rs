// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Result lines on stdout and the optional JSON results file.

use crate::models::scan::ScanResult;
use crate::models::settings::OutputMode;
use colored::Colorize;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write results: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to serialize results: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// `URL [status] [length] [server] [title] [names]`, empty fields omitted
pub fn format_line(result: &ScanResult) -> String {
    let mut line = format!(
        "{} [{}] [{}]",
        result.url, result.status_code, result.length
    );
    for field in [&result.server, &result.title, &result.cms] {
        if !field.is_empty() {
            line.push_str(&format!(" [{}]", field));
        }
    }
    line
}

/// `URL [names]`
pub fn format_silent_line(result: &ScanResult) -> String {
    format!("{} [{}]", result.url, result.cms)
}

/// Text to print for a result in the given mode, if anything
pub fn render(result: &ScanResult, mode: OutputMode) -> Option<String> {
    match mode {
        OutputMode::Plain => {
            let line = format_line(result);
            if result.is_hit() {
                Some(line.truecolor(237, 64, 35).to_string())
            } else {
                Some(line)
            }
        }
        OutputMode::Silent => result.is_hit().then(|| format_silent_line(result)),
        OutputMode::Json => match serde_json::to_string(result) {
            Ok(json) => Some(json),
            Err(e) => {
                tracing::warn!("Failed to serialize result for {}: {}", result.url, e);
                None
            }
        },
    }
}

pub fn print_result(result: &ScanResult, mode: OutputMode) {
    if let Some(line) = render(result, mode) {
        println!("{}", line);
    }
}

/// Summary text, set off from the result lines by a blank line
pub fn format_summary(scanned: usize, matched: usize) -> String {
    format!("\n[+] Scanned: {}, Matched: {}", scanned, matched)
}

/// Run totals; only plain mode prints them
pub fn print_summary(scanned: usize, matched: usize, mode: OutputMode) {
    if mode == OutputMode::Plain {
        println!("{}", format_summary(scanned, matched).truecolor(244, 211, 49));
    }
}

/// Write all results as an indented JSON array.
/// Returns `Ok(false)` without touching the filesystem unless the path ends in `.json`.
pub fn save_results(path: &Path, results: &[ScanResult]) -> Result<bool, OutputError> {
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if !is_json {
        tracing::warn!(
            "Results file {} must have a .json extension, skipping",
            path.display()
        );
        return Ok(false);
    }

    let json = serde_json::to_string_pretty(results)?;
    std::fs::write(path, json)?;
    tracing::info!("Saved {} results to {}", results.len(), path.display());
    Ok(true)
}
