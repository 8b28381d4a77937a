// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use anyhow::{bail, Context, Result};
use clap::Parser;
use fingerprobe::models::settings::{
    OutputMode, ScanConfig, DEFAULT_THREADS, DEFAULT_TIMEOUT_SECS,
};
use fingerprobe::services::logging;
use fingerprobe::services::output::{print_summary, save_results};
use fingerprobe::services::rules::FingerprintDatabase;
use fingerprobe::services::scanner::Scanner;
use fingerprobe::services::targets::{load_targets, normalize_target};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

// Version is extracted from Cargo.toml at compile time via build.rs
// In CI/CD, the patch version can be overridden via FINGERPROBE_PATCH_VERSION env var
const VERSION: &str = env!("FINGERPROBE_VERSION");

/// Fallback database when none is given on the command line
const DEFAULT_DATABASE: &str = "finger.json";

#[derive(Parser, Debug)]
#[command(name = "fingerprobe")]
#[command(about = "Web application fingerprint scanner")]
#[command(version = VERSION)]
struct Cli {
    /// Single target (URL or bare host)
    #[arg(short = 'u', long = "url")]
    url: Option<String>,

    /// File with one target per line
    #[arg(short = 'l', long = "list")]
    list: Option<PathBuf>,

    /// Number of concurrent workers
    #[arg(short = 't', long = "thread", env = "FINGERPROBE_THREADS", default_value_t = DEFAULT_THREADS)]
    threads: usize,

    /// Request timeout in seconds
    #[arg(long, env = "FINGERPROBE_TIMEOUT", default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    /// Save all results to a .json file
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Proxy URL (http, https or socks5)
    #[arg(short = 'p', long = "proxy", env = "FINGERPROBE_PROXY")]
    proxy: Option<String>,

    /// Print only matched targets
    #[arg(short = 's', long = "silent")]
    silent: bool,

    /// Print one JSON object per result
    #[arg(short = 'j', long = "json")]
    json: bool,

    /// Structured fingerprint database (.json or .json.gz), repeatable
    #[arg(short = 'f', long = "finger")]
    finger: Vec<PathBuf>,

    /// Rule-string fingerprint database (.yaml), repeatable
    #[arg(long = "arl")]
    arl: Vec<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else if self.silent {
            OutputMode::Silent
        } else {
            OutputMode::Plain
        }
    }

    fn scan_config(&self) -> ScanConfig {
        ScanConfig::default()
            .with_threads(self.threads)
            .with_timeout(Duration::from_secs(self.timeout))
            .with_proxy(self.proxy.clone())
            .with_output_mode(self.output_mode())
            .with_output(self.output.clone())
    }

    fn targets(&self) -> Result<Vec<String>> {
        let mut targets = Vec::new();
        if let Some(url) = &self.url {
            if !url.trim().is_empty() {
                targets.push(normalize_target(url));
            }
        }
        if let Some(list) = &self.list {
            targets.extend(load_targets(list)?);
        }
        if targets.is_empty() {
            bail!("No targets given, use -u <url> or -l <file>");
        }
        Ok(targets)
    }

    fn database_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.finger.iter().chain(self.arl.iter()).cloned().collect();
        if paths.is_empty() {
            paths.push(PathBuf::from(DEFAULT_DATABASE));
        }
        paths
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli.scan_config();
    let targets = cli.targets()?;

    let database = FingerprintDatabase::load_all(&cli.database_paths())
        .context("Failed to load fingerprint database")?;

    let mode = config.output_mode;
    let output = config.output.clone();
    let scanner = Scanner::new(config, Arc::new(database), targets)
        .context("Failed to build HTTP client")?;

    let report = Arc::new(scanner).run().await;
    print_summary(report.all.len(), report.hits.len(), mode);

    if let Some(path) = output {
        if let Err(e) = save_results(&path, &report.all) {
            tracing::warn!("{}", e);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            std::process::exit(if e.use_stderr() { 1 } else { 0 });
        }
    };

    if let Err(e) = logging::init(cli.verbose) {
        eprintln!("Failed to initialize logging: {}", e);
    }
    tracing::debug!("fingerprobe v{}", VERSION);

    if let Err(e) = run(cli).await {
        eprintln!("[-] {:#}", e);
        std::process::exit(1);
    }
}
