// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use crate::models::crawler::Task;
use crate::models::scan::{ScanReport, ScanResult};
use crate::models::settings::ScanConfig;
use crate::services::crawler::{FetchError, Fetcher};
use crate::services::favicon;
use crate::services::frontier::Frontier;
use crate::services::logging::redact_proxy;
use crate::services::output;
use crate::services::rules::{FingerprintDatabase, Signals};
use futures::future::join_all;
use parking_lot::Mutex;
use std::sync::Arc;

/// Drives a scan: a fixed pool of workers draining a shared frontier
pub struct Scanner {
    config: ScanConfig,
    fetcher: Fetcher,
    database: Arc<FingerprintDatabase>,
    frontier: Frontier,
    report: Mutex<ScanReport>,
    fetch_favicons: bool,
}

impl Scanner {
    /// Create a scanner seeded with primary targets
    pub fn new(
        config: ScanConfig,
        database: Arc<FingerprintDatabase>,
        targets: impl IntoIterator<Item = String>,
    ) -> Result<Self, FetchError> {
        let fetcher = Fetcher::new(&config)?;
        let fetch_favicons = database.needs_favicon();
        Ok(Self {
            config,
            fetcher,
            database,
            frontier: Frontier::with_tasks(targets.into_iter().map(Task::primary)),
            report: Mutex::new(ScanReport::default()),
            fetch_favicons,
        })
    }

    /// Run until the frontier is drained and no task is in flight.
    /// Results are printed as they complete and returned in completion order.
    pub async fn run(self: Arc<Self>) -> ScanReport {
        let workers = self.config.threads.max(1);
        tracing::info!(
            "Scanning {} targets with {} workers, {} fingerprints",
            self.frontier.len(),
            workers,
            self.database.len()
        );
        if let Some(proxy) = &self.config.proxy {
            tracing::info!("Using proxy {}", redact_proxy(proxy));
        }
        if !self.fetch_favicons {
            tracing::debug!("No favicon rules loaded, favicon lookups disabled");
        }

        let handles: Vec<_> = (0..workers)
            .map(|id| {
                let scanner = self.clone();
                tokio::spawn(async move { scanner.worker(id).await })
            })
            .collect();

        for joined in join_all(handles).await {
            if let Err(e) = joined {
                tracing::error!("Scan worker failed: {}", e);
            }
        }

        std::mem::take(&mut *self.report.lock())
    }

    async fn worker(&self, id: usize) {
        tracing::trace!("Worker {} started", id);
        while let Some(task) = self.frontier.next_task().await {
            let _in_flight = self.frontier.in_flight_guard();
            self.process_task(task).await;
        }
        tracing::trace!("Worker {} finished", id);
    }

    /// Fetch, fingerprint and record one task, then enqueue what it discovered
    async fn process_task(&self, task: Task) {
        tracing::debug!("Fetching {} ({})", task.url, task.kind);

        let fetch = match self.fetcher.fetch_with_fallback(&task.url, task.kind).await {
            Ok(fetch) => fetch,
            Err(e) => {
                tracing::debug!("Dropping {}: {}", task.url, e);
                return;
            }
        };

        let favicon_hash = if task.kind.is_primary() && self.fetch_favicons {
            favicon::fetch_hash(&self.fetcher, &fetch.body, &fetch.url).await
        } else {
            None
        };

        let matched = self
            .database
            .match_all(&Signals::new(&fetch, favicon_hash.as_deref()));
        let result = ScanResult::from_fetch(&fetch, &matched);

        {
            let mut report = self.report.lock();
            output::print_result(&result, self.config.output_mode);
            report.record(result);
        }

        for target in fetch.redirect_targets {
            tracing::debug!("Queueing redirect target {}", target);
            self.frontier.push(Task::derived(target));
        }
    }
}
