// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use crate::models::crawler::{FetchResult, TaskKind};
use crate::models::settings::ScanConfig;
use crate::services::encoding;
use crate::services::extractor::{extract_redirects, extract_server, extract_title};
use rand::seq::SliceRandom;
use reqwest::header::{HeaderMap, ACCEPT, CONNECTION, COOKIE, USER_AGENT};
use std::collections::BTreeMap;
use thiserror::Error;

/// Browser User-Agents rotated per request
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Chrome/96.0.4664.110 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:91.0) Gecko/20100101 Firefox/91.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 Chrome/97.0.4692.71 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 Chrome/97.0.4692.71 Safari/537.36",
];

/// Unknown remember-me tokens make Shiro answer with `rememberMe=deleteMe`
const REMEMBER_ME_COOKIE: &str = "rememberMe=me";

/// Errors that can occur while fetching
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Unexpected status {0}")]
    Status(u16),
}

/// Pick a User-Agent from the pool
pub fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// Canonical MIME form of a header name: `x-powered-by` -> `X-Powered-By`
pub fn canonical_header_name(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => {
                    first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

fn collect_headers(headers: &HeaderMap) -> BTreeMap<String, Vec<String>> {
    let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in headers {
        map.entry(canonical_header_name(name.as_str()))
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    map
}

/// Rebuild the raw response: status line, headers, blank line, body
fn build_raw_response(
    status_line: &str,
    headers: &BTreeMap<String, Vec<String>>,
    body: &[u8],
) -> Vec<u8> {
    let mut raw = Vec::with_capacity(body.len() + 512);
    raw.extend_from_slice(status_line.as_bytes());
    raw.extend_from_slice(b"\r\n");
    for (name, values) in headers {
        for value in values {
            raw.extend_from_slice(format!("{}: {}\r\n", name, value).as_bytes());
        }
    }
    raw.extend_from_slice(b"\r\n");
    raw.extend_from_slice(body);
    raw
}

/// HTTP client for page and favicon fetches
#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    favicon_timeout: std::time::Duration,
}

impl Fetcher {
    /// Build a fetcher from scan settings: certificate checks off, timeout
    /// and proxy from the config
    pub fn new(config: &ScanConfig) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(config.timeout);

        if let Some(proxy) = &config.proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }

        Ok(Self {
            client: builder.build()?,
            favicon_timeout: config.favicon_timeout,
        })
    }

    /// Issue one GET and normalize the response.
    /// Any status code is a valid outcome; only transport problems are errors.
    pub async fn fetch(&self, url: &str, kind: TaskKind) -> Result<FetchResult, FetchError> {
        url::Url::parse(url).map_err(|source| FetchError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;

        let response = self
            .client
            .get(url)
            .header(USER_AGENT, random_user_agent())
            .header(ACCEPT, "*/*")
            .header(CONNECTION, "close")
            .header(COOKIE, REMEMBER_ME_COOKIE)
            .send()
            .await?;

        let status = response.status();
        let status_line = format!(
            "{:?} {} {}",
            response.version(),
            status.as_u16(),
            status.canonical_reason().unwrap_or_default()
        );
        let headers = collect_headers(response.headers());

        // A body cut short by a timeout or reset still counts as a response
        let raw_body = match response.bytes().await {
            Ok(bytes) => bytes.to_vec(),
            Err(e) => {
                tracing::debug!("Partial body from {}: {}", url, e);
                Vec::new()
            }
        };

        let content_type = headers
            .get("Content-Type")
            .and_then(|v| v.first())
            .map(|v| v.to_ascii_lowercase())
            .unwrap_or_default();
        let body = encoding::normalize(&raw_body, &content_type);

        let redirect_targets = if kind.is_primary() {
            extract_redirects(&body, url)
        } else {
            Vec::new()
        };

        Ok(FetchResult {
            url: url.to_string(),
            raw: build_raw_response(&status_line, &headers, &raw_body),
            title: extract_title(&body),
            server: extract_server(&headers),
            status_code: status.as_u16(),
            length: body.len(),
            body,
            headers,
            redirect_targets,
        })
    }

    /// Fetch a URL; on failure retry once with `https://` swapped for `http://`.
    /// A URL that is already plain HTTP is not retried.
    pub async fn fetch_with_fallback(
        &self,
        url: &str,
        kind: TaskKind,
    ) -> Result<FetchResult, FetchError> {
        match self.fetch(url, kind).await {
            Ok(result) => Ok(result),
            Err(e) => {
                let fallback = url.replace("https://", "http://");
                if fallback == url {
                    return Err(e);
                }
                tracing::debug!("Fetch of {} failed ({}), retrying as {}", url, e, fallback);
                self.fetch(&fallback, kind).await
            }
        }
    }

    /// Download favicon bytes. Anything but a 200 is an error.
    pub async fn fetch_favicon(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url)
            .timeout(self.favicon_timeout)
            .header(USER_AGENT, random_user_agent())
            .send()
            .await?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        Ok(response.bytes().await?.to_vec())
    }
}
