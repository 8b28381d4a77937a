// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Signals derived from a normalized response: title, server banner,
//! redirect targets and favicon location.

use regex::Regex;
use scraper::{Html, Selector};
use std::collections::BTreeMap;
use std::sync::LazyLock;

static TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("valid regex"));

/// JS and meta-refresh redirect patterns; the URL is always the last capture group
static REDIRECTS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#"(window|top)\.location\.href = ['"](.*?)['"]"#,
        r#"redirectUrl = ['"](.*?)['"]"#,
        r#"<meta.*?http-equiv=.*?refresh.*?url=(.*?)>"#,
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

/// Extract the page title: first `<title>` tag, trimmed, with line breaks and tabs removed
pub fn extract_title(body: &str) -> String {
    TITLE
        .captures(body)
        .and_then(|c| c.get(1))
        .map(|m| {
            m.as_str()
                .trim()
                .chars()
                .filter(|c| !matches!(c, '\n' | '\r' | '\t'))
                .collect()
        })
        .unwrap_or_default()
}

/// `Server` header if present, else `X-Powered-By`, else empty
pub fn extract_server(headers: &BTreeMap<String, Vec<String>>) -> String {
    let first = |name: &str| {
        headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .and_then(|(_, v)| v.first())
            .filter(|v| !v.is_empty())
            .cloned()
    };
    first("Server")
        .or_else(|| first("X-Powered-By"))
        .unwrap_or_default()
}

/// Find relative redirect targets in a page and make them absolute.
///
/// Targets that already contain `http` are skipped, as are empty ones.
/// The result keeps discovery order and holds no duplicates.
pub fn extract_redirects(body: &str, base_url: &str) -> Vec<String> {
    let mut base = base_url.to_string();
    if !base.ends_with('/') {
        base.push('/');
    }

    let mut targets: Vec<String> = Vec::new();
    for pattern in REDIRECTS.iter() {
        for captures in pattern.captures_iter(body) {
            let Some(path) = captures.iter().flatten().last().map(|m| m.as_str()) else {
                continue;
            };
            if path.is_empty() || path.contains("http") {
                continue;
            }

            let path = path
                .trim_matches(|c: char| c == '"' || c == '\'' || c.is_whitespace())
                .trim_matches('/')
                .replace("../", "/");
            let path = path.trim_start_matches('/');
            if path.is_empty() {
                continue;
            }

            let target = format!("{}{}", base, path);
            if !targets.contains(&target) {
                targets.push(target);
            }
        }
    }
    targets
}

/// Scheme and authority of a URL, e.g. `https://host:8443`
fn origin(page_url: &str) -> Option<(String, String)> {
    let url = url::Url::parse(page_url).ok()?;
    let host = url.host_str()?;
    let authority = match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };
    Some((url.scheme().to_string(), authority))
}

/// Locate the favicon href in a page, if one is declared
fn find_favicon_href(body: &str) -> Option<String> {
    let document = Html::parse_document(body);

    if let Ok(selector) = Selector::parse("link[rel][href]") {
        for element in document.select(&selector) {
            let rel = element.value().attr("rel").unwrap_or_default();
            let rel = rel.trim().to_ascii_lowercase();
            if rel == "icon" || rel == "shortcut icon" {
                if let Some(href) = element.value().attr("href").map(str::trim) {
                    if !href.is_empty() {
                        return Some(href.to_string());
                    }
                }
            }
        }
    }

    let selector = Selector::parse("[href]").ok()?;
    document
        .select(&selector)
        .filter_map(|e| e.value().attr("href"))
        .map(str::trim)
        .find(|href| href.to_ascii_lowercase().contains("favicon"))
        .map(str::to_string)
}

/// Resolve the favicon URL for a page, falling back to `/favicon.ico` at the host root
pub fn extract_favicon_url(body: &str, page_url: &str) -> Option<String> {
    let (scheme, authority) = origin(page_url)?;
    let base = format!("{}://{}", scheme, authority);

    let Some(href) = find_favicon_href(body) else {
        return Some(format!("{}/favicon.ico", base));
    };

    let resolved = if let Some(rest) = href.strip_prefix("//") {
        format!("{}://{}", scheme, rest)
    } else if href.starts_with("http") {
        href
    } else if href.starts_with('/') {
        format!("{}{}", base, href)
    } else {
        format!("{}/{}", base, href)
    };
    Some(resolved)
}
