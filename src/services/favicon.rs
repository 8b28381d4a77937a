// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Shodan-style favicon fingerprint: MurmurHash3 (x86, 32-bit, seed 0) over
//! the MIME base64 encoding of the icon bytes, read as a signed integer.

use crate::services::crawler::Fetcher;
use crate::services::extractor::extract_favicon_url;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::io::Cursor;

/// Line width of MIME base64
const BASE64_LINE: usize = 76;

/// Standard base64 broken into 76-character lines, each followed by `\n`
fn mime_base64(bytes: &[u8]) -> String {
    let encoded = STANDARD.encode(bytes);
    let mut wrapped = String::with_capacity(encoded.len() + encoded.len() / BASE64_LINE + 1);
    for chunk in encoded.as_bytes().chunks(BASE64_LINE) {
        // base64 output is ASCII
        wrapped.push_str(&String::from_utf8_lossy(chunk));
        wrapped.push('\n');
    }
    wrapped
}

/// Hash favicon bytes into the decimal text used by `icon_hash` rules
pub fn favicon_hash(bytes: &[u8]) -> String {
    let text = mime_base64(bytes);
    let hash = murmur3::murmur3_32(&mut Cursor::new(text.as_bytes()), 0).unwrap_or_default();
    (hash as i32).to_string()
}

/// Locate, download and hash the favicon of a page.
/// Any failure along the way means the page simply has no favicon hash.
pub async fn fetch_hash(fetcher: &Fetcher, body: &str, page_url: &str) -> Option<String> {
    let icon_url = extract_favicon_url(body, page_url)?;

    match fetcher.fetch_favicon(&icon_url).await {
        Ok(bytes) if !bytes.is_empty() => {
            let hash = favicon_hash(&bytes);
            tracing::debug!("Favicon {} hashed to {}", icon_url, hash);
            Some(hash)
        }
        Ok(_) => None,
        Err(e) => {
            tracing::debug!("No favicon at {}: {}", icon_url, e);
            None
        }
    }
}
