// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Response body charset detection and transcoding to UTF-8.
//!
//! Detection order, each step refining the previous one:
//! 1. `charset` in the `Content-Type` header
//! 2. a `charset=` attribute in an HTML `<meta>` tag
//! 3. if still UTF-8, sniffing the raw bytes of the `<title>` tag

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, BIG5, GB18030};
use regex::bytes::Regex;
use std::sync::LazyLock;

// Unicode mode is off so `.` and `[^>]` also match bytes of non-UTF-8 pages
static META_CHARSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is-u)<meta[^>]*charset\s*=["']?\s*([A-Za-z0-9\-]+)"#).expect("valid regex")
});

static TITLE_BYTES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is-u)<title[^>]*>(.*?)</title>").expect("valid regex"));

/// Encodings the normalizer distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    Utf8,
    Gb18030,
    Big5,
}

impl Charset {
    /// Map a charset label or a whole `Content-Type` value.
    /// GBK family and windows-1252 collapse to GB18030; unknown or absent
    /// labels default to GB18030 as well.
    pub fn from_label(label: &str) -> Self {
        let label = label.to_ascii_lowercase();
        if label.contains("gbk")
            || label.contains("gb2312")
            || label.contains("gb18030")
            || label.contains("windows-1252")
        {
            Charset::Gb18030
        } else if label.contains("big5") {
            Charset::Big5
        } else if label.contains("utf-8") {
            Charset::Utf8
        } else {
            Charset::Gb18030
        }
    }

    fn encoding(&self) -> Option<&'static Encoding> {
        match self {
            Charset::Utf8 => None,
            Charset::Gb18030 => Some(GB18030),
            Charset::Big5 => Some(BIG5),
        }
    }
}

/// Charset declared by a `<meta ... charset=...>` tag, if any
pub fn meta_charset(raw: &[u8]) -> Option<Charset> {
    let captures = META_CHARSET.captures(raw)?;
    let label = std::str::from_utf8(captures.get(1)?.as_bytes()).ok()?;
    Some(Charset::from_label(label))
}

/// Charset guessed from the raw bytes inside `<title>`.
///
/// ASCII-only titles carry no evidence and yield `None`; so does a title
/// that is already valid UTF-8.
pub fn sniff_title_charset(raw: &[u8]) -> Option<Charset> {
    let captures = TITLE_BYTES.captures(raw)?;
    let title = captures.get(1)?.as_bytes();
    if title.is_ascii() {
        return None;
    }
    if std::str::from_utf8(title).is_ok() {
        return Some(Charset::Utf8);
    }

    let mut detector = EncodingDetector::new();
    detector.feed(title, true);
    let guess = detector.guess(None, true);
    Some(Charset::from_label(guess.name()))
}

/// Resolve the charset of a response body
pub fn detect_charset(raw: &[u8], content_type: &str) -> Charset {
    let mut charset = Charset::from_label(content_type);

    if let Some(meta) = meta_charset(raw) {
        charset = meta;
    }

    if charset == Charset::Utf8 {
        if let Some(sniffed) = sniff_title_charset(raw) {
            charset = sniffed;
        }
    }

    charset
}

/// Convert a response body to UTF-8 text.
/// Malformed sequences are replaced rather than aborting the conversion.
pub fn normalize(raw: &[u8], content_type: &str) -> String {
    match detect_charset(raw, content_type).encoding() {
        Some(encoding) => {
            let (text, _) = encoding.decode_without_bom_handling(raw);
            text.into_owned()
        }
        None => String::from_utf8_lossy(raw).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // "中文" in GBK
    const GBK_ZHONGWEN: &[u8] = &[0xD6, 0xD0, 0xCE, 0xC4];

    #[test]
    fn test_label_mapping() {
        assert_eq!(Charset::from_label("text/html; charset=GBK"), Charset::Gb18030);
        assert_eq!(Charset::from_label("gb2312"), Charset::Gb18030);
        assert_eq!(Charset::from_label("windows-1252"), Charset::Gb18030);
        assert_eq!(Charset::from_label("Big5"), Charset::Big5);
        assert_eq!(Charset::from_label("text/html; charset=UTF-8"), Charset::Utf8);
        assert_eq!(Charset::from_label(""), Charset::Gb18030);
        assert_eq!(Charset::from_label("iso-8859-1"), Charset::Gb18030);
    }

    #[test]
    fn test_utf8_passthrough() {
        let body = "<html><title>Über 中文</title><body>ok</body></html>";
        assert_eq!(normalize(body.as_bytes(), "text/html; charset=utf-8"), body);
    }

    #[test]
    fn test_normalize_is_idempotent_for_utf8() {
        let body = "<meta charset=\"utf-8\"><title>日本語 テスト</title><p>é à ü</p>";
        let once = normalize(body.as_bytes(), "utf-8");
        let twice = normalize(once.as_bytes(), "utf-8");
        assert_eq!(once, twice);
        assert_eq!(once, body);
    }

    #[test]
    fn test_header_gbk_is_transcoded() {
        let mut raw = b"<html><body>".to_vec();
        raw.extend_from_slice(GBK_ZHONGWEN);
        raw.extend_from_slice(b"</body></html>");
        let text = normalize(&raw, "text/html; charset=gbk");
        assert!(text.contains("中文"));
    }

    #[test]
    fn test_meta_charset_overrides_header() {
        let mut raw = b"<html><head><meta http-equiv=\"Content-Type\" content=\"text/html; charset=gb2312\"></head><body>".to_vec();
        raw.extend_from_slice(GBK_ZHONGWEN);
        raw.extend_from_slice(b"</body></html>");
        let text = normalize(&raw, "text/html; charset=utf-8");
        assert!(text.contains("中文"));
    }

    #[test]
    fn test_title_sniffing_refines_utf8_guess() {
        let mut raw = b"<html><head><title>".to_vec();
        raw.extend_from_slice(GBK_ZHONGWEN);
        raw.extend_from_slice(GBK_ZHONGWEN);
        raw.extend_from_slice(b"</title></head></html>");
        assert_ne!(detect_charset(&raw, "text/html; charset=utf-8"), Charset::Utf8);
    }

    #[test]
    fn test_ascii_title_keeps_utf8() {
        let raw = b"<title>Apache Tomcat</title>";
        assert_eq!(detect_charset(raw, "text/html; charset=utf-8"), Charset::Utf8);
        assert_eq!(sniff_title_charset(raw), None);
    }

    #[test]
    fn test_absent_charset_defaults_to_gb18030() {
        assert_eq!(detect_charset(b"<p>plain</p>", ""), Charset::Gb18030);
        assert_eq!(normalize(b"<p>plain</p>", ""), "<p>plain</p>");
    }

    #[test]
    fn test_meta_charset_with_gbk_bytes_inside_tag() {
        let mut raw = b"<meta content=\"".to_vec();
        raw.extend_from_slice(&GBK_ZHONGWEN[..2]);
        raw.extend_from_slice(b"\" charset=gbk>");
        assert_eq!(meta_charset(&raw), Some(Charset::Gb18030));
    }

    #[test]
    fn test_gbk_title_under_utf8_header_is_transcoded() {
        let mut raw = b"<html><head><title>".to_vec();
        raw.extend_from_slice(GBK_ZHONGWEN);
        raw.extend_from_slice(GBK_ZHONGWEN);
        raw.extend_from_slice(b"</title></head></html>");
        assert!(sniff_title_charset(&raw).is_some());
        assert!(!normalize(&raw, "text/html; charset=utf-8").contains('\u{FFFD}'));
    }

    #[test]
    fn test_big5_meta() {
        assert_eq!(
            meta_charset(b"<meta charset='big5'>"),
            Some(Charset::Big5)
        );
    }

    #[test]
    fn test_truncated_multibyte_does_not_abort() {
        let raw = [b'a', 0xD6];
        let text = normalize(&raw, "charset=gbk");
        assert!(text.starts_with('a'));
    }
}
