// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! On-disk shapes of the fingerprint databases.

use serde::Deserialize;

/// How the tokens of a structured rule are evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum MatchMethod {
    /// Every token must be a case-sensitive substring
    Keyword,
    /// Every token must compile and match
    Regex,
    /// The single token must equal the favicon hash
    FaviconHash,
    /// Anything this build does not understand; never matches
    Unknown,
}

impl From<String> for MatchMethod {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "keyword" => MatchMethod::Keyword,
            "regular" | "regex" => MatchMethod::Regex,
            "faviconhash" | "favicon_hash" | "icon_hash" => MatchMethod::FaviconHash,
            _ => MatchMethod::Unknown,
        }
    }
}

/// Which response signal a structured rule looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum MatchLocation {
    Body,
    Header,
    Title,
    #[default]
    Unknown,
}

impl From<String> for MatchLocation {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "body" => MatchLocation::Body,
            "header" => MatchLocation::Header,
            "title" => MatchLocation::Title,
            _ => MatchLocation::Unknown,
        }
    }
}

/// A single structured rule as stored in a JSON fingerprint file
#[derive(Debug, Clone, Deserialize)]
pub struct FingerprintRule {
    #[serde(alias = "cms", alias = "Cms", alias = "Name")]
    pub name: String,
    #[serde(alias = "Method")]
    pub method: MatchMethod,
    #[serde(alias = "Location", default)]
    pub location: MatchLocation,
    /// Tokens are ANDed
    #[serde(
        rename = "keyword",
        alias = "keywords",
        alias = "Keyword",
        default
    )]
    pub tokens: Vec<String>,
}

/// Accepted top-level layouts of a JSON fingerprint file
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum FingerprintFile {
    List(Vec<FingerprintRule>),
    Wrapped {
        #[serde(alias = "Fingerprint")]
        fingerprint: Vec<FingerprintRule>,
    },
}

impl FingerprintFile {
    pub fn into_rules(self) -> Vec<FingerprintRule> {
        match self {
            FingerprintFile::List(rules) => rules,
            FingerprintFile::Wrapped { fingerprint } => fingerprint,
        }
    }
}

/// One entry of an ARL-style YAML file: a name and a boolean rule string
#[derive(Debug, Clone, Deserialize)]
pub struct RuleStringEntry {
    pub name: String,
    #[serde(default)]
    pub rule: String,
}
