// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Fingerprint database and rule evaluation.
//!
//! Two rule shapes share one [`Rule`] type: structured rules from JSON
//! files and boolean rule strings from ARL-style YAML files. Both are
//! evaluated against the same [`Signals`] of a fetched page.

use crate::models::crawler::FetchResult;
use crate::models::fingerprint::{
    FingerprintFile, FingerprintRule, MatchLocation, MatchMethod, RuleStringEntry,
};
use flate2::read::GzDecoder;
use regex::Regex;
use std::cell::OnceCell;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

/// Suffixes that only record which clause type a rule-string name came from
const NAME_SUFFIXES: &[&str] = &["_body", "_header", "_title", "_icon_hash"];

static BODY_CLAUSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"body="((?:[^"\\]|\\.)*)""#).expect("valid regex"));
static HEADER_CLAUSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"header="((?:[^"\\]|\\.)*)""#).expect("valid regex"));
static TITLE_CLAUSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"title="((?:[^"\\]|\\.)*)""#).expect("valid regex"));
static ICON_HASH_CLAUSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"icon_hash="([^"]+)""#).expect("valid regex"));

/// Errors that can occur while loading a fingerprint database
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid YAML in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("Unsupported fingerprint file format: {0}")]
    UnsupportedFormat(PathBuf),
}

/// Response signals rules are evaluated against
pub struct Signals<'a> {
    pub body: &'a str,
    pub title: &'a str,
    /// Headers rendered as a sorted JSON object, for structured rules
    pub header_json: String,
    /// Headers rendered as `Name: value` lines, for rule strings
    pub header_text: String,
    pub favicon_hash: Option<&'a str>,
    body_lower: OnceCell<String>,
    title_lower: OnceCell<String>,
    header_text_lower: OnceCell<String>,
}

impl<'a> Signals<'a> {
    pub fn new(fetch: &'a FetchResult, favicon_hash: Option<&'a str>) -> Self {
        Self {
            body: &fetch.body,
            title: &fetch.title,
            header_json: fetch.header_json(),
            header_text: fetch.header_text(),
            favicon_hash,
            body_lower: OnceCell::new(),
            title_lower: OnceCell::new(),
            header_text_lower: OnceCell::new(),
        }
    }

    fn body_lower(&self) -> &str {
        self.body_lower.get_or_init(|| self.body.to_lowercase())
    }

    fn title_lower(&self) -> &str {
        self.title_lower.get_or_init(|| self.title.to_lowercase())
    }

    fn header_text_lower(&self) -> &str {
        self.header_text_lower
            .get_or_init(|| self.header_text.to_lowercase())
    }
}

/// Every token must be a case-sensitive substring of the target
pub fn match_keyword(target: &str, tokens: &[String]) -> bool {
    !tokens.is_empty() && tokens.iter().all(|token| target.contains(token.as_str()))
}

/// Compile every pattern; a single invalid pattern poisons the whole set
fn compile_patterns(tokens: &[String]) -> Option<Vec<Regex>> {
    tokens
        .iter()
        .map(|token| match Regex::new(token) {
            Ok(regex) => Some(regex),
            Err(e) => {
                tracing::debug!("Invalid fingerprint pattern {:?}: {}", token, e);
                None
            }
        })
        .collect()
}

/// A structured rule with its patterns compiled once at load time
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub name: String,
    pub method: MatchMethod,
    pub location: MatchLocation,
    pub tokens: Vec<String>,
    patterns: Option<Vec<Regex>>,
}

impl CompiledRule {
    pub fn compile(rule: FingerprintRule) -> Self {
        let patterns = match rule.method {
            MatchMethod::Regex => compile_patterns(&rule.tokens),
            _ => None,
        };
        Self {
            name: rule.name,
            method: rule.method,
            location: rule.location,
            tokens: rule.tokens,
            patterns,
        }
    }

    fn target<'s>(&self, signals: &'s Signals<'_>) -> Option<&'s str> {
        match self.location {
            MatchLocation::Body => Some(signals.body),
            MatchLocation::Header => Some(&signals.header_json),
            MatchLocation::Title => Some(signals.title),
            MatchLocation::Unknown => None,
        }
    }

    pub fn evaluate(&self, signals: &Signals<'_>) -> bool {
        if self.tokens.is_empty() {
            return false;
        }
        match self.method {
            MatchMethod::Keyword => self
                .target(signals)
                .is_some_and(|target| match_keyword(target, &self.tokens)),
            MatchMethod::Regex => match (self.target(signals), &self.patterns) {
                (Some(target), Some(patterns)) => {
                    patterns.iter().all(|pattern| pattern.is_match(target))
                }
                _ => false,
            },
            MatchMethod::FaviconHash => signals
                .favicon_hash
                .is_some_and(|hash| hash == self.tokens[0]),
            MatchMethod::Unknown => false,
        }
    }
}

/// One clause of a rule string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Lowercased needle searched in the lowercased body
    Body(String),
    Header(String),
    Title(String),
    /// Compared verbatim with the favicon hash
    IconHash(String),
}

impl Condition {
    fn evaluate(&self, signals: &Signals<'_>) -> bool {
        match self {
            Condition::Body(needle) => signals.body_lower().contains(needle.as_str()),
            Condition::Header(needle) => signals.header_text_lower().contains(needle.as_str()),
            Condition::Title(needle) => signals.title_lower().contains(needle.as_str()),
            Condition::IconHash(expected) => signals.favicon_hash == Some(expected.as_str()),
        }
    }
}

/// Undo `\"` and `\\` escapes inside a quoted clause value
pub fn unescape(value: &str) -> String {
    value.replace("\\\"", "\"").replace("\\\\", "\\")
}

/// Drop the first known clause-type suffix from a rule name
pub fn strip_name_suffix(name: &str) -> &str {
    NAME_SUFFIXES
        .iter()
        .find_map(|suffix| name.strip_suffix(suffix))
        .unwrap_or(name)
}

/// Split a rule string into its clauses. Clauses with empty values are skipped.
pub fn parse_conditions(rule: &str) -> Vec<Condition> {
    let mut conditions = Vec::new();

    let mut text_clauses = |pattern: &Regex, make: fn(String) -> Condition| {
        for captures in pattern.captures_iter(rule) {
            if let Some(value) = captures.get(1).map(|m| m.as_str()) {
                if !value.is_empty() {
                    conditions.push(make(unescape(value).to_lowercase()));
                }
            }
        }
    };
    text_clauses(&BODY_CLAUSE, Condition::Body);
    text_clauses(&HEADER_CLAUSE, Condition::Header);
    text_clauses(&TITLE_CLAUSE, Condition::Title);

    for captures in ICON_HASH_CLAUSE.captures_iter(rule) {
        if let Some(value) = captures.get(1) {
            conditions.push(Condition::IconHash(value.as_str().to_string()));
        }
    }

    conditions
}

/// A boolean rule string: every parsed clause must hold
#[derive(Debug, Clone)]
pub struct RuleStringFingerprint {
    /// Display name with the clause-type suffix removed
    pub name: String,
    pub conditions: Vec<Condition>,
}

impl RuleStringFingerprint {
    pub fn parse(entry: RuleStringEntry) -> Self {
        Self {
            name: strip_name_suffix(&entry.name).to_string(),
            conditions: parse_conditions(&entry.rule),
        }
    }

    pub fn evaluate(&self, signals: &Signals<'_>) -> bool {
        !self.conditions.is_empty() && self.conditions.iter().all(|c| c.evaluate(signals))
    }

    fn uses_icon_hash(&self) -> bool {
        self.conditions
            .iter()
            .any(|c| matches!(c, Condition::IconHash(_)))
    }
}

/// Either rule shape, evaluated uniformly
#[derive(Debug, Clone)]
pub enum Rule {
    Structured(CompiledRule),
    RuleString(RuleStringFingerprint),
}

impl Rule {
    pub fn name(&self) -> &str {
        match self {
            Rule::Structured(rule) => &rule.name,
            Rule::RuleString(rule) => &rule.name,
        }
    }

    pub fn evaluate(&self, signals: &Signals<'_>) -> bool {
        match self {
            Rule::Structured(rule) => rule.evaluate(signals),
            Rule::RuleString(rule) => rule.evaluate(signals),
        }
    }

    /// Whether evaluating this rule can depend on the favicon hash
    pub fn needs_favicon(&self) -> bool {
        match self {
            Rule::Structured(rule) => rule.method == MatchMethod::FaviconHash,
            Rule::RuleString(rule) => rule.uses_icon_hash(),
        }
    }
}

/// Immutable collection of rules shared by all scan workers
#[derive(Debug, Clone, Default)]
pub struct FingerprintDatabase {
    rules: Vec<Rule>,
}

impl FingerprintDatabase {
    pub fn from_rules(rules: Vec<FingerprintRule>) -> Self {
        Self {
            rules: rules
                .into_iter()
                .map(|rule| Rule::Structured(CompiledRule::compile(rule)))
                .collect(),
        }
    }

    pub fn from_rule_strings(entries: Vec<RuleStringEntry>) -> Self {
        Self {
            rules: entries
                .into_iter()
                .map(|entry| Rule::RuleString(RuleStringFingerprint::parse(entry)))
                .collect(),
        }
    }

    /// Load one fingerprint file, picking the format from its extension:
    /// `.json`, `.json.gz`/`.gz` or `.yaml`/`.yml`
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DatabaseError> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        let io_error = |source| DatabaseError::Io {
            path: path.to_path_buf(),
            source,
        };
        let json_error = |source| DatabaseError::Json {
            path: path.to_path_buf(),
            source,
        };

        let database = if file_name.ends_with(".gz") {
            let compressed = std::fs::read(path).map_err(io_error)?;
            let mut decoder = GzDecoder::new(compressed.as_slice());
            let mut json = Vec::new();
            decoder.read_to_end(&mut json).map_err(io_error)?;
            let file: FingerprintFile = serde_json::from_slice(&json).map_err(json_error)?;
            Self::from_rules(file.into_rules())
        } else if file_name.ends_with(".json") {
            let json = std::fs::read(path).map_err(io_error)?;
            let file: FingerprintFile = serde_json::from_slice(&json).map_err(json_error)?;
            Self::from_rules(file.into_rules())
        } else if file_name.ends_with(".yaml") || file_name.ends_with(".yml") {
            let yaml = std::fs::read_to_string(path).map_err(io_error)?;
            let entries: Vec<RuleStringEntry> =
                serde_yaml::from_str(&yaml).map_err(|source| DatabaseError::Yaml {
                    path: path.to_path_buf(),
                    source,
                })?;
            Self::from_rule_strings(entries)
        } else {
            return Err(DatabaseError::UnsupportedFormat(path.to_path_buf()));
        };

        tracing::info!("Loaded {} fingerprints from {}", database.len(), path.display());
        Ok(database)
    }

    /// Load and merge several files, keeping their order
    pub fn load_all<P: AsRef<Path>>(paths: &[P]) -> Result<Self, DatabaseError> {
        let mut database = Self::default();
        for path in paths {
            database.merge(Self::load(path)?);
        }
        Ok(database)
    }

    pub fn merge(&mut self, other: FingerprintDatabase) {
        self.rules.extend(other.rules);
    }

    /// Names of all matching rules in database order, without duplicates
    pub fn match_all(&self, signals: &Signals<'_>) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for rule in &self.rules {
            let name = rule.name();
            if name.is_empty() || names.iter().any(|n| n == name) {
                continue;
            }
            if rule.evaluate(signals) {
                names.push(name.to_string());
            }
        }
        names
    }

    /// Whether any rule looks at the favicon hash
    pub fn needs_favicon(&self) -> bool {
        self.rules.iter().any(Rule::needs_favicon)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
