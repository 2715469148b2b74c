//! Markup extractors
//!
//! Pods of different versions embed the CSRF token and the current user's
//! attributes in different places. Each known format is one [`Extractor`];
//! callers hold an ordered list and take the first match.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

use crate::{Error, Result};

static META_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<meta\s+name=["']csrf-token["']\s+content=["']([^"']*)["']"#)
        .expect("meta csrf pattern is valid")
});

static LEGACY_META_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"content=["']([^"']*)["']\s+name=["']csrf-token["']"#)
        .expect("legacy csrf pattern is valid")
});

static GON_USER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"gon\.user\s*=\s*(\{.*?\});").expect("gon.user pattern is valid")
});

static LEGACY_USER_ATTRIBUTES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"window\.current_user_attributes\s*=\s*(\{.*\})")
        .expect("current_user_attributes pattern is valid")
});

/// A pure strategy pulling one value out of a response body
pub trait Extractor: Send + Sync + fmt::Debug {
    /// Short label used in logs
    fn name(&self) -> &str;

    /// The extracted value, or `None` when this format is not present
    fn extract(&self, body: &str) -> Option<String>;
}

/// Extractor returning the first capture group of a regular expression.
/// Empty captures count as no match.
#[derive(Debug, Clone)]
pub struct PatternExtractor {
    name: String,
    pattern: Regex,
}

impl PatternExtractor {
    /// Compile a custom pattern; it must have at least one capture group
    pub fn new(name: impl Into<String>, pattern: &str) -> Result<Self> {
        let pattern = Regex::new(pattern)
            .map_err(|e| Error::config(format!("Invalid extractor pattern: {}", e)))?;
        if pattern.captures_len() < 2 {
            return Err(Error::config("Extractor pattern needs a capture group"));
        }
        Ok(Self::from_regex(name, pattern))
    }

    fn from_regex(name: impl Into<String>, pattern: Regex) -> Self {
        Self {
            name: name.into(),
            pattern,
        }
    }
}

impl Extractor for PatternExtractor {
    fn name(&self) -> &str {
        &self.name
    }

    fn extract(&self, body: &str) -> Option<String> {
        self.pattern
            .captures(body)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .filter(|value| !value.is_empty())
    }
}

/// Current then legacy CSRF meta tag formats
pub fn token_extractors() -> Vec<Box<dyn Extractor>> {
    vec![
        Box::new(PatternExtractor::from_regex("meta", META_TOKEN.clone())),
        Box::new(PatternExtractor::from_regex(
            "legacy-meta",
            LEGACY_META_TOKEN.clone(),
        )),
    ]
}

/// Current (`gon.user`) then legacy (`window.current_user_attributes`) formats
pub fn user_data_extractors() -> Vec<Box<dyn Extractor>> {
    vec![
        Box::new(PatternExtractor::from_regex("gon-user", GON_USER.clone())),
        Box::new(PatternExtractor::from_regex(
            "current-user-attributes",
            LEGACY_USER_ATTRIBUTES.clone(),
        )),
    ]
}

/// Run extractors in order and return the first match with its extractor's name
pub fn extract_first<'a>(
    extractors: &'a [Box<dyn Extractor>],
    body: &str,
) -> Option<(&'a str, String)> {
    extractors.iter().find_map(|extractor| {
        extractor
            .extract(body)
            .map(|value| (extractor.name(), value))
    })
}
