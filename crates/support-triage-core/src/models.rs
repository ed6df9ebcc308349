//! Core data models shared by the classifier, the playbook table and the
//! document retriever.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How urgent a classified error is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = anyhow::Error;

    /// Case-insensitive: `"high"`, `"High"` and `"HIGH"` all parse.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            other => bail!("unknown severity: '{}'. Must be Low, Medium, or High.", other),
        }
    }
}

/// A named classification bucket.
///
/// `match_any` holds uppercase trigger substrings; blank triggers are never
/// stored, so a rule with no triggers can only be reached as the fallback.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rule {
    pub category: String,
    pub match_any: Vec<String>,
    pub severity: Severity,
    pub signals: Vec<String>,
}

impl Rule {
    /// Build a rule, normalising triggers to uppercase and dropping blanks.
    pub fn new<S: AsRef<str>>(
        category: impl Into<String>,
        match_any: &[S],
        severity: Severity,
        signals: &[S],
    ) -> Self {
        Self {
            category: category.into(),
            match_any: normalize_triggers(match_any),
            severity,
            signals: signals.iter().map(|s| s.as_ref().to_string()).collect(),
        }
    }

    /// True if any trigger occurs in either normalised input.
    pub fn matches(&self, code: &str, message: &str) -> bool {
        self.match_any
            .iter()
            .any(|t| code.contains(t.as_str()) || message.contains(t.as_str()))
    }
}

pub(crate) fn normalize_triggers<S: AsRef<str>>(triggers: &[S]) -> Vec<String> {
    triggers
        .iter()
        .map(|t| t.as_ref().to_uppercase())
        .filter(|t| !t.trim().is_empty())
        .collect()
}

/// Outcome of classifying one error report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub category: String,
    pub severity: Severity,
    pub signals: Vec<String>,
}

/// Reference documents and remediation steps for one category.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlaybookEntry {
    pub refs: Vec<String>,
    pub steps: Vec<String>,
}

/// A seed file contributing to the searchable corpus. `path` is the file
/// name only and doubles as the document identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedDocument {
    pub path: String,
    pub text: String,
}

/// One ranked document returned by [`crate::search::VectorStore::search`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub path: String,
    pub text: String,
    /// Raw linear-kernel score; not clamped or normalised.
    pub score: f64,
}
