//! Remediation playbooks keyed by category.
//!
//! [`Playbook::with_defaults`] seeds one entry per built-in category so the
//! service works with no files on disk. Callers may replace individual
//! fields afterwards (the application does so from override files); after
//! construction the table is read-only.

use indexmap::IndexMap;

use crate::classify::GENERAL;
use crate::models::PlaybookEntry;

fn entry(refs: &[&str], steps: &[&str]) -> PlaybookEntry {
    PlaybookEntry {
        refs: refs.iter().map(|s| s.to_string()).collect(),
        steps: steps.iter().map(|s| s.to_string()).collect(),
    }
}

fn default_entries() -> IndexMap<String, PlaybookEntry> {
    let mut table = IndexMap::new();
    table.insert(
        "Payments".to_string(),
        entry(
            &[
                "docs/payments/gateway-checks.md",
                "docs/payments/tokenization.md",
                "runbooks/payments/common-failures.md",
            ],
            &[
                "Verify payment method is allowed for the account/location.",
                "Check tokenization response (token present, not expired).",
                "Confirm gateway credentials & merchant config in env.",
                "Validate currency, amount format, and CVV/AVS rules.",
                "Retry once if upstream 5xx; otherwise surface user-safe message.",
            ],
        ),
    );
    table.insert(
        "Auth".to_string(),
        entry(
            &["docs/auth/jwt-rotation.md", "runbooks/auth/401-403.md"],
            &[
                "Check Authorization header present and Bearer token format.",
                "Validate token exp/nbf and audience claims.",
                "Confirm server clock skew and refresh token logic.",
            ],
        ),
    );
    table.insert(
        "Networking".to_string(),
        entry(
            &["docs/net/retries.md", "runbooks/net/timeouts.md"],
            &[
                "Confirm upstream host resolves and is reachable.",
                "Increase client timeout to >= 30s for heavy operations.",
                "Enable exponential backoff with jitter on retries.",
            ],
        ),
    );
    table.insert(
        "Routing".to_string(),
        entry(
            &["docs/api/routing.md"],
            &[
                "Check route path and HTTP method.",
                "Ensure service registering route on startup (import side-effects).",
            ],
        ),
    );
    table.insert(
        GENERAL.to_string(),
        entry(
            &["docs/oncall/triage-checklist.md"],
            &[
                "Reproduce locally with same inputs.",
                "Check recent deploys/feature flags.",
                "Collect logs with correlation/request IDs.",
            ],
        ),
    );
    table
}

/// Category → playbook table with a guaranteed `General` entry.
#[derive(Debug, Clone)]
pub struct Playbook {
    entries: IndexMap<String, PlaybookEntry>,
}

impl Playbook {
    pub fn with_defaults() -> Self {
        Self {
            entries: default_entries(),
        }
    }

    /// Categories in table order.
    pub fn categories(&self) -> Vec<&str> {
        self.entries.keys().map(|k| k.as_str()).collect()
    }

    pub fn entry(&self, category: &str) -> Option<&PlaybookEntry> {
        self.entries.get(category)
    }

    /// Replace the references of an existing category. Returns `false` (and
    /// changes nothing) for an unknown category.
    pub fn set_refs(&mut self, category: &str, refs: Vec<String>) -> bool {
        match self.entries.get_mut(category) {
            Some(e) => {
                e.refs = refs;
                true
            }
            None => false,
        }
    }

    /// Replace the steps of an existing category. Returns `false` (and
    /// changes nothing) for an unknown category.
    pub fn set_steps(&mut self, category: &str, steps: Vec<String>) -> bool {
        match self.entries.get_mut(category) {
            Some(e) => {
                e.steps = steps;
                true
            }
            None => false,
        }
    }

    /// Look up the playbook for `category`; unknown categories get the
    /// `General` entry.
    ///
    /// `error_code` and `message` are not consulted yet. They are part of
    /// the signature so content-aware ranking can be added without touching
    /// callers.
    pub fn retrieve_playbook(
        &self,
        _error_code: &str,
        category: &str,
        _message: &str,
    ) -> (&[String], &[String]) {
        match self
            .entries
            .get(category)
            .or_else(|| self.entries.get(GENERAL))
        {
            Some(entry) => (&entry.refs, &entry.steps),
            None => (&[], &[]),
        }
    }
}

impl Default for Playbook {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Split override file content into entries: one per non-blank line, trimmed.
pub fn parse_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}
