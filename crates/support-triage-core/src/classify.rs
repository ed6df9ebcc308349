//! Ordered keyword rule engine.
//!
//! Rules are evaluated in the order they were defined. The first rule with a
//! trigger contained in the uppercased error code or message wins; there is
//! no scoring. Reports that match nothing land in the `General` bucket.
//!
//! Rule sets come either from [`default_rules`] or from a JSON document
//! parsed by [`parse_rules`]:
//!
//! ```json
//! {
//!   "Payments": { "match_any": ["PAYMENT", "CARD"], "severity": "High", "signals": ["gateway_response"] },
//!   "General":  { "match_any": [], "severity": "Low", "signals": ["generic_checklist"] }
//! }
//! ```

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Deserialize;

use crate::models::{normalize_triggers, ClassificationResult, Rule, Severity};

/// Name of the fallback bucket.
pub const GENERAL: &str = "General";

/// Signal attached when a rule omits `signals`.
const GENERIC_SIGNAL: &str = "generic_checklist";

/// The built-in rule set used when no rule file is configured or the
/// configured one cannot be used.
pub fn default_rules() -> Vec<Rule> {
    vec![
        Rule::new(
            "Payments",
            &["PAYMENT", "CARD"],
            Severity::High,
            &["payment_module", "cc_validation", "gateway_response"],
        ),
        Rule::new(
            "Auth",
            &["AUTH", "UNAUTHORIZED", "401"],
            Severity::Medium,
            &["token_expired", "bad_credentials"],
        ),
        Rule::new(
            "Networking",
            &["TIMEOUT", "TIMED OUT"],
            Severity::Medium,
            &["upstream_timeout", "retry_needed"],
        ),
        Rule::new(
            "Routing",
            &["NOT FOUND", "404"],
            Severity::Low,
            &["missing_endpoint", "bad_url"],
        ),
        general_rule(),
    ]
}

fn general_rule() -> Rule {
    Rule::new(GENERAL, &[] as &[&str], Severity::Low, &[GENERIC_SIGNAL])
}

#[derive(Debug, Deserialize)]
struct RawRule {
    #[serde(default)]
    match_any: Vec<String>,
    #[serde(default)]
    severity: Option<String>,
    #[serde(default)]
    signals: Option<Vec<String>>,
}

/// Parse a JSON rule document, preserving key order as evaluation order.
///
/// Missing `severity` defaults to `Low`, missing `signals` to
/// `["generic_checklist"]`. An unknown severity is an error.
pub fn parse_rules(json: &str) -> Result<Vec<Rule>> {
    let raw: IndexMap<String, RawRule> =
        serde_json::from_str(json).context("rule document is not a category → rule object")?;

    let mut rules = Vec::with_capacity(raw.len());
    for (category, entry) in raw {
        let severity = match entry.severity {
            Some(s) => s
                .parse::<Severity>()
                .with_context(|| format!("invalid severity for rule '{}'", category))?,
            None => Severity::Low,
        };
        let signals = entry
            .signals
            .unwrap_or_else(|| vec![GENERIC_SIGNAL.to_string()]);

        rules.push(Rule {
            category,
            match_any: normalize_triggers(&entry.match_any),
            severity,
            signals,
        });
    }
    Ok(rules)
}

/// An ordered, immutable rule set that always has a `General` fallback.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<Rule>,
    fallback: usize,
    fallback_added: bool,
}

impl RuleSet {
    /// Wrap `rules`, appending the built-in `General` rule if none is present.
    pub fn new(mut rules: Vec<Rule>) -> Self {
        let (fallback, fallback_added) = match rules.iter().position(|r| r.category == GENERAL) {
            Some(idx) => (idx, false),
            None => {
                rules.push(general_rule());
                (rules.len() - 1, true)
            }
        };
        Self {
            rules,
            fallback,
            fallback_added,
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn fallback(&self) -> &Rule {
        &self.rules[self.fallback]
    }

    /// True when [`RuleSet::new`] had to synthesise the `General` rule.
    pub fn fallback_added(&self) -> bool {
        self.fallback_added
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

/// First-match-wins classifier over a [`RuleSet`].
#[derive(Debug, Clone, Default)]
pub struct RuleClassifier {
    rules: RuleSet,
}

impl RuleClassifier {
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Classify one error report.
    ///
    /// The code is uppercased and trimmed, the message uppercased. `_trace`
    /// is accepted for interface stability and currently ignored.
    pub fn classify(&self, error_code: &str, message: &str, _trace: &str) -> ClassificationResult {
        let code = error_code.to_uppercase();
        let code = code.trim();
        let msg = message.to_uppercase();

        let rule = self
            .rules
            .rules()
            .iter()
            .find(|r| r.matches(code, &msg))
            .unwrap_or_else(|| self.rules.fallback());

        ClassificationResult {
            category: rule.category.clone(),
            severity: rule.severity,
            signals: rule.signals.clone(),
        }
    }
}
