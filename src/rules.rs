//! Rule-file loading for the classifier.
//!
//! Classification must keep working whatever state the rule file is in, so
//! every failure here degrades to the built-in rules. Each degradation is
//! logged with the path and cause.

use std::path::Path;

use support_triage_core::classify::{parse_rules, RuleClassifier, RuleSet};

/// Build the rule set from an optional JSON rule file.
pub fn load_rule_set(path: Option<&Path>) -> RuleSet {
    let Some(path) = path else {
        tracing::info!("no rule file configured, using built-in rules");
        return RuleSet::default();
    };

    if !path.exists() {
        tracing::info!(path = %path.display(), "rule file not found, using built-in rules");
        return RuleSet::default();
    }

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read rule file, using built-in rules");
            return RuleSet::default();
        }
    };

    match parse_rules(&content) {
        Ok(rules) => {
            let set = RuleSet::new(rules);
            if set.fallback_added() {
                tracing::warn!(path = %path.display(), "rule file has no General rule, appended built-in General");
            }
            tracing::info!(path = %path.display(), rules = set.rules().len(), "loaded rules");
            set
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %format!("{:#}", e), "malformed rule file, using built-in rules");
            RuleSet::default()
        }
    }
}

pub fn load_classifier(path: Option<&Path>) -> RuleClassifier {
    RuleClassifier::new(load_rule_set(path))
}
