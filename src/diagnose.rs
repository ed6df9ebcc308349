//! The diagnosis pipeline: validate, classify, look up the playbook, and
//! optionally attach an assistant summary.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use support_triage_core::classify::RuleClassifier;
use support_triage_core::models::Severity;
use support_triage_core::playbook::Playbook;

use crate::summarize::Summarizer;

/// Longest accepted stack trace, in characters.
pub const MAX_TRACE_CHARS: usize = 20_000;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DiagnoseRequest {
    pub error_code: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub trace: Option<String>,
    #[serde(default)]
    pub context: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnoseResponse {
    pub detected_error: String,
    pub category: String,
    pub severity: Severity,
    pub signals: Vec<String>,
    pub suggested_steps: Vec<String>,
    pub references: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assistant_summary: Option<String>,
}

/// A request rejected before any work was done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidRequest(pub String);

impl fmt::Display for InvalidRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for InvalidRequest {}

pub struct Diagnostician {
    classifier: RuleClassifier,
    playbook: Playbook,
    summarizer: Arc<dyn Summarizer>,
}

impl Diagnostician {
    pub fn new(classifier: RuleClassifier, playbook: Playbook, summarizer: Arc<dyn Summarizer>) -> Self {
        Self {
            classifier,
            playbook,
            summarizer,
        }
    }

    pub fn playbook(&self) -> &Playbook {
        &self.playbook
    }

    pub async fn diagnose(
        &self,
        req: &DiagnoseRequest,
        with_summary: bool,
    ) -> Result<DiagnoseResponse, InvalidRequest> {
        validate(req)?;

        let message = req.message.as_deref().unwrap_or("");
        let trace = req.trace.as_deref().unwrap_or("");

        let result = self.classifier.classify(&req.error_code, message, trace);
        let (refs, steps) =
            self.playbook
                .retrieve_playbook(&req.error_code, &result.category, message);

        let shown_message = if message.is_empty() { "No message" } else { message };
        let raw_notes = format!(
            "query=[{}/{}] {} :: {}\nsteps={} refs={}",
            result.category,
            result.severity,
            req.error_code,
            shown_message,
            steps.len(),
            refs.len()
        );

        tracing::info!(
            error_code = %req.error_code,
            category = %result.category,
            severity = %result.severity,
            with_summary,
            "diagnosed"
        );

        let mut response = DiagnoseResponse {
            detected_error: req.error_code.clone(),
            category: result.category,
            severity: result.severity,
            signals: result.signals,
            suggested_steps: steps.to_vec(),
            references: refs.to_vec(),
            raw_notes: Some(raw_notes),
            assistant_summary: None,
        };

        if with_summary {
            let query = format!(
                "[{}/{}] {}: {}",
                response.category, response.severity, req.error_code, shown_message
            );
            let snippets = vec![
                format!("Steps:\n- {}", response.suggested_steps.join("\n- ")),
                format!("References:\n- {}", response.references.join("\n- ")),
            ];
            response.assistant_summary = Some(self.summarizer.summarize(&query, &snippets).await);
        }

        Ok(response)
    }
}

fn validate(req: &DiagnoseRequest) -> Result<(), InvalidRequest> {
    if req.error_code.trim().is_empty() {
        return Err(InvalidRequest("error_code is required".to_string()));
    }
    if let Some(trace) = &req.trace {
        if trace.chars().count() > MAX_TRACE_CHARS {
            return Err(InvalidRequest(format!(
                "trace must be at most {} characters",
                MAX_TRACE_CHARS
            )));
        }
    }
    Ok(())
}
