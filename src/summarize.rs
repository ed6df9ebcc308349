//! Assistant summaries for diagnoses.
//!
//! A [`Summarizer`] turns a query and a handful of text snippets into a
//! short, human-readable summary. Summaries are best-effort: providers never
//! return an error, and any remote failure degrades to [`fallback_summary`].
//!
//! | Provider | Behaviour |
//! |----------|-----------|
//! | `fallback` | Local, deterministic synthesis from the first snippets |
//! | `openai` | Chat-completions call; falls back locally on any failure |

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::SummarizerConfig;

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

const FALLBACK_SNIPPETS: usize = 3;
const FALLBACK_SNIPPET_CHARS: usize = 400;
const PROMPT_SNIPPET_CHARS: usize = 800;

const SYSTEM_PROMPT: &str =
    "You are a support assistant that writes crisp, step-by-step guidance.";

#[async_trait]
pub trait Summarizer: Send + Sync {
    fn name(&self) -> &str;

    async fn summarize(&self, query: &str, snippets: &[String]) -> String;
}

/// Trim `s` and cut it to `max` characters, marking the cut with `" ..."`.
fn clip(s: &str, max: usize) -> String {
    let s = s.trim();
    if s.chars().count() > max {
        let head: String = s.chars().take(max).collect();
        format!("{} ...", head.trim_end())
    } else {
        s.to_string()
    }
}

/// Local synthesis used when no remote model is available.
pub fn fallback_summary(query: &str, snippets: &[String]) -> String {
    if snippets.is_empty() {
        return format!(
            "Summary for: {}\n\nNo snippets available. Please provide more context or logs.",
            query
        );
    }

    let bullets = snippets
        .iter()
        .take(FALLBACK_SNIPPETS)
        .map(|s| format!("- {}", clip(s, FALLBACK_SNIPPET_CHARS)))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Summary for: {}\n\n\
         Key points from available support snippets:\n{}\n\n\
         Next steps:\n\
         - Verify relevant configuration and credentials for the failing component.\n\
         - Reproduce with the same inputs; collect logs/correlation IDs.\n\
         - If a gateway or upstream is involved, check recent changes and retry policy.",
        query, bullets
    )
}

pub struct FallbackSummarizer;

#[async_trait]
impl Summarizer for FallbackSummarizer {
    fn name(&self) -> &str {
        "fallback"
    }

    async fn summarize(&self, query: &str, snippets: &[String]) -> String {
        fallback_summary(query, snippets)
    }
}

// ============ OpenAI ============

pub struct OpenAiSummarizer {
    client: reqwest::Client,
    model: String,
    api_key: Option<String>,
    endpoint: String,
}

impl OpenAiSummarizer {
    /// Build from config, reading `OPENAI_API_KEY` from the environment.
    pub fn new(config: &SummarizerConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(config: &SummarizerConfig, api_key: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            model: config.effective_model(),
            api_key,
            endpoint: OPENAI_CHAT_URL.to_string(),
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn complete(&self, api_key: &str, query: &str, snippets: &[String]) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": build_prompt(query, snippets)},
            ],
            "temperature": 0.3,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("OpenAI API error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response.json().await?;
        parse_completion(&json)
    }
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    fn name(&self) -> &str {
        "openai"
    }

    async fn summarize(&self, query: &str, snippets: &[String]) -> String {
        let Some(api_key) = self.api_key.as_deref() else {
            tracing::debug!("OPENAI_API_KEY not set, using local summary");
            return fallback_summary(query, snippets);
        };

        match self.complete(api_key, query, snippets).await {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(model = %self.model, error = %format!("{:#}", e), "summary request failed, using local summary");
                fallback_summary(query, snippets)
            }
        }
    }
}

fn build_prompt(query: &str, snippets: &[String]) -> String {
    let mut prompt = format!(
        "You are a precise support assistant. \
         Given an error/query and relevant support snippets, produce a concise, actionable response. \
         Use bullet points, avoid fluff, and call out concrete checks/fixes.\n\n\
         User query:\n{}\n\n\
         Relevant support snippets:\n",
        query
    );
    for (i, snippet) in snippets.iter().enumerate() {
        prompt.push_str(&format!("{}. {}\n", i + 1, clip(snippet, PROMPT_SNIPPET_CHARS)));
    }
    prompt.push_str(
        "\nNow provide the best possible short, actionable response for the user. \
         If data is missing, say what to collect next.",
    );
    prompt
}

/// Extract `choices[0].message.content`. Blank content is an error.
fn parse_completion(json: &serde_json::Value) -> Result<String> {
    let content = json
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(str::trim)
        .unwrap_or_default();

    if content.is_empty() {
        bail!("Invalid OpenAI response: empty completion");
    }
    Ok(content.to_string())
}

/// Instantiate the configured provider.
pub fn create_summarizer(config: &SummarizerConfig) -> Result<Arc<dyn Summarizer>> {
    match config.provider.as_str() {
        "fallback" => Ok(Arc::new(FallbackSummarizer)),
        "openai" => Ok(Arc::new(OpenAiSummarizer::new(config)?)),
        other => bail!("Unknown summarizer provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_without_snippets() {
        assert_eq!(
            fallback_summary("AUTH_FAILED", &[]),
            "Summary for: AUTH_FAILED\n\nNo snippets available. Please provide more context or logs."
        );
    }

    #[test]
    fn test_fallback_takes_first_three() {
        let snippets: Vec<String> = ["  one  ", "two", "three", "four"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let out = fallback_summary("q", &snippets);

        assert!(out.starts_with("Summary for: q\n\nKey points from available support snippets:\n- one\n- two\n- three\n\nNext steps:\n"));
        assert!(!out.contains("four"));
        assert!(out.ends_with("check recent changes and retry policy."));
    }

    #[test]
    fn test_fallback_truncates_long_snippets() {
        let long = "x".repeat(450);
        let out = fallback_summary("q", &[long]);
        let expected = format!("- {} ...\n", "x".repeat(400));
        assert!(out.contains(&expected));
    }

    #[test]
    fn test_clip_counts_chars_not_bytes() {
        let s = "é".repeat(10);
        assert_eq!(clip(&s, 10), s);
        assert_eq!(clip(&s, 4), "éééé ...");
    }

    #[test]
    fn test_prompt_numbers_and_clips_snippets() {
        let prompt = build_prompt("[Auth/Medium] X: y", &["a".repeat(900), "b".to_string()]);
        assert!(prompt.contains("User query:\n[Auth/Medium] X: y"));
        assert!(prompt.contains(&format!("1. {} ...\n", "a".repeat(800))));
        assert!(prompt.contains("2. b\n"));
    }

    #[test]
    fn test_parse_completion() {
        let ok = serde_json::json!({"choices": [{"message": {"content": "  do this  "}}]});
        assert_eq!(parse_completion(&ok).unwrap(), "do this");

        let blank = serde_json::json!({"choices": [{"message": {"content": "   "}}]});
        assert!(parse_completion(&blank).is_err());

        assert!(parse_completion(&serde_json::json!({})).is_err());
    }

    #[test]
    fn test_create_summarizer() {
        let cfg = SummarizerConfig::default();
        assert_eq!(create_summarizer(&cfg).unwrap().name(), "fallback");

        let cfg = SummarizerConfig {
            provider: "bogus".to_string(),
            ..SummarizerConfig::default()
        };
        assert!(create_summarizer(&cfg).is_err());
    }

    #[tokio::test]
    async fn test_openai_without_key_falls_back() {
        let s = OpenAiSummarizer::with_api_key(&SummarizerConfig::default(), None).unwrap();
        let snippets = vec!["Steps:\n- retry".to_string()];
        assert_eq!(
            s.summarize("q", &snippets).await,
            fallback_summary("q", &snippets)
        );
    }

    #[tokio::test]
    async fn test_openai_unreachable_falls_back() {
        let cfg = SummarizerConfig {
            timeout_secs: 2,
            ..SummarizerConfig::default()
        };
        let s = OpenAiSummarizer::with_api_key(&cfg, Some("sk-test".to_string()))
            .unwrap()
            .with_endpoint("http://127.0.0.1:1/v1/chat/completions");
        assert_eq!(s.summarize("q", &[]).await, fallback_summary("q", &[]));
    }
}
