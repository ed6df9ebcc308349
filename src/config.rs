//! TOML configuration.
//!
//! Every section and field has a default, so a service started without a
//! config file runs on [`Config::minimal`]. A file that exists but fails to
//! parse or validate is a start-up error.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub playbook: PlaybookConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub summarizer: SummarizerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ClassifierConfig {
    /// JSON rule document. `None` means built-in rules.
    #[serde(default)]
    pub rules_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PlaybookConfig {
    /// Directory holding `<stem>_refs.txt` / `<stem>_steps.txt` overrides.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_seeds_dir")]
    pub seeds_dir: PathBuf,
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            seeds_dir: default_seeds_dir(),
            store_path: default_store_path(),
            include_globs: default_include_globs(),
            default_top_k: default_top_k(),
        }
    }
}

fn default_seeds_dir() -> PathBuf {
    PathBuf::from("seeds")
}
fn default_store_path() -> PathBuf {
    PathBuf::from("vector_store/store.bin")
}
fn default_include_globs() -> Vec<String> {
    vec!["*.md".to_string(), "*.txt".to_string()]
}
fn default_top_k() -> usize {
    support_triage_core::search::DEFAULT_TOP_K
}

#[derive(Debug, Deserialize, Clone)]
pub struct SummarizerConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "fallback".to_string()
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

impl SummarizerConfig {
    /// Model name, with `OPENAI_MODEL` taking precedence over the file.
    pub fn effective_model(&self) -> String {
        std::env::var("OPENAI_MODEL")
            .ok()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| self.model.clone())
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    /// When set, events are also written to a daily-rolling `api.log` here.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Config {
    /// Built-in configuration used when no config file exists.
    pub fn minimal() -> Self {
        Self::default()
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Load `path` if it exists, otherwise fall back to [`Config::minimal`].
///
/// Runs before logging is installed, so it does not log; callers report
/// the fallback once the subscriber is up.
pub fn load_or_minimal(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(Config::minimal())
    }
}

fn validate(config: &Config) -> Result<()> {
    if config.retrieval.default_top_k < 1 {
        anyhow::bail!("retrieval.default_top_k must be >= 1");
    }

    if config.retrieval.include_globs.is_empty() {
        anyhow::bail!("retrieval.include_globs must not be empty");
    }

    if config.summarizer.timeout_secs == 0 {
        anyhow::bail!("summarizer.timeout_secs must be > 0");
    }

    match config.summarizer.provider.as_str() {
        "fallback" | "openai" => {}
        other => anyhow::bail!(
            "Unknown summarizer provider: '{}'. Must be fallback or openai.",
            other
        ),
    }

    Ok(())
}
