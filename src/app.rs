//! Start-up wiring shared by the CLI and the HTTP server.

use anyhow::Result;
use std::sync::Arc;

use crate::config::Config;
use crate::diagnose::Diagnostician;
use crate::playbook::load_playbook;
use crate::rules::load_classifier;
use crate::summarize::create_summarizer;
use crate::vector_store::DocumentIndex;

/// Long-lived components, built once and shared by handle.
#[derive(Clone)]
pub struct App {
    pub config: Arc<Config>,
    pub diagnostician: Arc<Diagnostician>,
    pub index: Arc<DocumentIndex>,
}

impl App {
    pub fn from_config(config: &Config) -> Result<Self> {
        let classifier = load_classifier(config.classifier.rules_path.as_deref());
        let playbook = load_playbook(config.playbook.dir.as_deref());
        let summarizer = create_summarizer(&config.summarizer)?;
        tracing::debug!(summarizer = summarizer.name(), "summarizer ready");

        Ok(Self {
            config: Arc::new(config.clone()),
            diagnostician: Arc::new(Diagnostician::new(classifier, playbook, summarizer)),
            index: Arc::new(DocumentIndex::new(&config.retrieval)),
        })
    }
}
