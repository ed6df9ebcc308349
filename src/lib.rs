//! # Support Triage
//!
//! An error-report triage service. Given an error code and message it picks
//! a support category with an ordered rule classifier, returns that
//! category's remediation playbook, and can search a corpus of support
//! documents with a TF-IDF index.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌────────────────┐
//! │ rules.json   │──▶│ Classifier   │──▶│                │
//! │ playbook dir │──▶│ Playbook     │──▶│  Diagnostician │──┐
//! └──────────────┘   └──────────────┘   │  + Summarizer  │  │
//!                                       └────────────────┘  │   ┌──────────┐
//! ┌──────────────┐   ┌──────────────┐                       ├──▶│   CLI    │
//! │ seeds/*.md   │──▶│ DocumentIndex│──────────────────────▶│   │ (triage) │
//! └──────────────┘   │ (TF-IDF)     │                       │   └──────────┘
//!                    └──────┬───────┘                       │   ┌──────────┐
//!                           ▼                               └──▶│   HTTP   │
//!                    vector_store/store.bin                     └──────────┘
//! ```
//!
//! The pure algorithms live in the `support-triage-core` crate; this crate
//! adds file loading, persistence, the summarizer, and the CLI and HTTP
//! surfaces.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`rules`] | Rule-file loading with fallback to built-in rules |
//! | [`playbook`] | Playbook override files |
//! | [`seeds`] | Seed corpus scanning |
//! | [`vector_store`] | Persisted document index lifecycle |
//! | [`summarize`] | Assistant summary providers |
//! | [`diagnose`] | The diagnosis pipeline |
//! | [`app`] | Start-up wiring |
//! | [`commands`] | CLI command implementations |
//! | [`server`] | HTTP API |
//! | [`logging`] | Tracing subscriber setup |

pub mod app;
pub mod commands;
pub mod config;
pub mod diagnose;
pub mod logging;
pub mod playbook;
pub mod rules;
pub mod seeds;
pub mod server;
pub mod summarize;
pub mod vector_store;
