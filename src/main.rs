//! # Support Triage CLI (`triage`)
//!
//! ## Usage
//!
//! ```bash
//! triage --config ./config/triage.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `triage diagnose <code>` | Classify an error and print its playbook |
//! | `triage search "<query>"` | Search the seed corpus |
//! | `triage rebuild` | Rebuild the persisted document index |
//! | `triage store-info` | Report on the persisted index file |
//! | `triage categories` | List playbook categories |
//! | `triage serve` | Start the HTTP API |
//!
//! ## Examples
//!
//! ```bash
//! triage diagnose PAYMENT_METHOD_ERROR --message "card declined" --summary
//! triage search "gateway timeout" --top-k 5
//! triage serve --config ./config/triage.toml
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use support_triage::app::App;
use support_triage::{commands, config, logging, server};

/// Support Triage: classify error reports, suggest remediation steps, and
/// search the support corpus.
#[derive(Parser)]
#[command(
    name = "triage",
    about = "Support Triage: error classification, remediation playbooks and document search",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/triage.toml`. When the file does not exist the
    /// built-in defaults are used.
    #[arg(long, global = true, default_value = "./config/triage.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify an error and print the matching playbook.
    Diagnose {
        /// Error code, e.g. `PAYMENT_METHOD_ERROR`.
        error_code: String,

        /// Human-readable error message.
        #[arg(long)]
        message: Option<String>,

        /// Stack trace (accepted, not used for classification).
        #[arg(long)]
        trace: Option<String>,

        /// Attach an assistant summary.
        #[arg(long)]
        summary: bool,
    },

    /// Search the seed corpus.
    Search {
        query: String,

        /// Maximum number of results. Defaults to `[retrieval].default_top_k`.
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Rebuild the document index from the seeds directory.
    Rebuild,

    /// Report whether the persisted index exists and its size.
    StoreInfo,

    /// List playbook categories.
    Categories,

    /// Start the HTTP API on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config_found = cli.config.exists();
    let cfg = config::load_or_minimal(&cli.config)?;
    let _log_guard = logging::init_logging(&cfg.logging)?;
    if !config_found {
        tracing::info!(path = %cli.config.display(), "config file not found, using built-in defaults");
    }

    match cli.command {
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        command => {
            let app = App::from_config(&cfg)?;
            match command {
                Commands::Diagnose {
                    error_code,
                    message,
                    trace,
                    summary,
                } => {
                    commands::run_diagnose(&app, error_code, message, trace, summary).await?;
                }
                Commands::Search { query, top_k } => {
                    commands::run_search(&app, &query, top_k)?;
                }
                Commands::Rebuild => {
                    commands::run_rebuild(&app)?;
                }
                Commands::StoreInfo => {
                    commands::run_store_info(&app)?;
                }
                Commands::Categories => {
                    commands::run_categories(&app)?;
                }
                Commands::Serve => {
                    // Handled above
                    unreachable!()
                }
            }
        }
    }

    Ok(())
}
