//! CLI command implementations. Each prints pretty JSON on stdout.

use anyhow::Result;
use serde::Serialize;

use crate::app::App;
use crate::diagnose::DiagnoseRequest;

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn run_diagnose(
    app: &App,
    error_code: String,
    message: Option<String>,
    trace: Option<String>,
    summary: bool,
) -> Result<()> {
    let req = DiagnoseRequest {
        error_code,
        message,
        trace,
        context: None,
    };
    let resp = app.diagnostician.diagnose(&req, summary).await?;
    print_json(&resp)
}

pub fn run_search(app: &App, query: &str, top_k: Option<usize>) -> Result<()> {
    let top_k = top_k.unwrap_or(app.config.retrieval.default_top_k);
    let results = app.index.search(query, top_k);
    print_json(&serde_json::json!({ "results": results }))
}

pub fn run_rebuild(app: &App) -> Result<()> {
    let documents = app.index.rebuild()?;
    print_json(&serde_json::json!({ "status": "rebuilt", "documents": documents }))
}

pub fn run_store_info(app: &App) -> Result<()> {
    print_json(&app.index.store_info())
}

pub fn run_categories(app: &App) -> Result<()> {
    let categories = app.diagnostician.playbook().categories();
    print_json(&serde_json::json!({ "categories": categories }))
}
