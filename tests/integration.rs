use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn triage_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_triage"))
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let seeds_dir = root.join("seeds");
    fs::create_dir_all(&seeds_dir).unwrap();
    fs::write(
        seeds_dir.join("gateway.md"),
        "# Payment gateway\n\nCard declined responses come from the payment gateway. Check the merchant configuration.",
    )
    .unwrap();
    fs::write(
        seeds_dir.join("timeouts.txt"),
        "Upstream timeout errors usually mean the dependency is overloaded. Retry with backoff.",
    )
    .unwrap();
    fs::write(
        seeds_dir.join("jwt.md"),
        "Expired JWT tokens produce 401 unauthorized responses until the client refreshes.",
    )
    .unwrap();
    fs::write(seeds_dir.join("ignored.json"), "{\"gateway\": true}").unwrap();

    let config_content = format!(
        r#"[server]
bind = "127.0.0.1:0"

[retrieval]
seeds_dir = "{root}/seeds"
store_path = "{root}/vector_store/store.bin"
default_top_k = 2
"#,
        root = root.display()
    );

    let config_path = config_dir.join("triage.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_triage(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = triage_binary();
    let workdir = config_path.parent().unwrap().parent().unwrap();
    let output = Command::new(&binary)
        .current_dir(workdir)
        .env("RUST_LOG", "warn")
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run triage binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn parse(stdout: &str) -> Value {
    serde_json::from_str(stdout).unwrap_or_else(|e| panic!("not JSON ({}): {}", e, stdout))
}

#[test]
fn test_diagnose_payment_error() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_triage(
        &config_path,
        &["diagnose", "PAYMENT_METHOD_ERROR", "--message", "card declined"],
    );
    assert!(success, "diagnose failed: {}", stderr);

    let body = parse(&stdout);
    assert_eq!(body["detected_error"], "PAYMENT_METHOD_ERROR");
    assert_eq!(body["category"], "Payments");
    assert_eq!(body["severity"], "High");
    assert_eq!(
        body["signals"],
        serde_json::json!(["payment_module", "cc_validation", "gateway_response"])
    );
    assert!(body.get("assistant_summary").is_none());
}

#[test]
fn test_diagnose_with_summary() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) =
        run_triage(&config_path, &["diagnose", "UPSTREAM_TIMEOUT", "--summary"]);
    assert!(success, "diagnose --summary failed: {}", stderr);

    let body = parse(&stdout);
    assert_eq!(body["category"], "Networking");
    let summary = body["assistant_summary"].as_str().unwrap();
    assert!(summary.starts_with("Summary for: [Networking/Medium] UPSTREAM_TIMEOUT: No message"));
}

#[test]
fn test_diagnose_blank_code_fails() {
    let (_tmp, config_path) = setup_test_env();

    let (_stdout, stderr, success) = run_triage(&config_path, &["diagnose", "   "]);
    assert!(!success);
    assert!(stderr.contains("error_code is required"), "stderr: {}", stderr);
}

#[test]
fn test_store_info_then_rebuild() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_triage(&config_path, &["store-info"]);
    assert!(success, "store-info failed: {}", stderr);
    let info = parse(&stdout);
    assert_eq!(info["exists"], false);

    let (stdout, stderr, success) = run_triage(&config_path, &["rebuild"]);
    assert!(success, "rebuild failed: {}", stderr);
    let body = parse(&stdout);
    assert_eq!(body["status"], "rebuilt");
    assert_eq!(body["documents"], 3);
    assert!(tmp.path().join("vector_store").join("store.bin").exists());

    let (stdout, _stderr, success) = run_triage(&config_path, &["store-info"]);
    assert!(success);
    let info = parse(&stdout);
    assert_eq!(info["exists"], true);
    assert!(info["size_bytes"].as_u64().unwrap() > 0);
}

#[test]
fn test_search_bootstraps_index() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_triage(&config_path, &["search", "payment gateway declined"]);
    assert!(success, "search failed: {}", stderr);

    let body = parse(&stdout);
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2, "default_top_k from config");
    assert_eq!(results[0]["path"], "gateway.md");
    assert!(results[0]["score"].as_f64().unwrap() > 0.0);
    assert!(tmp.path().join("vector_store").join("store.bin").exists());
}

#[test]
fn test_search_top_k_flag() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _stderr, success) =
        run_triage(&config_path, &["search", "expired jwt tokens", "--top-k", "1"]);
    assert!(success);
    let body = parse(&stdout);
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["path"], "jwt.md");
}

#[test]
fn test_search_blank_query_is_empty() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _stderr, success) = run_triage(&config_path, &["search", "   "]);
    assert!(success);
    assert_eq!(parse(&stdout)["results"], serde_json::json!([]));
}

#[test]
fn test_categories() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _stderr, success) = run_triage(&config_path, &["categories"]);
    assert!(success);
    assert_eq!(
        parse(&stdout)["categories"],
        serde_json::json!(["Payments", "Auth", "Networking", "Routing", "General"])
    );
}

#[test]
fn test_missing_config_uses_defaults() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("config").join("absent.toml");

    let (stdout, stderr, success) = run_triage(&config_path, &["diagnose", "AUTH_EXPIRED"]);
    assert!(success, "diagnose without config failed: {}", stderr);
    assert_eq!(parse(&stdout)["category"], "Auth");
}

#[test]
fn test_invalid_config_is_fatal() {
    let (_tmp, config_path) = setup_test_env();
    fs::write(&config_path, "[retrieval]\ndefault_top_k = 0\n").unwrap();

    let (_stdout, stderr, success) = run_triage(&config_path, &["categories"]);
    assert!(!success);
    assert!(stderr.contains("default_top_k"), "stderr: {}", stderr);
}

#[test]
fn test_missing_config_is_reported_in_logs() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("config").join("absent.toml");

    let output = Command::new(triage_binary())
        .current_dir(tmp.path())
        .env("RUST_LOG", "info")
        .arg("--config")
        .arg(&config_path)
        .arg("categories")
        .output()
        .unwrap();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    assert!(output.status.success(), "categories failed: {}", stderr);
    assert!(
        stderr.contains("config file not found, using built-in defaults"),
        "stderr: {}",
        stderr
    );
}
