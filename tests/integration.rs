use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn linksearch_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("linksearch");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[db]
url = "sqlite:{}/data/catalog.sqlite"
table = "LinksBusqueda"

[llm]
api_base = "http://127.0.0.1:9"
timeout_secs = 2

[server]
bind = "127.0.0.1:0"
"#,
        root.display()
    );

    let config_path = config_dir.join("search.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_linksearch(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = linksearch_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("CATALOG_DATABASE_URL")
        .env_remove("CATALOG_TABLE")
        .env_remove("AZURE_OPENAI_API_BASE")
        .env_remove("AZURE_OPENAI_API_KEY")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run linksearch binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_init_creates_catalog() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_linksearch(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("LinksBusqueda"));
    assert!(tmp.path().join("data/catalog.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_linksearch(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_linksearch(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_ask_rejects_blank_query() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_linksearch(&config_path, &["ask", "   "]);
    assert!(!success);
    assert!(stderr.contains("must not be empty"), "stderr: {}", stderr);
}

#[test]
fn test_ask_requires_api_key() {
    let (_tmp, config_path) = setup_test_env();
    run_linksearch(&config_path, &["init"]);

    let (_, stderr, success) = run_linksearch(&config_path, &["ask", "curso de python"]);
    assert!(!success);
    assert!(stderr.contains("AZURE_OPENAI_API_KEY"), "stderr: {}", stderr);
}

#[test]
fn test_invalid_table_name_rejected() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("search.toml");
    fs::write(&config_path, "[db]\ntable = \"Links; DROP TABLE x\"\n").unwrap();

    let (_, stderr, success) = run_linksearch(&config_path, &["init"]);
    assert!(!success);
    assert!(stderr.contains("db.table"), "stderr: {}", stderr);
}
