use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn vctx_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("vctx");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let vault = root.join("vault");
    for dir in ["Projects", "Refs", "Daily", "Templates"] {
        fs::create_dir_all(vault.join(dir)).unwrap();
    }
    fs::write(
        vault.join("Projects/Rust.md"),
        "---\ntitle: Rust Notes\ntags: [rust, lang]\n---\nOwnership, borrowing and lifetimes in Rust.",
    )
    .unwrap();
    fs::write(
        vault.join("Projects/Python.md"),
        "---\ntags: [python]\n---\nPython typing and asyncio notes.",
    )
    .unwrap();
    fs::write(
        vault.join("Refs/links.md"),
        "Compare with [[Rust]] and [[Python|the snake]].",
    )
    .unwrap();
    fs::write(vault.join("Daily/2025-01-15.md"), "Worked on Rust lifetimes.").unwrap();
    fs::write(vault.join("Templates/daily.md"), "[[Rust]] template").unwrap();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    let config_content = r#"[vault]
root = "../vault"
exclude_globs = ["Templates/**"]

[context]
default_format = "detailed"

[server]
bind = "127.0.0.1:7332"
"#;
    let config_path = config_dir.join("vctx.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_vctx(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = vctx_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run vctx binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn run_json(config_path: &Path, args: &[&str]) -> serde_json::Value {
    let (stdout, stderr, success) = run_vctx(config_path, args);
    assert!(success, "vctx {:?} failed: stderr={}", args, stderr);
    serde_json::from_str(&stdout)
        .unwrap_or_else(|e| panic!("invalid JSON from {:?}: {}\n{}", args, e, stdout))
}

#[test]
fn test_context_read_text() {
    let (_tmp, config_path) = setup_test_env();
    let (stdout, stderr, success) =
        run_vctx(&config_path, &["context", "read", "Projects/Rust.md"]);
    assert!(success, "read failed: stderr={}", stderr);
    assert!(stdout.contains("path:   Projects/Rust.md"));
    assert!(stdout.contains("title:  Rust Notes"));
    assert!(stdout.contains("Ownership, borrowing and lifetimes in Rust."));
    assert!(stdout.contains("meta:"));
    assert!(stdout.contains("tokens"));
}

#[test]
fn test_context_read_json_concise() {
    let (_tmp, config_path) = setup_test_env();
    let value = run_json(
        &config_path,
        &["context", "read", "Projects/Rust.md", "--json", "--format", "concise"],
    );
    assert_eq!(value["primary_note"]["path"], "Projects/Rust.md");
    assert_eq!(value["primary_note"]["word_count"], 6);
    assert!(value["primary_note"].get("metadata").is_none());
    assert!(value["token_estimate"].as_u64().unwrap() > 0);
}

#[test]
fn test_context_read_missing_fails() {
    let (_tmp, config_path) = setup_test_env();
    let (_, stderr, success) = run_vctx(&config_path, &["context", "read", "Nope.md"]);
    assert!(!success);
    assert!(stderr.contains("note not found: Nope.md"), "stderr={}", stderr);
}

#[test]
fn test_context_read_traversal_fails() {
    let (_tmp, config_path) = setup_test_env();
    let (_, stderr, success) =
        run_vctx(&config_path, &["context", "read", "../config/vctx.toml"]);
    assert!(!success);
    assert!(stderr.contains("invalid path"), "stderr={}", stderr);
}

#[test]
fn test_context_multiple_partial() {
    let (_tmp, config_path) = setup_test_env();
    let value = run_json(
        &config_path,
        &[
            "context",
            "multiple",
            "Missing.md",
            "Projects/Python.md",
            "Projects/Rust.md",
            "--json",
        ],
    );
    assert_eq!(value["primary_note"]["path"], "Projects/Python.md");
    assert_eq!(value["related_notes"][0]["path"], "Projects/Rust.md");
}

#[test]
fn test_context_backlinks_excludes_templates() {
    let (_tmp, config_path) = setup_test_env();
    let value = run_json(
        &config_path,
        &["context", "backlinks", "Projects/Rust.md", "--json"],
    );
    let backlinks = value["backlinks"].as_array().unwrap();
    assert_eq!(backlinks.len(), 1);
    assert_eq!(backlinks[0]["note_path"], "Refs/links.md");
    assert!(backlinks[0]["context"]
        .as_str()
        .unwrap()
        .contains("[[Rust]]"));
}

#[test]
fn test_context_daily() {
    let (_tmp, config_path) = setup_test_env();
    let value = run_json(
        &config_path,
        &["context", "daily", "--date", "2025-01-15", "--json"],
    );
    assert_eq!(value["primary_note"]["path"], "Daily/2025-01-15.md");

    let (_, stderr, success) =
        run_vctx(&config_path, &["context", "daily", "--date", "2099-12-31"]);
    assert!(!success);
    assert!(stderr.contains("Journal/2099-12-31.md"), "stderr={}", stderr);
}

#[test]
fn test_context_related_bounds() {
    let (_tmp, config_path) = setup_test_env();
    let (_, stderr, success) = run_vctx(
        &config_path,
        &["context", "related", "Projects/Rust.md", "--max-related", "50"],
    );
    assert!(!success);
    assert!(stderr.contains("--max-related"));
}

#[test]
fn test_query_search_and_list() {
    let (_tmp, config_path) = setup_test_env();
    let value = run_json(&config_path, &["query", "search", "lifetimes", "--json"]);
    let paths: Vec<&str> = value["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["path"].as_str().unwrap())
        .collect();
    assert_eq!(paths.len(), 2);
    assert!(paths.contains(&"Projects/Rust.md"));
    assert!(paths.contains(&"Daily/2025-01-15.md"));

    let value = run_json(&config_path, &["query", "list", "Projects", "--json"]);
    assert_eq!(value["total_found"], 2);

    let (stdout, _, success) = run_vctx(&config_path, &["query", "search", "haskell"]);
    assert!(success);
    assert!(stdout.contains("No results."));
    assert!(stdout.contains("hint: No notes found matching 'haskell'"));
}

#[test]
fn test_query_metadata_by_tag() {
    let (_tmp, config_path) = setup_test_env();
    let value = run_json(
        &config_path,
        &["query", "metadata", "--tag", "python", "--json", "--format", "detailed"],
    );
    assert_eq!(value["results"][0]["path"], "Projects/Python.md");
    assert_eq!(value["results"][0]["tags"][0], "python");
}

#[test]
fn test_tools_list_without_config() {
    let value = run_json(Path::new("/nonexistent/vctx.toml"), &["tools", "list"]);
    let names: Vec<&str> = value
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["get_context", "query_vault"]);
}

#[test]
fn test_tools_call() {
    let (_tmp, config_path) = setup_test_env();
    let value = run_json(
        &config_path,
        &[
            "tools",
            "call",
            "get_context",
            "--param",
            "context_type=read_multiple",
            "--param",
            r#"targets=["Projects/Rust.md","Refs/links.md"]"#,
            "--param",
            "response_format=concise",
        ],
    );
    assert_eq!(value["primary_note"]["path"], "Projects/Rust.md");
    assert_eq!(value["related_notes"][0]["path"], "Refs/links.md");

    let (_, stderr, success) = run_vctx(
        &config_path,
        &["tools", "call", "get_context", "--param", "context_type=bogus"],
    );
    assert!(!success);
    assert!(stderr.contains("must be one of"));
}

#[test]
fn test_vault_flag_without_config() {
    let (tmp, _config_path) = setup_test_env();
    let vault = tmp.path().join("vault");
    let value = run_json(
        Path::new("/nonexistent/vctx.toml"),
        &[
            "--vault",
            vault.to_str().unwrap(),
            "context",
            "read",
            "Refs/links.md",
            "--json",
        ],
    );
    assert_eq!(value["primary_note"]["title"], "links");
}

#[test]
fn test_missing_config_fails() {
    let (_, stderr, success) = run_vctx(
        Path::new("/nonexistent/vctx.toml"),
        &["context", "read", "a.md"],
    );
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"));
}
