use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn rp_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("rp");
    path
}

const PARIS_HTML: &str = r#"
<html><body>
  <div class="vector-header">Site navigation</div>
  <div id="mw-content-text">
    <p>Paris is the capital of France.</p>
    <h2>History</h2>
    <p>Founded on the Seine.</p>
    <div class="toc">Contents</div>
    <span class="mw-editsection">[edit]</span>
    <h2><span id="See_also">See also</span></h2>
    <ul><li>Related article</li></ul>
    <h2>References</h2>
    <p>Retrieved from https://wiki.example.org/Paris</p>
    <p>Cited works.</p>
  </div>
  <div class="navbox">Cities of Europe</div>
</body></html>
"#;

const PLAIN_HTML: &str = r#"
<html><body>
  <p>A page without a wiki content root.</p>
  <p>Both paragraphs survive.</p>
</body></html>
"#;

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let raw_dir = root.join("raw-html");
    fs::create_dir_all(&raw_dir).unwrap();
    fs::write(raw_dir.join("paris.html"), PARIS_HTML).unwrap();
    fs::write(raw_dir.join("plain.html"), PLAIN_HTML).unwrap();

    let config_content = format!(
        r#"[paths]
raw_html_dir = "{root}/raw-html"
cleaned_html_dir = "{root}/cleaned-html"
docs_dir = "{root}/cleaned-markdown"

[db]
path = "{root}/rag-index/ragprep.sqlite"

[chunking]
chunk_size = 500
chunk_overlap = 100

[retrieval]
top_k = 5
"#,
        root = root.display()
    );

    let config_path = root.join("ragprep.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_rp(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = rp_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("OPENAI_API_KEY")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run rp binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_init_creates_database() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_rp(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("✅"));
    assert!(stdout.contains("initialized"));
    assert!(config_path.parent().unwrap().join("rag-index/ragprep.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_rp(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_rp(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_clean_writes_cleaned_html_and_markdown() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_rp(&config_path, &["clean"]);
    assert!(success, "clean failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("html files: 2"));
    assert!(stdout.contains("cleaned: 2"));
    assert!(stdout.contains("✅ HTML cleaned and converted to markdown."));

    let cleaned = fs::read_to_string(tmp.path().join("cleaned-html/paris.html")).unwrap();
    assert!(cleaned.contains("Paris is the capital of France."));
    assert!(!cleaned.contains("Site navigation"));
    assert!(!cleaned.contains("Cities of Europe"));

    let md = fs::read_to_string(tmp.path().join("cleaned-markdown/paris.md")).unwrap();
    assert!(md.contains("Paris is the capital of France."));
    assert!(md.contains("Founded on the Seine."));
    assert!(!md.contains("Cities of Europe"));
    assert!(!md.contains("Contents"));
    assert!(!md.contains("[edit]"));
}

#[test]
fn test_clean_removes_see_also_and_junk_text() {
    let (tmp, config_path) = setup_test_env();

    let (_, _, success) = run_rp(&config_path, &["clean"]);
    assert!(success);

    let md = fs::read_to_string(tmp.path().join("cleaned-markdown/paris.md")).unwrap();
    assert!(!md.contains("See also"));
    assert!(!md.contains("Related article"));
    assert!(md.contains("References"));
    assert!(md.contains("Cited works."));
    assert!(!md.contains("Retrieved from"));
}

#[test]
fn test_clean_keeps_pages_without_content_root() {
    let (tmp, config_path) = setup_test_env();

    let (_, _, success) = run_rp(&config_path, &["clean"]);
    assert!(success);

    let md = fs::read_to_string(tmp.path().join("cleaned-markdown/plain.md")).unwrap();
    assert!(md.contains("A page without a wiki content root."));
    assert!(md.contains("Both paragraphs survive."));
}

#[test]
fn test_clean_missing_input_dir_fails() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("ragprep.toml");
    fs::write(
        &config_path,
        format!(
            "[paths]\nraw_html_dir = \"{}/no-such-dir\"\n",
            tmp.path().display()
        ),
    )
    .unwrap();

    let (_, stderr, success) = run_rp(&config_path, &["clean"]);
    assert!(!success);
    assert!(stderr.contains("does not exist"));
}

#[test]
fn test_index_dry_run_reports_counts() {
    let (_tmp, config_path) = setup_test_env();

    run_rp(&config_path, &["clean"]);
    let (stdout, stderr, success) = run_rp(&config_path, &["index", "--dry-run"]);
    assert!(success, "dry-run failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("index (dry-run)"));
    assert!(stdout.contains("markdown files: 2"));
    assert!(stdout.contains("estimated chunks:"));
}

#[test]
fn test_index_without_markdown_dir_fails() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_rp(&config_path, &["index", "--dry-run"]);
    assert!(!success);
    assert!(stderr.contains("run `rp clean` first"));
}

#[test]
fn test_index_embedding_failure_is_fatal() {
    let (tmp, config_path) = setup_test_env();
    run_rp(&config_path, &["clean"]);

    // Same layout, but an openai provider with no API key in the
    // environment: the embedding step must abort the run.
    let openai_config = tmp.path().join("openai.toml");
    fs::write(
        &openai_config,
        format!(
            r#"[paths]
docs_dir = "{root}/cleaned-markdown"

[db]
path = "{root}/rag-index/ragprep.sqlite"

[embedding]
provider = "openai"
model = "text-embedding-3-small"
dims = 1536
"#,
            root = tmp.path().display()
        ),
    )
    .unwrap();

    let (_, stderr, success) = run_rp(&openai_config, &["index"]);
    assert!(!success);
    assert!(stderr.contains("OPENAI_API_KEY"));
}
