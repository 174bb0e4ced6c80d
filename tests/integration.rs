use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn pscout_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("pscout");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let data_dir = root.join("data");
    fs::create_dir_all(&data_dir).unwrap();

    // A tiny 4-dim corpus with inline embeddings so ingest works without
    // any embedding provider.
    fs::write(
        root.join("papers.json"),
        r#"[
  {
    "title": "Attention Is All You Need",
    "authors": ["Vaswani", "Shazeer"],
    "abstract": "We propose the Transformer, based solely on attention mechanisms.",
    "year": 2017,
    "venue": "NeurIPS",
    "embedding": [1.0, 0.0, 0.0, 0.0]
  },
  {
    "title": "Deep Residual Learning for Image Recognition",
    "authors": ["He", "Zhang"],
    "abstract": "We present a residual learning framework for deep networks.",
    "year": 2016,
    "embedding": [0.0, 1.0, 0.0, 0.0]
  },
  {
    "title": "Playing Atari with Deep Reinforcement Learning",
    "abstract": "We present the first deep learning model to learn control policies from raw pixels.",
    "year": 2013,
    "embedding": [0.0, 0.0, 1.0, 0.0]
  }
]"#,
    )
    .unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/papers.sqlite"

[corpus]
dims = 4

[retrieval]
top_k = 3

[context]
max_history = 5
alpha = 0.7

[server]
bind = "127.0.0.1:7878"
"#,
        root.display()
    );

    let config_path = config_dir.join("pscout.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_pscout(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = pscout_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run pscout binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_init_creates_database() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_pscout(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_pscout(&config_path, &["init"]);
    let (_, _, success2) = run_pscout(&config_path, &["init"]);
    assert!(success1);
    assert!(success2);
}

#[test]
fn test_ingest_and_stats() {
    let (tmp, config_path) = setup_test_env();
    let papers = tmp.path().join("papers.json");

    run_pscout(&config_path, &["init"]);

    let (stdout, stderr, success) =
        run_pscout(&config_path, &["ingest", papers.to_str().unwrap()]);
    assert!(
        success,
        "ingest failed: stdout={}, stderr={}",
        stdout, stderr
    );
    assert!(stdout.contains("inserted: 3"));

    let (stdout, _, success) = run_pscout(&config_path, &["stats"]);
    assert!(success);
    assert!(stdout.contains("Papers:     3"));
    assert!(stdout.contains("3 / 3"));
}

#[test]
fn test_ingest_skips_duplicates() {
    let (tmp, config_path) = setup_test_env();
    let papers = tmp.path().join("papers.json");

    run_pscout(&config_path, &["init"]);
    run_pscout(&config_path, &["ingest", papers.to_str().unwrap()]);

    let (stdout, _, success) = run_pscout(&config_path, &["ingest", papers.to_str().unwrap()]);
    assert!(success);
    assert!(stdout.contains("inserted: 0"));
    assert!(stdout.contains("skipped (duplicate): 3"));
}

#[test]
fn test_ingest_dry_run_writes_nothing() {
    let (tmp, config_path) = setup_test_env();
    let papers = tmp.path().join("papers.json");

    run_pscout(&config_path, &["init"]);

    let (stdout, _, success) = run_pscout(
        &config_path,
        &["ingest", papers.to_str().unwrap(), "--dry-run"],
    );
    assert!(success);
    assert!(stdout.contains("dry-run"));
    assert!(stdout.contains("records found: 3"));

    let (stdout, _, _) = run_pscout(&config_path, &["stats"]);
    assert!(stdout.contains("Papers:     0"));
}

#[test]
fn test_ingest_respects_limit() {
    let (tmp, config_path) = setup_test_env();
    let papers = tmp.path().join("papers.json");

    run_pscout(&config_path, &["init"]);

    let (stdout, _, success) = run_pscout(
        &config_path,
        &["ingest", papers.to_str().unwrap(), "--limit", "2"],
    );
    assert!(success);
    assert!(stdout.contains("inserted: 2"));
}

#[test]
fn test_ingest_rejects_dimension_mismatch() {
    let (tmp, config_path) = setup_test_env();

    let bad = tmp.path().join("bad.json");
    fs::write(
        &bad,
        r#"[{"title": "Wrong Dims", "embedding": [1.0, 0.0]}]"#,
    )
    .unwrap();

    run_pscout(&config_path, &["init"]);

    let (_, stderr, success) = run_pscout(&config_path, &["ingest", bad.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("dims"), "stderr: {}", stderr);
}

#[test]
fn test_ingest_without_embeddings_requires_provider() {
    let (tmp, config_path) = setup_test_env();

    let plain = tmp.path().join("plain.json");
    fs::write(&plain, r#"[{"title": "No Vector Here"}]"#).unwrap();

    run_pscout(&config_path, &["init"]);

    let (_, stderr, success) = run_pscout(&config_path, &["ingest", plain.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("provider"), "stderr: {}", stderr);
}

#[test]
fn test_search_requires_embedding_provider() {
    let (tmp, config_path) = setup_test_env();
    let papers = tmp.path().join("papers.json");

    run_pscout(&config_path, &["init"]);
    run_pscout(&config_path, &["ingest", papers.to_str().unwrap()]);

    let (_, stderr, success) = run_pscout(&config_path, &["search", "transformers"]);
    assert!(!success);
    assert!(
        stderr.contains("requires embeddings"),
        "stderr: {}",
        stderr
    );
}

#[test]
fn test_get_round_trip() {
    let (tmp, config_path) = setup_test_env();
    let papers = tmp.path().join("papers.json");

    run_pscout(&config_path, &["init"]);
    run_pscout(&config_path, &["ingest", papers.to_str().unwrap()]);

    // No stable id in the fixture, so look one up through stats output is
    // not possible; instead query by a known-bad id and check the error.
    let (_, stderr, success) = run_pscout(&config_path, &["get", "not-a-real-id"]);
    assert!(!success);
    assert!(stderr.contains("not found"), "stderr: {}", stderr);
}

#[test]
fn test_rejects_invalid_config() {
    let (tmp, _) = setup_test_env();

    let bad_config = tmp.path().join("config").join("bad.toml");
    fs::write(
        &bad_config,
        r#"[db]
path = "data/papers.sqlite"

[corpus]
dims = 4

[context]
alpha = 2.0

[server]
bind = "127.0.0.1:7878"
"#,
    )
    .unwrap();

    let binary = pscout_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(bad_config.to_str().unwrap())
        .arg("stats")
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("alpha"), "stderr: {}", stderr);
}
