//! Integration tests for the eduagent CLI
//!
//! Drives the compiled binary end to end against an isolated data
//! directory. Anything that needs the content backend is covered by
//! in-process tests with a mock generator; these tests stick to paths
//! that never leave the machine.

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

/// Run eduagent with an isolated data directory, returning
/// (success, stdout, stderr).
fn run_eduagent(data_dir: &Path, args: &[&str]) -> (bool, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_eduagent"))
        .env("EDUAGENT_DATA_DIR", data_dir)
        .env_remove("EDUAGENT_API_KEY")
        .args(args)
        .output()
        .expect("failed to execute eduagent");

    (
        output.status.success(),
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
    )
}

#[test]
fn init_creates_database_and_config() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("data");

    let (ok, stdout, stderr) = run_eduagent(&dir, &["init"]);
    assert!(ok, "init failed: {stderr}");
    assert!(stdout.contains("Initialized"));
    assert!(dir.join("eduagent.sqlite").exists());
    assert!(dir.join("config.toml").exists());
}

#[test]
fn init_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("data");

    let (ok, _, _) = run_eduagent(&dir, &["init"]);
    assert!(ok);
    let (ok, _, stderr) = run_eduagent(&dir, &["init"]);
    assert!(ok, "second init failed: {stderr}");
}

#[test]
fn commands_refuse_to_run_before_init() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("never-initialized");

    let (ok, _, stderr) = run_eduagent(&dir, &["status"]);
    assert!(!ok);
    assert!(stderr.contains("init"), "unexpected stderr: {stderr}");
}

#[test]
fn status_reports_counts() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("data");
    run_eduagent(&dir, &["init"]);

    let (ok, stdout, stderr) = run_eduagent(&dir, &["status"]);
    assert!(ok, "status failed: {stderr}");
    assert!(stdout.contains("Learners:   0"));
    assert!(stdout.contains("Roadmaps:   0"));
    assert!(stdout.contains("missing"), "no API key should be reported");
}

#[test]
fn seed_then_status_shows_learners() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("data");
    run_eduagent(&dir, &["init"]);

    let (ok, _, stderr) = run_eduagent(&dir, &["seed"]);
    assert!(ok, "seed failed: {stderr}");

    let (ok, stdout, _) = run_eduagent(&dir, &["status"]);
    assert!(ok);
    assert!(stdout.contains("Learners:   3"), "stdout was: {stdout}");
}

#[test]
fn quiz_submit_records_results() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("data");
    run_eduagent(&dir, &["init"]);
    run_eduagent(&dir, &["seed"]);

    // A strong pass only touches stored state, never the content backend
    let (ok, stdout, stderr) = run_eduagent(
        &dir,
        &[
            "quiz", "submit", "--learner", "alice", "--score", "18", "--total", "20",
        ],
    );
    assert!(ok, "quiz submit failed: {stderr}");
    assert!(stdout.contains("90%"), "stdout was: {stdout}");
    assert!(stdout.contains("update_mastery"), "stdout was: {stdout}");
}

#[test]
fn quiz_submit_for_unknown_learner_fails() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("data");
    run_eduagent(&dir, &["init"]);

    let (ok, _, stderr) = run_eduagent(
        &dir,
        &[
            "quiz", "submit", "--learner", "ghost", "--score", "5", "--total", "10",
        ],
    );
    assert!(!ok);
    assert!(stderr.contains("not found"), "unexpected stderr: {stderr}");
}

#[test]
fn forget_clears_agent_memory() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("data");
    run_eduagent(&dir, &["init"]);
    run_eduagent(&dir, &["seed"]);

    let (ok, stdout, stderr) = run_eduagent(&dir, &["forget", "alice"]);
    assert!(ok, "forget failed: {stderr}");
    assert!(stdout.contains("alice"));
}

#[test]
fn tick_with_no_learners_is_quiet() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("data");
    run_eduagent(&dir, &["init"]);

    let (ok, stdout, stderr) = run_eduagent(&dir, &["tick"]);
    assert!(ok, "tick failed: {stderr}");
    assert!(stdout.contains("0 learners processed"));
    assert!(stdout.contains("0 errors"));
}

#[test]
fn roadmap_list_is_empty_for_unknown_learner() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("data");
    run_eduagent(&dir, &["init"]);

    let (ok, stdout, _) = run_eduagent(&dir, &["roadmap", "list", "--learner", "nobody"]);
    assert!(ok);
    assert!(stdout.contains("No roadmaps"));
}

#[test]
fn unknown_day_fails_cleanly() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("data");
    run_eduagent(&dir, &["init"]);

    let (ok, _, stderr) = run_eduagent(&dir, &["day", "show", "no-such-day"]);
    assert!(!ok);
    assert!(stderr.contains("not found"), "unexpected stderr: {stderr}");
}

#[test]
fn deleting_missing_roadmap_fails_cleanly() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("data");
    run_eduagent(&dir, &["init"]);

    let (ok, _, stderr) = run_eduagent(&dir, &["roadmap", "delete", "no-such-roadmap"]);
    assert!(!ok);
    assert!(stderr.contains("not found"), "unexpected stderr: {stderr}");
}
