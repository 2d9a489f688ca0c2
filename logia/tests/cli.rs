//! CLI integration tests for the `logia` binary.
//!
//! Every test runs the binary inside a fresh temporary directory so that no
//! configuration file from the workspace is picked up.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use logia::dataset::Topic;
use logia::runner::ModelResponse;

const EVENTS_CSV: &str = "\
timestamp,agent.name,rule.level,rule.id,rule.description
\"Jun 15, 2025 @ 08:46:14.273\",agent-ubuntu,10,5712,sshd: brute force trying to get access to the system
\"Jun 15, 2025 @ 08:40:02.000\",agent-ubuntu,5,5710,sshd: Attempt to login using a non-existent user
";

// =============================================================================
// Helper Functions
// =============================================================================

fn logia_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_logia"))
}

fn run_in(dir: &Path, args: &[&str]) -> Output {
    Command::new(logia_bin())
        .current_dir(dir)
        .args(args)
        .output()
        .expect("Failed to execute logia binary")
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "Expected exit code 0, got {:?}\nstderr: {}",
        output.status.code(),
        String::from_utf8_lossy(&output.stderr)
    );
}

fn assert_failure(output: &Output) {
    assert_eq!(
        output.status.code(),
        Some(1),
        "Expected exit code 1, got {:?}\nstdout: {}\nstderr: {}",
        output.status.code(),
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

fn stdout_str(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr_str(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn save_response(dir: &Path, model: &str, answer: &str) -> PathBuf {
    ModelResponse::new(model, "logs.json", Topic::ContentSummary, answer, "20250615_090000")
        .save(dir)
        .unwrap()
}

// =============================================================================
// Commands
// =============================================================================

#[test]
fn test_list_topics() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_in(dir.path(), &["list-topics"]);
    assert_success(&output);

    let out = stdout_str(&output);
    assert!(out.contains("1. Topic 1 - Basic Events (4 questions)"));
    assert!(out.contains("5. Topic 5 - Multiple Choice Questions (6 questions)"));
}

#[test]
fn test_list_models_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_in(dir.path(), &["list-models"]);
    assert_success(&output);

    let out = stdout_str(&output);
    assert!(out.contains("Configured Models (4)"));
    assert!(out.contains("deepseek-r1:32b [strip-think]"));
}

#[test]
fn test_parse_writes_views() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("events.csv"), EVENTS_CSV).unwrap();

    let output = run_in(dir.path(), &["parse", "--input", "events.csv", "--output", "parsed"]);
    assert_success(&output);
    assert!(stdout_str(&output).contains("Level >= 7:          1"));

    for name in [
        "parsed_logs_filtered.json",
        "parsed_logs_all.json",
        "parsed_logs_by_unique_rule_description.json",
    ] {
        assert!(dir.path().join("parsed").join(name).exists(), "{} missing", name);
    }
    let all = std::fs::read_to_string(dir.path().join("parsed/parsed_logs_all.json")).unwrap();
    assert_eq!(all.lines().count(), 2);
    assert!(all.lines().next().unwrap().contains("\"rule.id\":5710"));
}

#[test]
fn test_parse_missing_input() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_in(dir.path(), &["parse", "--input", "nope.csv"]);
    assert_failure(&output);
    assert!(stderr_str(&output).contains("Raw event file not found"));
}

#[test]
fn test_dump_prompt_uses_config_paths() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("events.csv"), EVENTS_CSV).unwrap();
    std::fs::write(
        dir.path().join("logia.toml"),
        "[paths]\nraw_events = \"events.csv\"\ndata_dir = \"parsed\"\n",
    )
    .unwrap();

    assert_success(&run_in(dir.path(), &["parse"]));
    let output = run_in(dir.path(), &["dump-prompt", "--topic", "2"]);
    assert_success(&output);

    let out = stdout_str(&output);
    assert!(out.starts_with("Answer the questions strictly following the templates"));
    assert!(out.contains("### Real logs:"));
    assert!(out.contains("sshd: brute force trying to get access to the system"));
    assert!(out.contains("Summarize in one line what is happening in the system."));
}

#[test]
fn test_show_response() {
    let dir = tempfile::tempdir().unwrap();
    let path = save_response(dir.path(), "phi4", "Brute force against sshd.");

    let output = run_in(dir.path(), &["show", path.to_str().unwrap()]);
    assert_success(&output);

    let out = stdout_str(&output);
    assert!(out.contains("Model: phi4"));
    assert!(out.contains("A: Brute force against sshd."));
}

#[test]
fn test_show_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_in(dir.path(), &["show", "missing.json"]);
    assert_failure(&output);
}

#[test]
fn test_evaluate_ground_truth() {
    let dir = tempfile::tempdir().unwrap();
    let responses = dir.path().join("responses");
    save_response(&responses, "phi4", "SSH brute force");
    save_response(&responses, "llama3.2", "Nothing unusual");
    std::fs::write(
        dir.path().join("gt.json"),
        r#"{"Topic 2 - Content Summary": {"Summarize in one line what is happening in the system.": "ssh brute force"}}"#,
    )
    .unwrap();

    let topic_dir = responses.join(Topic::ContentSummary.slug());
    let output = run_in(
        dir.path(),
        &[
            "evaluate",
            "--mode",
            "ground-truth",
            "--responses",
            topic_dir.to_str().unwrap(),
            "--ground-truth",
            "gt.json",
            "--output",
            "results",
        ],
    );
    assert_success(&output);

    let out = stdout_str(&output);
    assert!(out.contains("Correct: 1/1 | Score: 10/10"));
    assert!(out.contains("Winner: phi4 (margin 10.00)"));

    let written: Vec<_> = std::fs::read_dir(dir.path().join("results"))
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(written.len(), 1);
    assert!(written[0].starts_with("results_ground_truth_"));
}

#[test]
fn test_evaluate_requires_source() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_in(dir.path(), &["evaluate", "--mode", "ground-truth"]);
    assert_failure(&output);
}

#[test]
fn test_evaluate_empty_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("empty")).unwrap();
    let output = run_in(dir.path(), &["evaluate", "--mode", "ground-truth", "--responses", "empty"]);
    assert_failure(&output);
    assert!(stderr_str(&output).contains("No responses found"));
}

#[test]
fn test_generate_without_enabled_models() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("logia.toml"),
        "[models.phi4]\nbackend = \"ollama\"\nmodel = \"phi4\"\nenabled = false\n\n\
         [models.openai_gpt4]\nbackend = \"openai\"\nmodel = \"gpt-4\"\nenabled = false\n",
    )
    .unwrap();

    let output = run_in(dir.path(), &["generate", "--skip-parse"]);
    assert_failure(&output);
    assert!(stderr_str(&output).contains("No models available"));
    assert!(!dir.path().join("responses_by_topic").exists());
}

#[test]
fn test_generate_unknown_model() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_in(dir.path(), &["generate", "--skip-parse", "--models", "nope"]);
    assert_failure(&output);
    assert!(stderr_str(&output).contains("Unknown model: nope"));
}

#[test]
fn test_init_config_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_in(dir.path(), &["init-config", "--output", "config/logia.toml"]);
    assert_success(&output);
    assert!(dir.path().join("config/logia.toml").exists());

    let output = run_in(dir.path(), &["--config", "config/logia.toml", "list-models"]);
    assert_success(&output);
    assert!(stdout_str(&output).contains("openai_gpt4"));
}

#[test]
fn test_unknown_topic_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_in(dir.path(), &["dump-prompt", "--topic", "9"]);
    assert!(!output.status.success());
}
