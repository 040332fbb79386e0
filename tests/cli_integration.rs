//! CLI Integration Tests
//!
//! Tests the command-line interface end-to-end.

use assert_cmd::Command;
use assert_fs::prelude::*;
use predicates::prelude::*;

/// Get the binary to test.
fn fddflow() -> Command {
    Command::cargo_bin("fddflow").unwrap()
}

/// A temp dir with an empty local config so the user's own config is never read.
fn workspace() -> assert_fs::TempDir {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child(".fddflow.toml").write_str("").unwrap();
    temp
}

fn express_project(temp: &assert_fs::TempDir) {
    temp.child("package.json")
        .write_str(r#"{"name": "shop", "dependencies": {"express": "^4.18.0"}}"#)
        .unwrap();
    temp.child("src/features/cart/index.js").write_str("").unwrap();
}

// ============================================================================
// Help & Version Tests
// ============================================================================

#[test]
fn test_help_flag() {
    fddflow()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Guided design workflows"));
}

#[test]
fn test_version_flag() {
    fddflow()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_missing_subcommand_fails() {
    fddflow().assert().failure();
}

// ============================================================================
// Catalog Tests
// ============================================================================

#[test]
fn test_list_shows_builtins() {
    let temp = workspace();
    fddflow()
        .current_dir(temp.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("fdd-base"))
        .stdout(predicate::str::contains("fdd-reverse-engineering (extends fdd-base)"));
}

#[test]
fn test_list_includes_project_workflows() {
    let temp = workspace();
    temp.child(".fddflow/workflows/team.yaml")
        .write_str("name: team\nparent: fdd-base\ndescription: Team flavour\n")
        .unwrap();

    fddflow()
        .current_dir(temp.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("team (extends fdd-base) - Team flavour"));
}

#[test]
fn test_resolve_text() {
    let temp = workspace();
    fddflow()
        .current_dir(temp.path())
        .args(["resolve", "fdd-reverse-engineering"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Chain: fdd-base -> fdd-reverse-engineering"))
        .stdout(predicate::str::contains("Threshold: 70.00%"))
        .stdout(predicate::str::contains("features/{slug}/DESIGN.md (per feature)"));
}

#[test]
fn test_resolve_json() {
    let temp = workspace();
    let output = fddflow()
        .current_dir(temp.path())
        .args(["resolve", "fdd-base", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["name"], "fdd-base");
    assert_eq!(json["steps"][0]["id"], "project-name");
}

#[test]
fn test_resolve_unknown_workflow() {
    let temp = workspace();
    fddflow()
        .current_dir(temp.path())
        .args(["resolve", "nope"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unknown workflow 'nope'"));
}

#[test]
fn test_broken_extension_is_reported() {
    let temp = workspace();
    temp.child(".fddflow/workflows/broken.yaml")
        .write_str(
            "name: broken\nparent: fdd-base\nchanges:\n  - op: append\n    step: missing\n    text: more\n",
        )
        .unwrap();

    fddflow()
        .current_dir(temp.path())
        .args(["propose", "broken"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Cannot resolve 'broken' at step 'missing'"));
}

// ============================================================================
// Detection & Proposal Tests
// ============================================================================

#[test]
fn test_detect_text() {
    let temp = workspace();
    express_project(&temp);

    fddflow()
        .current_dir(temp.path())
        .args(["detect", "--detector", "npm", "--detector", "features"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Node/Express"))
        .stdout(predicate::str::contains("cart"));
}

#[test]
fn test_detect_unknown_detector_degrades() {
    let temp = workspace();
    fddflow()
        .current_dir(temp.path())
        .args(["detect", "--detector", "cobol"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cobol is not a registered detector"));
}

#[test]
fn test_propose_json() {
    let temp = workspace();
    express_project(&temp);

    let output = fddflow()
        .current_dir(temp.path())
        .args(["propose", "fdd-reverse-engineering", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["tech-stack"][0]["value"], "Node/Express");
    assert_eq!(json["project-name"][0]["value"], "shop");
}

// ============================================================================
// Run Tests
// ============================================================================

#[test]
fn test_run_non_interactive() {
    let temp = workspace();
    express_project(&temp);

    fddflow()
        .current_dir(temp.path())
        .args([
            "run",
            "fdd-reverse-engineering",
            "--non-interactive",
            "--answer",
            "vision=Sell coffee",
            "--answer",
            "actors=Buyers",
            "--answer",
            "testing=none yet",
            "--answer",
            "linting=none",
            "--answer",
            "deployment=Heroku",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("accepted"));

    temp.child("docs/fdd/DESIGN.md")
        .assert(predicate::str::contains("- **Stack**: Node/Express"));
    temp.child("docs/fdd/features/cart/DESIGN.md")
        .assert(predicate::str::contains("reverse-engineered"));
    temp.child(".fddflow/state/fdd-reverse-engineering.json").assert(predicate::path::missing());
}

#[test]
fn test_run_missing_answer_fails() {
    let temp = workspace();
    fddflow()
        .current_dir(temp.path())
        .args(["run", "fdd-base", "--non-interactive"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No answer available for step 'project-name'"));
}

#[test]
fn test_run_rejects_malformed_answer() {
    let temp = workspace();
    fddflow()
        .current_dir(temp.path())
        .args(["run", "fdd-base", "--non-interactive", "--answer", "vision"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("expected step=value"));
}

#[test]
fn test_run_rejects_blank_answer() {
    let temp = workspace();
    fddflow()
        .current_dir(temp.path())
        .args(["run", "fdd-base", "--non-interactive", "--answer", "testing="])
        .timeout(std::time::Duration::from_secs(10))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("step and value cannot be empty"));
}

#[test]
fn test_run_interrupted_by_closed_stdin() {
    let temp = workspace();
    fddflow()
        .current_dir(temp.path())
        .args(["run", "fdd-base"])
        .write_stdin("Shop\n")
        .assert()
        .code(130);

    temp.child(".fddflow/state/fdd-base.json")
        .assert(predicate::str::contains("project-name"));
}

// ============================================================================
// Validate Tests
// ============================================================================

#[test]
fn test_validate_pass_and_fail() {
    let temp = workspace();
    temp.child("good.md").write_str("## A. Vision\n\nCoffee.\n").unwrap();
    temp.child("bad.md").write_str("## A. Vision\n\nTBD\n").unwrap();

    fddflow()
        .current_dir(temp.path())
        .args(["validate", "good.md", "--section", "A"])
        .assert()
        .success()
        .stdout(predicate::str::contains("PASS"));

    fddflow()
        .current_dir(temp.path())
        .args(["validate", "bad.md", "--section", "A", "--section", "B"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("FAIL"))
        .stdout(predicate::str::contains("missing section B"));
}

// ============================================================================
// Config & Completions Tests
// ============================================================================

#[test]
fn test_config_shows_defaults() {
    let temp = workspace();
    fddflow()
        .current_dir(temp.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("[general]"))
        .stdout(predicate::str::contains("threshold = 90.0"));
}

#[test]
fn test_invalid_config_file() {
    let temp = workspace();
    temp.child("bad.toml").write_str("[general]\nthreshold = 250.0\n").unwrap();

    fddflow()
        .current_dir(temp.path())
        .args(["--config", "bad.toml", "config"])
        .assert()
        .code(1);
}

#[test]
fn test_completions() {
    fddflow()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("fddflow"));
}
