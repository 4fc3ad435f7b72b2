mod common;

use common::*;
use std::process::Command;

fn cli_command() -> Command {
    Command::new(env!("CARGO_BIN_EXE_step-engine"))
}

#[test]
fn test_cli_help() {
    let output = cli_command().arg("--help").output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Run and check step programs"));
    assert!(stdout.contains("run"));
    assert!(stdout.contains("validate"));
    assert!(stdout.contains("inspect"));
}

#[test]
fn test_cli_version() {
    let output = cli_command().arg("--version").output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("step-engine"));
}

#[test]
fn test_cli_run_help() {
    let output = cli_command().args(["run", "--help"]).output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Run a program file"));
    assert!(stdout.contains("--state"));
    assert!(stdout.contains("--config"));
    assert!(stdout.contains("--mode"));
    assert!(stdout.contains("--timeout-ms"));
    assert!(stdout.contains("--checkpoint"));
    assert!(stdout.contains("--resume-from"));
    assert!(stdout.contains("--json"));
}

#[test]
fn test_cli_run_program() {
    let dir = create_test_dir();
    let path = write_file(dir.path(), "simple.prog", &simple_program());

    let output = cli_command()
        .args(["run", path.to_str().unwrap()])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Success: YES"));
    assert!(stdout.contains("✓ compute"));
    assert!(stdout.contains("✓ finish"));
}

#[test]
fn test_cli_run_json_output() {
    let dir = create_test_dir();
    let program = write_file(dir.path(), "flags.prog", &flag_program(&["a", "b"]));
    let state = write_file(dir.path(), "state.json", r#"{"seed": 7}"#);

    let output = cli_command()
        .args([
            "run",
            program.to_str().unwrap(),
            "--state",
            state.to_str().unwrap(),
            "--json",
        ])
        .output()
        .unwrap();

    assert!(output.status.success());
    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["success"], serde_json::json!(true));
    assert_eq!(result["final_state"]["seed"], serde_json::json!(7));
    assert_eq!(result["final_state"]["b"], serde_json::json!(true));
    assert_eq!(result["trace"].as_array().unwrap().len(), 2);
}

#[test]
fn test_cli_run_failure_exit_code() {
    let dir = create_test_dir();
    let program = program_text("failing", &[("a", &["fail: broken"]), ("b", &["set b = 1"])]);
    let path = write_file(dir.path(), "failing.prog", &program);

    let output = cli_command()
        .args(["run", path.to_str().unwrap()])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Success: NO"));
    assert!(stdout.contains("broken"));
}

#[test]
fn test_cli_run_adaptive_with_config() {
    let dir = create_test_dir();
    let program = program_text(
        "adaptive",
        &[("a", &["fail: broken"]), ("b", &["set b = true"])],
    );
    let path = write_file(dir.path(), "adaptive.prog", &program);
    let config = write_file(
        dir.path(),
        "options.yaml",
        "mode: adaptive\ntimeout_ms: 10000\ncheckpoint: true\n",
    );

    let output = cli_command()
        .args([
            "run",
            path.to_str().unwrap(),
            "--config",
            config.to_str().unwrap(),
            "--json",
        ])
        .output()
        .unwrap();

    // the failed step still counts against success
    assert_eq!(output.status.code(), Some(1));
    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["final_state"]["b"], serde_json::json!(true));
    assert_eq!(result["statistics"]["failed_steps"], serde_json::json!(1));
}

#[test]
fn test_cli_mode_flag_overrides_config() {
    let dir = create_test_dir();
    let program = program_text("p", &[("a", &["fail"]), ("b", &["set b = true"])]);
    let path = write_file(dir.path(), "p.prog", &program);
    let config = write_file(dir.path(), "options.json", r#"{"mode": "adaptive"}"#);

    let output = cli_command()
        .args([
            "run",
            path.to_str().unwrap(),
            "--config",
            config.to_str().unwrap(),
            "--mode",
            "strict",
            "--json",
        ])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["outcome"], serde_json::json!("halted_on_error"));
    assert!(result["final_state"].get("b").is_none());
}

#[test]
fn test_cli_run_invalid_mode() {
    let dir = create_test_dir();
    let path = write_file(dir.path(), "simple.prog", &simple_program());

    let output = cli_command()
        .args(["run", path.to_str().unwrap(), "--mode", "chaotic"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("chaotic"));
}

#[test]
fn test_cli_run_missing_file() {
    let output = cli_command()
        .args(["run", "/nonexistent/program.prog"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_cli_validate_file() {
    let dir = create_test_dir();
    let path = write_file(dir.path(), "simple.prog", &simple_program());

    let output = cli_command()
        .args(["validate", path.to_str().unwrap()])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("is valid (2 steps)"));
}

#[test]
fn test_cli_validate_directory() {
    let dir = create_test_dir();
    write_file(dir.path(), "good.prog", &simple_program());
    write_file(
        dir.path(),
        "dupes.program",
        &program_text("dupes", &[("x", &["compute"]), ("x", &["store"])]),
    );
    write_file(dir.path(), "empty.prog", "PROGRAM: nothing\n");
    write_file(dir.path(), "notes.txt", "not a program");

    let output = cli_command()
        .args(["validate", dir.path().to_str().unwrap()])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("good.prog is valid"));
    assert!(stdout.contains("duplicate step names: x"));
    assert!(stdout.contains("empty.prog: no steps"));
    assert!(!stdout.contains("notes.txt"));
}

#[test]
fn test_cli_validate_missing_path() {
    let output = cli_command()
        .args(["validate", "/nonexistent/path"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_cli_inspect() {
    let dir = create_test_dir();
    let path = write_file(dir.path(), "simple.prog", &simple_program());

    let output = cli_command()
        .args(["inspect", path.to_str().unwrap()])
        .output()
        .unwrap();

    assert!(output.status.success());
    let program: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(program["name"], serde_json::json!("simple"));
    assert_eq!(program["goal"], serde_json::json!("exercise the engine"));
    assert_eq!(program["steps"][0]["name"], serde_json::json!("compute"));
    assert_eq!(
        program["steps"][1]["actions"][0],
        serde_json::json!("set completion flag")
    );
}
