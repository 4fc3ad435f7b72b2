use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub fn create_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

pub fn write_file(dir: &Path, filename: &str, content: &str) -> PathBuf {
    let path = dir.join(filename);
    fs::write(&path, content).expect("Failed to write test file");
    path
}

/// Program text for the given `(step, actions)` pairs
pub fn program_text(name: &str, steps: &[(&str, &[&str])]) -> String {
    let mut text = format!("PROGRAM: {}\nGOAL: exercise the engine\nSTEPS:\n", name);
    for (step, actions) in steps {
        text.push_str(&format!("  STEP {}:\n", step));
        for action in *actions {
            text.push_str(&format!("    ACTION: {}\n", action));
        }
    }
    text
}

/// Program whose steps each set `<step> = true`
pub fn flag_program(steps: &[&str]) -> String {
    let mut text = String::from("PROGRAM: flags\nSTEPS:\n");
    for step in steps {
        text.push_str(&format!("  STEP {}:\n    ACTION: set {} = true\n", step, step));
    }
    text
}

/// Two-step program: compute, then mark completion
pub fn simple_program() -> String {
    program_text(
        "simple",
        &[
            ("compute", &["calculate the totals"]),
            ("finish", &["set completion flag"]),
        ],
    )
}
