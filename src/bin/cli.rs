use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use serde_json::Value;
use step_engine::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "step-engine")]
#[command(about = "Run and check step programs", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program file
    Run {
        /// Path to the program file
        #[arg(value_name = "PROGRAM")]
        program: PathBuf,

        /// JSON file holding the initial state object
        #[arg(short, long)]
        state: Option<PathBuf>,

        /// YAML or JSON options file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Execution mode: strict or adaptive (overrides config)
        #[arg(short, long)]
        mode: Option<String>,

        /// Timeout in milliseconds (overrides config)
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Capture a checkpoint after each step
        #[arg(long)]
        checkpoint: bool,

        /// Start at this step instead of the first one
        #[arg(long)]
        resume_from: Option<String>,

        /// Loop iteration ceiling (overrides config)
        #[arg(long)]
        max_iterations: Option<usize>,

        /// Evaluate conditions against the state instead of accepting them
        #[arg(long)]
        state_conditions: bool,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate program files without running them
    Validate {
        /// Path to a program file or directory
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },

    /// Print the parsed form of a program as JSON
    Inspect {
        /// Path to the program file
        #[arg(value_name = "PROGRAM")]
        program: PathBuf,
    },
}

/// Run arguments that feed into options
struct RunOverrides {
    config: Option<PathBuf>,
    mode: Option<String>,
    timeout_ms: Option<u64>,
    checkpoint: bool,
    resume_from: Option<String>,
    max_iterations: Option<usize>,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        "step_engine=debug"
    } else {
        "step_engine=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(success) => {
            if success {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<bool> {
    match cli.command {
        Commands::Run {
            program,
            state,
            config,
            mode,
            timeout_ms,
            checkpoint,
            resume_from,
            max_iterations,
            state_conditions,
            json,
        } => {
            let overrides = RunOverrides {
                config,
                mode,
                timeout_ms,
                checkpoint,
                resume_from,
                max_iterations,
            };
            run_program(&program, state.as_deref(), overrides, state_conditions, json)
        }
        Commands::Validate { path } => validate(&path),
        Commands::Inspect { program } => inspect(&program),
    }
}

fn run_program(
    path: &Path,
    state_file: Option<&Path>,
    overrides: RunOverrides,
    state_conditions: bool,
    json: bool,
) -> anyhow::Result<bool> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read program: {}", path.display()))?;
    let state = load_state(state_file)?;
    let options = build_options(overrides)?;

    let mut executor = Executor::new();
    if state_conditions {
        executor = executor.with_evaluator(StateConditionEvaluator);
    }

    if !json {
        println!("Running program: {}\n", path.display());
    }

    let result = executor.execute(&text, state, options);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }

    Ok(result.success)
}

fn load_state(path: Option<&Path>) -> anyhow::Result<ExecutionState> {
    let Some(path) = path else {
        return Ok(ExecutionState::new());
    };

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read state: {}", path.display()))?;
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("Invalid JSON in state file: {}", path.display()))?;
    Ok(ExecutionState::from_value(value)?)
}

/// Config file first, then command-line overrides
fn build_options(overrides: RunOverrides) -> anyhow::Result<ExecutionOptions> {
    let mut raw = match &overrides.config {
        Some(path) => RawOptions::load_file(path)?,
        None => RawOptions::default(),
    };

    if let Some(mode) = overrides.mode {
        raw.mode = mode;
    }
    if let Some(timeout_ms) = overrides.timeout_ms {
        raw.timeout_ms = timeout_ms;
    }
    if overrides.checkpoint {
        raw.checkpoint = true;
    }
    if overrides.resume_from.is_some() {
        raw.resume_from = overrides.resume_from;
    }
    if let Some(max) = overrides.max_iterations {
        raw.max_iterations = max;
    }

    Ok(ExecutionOptions::try_from(raw)?)
}

fn validate(path: &Path) -> anyhow::Result<bool> {
    if !path.exists() {
        anyhow::bail!("Path not found: {}", path.display());
    }

    let programs = if path.is_dir() {
        let programs = ProgramLoader::load_directory(path)?;
        if programs.is_empty() {
            println!("No programs found in: {}", path.display());
            return Ok(true);
        }
        programs
    } else {
        vec![(path.to_path_buf(), ProgramLoader::load_file(path)?)]
    };

    let mut all_valid = true;
    for (file, program) in &programs {
        let duplicates = program.duplicate_step_names();
        if program.is_empty() {
            all_valid = false;
            println!("✗ {}: no steps", file.display());
        } else if !duplicates.is_empty() {
            all_valid = false;
            println!(
                "✗ {}: duplicate step names: {}",
                file.display(),
                duplicates.join(", ")
            );
        } else {
            println!("✓ {} is valid ({} steps)", file.display(), program.len());
        }
    }

    Ok(all_valid)
}

fn inspect(path: &Path) -> anyhow::Result<bool> {
    let program = ProgramLoader::load_file(path)?;
    println!("{}", serde_json::to_string_pretty(&program)?);
    Ok(true)
}

fn print_result(result: &ExecutionResult) {
    println!("=== Program Result ===\n");
    println!("Success: {}", if result.success { "YES" } else { "NO" });
    println!("Run ID: {}", result.run_id);
    if let Some(outcome) = result.outcome {
        println!("Outcome: {:?}", outcome);
    }
    println!();

    for record in &result.trace {
        let status = match record.status {
            StepStatus::Success => "✓",
            StepStatus::Failed => "✗",
            StepStatus::Skipped => "-",
            StepStatus::Pending | StepStatus::Running => "?",
        };
        println!("  {} {}", status, record.step);
        if let Some(err) = &record.error {
            println!("      Error: {}", err);
        }
        if let Some(reason) = &record.reason {
            println!("      Reason: {}", reason);
        }
    }

    for error in result.errors.iter().filter(|e| e.kind != ErrorKind::StepError) {
        println!("\n{:?}: {}", error.kind, error.message);
    }

    let stats = &result.statistics;
    println!(
        "\n{} of {} steps executed: {} succeeded, {} failed, {} skipped ({}ms)",
        stats.executed_steps,
        stats.total_steps,
        stats.success_steps,
        stats.failed_steps,
        stats.skipped_steps,
        stats.duration_ms
    );
}
