//! Run configuration
//!
//! Options can be built in code or loaded from a YAML/JSON file:
//!
//! ```yaml
//! mode: adaptive
//! timeout_ms: 5000
//! checkpoint: true
//! resume_from: compute
//! max_iterations: 200
//! max_checkpoints: 10
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::loader::LoadError;
use crate::engine::error::ExecutorError;

/// Default wall-clock budget for a run
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Hard ceiling on loop iterations, guards against cursor cycles
pub const DEFAULT_MAX_ITERATIONS: usize = 1000;

/// Number of most recent checkpoints retained
pub const DEFAULT_MAX_CHECKPOINTS: usize = 10;

/// Policy toward continuing after a step failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Halt the run on the first failed step
    #[default]
    Strict,
    /// Keep going after a failed step, as directed by the recovery policy
    Adaptive,
}

impl FromStr for ExecutionMode {
    type Err = ExecutorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "adaptive" => Ok(Self::Adaptive),
            other => Err(ExecutorError::UnknownMode(other.to_string())),
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => write!(f, "strict"),
            Self::Adaptive => write!(f, "adaptive"),
        }
    }
}

/// Validated run configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOptions {
    pub mode: ExecutionMode,
    pub timeout: Duration,
    pub checkpoint: bool,
    pub resume_from_step: Option<String>,
    pub max_iterations: usize,
    pub max_checkpoints: usize,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Strict,
            timeout: DEFAULT_TIMEOUT,
            checkpoint: false,
            resume_from_step: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_checkpoints: DEFAULT_MAX_CHECKPOINTS,
        }
    }
}

impl ExecutionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_timeout_ms(self, millis: u64) -> Self {
        self.with_timeout(Duration::from_millis(millis))
    }

    pub fn with_checkpoints(mut self, enabled: bool) -> Self {
        self.checkpoint = enabled;
        self
    }

    pub fn resuming_from(mut self, step: impl Into<String>) -> Self {
        self.resume_from_step = Some(step.into());
        self
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_max_checkpoints(mut self, max: usize) -> Self {
        self.max_checkpoints = max;
        self
    }

    /// Check limits that cannot be expressed in the types
    pub fn validate(&self) -> Result<(), ExecutorError> {
        if self.max_iterations == 0 {
            return Err(ExecutorError::InvalidOptions(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if self.max_checkpoints == 0 {
            return Err(ExecutorError::InvalidOptions(
                "max_checkpoints must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// String-typed options as they appear in config files and tool calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawOptions {
    #[serde(default = "default_mode")]
    pub mode: String,

    #[serde(default = "default_timeout_ms", alias = "timeout")]
    pub timeout_ms: u64,

    #[serde(default)]
    pub checkpoint: bool,

    #[serde(default, alias = "continue_from", alias = "resume_from_step")]
    pub resume_from: Option<String>,

    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    #[serde(default = "default_max_checkpoints")]
    pub max_checkpoints: usize,
}

fn default_mode() -> String {
    ExecutionMode::Strict.to_string()
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT.as_millis() as u64
}

fn default_max_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}

fn default_max_checkpoints() -> usize {
    DEFAULT_MAX_CHECKPOINTS
}

impl Default for RawOptions {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            timeout_ms: default_timeout_ms(),
            checkpoint: false,
            resume_from: None,
            max_iterations: default_max_iterations(),
            max_checkpoints: default_max_checkpoints(),
        }
    }
}

impl RawOptions {
    /// Load options from a `.json` file, or YAML for any other extension
    pub fn load_file(path: &Path) -> Result<Self, LoadError> {
        let content = std::fs::read_to_string(path)?;
        let file = path.display().to_string();
        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            serde_json::from_str(&content).map_err(|error| LoadError::Json { file, error })
        } else {
            serde_yaml::from_str(&content).map_err(|error| LoadError::Yaml { file, error })
        }
    }
}

impl TryFrom<RawOptions> for ExecutionOptions {
    type Error = ExecutorError;

    fn try_from(raw: RawOptions) -> Result<Self, Self::Error> {
        let options = ExecutionOptions {
            mode: raw.mode.parse()?,
            timeout: Duration::from_millis(raw.timeout_ms),
            checkpoint: raw.checkpoint,
            resume_from_step: raw.resume_from,
            max_iterations: raw.max_iterations,
            max_checkpoints: raw.max_checkpoints,
        };
        options.validate()?;
        Ok(options)
    }
}

impl TryFrom<serde_json::Value> for ExecutionOptions {
    type Error = ExecutorError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        let raw: RawOptions = if value.is_null() {
            RawOptions::default()
        } else {
            serde_json::from_value(value)?
        };
        raw.try_into()
    }
}
