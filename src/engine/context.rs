//! Execution context - the mutable record of one run
//!
//! The context owns the parsed program, the live state, the cursor, the
//! append-only trace and error list, the run options and the checkpoint
//! store. One context exists per run; it is never shared between runs.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::checkpoint::{Checkpoint, CheckpointStore};
use crate::engine::error::StepError;
use crate::program::model::{Program, Step};
use crate::program::options::ExecutionOptions;
use crate::program::state::ExecutionState;

/// Status of a step execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Success,
    Failed,
    Skipped,
}

impl StepStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed | Self::Skipped)
    }
}

/// Finalized record of one step execution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepExecutionRecord {
    pub step: String,
    pub status: StepStatus,
    /// 1-based attempt number; above 1 only for adaptive retries
    pub attempt: u32,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub state_before: ExecutionState,
    pub state_after: ExecutionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl StepExecutionRecord {
    /// Start recording a step; the record is finalized by one of the
    /// consuming methods on [`RunningStep`]
    pub fn begin(
        step: &str,
        attempt: u32,
        started_at: DateTime<Utc>,
        state_before: ExecutionState,
    ) -> RunningStep {
        RunningStep {
            step: step.to_string(),
            attempt,
            started_at,
            state_before,
        }
    }

    /// Whether the step changed the state
    pub fn changed_state(&self) -> bool {
        self.state_before != self.state_after
    }
}

/// A step that has begun but not finished
#[derive(Debug)]
pub struct RunningStep {
    step: String,
    attempt: u32,
    started_at: DateTime<Utc>,
    state_before: ExecutionState,
}

impl RunningStep {
    pub fn status(&self) -> StepStatus {
        StepStatus::Running
    }

    pub fn succeed(self, ended_at: DateTime<Utc>, state_after: ExecutionState) -> StepExecutionRecord {
        self.finish(StepStatus::Success, ended_at, state_after, None, None)
    }

    pub fn fail(
        self,
        ended_at: DateTime<Utc>,
        state_after: ExecutionState,
        error: &StepError,
    ) -> StepExecutionRecord {
        self.finish(StepStatus::Failed, ended_at, state_after, Some(error.to_string()), None)
    }

    pub fn skip(
        self,
        ended_at: DateTime<Utc>,
        state_after: ExecutionState,
        reason: impl Into<String>,
    ) -> StepExecutionRecord {
        self.finish(StepStatus::Skipped, ended_at, state_after, None, Some(reason.into()))
    }

    fn finish(
        self,
        status: StepStatus,
        ended_at: DateTime<Utc>,
        state_after: ExecutionState,
        error: Option<String>,
        reason: Option<String>,
    ) -> StepExecutionRecord {
        StepExecutionRecord {
            step: self.step,
            status,
            attempt: self.attempt,
            started_at: self.started_at,
            ended_at,
            state_before: self.state_before,
            state_after,
            error,
            reason,
        }
    }
}

/// Error category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Engine-internal, raised before the loop starts
    SystemError,
    /// A step's condition or action failed
    StepError,
    /// The run exceeded its wall-clock budget
    TimeoutError,
    /// The run hit the iteration ceiling
    IterationLimitError,
}

/// One recorded failure
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorRecord {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Terminal state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Completed,
    HaltedOnError,
    TimedOut,
    ExhaustedIterations,
}

/// Mutable record of one run
#[derive(Debug)]
pub struct ExecutionContext {
    run_id: String,
    program: Program,
    state: ExecutionState,
    cursor: Option<String>,
    trace: Vec<StepExecutionRecord>,
    errors: Vec<ErrorRecord>,
    options: ExecutionOptions,
    checkpoints: CheckpointStore,
    attempt: u32,
    active_duration: Duration,
    outcome: Option<RunOutcome>,
}

impl ExecutionContext {
    /// Create a context positioned at the resume step, or the first step
    pub fn new(program: Program, state: ExecutionState, options: ExecutionOptions) -> Self {
        let cursor = options
            .resume_from_step
            .clone()
            .or_else(|| program.first_step().map(str::to_string));

        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            checkpoints: CheckpointStore::new(options.max_checkpoints),
            program,
            state,
            cursor,
            trace: Vec::new(),
            errors: Vec::new(),
            options,
            attempt: 1,
            active_duration: Duration::ZERO,
            outcome: None,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn state(&self) -> &ExecutionState {
        &self.state
    }

    pub(crate) fn state_mut(&mut self) -> &mut ExecutionState {
        &mut self.state
    }

    /// Name of the next step to run, None when there is no more work
    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    pub fn trace(&self) -> &[StepExecutionRecord] {
        &self.trace
    }

    pub fn errors(&self) -> &[ErrorRecord] {
        &self.errors
    }

    pub fn options(&self) -> &ExecutionOptions {
        &self.options
    }

    pub fn checkpoints(&self) -> &CheckpointStore {
        &self.checkpoints
    }

    /// Outcome of the most recent run, None before the first run
    pub fn outcome(&self) -> Option<RunOutcome> {
        self.outcome
    }

    /// Total time spent inside the execution loop across runs
    pub fn active_duration(&self) -> Duration {
        self.active_duration
    }

    /// Step the cursor points at, None for no cursor or a dangling one
    pub fn current_step(&self) -> Option<&Step> {
        self.program.step(self.cursor.as_deref()?)
    }

    pub(crate) fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Move the cursor to the step after the current one
    pub(crate) fn advance(&mut self) {
        self.cursor = self
            .cursor
            .as_deref()
            .and_then(|name| self.program.next_step(name))
            .map(str::to_string);
        self.attempt = 1;
    }

    /// Keep the cursor on the current step for another attempt
    pub(crate) fn retry(&mut self) {
        self.attempt += 1;
    }

    /// Clear the cursor so the run ends
    pub(crate) fn halt(&mut self) {
        self.cursor = None;
    }

    pub(crate) fn push_record(&mut self, record: StepExecutionRecord) {
        self.trace.push(record);
    }

    pub(crate) fn push_error(
        &mut self,
        kind: ErrorKind,
        message: impl Into<String>,
        step: Option<String>,
        timestamp: DateTime<Utc>,
    ) {
        self.errors.push(ErrorRecord {
            kind,
            message: message.into(),
            step,
            timestamp,
        });
    }

    pub(crate) fn capture_checkpoint(&mut self, timestamp: DateTime<Utc>) {
        let checkpoint =
            Checkpoint::capture(timestamp, self.cursor.clone(), &self.state, self.trace.len());
        self.checkpoints.push(checkpoint);
    }

    pub(crate) fn finish_run(&mut self, outcome: RunOutcome, duration: Duration) {
        self.outcome = Some(outcome);
        self.active_duration += duration;
    }

    /// Rewind to a checkpoint. `index` counts from the oldest retained
    /// checkpoint when non-negative and from the latest when negative, so
    /// `-1` is the latest and `-2` the one before it.
    ///
    /// Replaces the state, resets the cursor and truncates the trace to the
    /// captured length. Errors and checkpoints are kept. Returns false when
    /// there is no such checkpoint.
    pub fn restore(&mut self, index: isize) -> bool {
        let Some(checkpoint) = self.checkpoints.get(index) else {
            return false;
        };

        self.state = checkpoint.state.clone();
        self.cursor = checkpoint.cursor.clone();
        self.trace.truncate(checkpoint.trace_length);
        self.attempt = 1;
        true
    }

    /// Rewind to the latest checkpoint
    pub fn restore_latest(&mut self) -> bool {
        self.restore(-1)
    }
}
