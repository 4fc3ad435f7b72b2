//! Program execution engine module
//!
//! This module contains:
//! - `executor` - The main program executor
//! - `context` - Per-run state, trace and error log
//! - `actions` - Action dispatchers and the handler registry
//! - `checkpoint` - Bounded in-memory checkpoints
//! - `recovery` - Failure policies for adaptive mode
//! - `clock` - System and mock time sources
//! - `error` - Step and executor error types
//! - `result` - Run result and statistics

pub mod actions;
pub mod checkpoint;
pub mod clock;
pub mod context;
pub mod error;
pub mod executor;
pub mod recovery;
pub mod result;

pub use actions::{ActionDispatcher, ActionHandler, DefaultDispatcher, RegistryDispatcher};
pub use checkpoint::{state_digest, Checkpoint, CheckpointStore};
pub use clock::{Clock, MockClock, SystemClock};
pub use context::{
    ErrorKind, ErrorRecord, ExecutionContext, RunOutcome, StepExecutionRecord, StepStatus,
};
pub use error::{ExecutorError, StepError};
pub use executor::{CancellationFlag, Executor};
pub use recovery::{
    ContinueOnFailure, HaltOnFailure, RecoveryDecision, RecoveryPolicy, RetryFailedStep,
};
pub use result::{ExecutionResult, ExecutionStatistics, ResultBuilder, INITIALIZATION_STEP};
