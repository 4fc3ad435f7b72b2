//! # Step Engine
//!
//! An execution engine for step programs: short, line-oriented scripts that
//! name a sequence of steps, each with actions and preconditions. The engine
//! runs the steps in order against a JSON-like state, recording a trace of
//! every step, and stops on completion, failure, timeout or an iteration
//! ceiling.
//!
//! ## Features
//!
//! - **Forgiving parser** - unrecognized lines are ignored, parsing never fails
//! - **Pluggable strategies** - condition evaluation, action dispatch, recovery and time
//! - **Strict and adaptive modes** - halt on the first failure or keep going
//! - **Checkpoints** - bounded in-memory snapshots with restore and resume
//!
//! ## Quick Start
//!
//! ```rust
//! use step_engine::prelude::*;
//!
//! let program = r#"
//! PROGRAM: demo
//! STEPS:
//!   STEP compute:
//!     ACTION: calculate the totals
//!   STEP finish:
//!     ACTION: set completion flag
//! "#;
//!
//! let executor = Executor::new();
//! let result = executor.execute(program, ExecutionState::new(), ExecutionOptions::default());
//!
//! assert!(result.success);
//! assert_eq!(result.trace.len(), 2);
//! assert!(result.final_state.is_completed());
//! ```

pub mod engine;
pub mod program;

// Re-export main types
pub use engine::{
    ActionDispatcher, ActionHandler, CancellationFlag, Checkpoint, CheckpointStore, Clock,
    ContinueOnFailure, DefaultDispatcher, ErrorKind, ErrorRecord, ExecutionContext,
    ExecutionResult, ExecutionStatistics, Executor, ExecutorError, HaltOnFailure, MockClock,
    RecoveryDecision, RecoveryPolicy, RegistryDispatcher, RetryFailedStep, RunOutcome, StepError,
    StepExecutionRecord, StepStatus, SystemClock,
};
pub use program::{
    ConditionEvaluator, ExecutionMode, ExecutionOptions, ExecutionState, LoadError,
    PermissiveEvaluator, Program, ProgramLoader, ProgramParser, RawOptions, StateConditionEvaluator,
    StateError, Step,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::engine::{
        ActionDispatcher, ActionHandler, CancellationFlag, Clock, DefaultDispatcher, ErrorKind,
        ExecutionContext, ExecutionResult, Executor, ExecutorError, MockClock, RecoveryPolicy,
        RegistryDispatcher, RunOutcome, StepError, StepStatus,
    };
    pub use crate::program::{
        ConditionEvaluator, ExecutionMode, ExecutionOptions, ExecutionState, LoadError, Program,
        ProgramLoader, ProgramParser, RawOptions, StateConditionEvaluator, Step,
    };
}
