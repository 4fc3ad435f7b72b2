//! Execution result types

use chrono::Utc;
use serde::Serialize;

use crate::engine::context::{
    ErrorKind, ErrorRecord, ExecutionContext, RunOutcome, StepExecutionRecord, StepStatus,
};
use crate::engine::error::ExecutorError;
use crate::program::state::ExecutionState;

/// Step attributed to errors raised before the loop starts
pub const INITIALIZATION_STEP: &str = "initialization";

/// Counters over one run's trace
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionStatistics {
    /// Steps declared by the program
    pub total_steps: usize,
    /// Trace records, skipped ones included
    pub executed_steps: usize,
    pub success_steps: usize,
    pub failed_steps: usize,
    pub skipped_steps: usize,
    /// Records whose step changed the state
    pub state_changes: usize,
    pub duration_ms: u64,
}

/// Reportable outcome of a run
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub run_id: String,
    pub success: bool,
    /// None when the run was rejected before the loop started
    pub outcome: Option<RunOutcome>,
    pub final_state: ExecutionState,
    pub trace: Vec<StepExecutionRecord>,
    pub errors: Vec<ErrorRecord>,
    pub statistics: ExecutionStatistics,
}

impl ExecutionResult {
    /// Result for a run rejected before the loop started
    pub fn system_error(error: &ExecutorError, initial_state: ExecutionState) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            success: false,
            outcome: None,
            final_state: initial_state,
            trace: Vec::new(),
            errors: vec![ErrorRecord {
                kind: ErrorKind::SystemError,
                message: error.to_string(),
                step: Some(INITIALIZATION_STEP.to_string()),
                timestamp: Utc::now(),
            }],
            statistics: ExecutionStatistics::default(),
        }
    }

    /// Records with the given status
    pub fn records_with(&self, status: StepStatus) -> impl Iterator<Item = &StepExecutionRecord> {
        self.trace.iter().filter(move |r| r.status == status)
    }
}

/// Converts a finished context into a result
pub struct ResultBuilder;

impl ResultBuilder {
    pub fn build(ctx: &ExecutionContext) -> ExecutionResult {
        let trace = ctx.trace().to_vec();
        let count = |status: StepStatus| trace.iter().filter(|r| r.status == status).count();

        let statistics = ExecutionStatistics {
            total_steps: ctx.program().len(),
            executed_steps: trace.len(),
            success_steps: count(StepStatus::Success),
            failed_steps: count(StepStatus::Failed),
            skipped_steps: count(StepStatus::Skipped),
            state_changes: trace.iter().filter(|r| r.changed_state()).count(),
            duration_ms: ctx.active_duration().as_millis() as u64,
        };

        ExecutionResult {
            run_id: ctx.run_id().to_string(),
            success: ctx.errors().is_empty(),
            outcome: ctx.outcome(),
            final_state: ctx.state().clone(),
            trace,
            errors: ctx.errors().to_vec(),
            statistics,
        }
    }
}
