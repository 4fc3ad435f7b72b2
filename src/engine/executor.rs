//! Program Executor - Runs step programs and manages state
//!
//! This is the main engine that:
//! 1. Parses program text
//! 2. Seeds an execution context with the caller's initial state
//! 3. Executes steps in order, consulting the condition evaluator first
//! 4. Routes actions to the action dispatcher
//! 5. Records the trace, errors and optional checkpoints
//!
//! A run ends when the state reports completion, the cursor runs out, a
//! step fails in strict mode, the timeout budget is spent, or the iteration
//! ceiling is reached. Every one of these ends is reported through the
//! returned result, never as an `Err` or a panic.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use crate::engine::actions::{ActionDispatcher, DefaultDispatcher};
use crate::engine::clock::{elapsed, Clock, SystemClock};
use crate::engine::context::{ErrorKind, ExecutionContext, RunOutcome, StepExecutionRecord};
use crate::engine::error::{ExecutorError, StepError};
use crate::engine::recovery::{ContinueOnFailure, RecoveryDecision, RecoveryPolicy};
use crate::engine::result::{ExecutionResult, ResultBuilder};
use crate::program::*;

/// Shared flag for cooperative cancellation.
///
/// Once set, every action the executor is about to run fails with
/// [`StepError::Cancelled`].
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// How a single step ended
#[derive(Debug)]
enum StepOutcome {
    Succeeded,
    /// Carries the first condition that did not hold
    Skipped(String),
    Failed(StepError),
}

/// The step-program executor
pub struct Executor {
    evaluator: Box<dyn ConditionEvaluator>,
    dispatcher: Box<dyn ActionDispatcher>,
    recovery: Box<dyn RecoveryPolicy>,
    clock: Box<dyn Clock>,
    cancellation: Option<CancellationFlag>,
}

impl Executor {
    /// Executor with the permissive evaluator, the default dispatcher,
    /// continue-on-failure recovery and the system clock
    pub fn new() -> Self {
        Self {
            evaluator: Box::new(PermissiveEvaluator),
            dispatcher: Box::new(DefaultDispatcher),
            recovery: Box::new(ContinueOnFailure),
            clock: Box::new(SystemClock),
            cancellation: None,
        }
    }

    pub fn with_evaluator(mut self, evaluator: impl ConditionEvaluator + 'static) -> Self {
        self.evaluator = Box::new(evaluator);
        self
    }

    pub fn with_dispatcher(mut self, dispatcher: impl ActionDispatcher + 'static) -> Self {
        self.dispatcher = Box::new(dispatcher);
        self
    }

    /// Policy consulted after a failed step in adaptive mode
    pub fn with_recovery(mut self, recovery: impl RecoveryPolicy + 'static) -> Self {
        self.recovery = Box::new(recovery);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_cancellation(mut self, flag: CancellationFlag) -> Self {
        self.cancellation = Some(flag);
        self
    }

    /// Parse a program and build a context for it without running it
    pub fn prepare(
        &self,
        program_text: &str,
        initial_state: ExecutionState,
        options: ExecutionOptions,
    ) -> Result<ExecutionContext, ExecutorError> {
        options.validate()?;
        let program = ProgramParser::parse(program_text);
        Ok(ExecutionContext::new(program, initial_state, options))
    }

    /// Parse and run a program to a terminal state
    #[instrument(skip_all)]
    pub fn execute(
        &self,
        program_text: &str,
        initial_state: ExecutionState,
        options: ExecutionOptions,
    ) -> ExecutionResult {
        if let Err(e) = options.validate() {
            error!(error = %e, "Rejecting run before start");
            return ExecutionResult::system_error(&e, initial_state);
        }

        let program = ProgramParser::parse(program_text);
        let mut ctx = ExecutionContext::new(program, initial_state, options);
        self.run(&mut ctx);
        ResultBuilder::build(&ctx)
    }

    /// Run with loosely typed state and options, as received from a tool
    /// call or config file. Invalid input yields a system-error result.
    pub fn execute_raw(&self, program_text: &str, initial_state: Value, options: Value) -> ExecutionResult {
        let state = match ExecutionState::from_value(initial_state) {
            Ok(state) => state,
            Err(e) => {
                let e = ExecutorError::from(e);
                error!(error = %e, "Rejecting run before start");
                return ExecutionResult::system_error(&e, ExecutionState::new());
            }
        };

        match ExecutionOptions::try_from(options) {
            Ok(options) => self.execute(program_text, state, options),
            Err(e) => {
                error!(error = %e, "Rejecting run before start");
                ExecutionResult::system_error(&e, state)
            }
        }
    }

    /// Continue a context from its current cursor, e.g. after a restore
    pub fn resume(&self, ctx: &mut ExecutionContext) -> ExecutionResult {
        self.run(ctx);
        ResultBuilder::build(ctx)
    }

    /// Drive the execution loop until a terminal state
    #[instrument(skip(self, ctx), fields(run_id = %ctx.run_id(), program = %ctx.program().name))]
    pub fn run(&self, ctx: &mut ExecutionContext) -> RunOutcome {
        let started = self.clock.now();
        let timeout = ctx.options().timeout;
        let max_iterations = ctx.options().max_iterations;

        info!(
            "Starting program run ({} steps, mode: {}, cursor: {:?})",
            ctx.program().len(),
            ctx.options().mode,
            ctx.cursor()
        );

        let mut iterations = 0usize;
        let mut halted = false;

        let outcome = loop {
            if ctx.state().is_completed() || ctx.cursor().is_none() {
                break if halted {
                    RunOutcome::HaltedOnError
                } else if iterations == 0 {
                    // nothing ran, an earlier run's outcome still stands
                    ctx.outcome().unwrap_or(RunOutcome::Completed)
                } else {
                    RunOutcome::Completed
                };
            }

            let now = self.clock.now();
            let spent = elapsed(started, now);
            if spent >= timeout {
                let message = format!(
                    "Execution timed out after {}ms (budget {}ms)",
                    spent.as_millis(),
                    timeout.as_millis()
                );
                warn!("{}", message);
                let step = ctx.cursor().map(str::to_string);
                ctx.push_error(ErrorKind::TimeoutError, message, step, now);
                break RunOutcome::TimedOut;
            }

            if iterations >= max_iterations {
                let message = format!("Iteration limit of {} reached", max_iterations);
                warn!("{}", message);
                let step = ctx.cursor().map(str::to_string);
                ctx.push_error(ErrorKind::IterationLimitError, message, step, now);
                break RunOutcome::ExhaustedIterations;
            }
            iterations += 1;

            let Some(step) = ctx.current_step().cloned() else {
                warn!("Cursor {:?} does not name a step, ending run", ctx.cursor());
                break RunOutcome::Completed;
            };

            let attempt = ctx.attempt();
            let mut retry = false;

            if let StepOutcome::Failed(error) = self.execute_step(ctx, &step) {
                let decision = match ctx.options().mode {
                    ExecutionMode::Strict => RecoveryDecision::Halt,
                    ExecutionMode::Adaptive => self.recovery.on_step_failed(&step, &error, attempt),
                };
                debug!(step = %step.name, ?decision, "Handling step failure");

                match decision {
                    RecoveryDecision::Continue => {}
                    RecoveryDecision::Retry => retry = true,
                    RecoveryDecision::Halt => {
                        ctx.halt();
                        halted = true;
                    }
                }
            }

            if ctx.options().checkpoint {
                ctx.capture_checkpoint(self.clock.now());
                debug!(
                    step = %step.name,
                    checkpoints = ctx.checkpoints().len(),
                    capacity = ctx.checkpoints().capacity(),
                    "Captured checkpoint"
                );
            }

            if retry {
                ctx.retry();
            } else if !halted {
                ctx.advance();
            }

            self.clock.step_finished();
        };

        let duration = elapsed(started, self.clock.now());
        ctx.finish_run(outcome, duration);

        let duration_ms = duration.as_millis() as u64;
        info!(
            ?outcome,
            records = ctx.trace().len(),
            errors = ctx.errors().len(),
            duration_ms,
            "Program run finished"
        );

        outcome
    }

    /// Execute one step and append its record (and error, if any)
    fn execute_step(&self, ctx: &mut ExecutionContext, step: &Step) -> StepOutcome {
        let attempt = ctx.attempt();
        debug!(step = %step.name, attempt, "Executing step");

        let running = StepExecutionRecord::begin(
            &step.name,
            attempt,
            self.clock.now(),
            ctx.state().clone(),
        );

        let outcome = match self.check_conditions(step, ctx.state()) {
            Ok(None) => match self.apply_actions(step, ctx.state_mut()) {
                Ok(()) => StepOutcome::Succeeded,
                Err(e) => StepOutcome::Failed(e),
            },
            Ok(Some(condition)) => StepOutcome::Skipped(condition),
            Err(e) => StepOutcome::Failed(e),
        };

        let ended_at = self.clock.now();
        let state_after = ctx.state().clone();

        let record = match &outcome {
            StepOutcome::Succeeded => running.succeed(ended_at, state_after),
            StepOutcome::Skipped(condition) => {
                info!("Skipping step '{}' due to condition: {}", step.name, condition);
                running.skip(ended_at, state_after, format!("Condition not met: {}", condition))
            }
            StepOutcome::Failed(e) => {
                error!("Step '{}' failed: {}", step.name, e);
                ctx.push_error(
                    ErrorKind::StepError,
                    e.to_string(),
                    Some(step.name.clone()),
                    ended_at,
                );
                running.fail(ended_at, state_after, e)
            }
        };

        ctx.push_record(record);
        outcome
    }

    /// First condition that does not hold, or None if all hold
    fn check_conditions(
        &self,
        step: &Step,
        state: &ExecutionState,
    ) -> Result<Option<String>, StepError> {
        for condition in &step.conditions {
            if !guarded(|| self.evaluator.evaluate(condition, state))? {
                return Ok(Some(condition.clone()));
            }
        }
        Ok(None)
    }

    fn apply_actions(&self, step: &Step, state: &mut ExecutionState) -> Result<(), StepError> {
        for action in &step.actions {
            if self.is_cancelled() {
                return Err(StepError::Cancelled);
            }
            guarded(|| self.dispatcher.apply(action, state))?;
        }
        Ok(())
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationFlag::is_cancelled)
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

/// Run a plugged-in strategy, turning a panic into a step error
fn guarded<T>(f: impl FnOnce() -> Result<T, StepError>) -> Result<T, StepError> {
    panic::catch_unwind(AssertUnwindSafe(f))
        .unwrap_or_else(|payload| Err(StepError::Panicked(panic_message(payload.as_ref()))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::context::StepStatus;

    #[test]
    fn test_guarded_passes_results_through() {
        assert_eq!(guarded(|| Ok::<_, StepError>(3)), Ok(3));
        assert_eq!(
            guarded(|| Err::<(), _>(StepError::Cancelled)),
            Err(StepError::Cancelled)
        );
    }

    #[test]
    fn test_guarded_converts_panics() {
        let result = guarded(|| -> Result<(), StepError> { panic!("handler exploded") });
        assert_eq!(result, Err(StepError::Panicked("handler exploded".to_string())));

        let code = 7;
        let result = guarded(|| -> Result<(), StepError> { panic!("code {}", code) });
        assert_eq!(result, Err(StepError::Panicked("code 7".to_string())));
    }

    #[test]
    fn test_panicking_dispatcher_becomes_step_error() {
        let executor = Executor::new().with_dispatcher(
            |_: &str, _: &mut ExecutionState| -> Result<(), StepError> { panic!("boom") },
        );

        let result = executor.execute(
            "STEPS:\n  STEP only:\n    ACTION: anything\n",
            ExecutionState::new(),
            ExecutionOptions::default(),
        );

        assert!(!result.success);
        assert_eq!(result.outcome, Some(RunOutcome::HaltedOnError));
        assert_eq!(result.trace[0].status, StepStatus::Failed);
        assert_eq!(result.errors[0].kind, ErrorKind::StepError);
        assert_eq!(result.errors[0].message, "Panicked: boom");
    }

    #[test]
    fn test_cancellation_flag() {
        let flag = CancellationFlag::new();
        assert!(!flag.is_cancelled());

        let handle = flag.clone();
        handle.cancel();
        assert!(flag.is_cancelled());
    }
}
