//! Recovery policies for adaptive mode
//!
//! In strict mode a failed step always halts the run. In adaptive mode the
//! executor asks a [`RecoveryPolicy`] what to do next. The default policy
//! keeps going with the next step.

use crate::engine::error::StepError;
use crate::program::model::Step;

/// What the executor does after a step fails in adaptive mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryDecision {
    /// Advance to the next step
    Continue,
    /// Run the same step again
    Retry,
    /// Stop the run, as in strict mode
    Halt,
}

/// Decides how an adaptive run reacts to a failed step
pub trait RecoveryPolicy: Send + Sync {
    /// `attempt` is the 1-based attempt number of the run that just failed
    fn on_step_failed(&self, step: &Step, error: &StepError, attempt: u32) -> RecoveryDecision;
}

/// Skip past failures
#[derive(Debug, Clone, Copy, Default)]
pub struct ContinueOnFailure;

impl RecoveryPolicy for ContinueOnFailure {
    fn on_step_failed(&self, _step: &Step, _error: &StepError, _attempt: u32) -> RecoveryDecision {
        RecoveryDecision::Continue
    }
}

/// Stop on the first failure
#[derive(Debug, Clone, Copy, Default)]
pub struct HaltOnFailure;

impl RecoveryPolicy for HaltOnFailure {
    fn on_step_failed(&self, _step: &Step, _error: &StepError, _attempt: u32) -> RecoveryDecision {
        RecoveryDecision::Halt
    }
}

/// Re-run a failed step up to `max_attempts` times in total, then continue.
///
/// Cancellation is never retried.
#[derive(Debug, Clone, Copy)]
pub struct RetryFailedStep {
    pub max_attempts: u32,
}

impl RetryFailedStep {
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }
}

impl RecoveryPolicy for RetryFailedStep {
    fn on_step_failed(&self, _step: &Step, error: &StepError, attempt: u32) -> RecoveryDecision {
        if *error == StepError::Cancelled {
            RecoveryDecision::Halt
        } else if attempt < self.max_attempts {
            RecoveryDecision::Retry
        } else {
            RecoveryDecision::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_until_exhausted() {
        let policy = RetryFailedStep::new(3);
        let step = Step::new("flaky");
        let error = StepError::action("call", "timeout");

        assert_eq!(policy.on_step_failed(&step, &error, 1), RecoveryDecision::Retry);
        assert_eq!(policy.on_step_failed(&step, &error, 2), RecoveryDecision::Retry);
        assert_eq!(policy.on_step_failed(&step, &error, 3), RecoveryDecision::Continue);
    }

    #[test]
    fn test_cancellation_halts() {
        let policy = RetryFailedStep::new(5);
        let decision = policy.on_step_failed(&Step::new("s"), &StepError::Cancelled, 1);
        assert_eq!(decision, RecoveryDecision::Halt);
    }

    #[test]
    fn test_fixed_policies() {
        let step = Step::new("s");
        let error = StepError::UnknownAction("x".into());

        assert_eq!(
            ContinueOnFailure.on_step_failed(&step, &error, 1),
            RecoveryDecision::Continue
        );
        assert_eq!(HaltOnFailure.on_step_failed(&step, &error, 1), RecoveryDecision::Halt);
    }
}
