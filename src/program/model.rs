//! Program and Step definitions
//!
//! A program is the parsed, immutable form of step-program text: a name,
//! a goal, and an ordered list of steps. Order is the only forward-progress
//! relation between steps.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ============================================================================
// Program
// ============================================================================

/// A parsed step program
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Program {
    /// Program name (empty when the text has no `PROGRAM:` line)
    pub name: String,

    /// Goal text
    pub goal: String,

    /// Steps in declaration order
    pub steps: Vec<Step>,
}

impl Program {
    /// Name of the first step, the default starting cursor
    pub fn first_step(&self) -> Option<&str> {
        self.steps.first().map(|s| s.name.as_str())
    }

    /// Find a step by name (first match in declaration order)
    pub fn step(&self, name: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.name == name)
    }

    /// Position of a step by name (first match in declaration order)
    pub fn position(&self, name: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.name == name)
    }

    /// Name of the step following `name`, or None if `name` is the last
    /// step or is not part of this program
    pub fn next_step(&self, name: &str) -> Option<&str> {
        let idx = self.position(name)?;
        self.steps.get(idx + 1).map(|s| s.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Step names that appear more than once, in first-repeat order.
    ///
    /// Duplicates are legal input but make the cursor revisit the first
    /// step with that name, so the run can only end on the iteration ceiling.
    pub fn duplicate_step_names(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();
        for step in &self.steps {
            if !seen.insert(step.name.as_str()) && !duplicates.contains(&step.name) {
                duplicates.push(step.name.clone());
            }
        }
        duplicates
    }
}

// ============================================================================
// Step
// ============================================================================

/// One named unit of work
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Step {
    /// Step label, doubles as the cursor value
    pub name: String,

    /// Action descriptors, applied in order
    #[serde(default)]
    pub actions: Vec<String>,

    /// Precondition descriptors, all must hold for the step to run
    #[serde(default)]
    pub conditions: Vec<String>,
}

impl Step {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.actions.push(action.into());
        self
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.conditions.push(condition.into());
        self
    }

    /// A step without preconditions is always eligible
    pub fn is_unconditional(&self) -> bool {
        self.conditions.is_empty()
    }
}
