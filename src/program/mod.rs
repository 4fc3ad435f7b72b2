//! Program types and definitions
//!
//! This module contains everything that describes a run before it starts:
//! - `model` - Program and Step
//! - `parser` - Line-oriented program text parser
//! - `state` - ExecutionState, the mutable data a program works on
//! - `conditions` - Precondition evaluation strategies
//! - `loader` - Load programs from files and directories
//! - `options` - Execution mode and run configuration

pub mod conditions;
pub mod loader;
pub mod model;
pub mod options;
pub mod parser;
pub mod state;

// Re-export all public types for convenience
pub use conditions::{ConditionEvaluator, PermissiveEvaluator, StateConditionEvaluator};
pub use loader::{LoadError, ProgramLoader};
pub use model::{Program, Step};
pub use options::{ExecutionMode, ExecutionOptions, RawOptions};
pub use parser::ProgramParser;
pub use state::{ExecutionState, StateError, COMPLETED_KEY};
