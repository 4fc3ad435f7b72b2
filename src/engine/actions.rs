//! Action dispatch
//!
//! Actions are opaque text descriptors applied to the execution state one
//! at a time. [`DefaultDispatcher`] recognizes a handful of illustrative
//! shapes so programs run standalone; [`RegistryDispatcher`] routes actions
//! to handlers registered by leading phrase.

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use crate::engine::error::StepError;
use crate::program::conditions::parse_literal;
use crate::program::state::ExecutionState;

static FAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^fail\b\s*:?\s*(.*)$").unwrap());
static ASSIGN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^set\s+(\S+?)\s*=\s*(.+)$").unwrap());
static STATE_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w-]+(?:\.[\w-]+)*$").unwrap());
static COMPLETE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:set|mark)\b.*\bcomplet(?:e|ed|ion)\b").unwrap());
static COMPUTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:compute|calculate)").unwrap());
static PERSIST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:save|persist|store)").unwrap());

/// Strategy that applies a step's actions to the shared state
pub trait ActionDispatcher: Send + Sync {
    /// Apply one action. An error aborts the remaining actions of the step.
    fn apply(&self, action: &str, state: &mut ExecutionState) -> Result<(), StepError>;
}

impl<F> ActionDispatcher for F
where
    F: Fn(&str, &mut ExecutionState) -> Result<(), StepError> + Send + Sync,
{
    fn apply(&self, action: &str, state: &mut ExecutionState) -> Result<(), StepError> {
        self(action, state)
    }
}

/// Built-in placeholder vocabulary.
///
/// Checked in this order:
/// - `fail <message>` raises a step error
/// - `set <path> = <value>` writes a JSON literal (or bare text) at a dotted
///   path; a malformed path is an invalid action
/// - `set ... complete` / `mark ... completed` sets the terminal `completed` key
/// - `compute ...` / `calculate ...` writes `processing.result = "computed"`
/// - `save ...` / `persist ...` / `store ...` writes `output.saved = true`
///
/// Anything else is a no-op.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultDispatcher;

impl ActionDispatcher for DefaultDispatcher {
    fn apply(&self, action: &str, state: &mut ExecutionState) -> Result<(), StepError> {
        let action = action.trim();

        if let Some(cap) = FAIL.captures(action) {
            let message = match cap[1].trim() {
                "" => "declared failure",
                m => m,
            };
            return Err(StepError::action(action, message));
        }
        if let Some(cap) = ASSIGN.captures(action) {
            if !STATE_PATH.is_match(&cap[1]) {
                return Err(StepError::InvalidAction(format!(
                    "'{}' is not a dotted state path",
                    &cap[1]
                )));
            }
            state.set_path(&cap[1], parse_literal(cap[2].trim()))?;
            return Ok(());
        }
        if COMPLETE.is_match(action) {
            state.mark_completed();
            return Ok(());
        }
        if COMPUTE.is_match(action) {
            state.set_path("processing.result", "computed")?;
            return Ok(());
        }
        if PERSIST.is_match(action) {
            state.set_path("output.saved", true)?;
            return Ok(());
        }

        debug!(action, "No built-in handler, treating action as no-op");
        Ok(())
    }
}

/// Handler for actions routed by a [`RegistryDispatcher`]
pub trait ActionHandler: Send + Sync {
    /// `args` is the action text after the registered phrase, with any
    /// separating `:` and whitespace removed
    fn handle(&self, args: &str, state: &mut ExecutionState) -> Result<(), StepError>;
}

impl<F> ActionHandler for F
where
    F: Fn(&str, &mut ExecutionState) -> Result<(), StepError> + Send + Sync,
{
    fn handle(&self, args: &str, state: &mut ExecutionState) -> Result<(), StepError> {
        self(args, state)
    }
}

/// Dispatcher that routes actions to handlers keyed by leading phrase.
///
/// Phrases match case-insensitively at a word boundary; the longest
/// registered phrase wins. Unmatched actions go to the fallback dispatcher
/// if one is set, otherwise they fail with [`StepError::UnknownAction`].
///
/// ```
/// use step_engine::engine::actions::{ActionDispatcher, RegistryDispatcher};
/// use step_engine::engine::StepError;
/// use step_engine::program::ExecutionState;
///
/// let dispatcher = RegistryDispatcher::new().register(
///     "increment",
///     |args: &str, state: &mut ExecutionState| -> Result<(), StepError> {
///         let current = state.get(args).and_then(|v| v.as_i64()).unwrap_or(0);
///         state.set(args, current + 1);
///         Ok(())
///     },
/// );
///
/// let mut state = ExecutionState::new();
/// dispatcher.apply("increment counter", &mut state).unwrap();
/// assert_eq!(state.get("counter"), Some(&serde_json::json!(1)));
/// ```
#[derive(Default)]
pub struct RegistryDispatcher {
    handlers: Vec<(String, Box<dyn ActionHandler>)>,
    fallback: Option<Box<dyn ActionDispatcher>>,
}

impl RegistryDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for actions starting with `phrase`
    pub fn register(mut self, phrase: impl Into<String>, handler: impl ActionHandler + 'static) -> Self {
        let phrase = phrase.into().trim().to_lowercase();
        self.handlers.retain(|(p, _)| *p != phrase);
        self.handlers.push((phrase, Box::new(handler)));
        self
    }

    /// Route unmatched actions to `fallback` instead of failing
    pub fn with_fallback(mut self, fallback: impl ActionDispatcher + 'static) -> Self {
        self.fallback = Some(Box::new(fallback));
        self
    }

    /// Registered phrases, in registration order
    pub fn phrases(&self) -> Vec<&str> {
        self.handlers.iter().map(|(p, _)| p.as_str()).collect()
    }

    fn route<'a>(&self, action: &'a str) -> Option<(&dyn ActionHandler, &'a str)> {
        let lowered = action.to_lowercase();
        self.handlers
            .iter()
            .filter(|(phrase, _)| matches_phrase(&lowered, phrase))
            .max_by_key(|(phrase, _)| phrase.len())
            .map(|(phrase, handler)| {
                let rest = action.get(phrase.len()..).unwrap_or("");
                let args = rest.trim_start().trim_start_matches(':').trim();
                (handler.as_ref(), args)
            })
    }
}

fn matches_phrase(action: &str, phrase: &str) -> bool {
    if !action.starts_with(phrase) {
        return false;
    }
    action[phrase.len()..]
        .chars()
        .next()
        .map_or(true, |c| c.is_whitespace() || c == ':')
}

impl ActionDispatcher for RegistryDispatcher {
    fn apply(&self, action: &str, state: &mut ExecutionState) -> Result<(), StepError> {
        let action = action.trim();

        if let Some((handler, args)) = self.route(action) {
            return handler.handle(args, state);
        }

        match &self.fallback {
            Some(fallback) => fallback.apply(action, state),
            None => Err(StepError::UnknownAction(action.to_string())),
        }
    }
}
