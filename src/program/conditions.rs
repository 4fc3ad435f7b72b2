//! Precondition evaluation
//!
//! A step runs only if every one of its conditions evaluates to true.
//! Evaluation is a pluggable strategy: [`PermissiveEvaluator`] is the
//! default and accepts everything, [`StateConditionEvaluator`] reads the
//! execution state for a small set of recognized condition shapes:
//!
//! - `order.total exists` / `order.total missing`
//! - `not order.paid`
//! - `order.total > 100` (also `==`, `!=`, `>=`, `<`, `<=`)
//! - `order.paid` (truthiness)

use regex::Regex;
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::LazyLock;

use super::state::ExecutionState;
use crate::engine::error::StepError;

const PATH: &str = r"[\w-]+(?:\.[\w-]+)*";

static EXISTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)^({PATH})\s+(?:exists|is set|is present)$")).unwrap()
});
static MISSING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)^({PATH})\s+(?:missing|is missing|is not set|is absent)$")).unwrap()
});
static NEGATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?i)^not\s+({PATH})$")).unwrap());
static COMPARISON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^({PATH})\s*(==|!=|>=|<=|>|<)\s*(.+)$")).unwrap()
});
static BARE_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"^({PATH})$")).unwrap());

/// Strategy consulted before a step runs
pub trait ConditionEvaluator: Send + Sync {
    /// Evaluate one precondition against the current state.
    ///
    /// Returning an error fails the step the condition belongs to.
    fn evaluate(&self, condition: &str, state: &ExecutionState) -> Result<bool, StepError>;
}

impl<F> ConditionEvaluator for F
where
    F: Fn(&str, &ExecutionState) -> bool + Send + Sync,
{
    fn evaluate(&self, condition: &str, state: &ExecutionState) -> Result<bool, StepError> {
        Ok(self(condition, state))
    }
}

/// Accepts every condition, so unconditioned programs run as plain sequences
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissiveEvaluator;

impl ConditionEvaluator for PermissiveEvaluator {
    fn evaluate(&self, _condition: &str, _state: &ExecutionState) -> Result<bool, StepError> {
        Ok(true)
    }
}

/// Evaluates recognized condition shapes against state; anything else is true
#[derive(Debug, Clone, Copy, Default)]
pub struct StateConditionEvaluator;

impl ConditionEvaluator for StateConditionEvaluator {
    fn evaluate(&self, condition: &str, state: &ExecutionState) -> Result<bool, StepError> {
        let condition = condition.trim();

        if let Some(cap) = EXISTS.captures(condition) {
            return Ok(state.contains_path(&cap[1]));
        }
        if let Some(cap) = MISSING.captures(condition) {
            return Ok(!state.contains_path(&cap[1]));
        }
        if let Some(cap) = NEGATION.captures(condition) {
            return Ok(!is_truthy(state.get_path(&cap[1])));
        }
        if let Some(cap) = COMPARISON.captures(condition) {
            let expected = parse_literal(cap[3].trim());
            return compare(condition, state.get_path(&cap[1]), &cap[2], &expected);
        }
        if let Some(cap) = BARE_PATH.captures(condition) {
            return Ok(is_truthy(state.get_path(&cap[1])));
        }

        Ok(true)
    }
}

/// Parse a literal operand: JSON when it parses, else bare text
pub(crate) fn parse_literal(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}

/// Ordering a missing value is false; ordering mismatched types is an error
fn compare(
    condition: &str,
    actual: Option<&Value>,
    op: &str,
    expected: &Value,
) -> Result<bool, StepError> {
    let actual = actual.unwrap_or(&Value::Null);
    let ordering = match op {
        "==" => return Ok(values_equal(actual, expected)),
        "!=" => return Ok(!values_equal(actual, expected)),
        _ if actual.is_null() => return Ok(false),
        _ => order(actual, expected).ok_or_else(|| StepError::Condition {
            condition: condition.to_string(),
            message: format!(
                "cannot order {} against {}",
                type_name(actual),
                type_name(expected)
            ),
        })?,
    };

    Ok(match op {
        ">" => ordering == Ordering::Greater,
        ">=" => ordering != Ordering::Less,
        "<" => ordering == Ordering::Less,
        _ => ordering != Ordering::Greater,
    })
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn order(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}
