//! Execution state for program runtime
//!
//! The state is a JSON object mapping string keys to arbitrary nested
//! values. Actions are the only writers; the execution loop only reads the
//! terminal `completed` key and takes snapshots.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key the execution loop treats as a terminal signal when set to `true`
pub const COMPLETED_KEY: &str = "completed";

/// Errors raised while building or writing state
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StateError {
    #[error("Initial state must be a JSON object, got: {0}")]
    NotAnObject(String),

    #[error("Cannot write '{path}': '{segment}' is not an object")]
    PathConflict { path: String, segment: String },

    #[error("Empty state path")]
    EmptyPath,
}

/// Mutable key-value data the program reads and writes
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionState {
    values: Map<String, Value>,
}

impl ExecutionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a state from a JSON value, which must be an object
    pub fn from_value(value: Value) -> Result<Self, StateError> {
        match value {
            Value::Object(values) => Ok(Self { values }),
            other => Err(StateError::NotAnObject(type_name(&other).to_string())),
        }
    }

    /// Get a top-level value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Get a value by dotted path (`order.total`)
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.values.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    pub fn contains_path(&self, path: &str) -> bool {
        self.get_path(path).is_some()
    }

    /// Set a top-level value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// Set a value by dotted path, creating intermediate objects as needed.
    ///
    /// Fails when an intermediate segment holds a non-object value.
    pub fn set_path(&mut self, path: &str, value: impl Into<Value>) -> Result<(), StateError> {
        let segments: Vec<&str> = path.split('.').map(str::trim).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(StateError::EmptyPath);
        }

        let (last, parents) = segments.split_last().ok_or(StateError::EmptyPath)?;
        let mut map = &mut self.values;
        for segment in parents {
            let entry = map
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            map = entry.as_object_mut().ok_or_else(|| StateError::PathConflict {
                path: path.to_string(),
                segment: segment.to_string(),
            })?;
        }
        map.insert(last.to_string(), value.into());
        Ok(())
    }

    /// Whether the terminal key is set to `true`
    pub fn is_completed(&self) -> bool {
        self.get(COMPLETED_KEY).and_then(Value::as_bool) == Some(true)
    }

    pub fn mark_completed(&mut self) {
        self.set(COMPLETED_KEY, true);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.values.clone())
    }
}

impl From<Map<String, Value>> for ExecutionState {
    fn from(values: Map<String, Value>) -> Self {
        Self { values }
    }
}

impl TryFrom<Value> for ExecutionState {
    type Error = StateError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_requires_object() {
        assert!(ExecutionState::from_value(json!({"a": 1})).is_ok());
        assert_eq!(
            ExecutionState::from_value(json!([1, 2])),
            Err(StateError::NotAnObject("array".to_string()))
        );
    }

    #[test]
    fn test_path_access() {
        let state = ExecutionState::from_value(json!({
            "order": {"total": 42, "lines": {"count": 3}}
        }))
        .unwrap();

        assert_eq!(state.get_path("order.total"), Some(&json!(42)));
        assert_eq!(state.get_path("order.lines.count"), Some(&json!(3)));
        assert_eq!(state.get_path("order.missing"), None);
        assert_eq!(state.get_path("order.total.deeper"), None);
        assert!(state.contains_path("order"));
    }

    #[test]
    fn test_set_path_creates_parents() {
        let mut state = ExecutionState::new();
        state.set_path("output.saved", true).unwrap();

        assert_eq!(state.to_value(), json!({"output": {"saved": true}}));
    }

    #[test]
    fn test_set_path_conflict() {
        let mut state = ExecutionState::new();
        state.set("output", "text");

        let err = state.set_path("output.saved", true).unwrap_err();
        assert!(matches!(err, StateError::PathConflict { .. }));
        assert_eq!(state.get("output"), Some(&json!("text")));
    }

    #[test]
    fn test_set_path_rejects_empty_segments() {
        let mut state = ExecutionState::new();
        assert_eq!(state.set_path("a..b", 1), Err(StateError::EmptyPath));
        assert_eq!(state.set_path("", 1), Err(StateError::EmptyPath));
    }

    #[test]
    fn test_completed_flag() {
        let mut state = ExecutionState::new();
        assert!(!state.is_completed());

        state.set(COMPLETED_KEY, "yes");
        assert!(!state.is_completed());

        state.mark_completed();
        assert!(state.is_completed());
    }

    #[test]
    fn test_clone_is_deep() {
        let mut state = ExecutionState::from_value(json!({"nested": {"n": 1}})).unwrap();
        let snapshot = state.clone();

        state.set_path("nested.n", 2).unwrap();

        assert_eq!(snapshot.get_path("nested.n"), Some(&json!(1)));
        assert_eq!(state.get_path("nested.n"), Some(&json!(2)));
    }
}
