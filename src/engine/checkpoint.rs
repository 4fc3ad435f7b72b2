//! In-memory checkpoints for rollback
//!
//! A checkpoint is captured after each step when checkpointing is enabled.
//! The store keeps the most recent checkpoints only; the oldest is evicted
//! first. Each checkpoint carries a content digest of its state so two
//! checkpoints can be compared without walking their values.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::program::options::DEFAULT_MAX_CHECKPOINTS;
use crate::program::state::ExecutionState;

/// Snapshot of a run at one point in its trace
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Checkpoint {
    pub timestamp: DateTime<Utc>,
    /// Cursor at capture time
    pub cursor: Option<String>,
    /// Deep copy of the state at capture time
    pub state: ExecutionState,
    /// Trace length at capture time
    pub trace_length: usize,
    /// SHA-256 of the canonical JSON form of `state`
    pub digest: String,
}

impl Checkpoint {
    pub fn capture(
        timestamp: DateTime<Utc>,
        cursor: Option<String>,
        state: &ExecutionState,
        trace_length: usize,
    ) -> Self {
        Self {
            timestamp,
            cursor,
            digest: state_digest(state),
            state: state.clone(),
            trace_length,
        }
    }
}

/// Bounded list of checkpoints, oldest first
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    entries: VecDeque<Checkpoint>,
    capacity: usize,
}

impl Default for CheckpointStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CHECKPOINTS)
    }
}

impl CheckpointStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Append a checkpoint, evicting the oldest ones past capacity
    pub fn push(&mut self, checkpoint: Checkpoint) {
        self.entries.push_back(checkpoint);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Checkpoint at `index`. Non-negative indices count from the oldest
    /// retained checkpoint, negative ones from the latest (`-1` is the latest).
    pub fn get(&self, index: isize) -> Option<&Checkpoint> {
        let position = if index < 0 {
            self.entries.len().checked_sub(index.unsigned_abs())?
        } else {
            index as usize
        };
        self.entries.get(position)
    }

    pub fn latest(&self) -> Option<&Checkpoint> {
        self.entries.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Checkpoint> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Hex SHA-256 of the canonical JSON form of a state
pub fn state_digest(state: &ExecutionState) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_json(&state.to_value()).as_bytes());
    hex::encode(hasher.finalize())
}

/// JSON with object keys sorted at every level
fn canonical_json(value: &Value) -> String {
    match value {
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", items.join(","))
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let items: Vec<String> = keys
                .into_iter()
                .map(|k| format!("{}:{}", Value::String(k.clone()), canonical_json(&map[k])))
                .collect();
            format!("{{{}}}", items.join(","))
        }
        scalar => scalar.to_string(),
    }
}
