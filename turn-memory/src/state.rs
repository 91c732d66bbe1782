//! Memory trait and the default turn state store.

use std::sync::RwLock;

use serde_json::{Map, Value};
use tracing::trace;

use crate::error::MemoryResult;
use crate::fork::MemoryFork;
use crate::path;

/// Dotted-path access to turn-scoped JSON state.
///
/// Implementations use interior mutability: a render pass holds a shared
/// reference while template functions write through it in declaration order.
pub trait Memory: Send + Sync {
    /// Returns a copy of the value at `path`, if present.
    fn get_value(&self, path: &str) -> Option<Value>;

    /// Writes `value` at `path`, creating intermediate objects.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError`](crate::MemoryError) when the path is malformed or
    /// crosses a non-object value.
    fn set_value(&self, path: &str, value: Value) -> MemoryResult<()>;

    /// Removes the value at `path`; missing values are not an error.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::InvalidPath`](crate::MemoryError::InvalidPath) for
    /// malformed paths.
    fn delete_value(&self, path: &str) -> MemoryResult<()>;

    /// Returns `true` when a value exists at `path`.
    fn has_value(&self, path: &str) -> bool {
        self.get_value(path).is_some()
    }
}

/// In-process memory for a single turn, organised into scopes.
#[derive(Debug, Default)]
pub struct TurnState {
    inner: RwLock<Map<String, Value>>,
}

impl TurnState {
    /// Creates empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates state from previously persisted scopes.
    #[must_use]
    pub fn from_map(scopes: Map<String, Value>) -> Self {
        Self {
            inner: RwLock::new(scopes),
        }
    }

    /// Returns a copy of every scope, suitable for persistence between turns.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn snapshot(&self) -> Map<String, Value> {
        self.inner.read().expect("turn state poisoned").clone()
    }

    /// Removes every value from the `temp` scope.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn clear_temp(&self) {
        self.inner
            .write()
            .expect("turn state poisoned")
            .remove(path::TEMP_SCOPE);
    }

    /// Returns an overlay whose writes never reach this state.
    #[must_use]
    pub fn fork(&self) -> MemoryFork<'_> {
        MemoryFork::new(self)
    }
}

impl Memory for TurnState {
    fn get_value(&self, path: &str) -> Option<Value> {
        let segments = path::segments(path).ok()?;
        let inner = self.inner.read().expect("turn state poisoned");
        path::lookup(&inner, &segments).cloned()
    }

    fn set_value(&self, path: &str, value: Value) -> MemoryResult<()> {
        let segments = path::segments(path)?;
        trace!(path, "memory write");
        let mut inner = self.inner.write().expect("turn state poisoned");
        path::insert(&mut inner, &segments, value)
    }

    fn delete_value(&self, path: &str) -> MemoryResult<()> {
        let segments = path::segments(path)?;
        let mut inner = self.inner.write().expect("turn state poisoned");
        path::remove(&mut inner, &segments);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::MemoryError;

    #[test]
    fn reads_and_writes_dotted_paths() {
        let state = TurnState::new();
        state
            .set_value("conversation.profile.name", json!("Ada"))
            .unwrap();
        state.set_value("input", json!("hello")).unwrap();

        assert_eq!(
            state.get_value("conversation.profile.name"),
            Some(json!("Ada"))
        );
        assert_eq!(state.get_value("temp.input"), Some(json!("hello")));
        assert!(state.has_value("conversation.profile"));
        assert!(!state.has_value("user.anything"));
    }

    #[test]
    fn delete_is_idempotent() {
        let state = TurnState::new();
        state.set_value("temp.value", json!(1)).unwrap();
        state.delete_value("temp.value").unwrap();
        state.delete_value("temp.value").unwrap();
        assert_eq!(state.get_value("temp.value"), None);
    }

    #[test]
    fn invalid_paths_error() {
        let state = TurnState::new();
        let err = state.set_value("a..b", json!(1)).expect_err("bad path");
        assert!(matches!(err, MemoryError::InvalidPath { .. }));
        assert_eq!(state.get_value(""), None);
    }

    #[test]
    fn clear_temp_keeps_other_scopes() {
        let state = TurnState::new();
        state.set_value("temp.input", json!("x")).unwrap();
        state.set_value("conversation.count", json!(2)).unwrap();
        state.clear_temp();

        let snapshot = state.snapshot();
        assert!(!snapshot.contains_key("temp"));
        assert_eq!(snapshot["conversation"]["count"], json!(2));
    }
}
