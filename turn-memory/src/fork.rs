//! Copy-on-write overlay over another memory.

use std::collections::BTreeMap;
use std::sync::RwLock;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{MemoryError, MemoryResult};
use crate::path;
use crate::state::Memory;

/// Overlay that reads through to a parent memory and keeps writes local.
///
/// Repair attempts render against a fork so that scratch history never leaks
/// into the caller's state. Overlay entries are keyed by normalised path; a
/// `None` entry is a tombstone hiding the parent value. No key is ever a
/// segment prefix of another key.
pub struct MemoryFork<'a> {
    parent: &'a dyn Memory,
    overlay: RwLock<BTreeMap<String, Option<Value>>>,
}

impl std::fmt::Debug for MemoryFork<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let overlay = self.overlay.read().expect("memory fork poisoned");
        f.debug_struct("MemoryFork")
            .field("overlay", &*overlay)
            .finish_non_exhaustive()
    }
}

impl<'a> MemoryFork<'a> {
    /// Creates an empty overlay on top of `parent`.
    #[must_use]
    pub fn new(parent: &'a dyn Memory) -> Self {
        Self {
            parent,
            overlay: RwLock::new(BTreeMap::new()),
        }
    }

    /// Returns the paths written or deleted through this fork.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn touched_paths(&self) -> Vec<String> {
        self.overlay
            .read()
            .expect("memory fork poisoned")
            .keys()
            .cloned()
            .collect()
    }

    fn ancestor_or_self(
        overlay: &BTreeMap<String, Option<Value>>,
        segments: &[String],
    ) -> Option<(usize, String)> {
        (1..=segments.len())
            .map(|depth| (depth, segments[..depth].join(".")))
            .find(|(_, key)| overlay.contains_key(key))
    }

    fn remove_descendants(overlay: &mut BTreeMap<String, Option<Value>>, key: &str) {
        let prefix = format!("{key}.");
        overlay.retain(|existing, _| !existing.starts_with(&prefix));
    }

    fn ensure_parents_are_objects(&self, segments: &[String]) -> MemoryResult<()> {
        for depth in 1..segments.len() {
            let prefix = segments[..depth].join(".");
            if self
                .get_value(&prefix)
                .is_some_and(|value| !value.is_object())
            {
                return Err(MemoryError::NotAnObject { path: prefix });
            }
        }
        Ok(())
    }
}

impl Memory for MemoryFork<'_> {
    fn get_value(&self, path: &str) -> Option<Value> {
        let segments = path::segments(path).ok()?;
        let overlay = self.overlay.read().expect("memory fork poisoned");

        if let Some((depth, key)) = Self::ancestor_or_self(&overlay, &segments) {
            let entry = overlay.get(&key)?.as_ref()?;
            return path::lookup_value(entry, &segments[depth..]).cloned();
        }

        let full = segments.join(".");
        let prefix = format!("{full}.");
        let mut base = self.parent.get_value(&full);
        for (key, entry) in overlay.range(prefix.clone()..) {
            if !key.starts_with(&prefix) {
                break;
            }
            let relative: Vec<String> = key[prefix.len()..]
                .split('.')
                .map(str::to_owned)
                .collect();
            match entry {
                Some(value) => {
                    let root = base.get_or_insert_with(|| Value::Object(Map::new()));
                    if path::overwrite_value(root, &relative, value.clone()) {
                        debug!(path = %key, "fork write shadows a parent scalar");
                    }
                }
                None => {
                    if let Some(root) = base.as_mut() {
                        path::remove_value(root, &relative);
                    }
                }
            }
        }
        base
    }

    fn set_value(&self, path: &str, value: Value) -> MemoryResult<()> {
        let segments = path::segments(path)?;
        self.ensure_parents_are_objects(&segments)?;

        let mut overlay = self.overlay.write().expect("memory fork poisoned");
        let full = segments.join(".");
        match Self::ancestor_or_self(&overlay, &segments) {
            Some((depth, key)) if depth < segments.len() => {
                let rest = &segments[depth..];
                match overlay.get_mut(&key) {
                    Some(Some(existing)) => path::insert_value(existing, rest, value),
                    _ => {
                        let mut created = Value::Object(Map::new());
                        path::insert_value(&mut created, rest, value)?;
                        overlay.insert(key, Some(created));
                        Ok(())
                    }
                }
            }
            _ => {
                Self::remove_descendants(&mut overlay, &full);
                overlay.insert(full, Some(value));
                Ok(())
            }
        }
    }

    fn delete_value(&self, path: &str) -> MemoryResult<()> {
        let segments = path::segments(path)?;
        let mut overlay = self.overlay.write().expect("memory fork poisoned");
        let full = segments.join(".");
        match Self::ancestor_or_self(&overlay, &segments) {
            Some((depth, key)) if depth < segments.len() => {
                if let Some(Some(existing)) = overlay.get_mut(&key) {
                    path::remove_value(existing, &segments[depth..]);
                }
            }
            _ => {
                Self::remove_descendants(&mut overlay, &full);
                overlay.insert(full, None);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::{Memory, MemoryError, TurnState};

    fn seeded() -> TurnState {
        let state = TurnState::new();
        state
            .set_value("conversation.history", json!(["hi"]))
            .unwrap();
        state
            .set_value("conversation.profile", json!({"name": "Ada", "age": 36}))
            .unwrap();
        state
    }

    #[test]
    fn reads_fall_through_to_parent() {
        let state = seeded();
        let fork = state.fork();
        assert_eq!(
            fork.get_value("conversation.profile.name"),
            Some(json!("Ada"))
        );
        assert!(fork.touched_paths().is_empty());
    }

    #[test]
    fn writes_stay_in_the_fork() {
        let state = seeded();
        let fork = state.fork();
        fork.set_value("conversation.history", json!(["hi", "there"]))
            .unwrap();
        fork.set_value("conversation.history-repair", json!([]))
            .unwrap();

        assert_eq!(
            fork.get_value("conversation.history"),
            Some(json!(["hi", "there"]))
        );
        assert_eq!(state.get_value("conversation.history"), Some(json!(["hi"])));
        assert_eq!(state.get_value("conversation.history-repair"), None);
    }

    #[test]
    fn nested_writes_merge_into_parent_objects() {
        let state = seeded();
        let fork = state.fork();
        fork.set_value("conversation.profile.name", json!("Grace"))
            .unwrap();

        assert_eq!(
            fork.get_value("conversation.profile"),
            Some(json!({"name": "Grace", "age": 36}))
        );
        assert_eq!(
            state.get_value("conversation.profile.name"),
            Some(json!("Ada"))
        );
    }

    #[test]
    fn writes_below_an_overlay_entry_edit_it() {
        let state = TurnState::new();
        let fork = state.fork();
        fork.set_value("temp.scratch", json!({})).unwrap();
        fork.set_value("temp.scratch.count", json!(3)).unwrap();
        assert_eq!(fork.get_value("temp.scratch"), Some(json!({"count": 3})));
        assert_eq!(fork.touched_paths(), ["temp.scratch"]);
    }

    #[test]
    fn deletes_hide_parent_values() {
        let state = seeded();
        let fork = state.fork();
        fork.delete_value("conversation.profile.age").unwrap();
        assert_eq!(
            fork.get_value("conversation.profile"),
            Some(json!({"name": "Ada"}))
        );

        fork.delete_value("conversation.profile").unwrap();
        assert_eq!(fork.get_value("conversation.profile.name"), None);
        assert!(state.has_value("conversation.profile.age"));
    }

    #[test]
    fn rejects_writes_through_scalars() {
        let state = seeded();
        let fork = state.fork();
        let err = fork
            .set_value("conversation.history.first", json!(1))
            .expect_err("array parent");
        assert!(matches!(err, MemoryError::NotAnObject { .. }));
    }

    #[test]
    fn fork_writes_shadow_parent_scalars_written_later() {
        let state = seeded();
        let fork = state.fork();
        fork.set_value("conversation.settings.theme.color", json!("blue"))
            .unwrap();
        state
            .set_value("conversation.settings", json!("dark"))
            .unwrap();

        assert_eq!(
            fork.get_value("conversation.settings"),
            Some(json!({"theme": {"color": "blue"}}))
        );
        assert_eq!(
            fork.get_value("conversation.settings.theme.color"),
            Some(json!("blue"))
        );
        assert_eq!(
            fork.get_value("conversation").unwrap()["settings"],
            json!({"theme": {"color": "blue"}})
        );
        assert_eq!(state.get_value("conversation.settings"), Some(json!("dark")));
    }

    #[test]
    fn forks_can_be_stacked() {
        let state = seeded();
        let outer = state.fork();
        outer.set_value("temp.input", json!("outer")).unwrap();
        let inner = crate::MemoryFork::new(&outer);
        inner.set_value("temp.input", json!("inner")).unwrap();

        assert_eq!(inner.get_value("input"), Some(json!("inner")));
        assert_eq!(outer.get_value("input"), Some(json!("outer")));
        assert_eq!(state.get_value("input"), None);
    }
}
