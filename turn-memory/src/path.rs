//! Dotted path parsing and JSON tree edits.

use serde_json::{Map, Value};

use crate::error::{MemoryError, MemoryResult};

/// Scope for values that live only for the current turn.
pub const TEMP_SCOPE: &str = "temp";
/// Scope for values that persist for the conversation.
pub const CONVERSATION_SCOPE: &str = "conversation";
/// Scope for values that persist for the user.
pub const USER_SCOPE: &str = "user";

/// Splits a dotted path into segments, defaulting single names to the temp scope.
pub(crate) fn segments(path: &str) -> MemoryResult<Vec<String>> {
    let trimmed = path.trim();
    let invalid = || MemoryError::InvalidPath {
        path: path.to_owned(),
    };
    if trimmed.is_empty() {
        return Err(invalid());
    }

    let parts: Vec<String> = trimmed.split('.').map(str::to_owned).collect();
    if parts.iter().any(|part| part.trim().is_empty()) {
        return Err(invalid());
    }

    if parts.len() == 1 {
        return Ok(vec![TEMP_SCOPE.to_owned(), parts[0].clone()]);
    }
    Ok(parts)
}

pub(crate) fn lookup<'a>(root: &'a Map<String, Value>, segments: &[String]) -> Option<&'a Value> {
    let (first, rest) = segments.split_first()?;
    let mut current = root.get(first)?;
    for segment in rest {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

pub(crate) fn lookup_value<'a>(root: &'a Value, segments: &[String]) -> Option<&'a Value> {
    if segments.is_empty() {
        return Some(root);
    }
    lookup(root.as_object()?, segments)
}

pub(crate) fn insert(
    root: &mut Map<String, Value>,
    segments: &[String],
    value: Value,
) -> MemoryResult<()> {
    let Some((last, parents)) = segments.split_last() else {
        return Ok(());
    };

    let mut current = root;
    for (depth, segment) in parents.iter().enumerate() {
        let entry = current
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        current = entry
            .as_object_mut()
            .ok_or_else(|| MemoryError::NotAnObject {
                path: segments[..=depth].join("."),
            })?;
    }
    current.insert(last.clone(), value);
    Ok(())
}

pub(crate) fn insert_value(
    root: &mut Value,
    segments: &[String],
    value: Value,
) -> MemoryResult<()> {
    if segments.is_empty() {
        *root = value;
        return Ok(());
    }
    match root.as_object_mut() {
        Some(map) => insert(map, segments, value),
        None => Err(MemoryError::NotAnObject {
            path: String::new(),
        }),
    }
}

/// Writes `value` at `segments` below `root`, replacing any node on the way
/// that is not an object. Returns whether such a node was replaced.
pub(crate) fn overwrite_value(root: &mut Value, segments: &[String], value: Value) -> bool {
    let mut replaced = false;
    let mut current = root;
    for segment in segments {
        if !current.is_object() {
            *current = Value::Object(Map::new());
            replaced = true;
        }
        let Value::Object(map) = current else {
            return replaced;
        };
        current = map
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    *current = value;
    replaced
}

pub(crate) fn remove(root: &mut Map<String, Value>, segments: &[String]) {
    let Some((last, parents)) = segments.split_last() else {
        return;
    };

    let mut current = root;
    for segment in parents {
        match current.get_mut(segment).and_then(Value::as_object_mut) {
            Some(next) => current = next,
            None => return,
        }
    }
    current.remove(last);
}

pub(crate) fn remove_value(root: &mut Value, segments: &[String]) {
    if let Some(map) = root.as_object_mut() {
        remove(map, segments);
    }
}
