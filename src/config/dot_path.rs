//! Dot-separated addressing into JSON documents.
//!
//! `profiles.base.properties.host` walks object keys; a numeric segment
//! indexes into an array that already has that element.

use crate::error::{ConfigError, Result};
use serde_json::{Map, Value};

pub fn segments(path: &str) -> Vec<&str> {
    path.split('.').filter(|s| !s.is_empty()).collect()
}

pub fn get<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut node = root;
    for segment in segments(path) {
        node = match node {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(node)
}

pub fn get_mut<'a>(root: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    let mut node = root;
    for segment in segments(path) {
        node = match node {
            Value::Object(map) => map.get_mut(segment)?,
            Value::Array(items) => items.get_mut(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(node)
}

pub fn contains(root: &Value, path: &str) -> bool {
    get(root, path).is_some()
}

/// Write `value` at `path`, creating intermediate objects as needed.
pub fn set(root: &mut Value, path: &str, value: Value) -> Result<()> {
    let parts = segments(path);
    let Some((last, parents)) = parts.split_last() else {
        return Err(ConfigError::invalid_path(path, "empty path"));
    };

    let mut node = root;
    for segment in parents {
        if node.is_null() {
            *node = Value::Object(Map::new());
        }
        node = match node {
            Value::Object(map) => map
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new())),
            Value::Array(items) => {
                let idx = segment
                    .parse::<usize>()
                    .ok()
                    .filter(|i| *i < items.len())
                    .ok_or_else(|| ConfigError::invalid_path(path, format!("no array element {segment}")))?;
                &mut items[idx]
            }
            _ => {
                return Err(ConfigError::invalid_path(
                    path,
                    format!("{segment} is inside a non-object value"),
                ));
            }
        };
    }

    if node.is_null() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => {
            map.insert(last.to_string(), value);
            Ok(())
        }
        Value::Array(items) => {
            let idx = last
                .parse::<usize>()
                .ok()
                .filter(|i| *i < items.len())
                .ok_or_else(|| ConfigError::invalid_path(path, format!("no array element {last}")))?;
            items[idx] = value;
            Ok(())
        }
        _ => Err(ConfigError::invalid_path(
            path,
            format!("cannot set {last} on a non-object value"),
        )),
    }
}

/// Remove the node at `path`, returning it. Key order of the parent is kept.
pub fn remove(root: &mut Value, path: &str) -> Option<Value> {
    let parts = segments(path);
    let (last, parents) = parts.split_last()?;
    let parent_path = parents.join(".");
    match get_mut(root, &parent_path)? {
        Value::Object(map) => map.shift_remove(*last),
        Value::Array(items) => {
            let idx = last.parse::<usize>().ok().filter(|i| *i < items.len())?;
            Some(items.remove(idx))
        }
        _ => None,
    }
}

/// Append `key` to a dot-path prefix.
pub fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}
