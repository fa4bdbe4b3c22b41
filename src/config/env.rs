//! Environment-variable indirection.
//!
//! A stored string of the exact form `$NAME` reads as the value of the
//! environment variable `NAME` when that variable is set. The stored
//! representation is never rewritten.

use regex_lite::Regex;
use serde_json::Value;
use std::sync::OnceLock;

fn reference_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\$([A-Za-z_][A-Za-z0-9_]*)$").unwrap_or_else(|_| unreachable!("static pattern"))
    })
}

/// Variable name referenced by `value`, if it is an indirection.
pub fn env_reference(value: &Value) -> Option<&str> {
    let text = value.as_str()?;
    reference_pattern()
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Variable name referenced by `value` when that variable is currently set.
pub fn active_override(value: &Value) -> Option<String> {
    let name = env_reference(value)?;
    std::env::var_os(name).map(|_| name.to_string())
}

/// Resolve a single value. Unset variables leave the literal in place.
pub fn resolve(value: &Value) -> Value {
    match env_reference(value).and_then(|name| std::env::var(name).ok()) {
        Some(resolved) => Value::String(resolved),
        None => value.clone(),
    }
}

/// Resolve every indirection in a document tree in place.
pub fn resolve_tree(value: &mut Value) {
    match value {
        Value::String(text) => {
            let resolved = reference_pattern()
                .captures(text.as_str())
                .and_then(|c| c.get(1))
                .and_then(|m| std::env::var(m.as_str()).ok());
            if let Some(resolved) = resolved {
                *text = resolved;
            }
        }
        Value::Object(map) => map.values_mut().for_each(resolve_tree),
        Value::Array(items) => items.iter_mut().for_each(resolve_tree),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serial_test::serial;

    #[test]
    fn test_env_reference_shape() {
        assert_eq!(env_reference(&json!("$FOO")), Some("FOO"));
        assert_eq!(env_reference(&json!("$foo_1")), Some("foo_1"));
        assert_eq!(env_reference(&json!("prefix$FOO")), None);
        assert_eq!(env_reference(&json!("$FOO bar")), None);
        assert_eq!(env_reference(&json!("$1ABC")), None);
        assert_eq!(env_reference(&json!(42)), None);
    }

    #[test]
    #[serial]
    fn test_resolve_set_and_unset() {
        let stored = json!("$TEAMCFG_ENV_TEST_VAR");
        unsafe { std::env::set_var("TEAMCFG_ENV_TEST_VAR", "bar") };
        assert_eq!(resolve(&stored), json!("bar"));
        assert_eq!(active_override(&stored).as_deref(), Some("TEAMCFG_ENV_TEST_VAR"));

        unsafe { std::env::remove_var("TEAMCFG_ENV_TEST_VAR") };
        assert_eq!(resolve(&stored), json!("$TEAMCFG_ENV_TEST_VAR"));
        assert_eq!(active_override(&stored), None);
    }

    #[test]
    #[serial]
    fn test_resolve_tree_nested() {
        unsafe { std::env::set_var("TEAMCFG_ENV_TREE_VAR", "h.example.com") };
        let mut doc = json!({"a": {"host": "$TEAMCFG_ENV_TREE_VAR", "port": 1}, "list": ["$TEAMCFG_ENV_TREE_VAR"]});
        resolve_tree(&mut doc);
        assert_eq!(doc["a"]["host"], json!("h.example.com"));
        assert_eq!(doc["list"][0], json!("h.example.com"));
        unsafe { std::env::remove_var("TEAMCFG_ENV_TREE_VAR") };
    }
}
