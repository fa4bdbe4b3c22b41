//! Deep merge of configuration layers.
//!
//! Implements leaf-wise merging where higher precedence values override lower
//! precedence values. Arrays are replaced entirely, except profile `secure`
//! arrays which are unioned.

use serde_json::{Map, Value};

/// Deep merge two JSON values, with `overlay` taking precedence over `base`.
///
/// - Objects are merged recursively: keys in overlay override keys in base
/// - Arrays, strings, numbers, booleans and nulls are replaced entirely
/// - An explicit null in overlay is a present value and wins
///
/// # Example
/// ```
/// use serde_json::json;
/// use teamcfg::config::deep_merge;
///
/// let base = json!({
///     "properties": { "host": "lpar1", "port": 443 },
///     "secure": ["password"]
/// });
/// let overlay = json!({
///     "properties": { "port": 1443 },
/// });
/// let result = deep_merge(base, overlay);
/// assert_eq!(result["properties"]["host"], "lpar1");
/// assert_eq!(result["properties"]["port"], 1443);
/// ```
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(slot) => {
                        let base_value = std::mem::take(slot);
                        *slot = deep_merge(base_value, overlay_value);
                    }
                    None => {
                        base_map.insert(key, overlay_value);
                    }
                }
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Merge two `profiles` maps, `overlay` winning leaf by leaf.
pub fn merge_profile_maps(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (name, overlay_profile) in overlay_map {
                match base_map.get_mut(&name) {
                    Some(slot) => {
                        let base_profile = std::mem::take(slot);
                        *slot = merge_profile(base_profile, overlay_profile);
                    }
                    None => {
                        base_map.insert(name, overlay_profile);
                    }
                }
            }
            Value::Object(base_map)
        }
        (base, Value::Null) => base,
        (_, overlay) => overlay,
    }
}

fn merge_profile(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(slot) => {
                        let base_value = std::mem::take(slot);
                        *slot = match key.as_str() {
                            "secure" => union_arrays(base_value, overlay_value),
                            "profiles" => merge_profile_maps(base_value, overlay_value),
                            _ => deep_merge(base_value, overlay_value),
                        };
                    }
                    None => {
                        base_map.insert(key, overlay_value);
                    }
                }
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Union two arrays keeping first-seen order (overlay entries first).
fn union_arrays(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Array(base_items), Value::Array(mut items)) => {
            for item in base_items {
                if !items.contains(&item) {
                    items.push(item);
                }
            }
            Value::Array(items)
        }
        (_, overlay) => overlay,
    }
}

/// Merge whole layer documents given highest precedence first.
///
/// - `profiles` merge leaf-wise across every layer
/// - `defaults` keep the first (highest) layer's entry per type
/// - `autoStore` takes the first non-null value
/// - `plugins` are unioned
/// - `$schema` is per-layer and never merged
/// - any other key deep-merges by precedence
pub fn merge_layers(layers: Vec<Value>) -> Value {
    let mut defaults = Map::new();
    let mut auto_store = Value::Null;
    let mut plugins: Vec<Value> = Vec::new();

    for layer in &layers {
        if let Some(Value::Object(layer_defaults)) = layer.get("defaults") {
            for (kind, name) in layer_defaults {
                if !defaults.contains_key(kind) {
                    defaults.insert(kind.clone(), name.clone());
                }
            }
        }
        if auto_store.is_null()
            && let Some(value) = layer.get("autoStore")
        {
            auto_store = value.clone();
        }
        if let Some(Value::Array(items)) = layer.get("plugins") {
            for item in items {
                if !plugins.contains(item) {
                    plugins.push(item.clone());
                }
            }
        }
    }

    let mut profiles = Value::Object(Map::new());
    let mut rest = Value::Object(Map::new());
    for layer in layers.into_iter().rev() {
        let Value::Object(mut map) = layer else {
            continue;
        };
        if let Some(layer_profiles) = map.shift_remove("profiles") {
            profiles = merge_profile_maps(profiles, layer_profiles);
        }
        for key in ["$schema", "defaults", "autoStore", "plugins"] {
            map.shift_remove(key);
        }
        rest = deep_merge(rest, Value::Object(map));
    }

    let mut merged = Map::new();
    merged.insert("profiles".to_string(), profiles);
    merged.insert("defaults".to_string(), Value::Object(defaults));
    if !auto_store.is_null() {
        merged.insert("autoStore".to_string(), auto_store);
    }
    if !plugins.is_empty() {
        merged.insert("plugins".to_string(), Value::Array(plugins));
    }
    if let Value::Object(rest) = rest {
        for (key, value) in rest {
            merged.insert(key, value);
        }
    }
    Value::Object(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_simple_objects() {
        let base = json!({"a": 1, "b": 2});
        let overlay = json!({"b": 3, "c": 4});
        let result = deep_merge(base, overlay);
        assert_eq!(result, json!({"a": 1, "b": 3, "c": 4}));
    }

    #[test]
    fn test_arrays_replaced_not_merged() {
        let base = json!({"items": [1, 2, 3]});
        let overlay = json!({"items": [4, 5]});
        let result = deep_merge(base, overlay);
        assert_eq!(result, json!({"items": [4, 5]}));
    }

    #[test]
    fn test_null_overrides_base() {
        let base = json!({"a": 1, "b": {"c": 2}});
        let overlay = json!({"a": null});
        let result = deep_merge(base, overlay);
        assert_eq!(result, json!({"a": null, "b": {"c": 2}}));
    }

    #[test]
    fn test_profile_secure_arrays_union() {
        let base = json!({"base": {"type": "base", "secure": ["user"], "properties": {"host": "g"}}});
        let overlay = json!({"base": {"secure": ["password"], "properties": {"port": 1}}});
        let result = merge_profile_maps(base, overlay);
        assert_eq!(result["base"]["secure"], json!(["password", "user"]));
        assert_eq!(result["base"]["properties"], json!({"host": "g", "port": 1}));
        assert_eq!(result["base"]["type"], json!("base"));
    }

    #[test]
    fn test_property_named_secure_is_plain_value() {
        let base = json!({"p": {"properties": {"secure": [1]}}});
        let overlay = json!({"p": {"properties": {"secure": [2]}}});
        let result = merge_profile_maps(base, overlay);
        assert_eq!(result["p"]["properties"]["secure"], json!([2]));
    }

    #[test]
    fn test_merge_layers_precedence() {
        let project_user = json!({"profiles": {"base": {"properties": {"host": "pu"}}}});
        let project = json!({"profiles": {"base": {"properties": {"host": "p", "port": 1}}}, "defaults": {"base": "base"}});
        let global_user = json!({"profiles": {"base": {"properties": {"user": "gu"}}}, "autoStore": false});
        let global = json!({
            "profiles": {"base": {"type": "base", "properties": {"host": "g"}}, "zos": {"type": "zos"}},
            "defaults": {"base": "other", "zos": "zos"},
            "autoStore": true
        });

        let merged = merge_layers(vec![project_user, project, global_user, global]);
        assert_eq!(merged["profiles"]["base"]["properties"]["host"], json!("pu"));
        assert_eq!(merged["profiles"]["base"]["properties"]["port"], json!(1));
        assert_eq!(merged["profiles"]["base"]["properties"]["user"], json!("gu"));
        assert_eq!(merged["profiles"]["base"]["type"], json!("base"));
        assert!(merged["profiles"]["zos"].is_object());
        assert_eq!(merged["defaults"], json!({"base": "base", "zos": "zos"}));
        assert_eq!(merged["autoStore"], json!(false));
    }

    #[test]
    fn test_merge_layers_skips_schema_and_unions_plugins() {
        let high = json!({"$schema": "./a.json", "plugins": ["x"]});
        let low = json!({"$schema": "./b.json", "plugins": ["y", "x"], "extra": {"k": 1}});
        let merged = merge_layers(vec![high, low]);
        assert!(merged.get("$schema").is_none());
        assert_eq!(merged["plugins"], json!(["x", "y"]));
        assert_eq!(merged["extra"], json!({"k": 1}));
    }
}
