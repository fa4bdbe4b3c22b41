//! Profile addressing and lookups over the merged view.

use super::document::SecretView;
use super::layers::LayerStack;
use super::paths::Layer;
use super::dot_path;
use crate::error::{ConfigError, Result};
use serde_json::{Map, Number, Value};

/// Dot-path of a (possibly nested) profile: `a.b` -> `profiles.a.profiles.b`.
pub fn profile_path(name: &str) -> String {
    dot_path::segments(name)
        .into_iter()
        .map(|segment| format!("profiles.{segment}"))
        .collect::<Vec<_>>()
        .join(".")
}

/// Interpret command-line text: booleans and numbers are typed, the rest stays a string.
pub fn coerce_value(text: &str) -> Value {
    match text {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(int) = text.parse::<i64>() {
        return Value::Number(int.into());
    }
    if let Some(number) = text
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .and_then(Number::from_f64)
    {
        return Value::Number(number);
    }
    Value::String(text.to_string())
}

/// Flattened dotted names of every profile under a `profiles` object.
pub fn profile_names(profiles: &Value) -> Vec<String> {
    let mut names = Vec::new();
    collect_names(profiles, "", &mut names);
    names
}

fn collect_names(profiles: &Value, prefix: &str, out: &mut Vec<String>) {
    let Some(map) = profiles.as_object() else {
        return;
    };
    for (name, profile) in map {
        let full = dot_path::join(prefix, name);
        out.push(full.clone());
        if let Some(nested) = profile.get("profiles") {
            collect_names(nested, &full, out);
        }
    }
}

impl LayerStack {
    pub fn profile_exists(&self, name: &str) -> bool {
        dot_path::contains(&self.merged(SecretView::Omit, false), &profile_path(name))
    }

    /// Default profile name for a type, from the merged `defaults`.
    pub fn default_profile_name(&self, kind: &str) -> Option<String> {
        self.merged(SecretView::Omit, false)
            .get("defaults")
            .and_then(|d| d.get(kind))
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    /// Merged properties of a profile, masked unless `secure_resolve`.
    pub fn profile(&self, name: &str, secure_resolve: bool) -> Option<Map<String, Value>> {
        let view = if secure_resolve {
            SecretView::Reveal
        } else {
            SecretView::Mask
        };
        let merged = self.merged(view, true);
        dot_path::get(&merged, &format!("{}.properties", profile_path(name)))
            .and_then(Value::as_object)
            .cloned()
    }

    pub fn profile_names(&self) -> Vec<String> {
        let merged = self.merged(SecretView::Omit, false);
        merged.get("profiles").map(profile_names).unwrap_or_default()
    }

    /// Highest-precedence existing layer that defines the profile.
    pub fn layer_holding_profile(&self, name: &str) -> Option<Layer> {
        let path = profile_path(name);
        Layer::ALL.into_iter().find(|layer| {
            let doc = self.layer(*layer);
            doc.exists() && dot_path::contains(doc.content(), &path)
        })
    }

    /// Rename or regroup a profile within one layer.
    pub fn move_profile(&mut self, layer: Layer, from: &str, to: &str) -> Result<()> {
        if !dot_path::contains(self.layer(layer).content(), &profile_path(from)) {
            return Err(ConfigError::not_found("profile", from));
        }
        if dot_path::contains(self.layer(layer).content(), &profile_path(to)) {
            return Err(ConfigError::invalid_path(
                &profile_path(to),
                format!("profile {to} already exists"),
            ));
        }
        self.layer_mut(layer)
            .move_node(&profile_path(from), &profile_path(to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_profile_path() {
        assert_eq!(profile_path("base"), "profiles.base");
        assert_eq!(profile_path("lpar1.zosmf"), "profiles.lpar1.profiles.zosmf");
    }

    #[test]
    fn test_coerce_value() {
        assert_eq!(coerce_value("true"), json!(true));
        assert_eq!(coerce_value("false"), json!(false));
        assert_eq!(coerce_value("443"), json!(443));
        assert_eq!(coerce_value("-2"), json!(-2));
        assert_eq!(coerce_value("1.5"), json!(1.5));
        assert_eq!(coerce_value("True"), json!("True"));
        assert_eq!(coerce_value("host.example.com"), json!("host.example.com"));
        assert_eq!(coerce_value(""), json!(""));
        assert_eq!(coerce_value("NaN"), json!("NaN"));
    }

    #[test]
    fn test_profile_names_flattened() {
        let profiles = json!({
            "lpar1": {"profiles": {"zosmf": {}, "tso": {}}},
            "base": {}
        });
        assert_eq!(
            profile_names(&profiles),
            vec!["lpar1", "lpar1.zosmf", "lpar1.tso", "base"]
        );
    }
}
