//! Non-fatal checks of a config document against profile type definitions.

use super::ProfileTypeDef;
use crate::config::{dot_path, env, profile_path};
use crate::error::Warning;
use serde_json::Value;

/// Check `config` against `types`. Never fails; every problem is a warning.
pub fn validate(config: &Value, types: &[ProfileTypeDef]) -> Vec<Warning> {
    let mut warnings = Vec::new();
    if let Some(profiles) = config.get("profiles") {
        check_profiles(profiles, "profiles", types, &mut warnings);
    }

    if let Some(defaults) = config.get("defaults").and_then(Value::as_object) {
        for (kind, name) in defaults {
            let location = format!("defaults.{kind}");
            let Some(name) = name.as_str() else {
                warnings.push(Warning::schema(location, "default profile name must be a string"));
                continue;
            };
            if !dot_path::contains(config, &profile_path(name)) {
                warnings.push(Warning::schema(
                    location,
                    format!("default {kind} profile \"{name}\" does not exist"),
                ));
            }
        }
    }

    if let Some(auto_store) = config.get("autoStore")
        && !auto_store.is_boolean()
    {
        warnings.push(Warning::schema("autoStore", "must be a boolean"));
    }
    warnings
}

fn check_profiles(profiles: &Value, prefix: &str, types: &[ProfileTypeDef], out: &mut Vec<Warning>) {
    let Some(map) = profiles.as_object() else {
        out.push(Warning::schema(prefix, "profiles must be an object"));
        return;
    };
    for (name, profile) in map {
        let location = format!("{prefix}.{name}");
        if name.chars().any(char::is_whitespace) {
            out.push(Warning::schema(&location, "profile names cannot contain whitespace"));
        }
        check_profile(profile, &location, types, out);
        if let Some(nested) = profile.get("profiles") {
            check_profiles(nested, &format!("{location}.profiles"), types, out);
        }
    }
}

fn check_profile(profile: &Value, location: &str, types: &[ProfileTypeDef], out: &mut Vec<Warning>) {
    let properties = profile.get("properties").and_then(Value::as_object);
    let secure: Vec<&str> = profile
        .get("secure")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let kind = match profile.get("type") {
        Some(Value::String(kind)) => kind,
        Some(_) => {
            out.push(Warning::schema(location, "profile type must be a string"));
            return;
        }
        None => {
            // Grouping profiles only hold nested profiles.
            if properties.is_some_and(|p| !p.is_empty()) {
                out.push(Warning::schema(location, "Missing profile type"));
            }
            return;
        }
    };

    let Some(def) = types.iter().find(|t| &t.name == kind) else {
        out.push(Warning::schema(location, format!("unknown profile type \"{kind}\"")));
        return;
    };

    if let Some(properties) = properties {
        for (prop, value) in properties {
            let Some(prop_def) = def.schema.properties.get(prop) else {
                continue;
            };
            // Environment indirections are typed by their resolved value.
            if env::env_reference(value).is_some() {
                continue;
            }
            let prop_location = format!("{location}.properties.{prop}");
            if !prop_def.accepts(value) {
                out.push(Warning::schema(
                    &prop_location,
                    format!("expected {} but found {}", prop_def.kind, type_name(value)),
                ));
            } else if let Some(allowed) = &prop_def.allowed
                && !allowed.contains(value)
            {
                out.push(Warning::schema(&prop_location, format!("{value} is not an allowed value")));
            }
        }
    }

    let securable = def.secure_properties();
    if !securable.is_empty() {
        for name in &secure {
            if !securable.contains(name) {
                out.push(Warning::schema(
                    format!("{location}.secure"),
                    format!("{name} is not a secure property of type {kind}"),
                ));
            }
        }
    }

    for required in &def.schema.required {
        let present = properties.is_some_and(|p| p.contains_key(required))
            || secure.contains(&required.as_str());
        if !present {
            out.push(Warning::schema(
                location,
                format!("missing required property {required}"),
            ));
        }
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
