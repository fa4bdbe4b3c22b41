use super::{JsonType, ProfileTypeDef, PropertyDef};
use crate::error::{ConfigError, Warning};
use serde_json::json;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Explicitly populated set of profile types, keyed by type name.
#[derive(Debug, Clone, Default)]
pub struct ProfileTypeRegistry {
    types: BTreeMap<String, ProfileTypeDef>,
}

impl ProfileTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in `base` type.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(base_profile());
        registry
    }

    /// Add or replace a type.
    pub fn register(&mut self, mut def: ProfileTypeDef) {
        for prop in def.schema.properties.values_mut() {
            prop.normalize();
        }
        debug!(profile_type = %def.name, "registered profile type");
        self.types.insert(def.name.clone(), def);
    }

    pub fn get(&self, name: &str) -> Option<&ProfileTypeDef> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Types sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = &ProfileTypeDef> {
        self.types.values()
    }

    pub fn names(&self) -> Vec<&str> {
        self.types.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn to_vec(&self) -> Vec<ProfileTypeDef> {
        self.types.values().cloned().collect()
    }

    /// Register every `*.json` type definition in `dir`.
    ///
    /// A missing directory is fine; unreadable files are reported.
    pub fn load_dir(&mut self, dir: &Path) -> Vec<Warning> {
        let mut warnings = Vec::new();
        let Ok(entries) = fs::read_dir(dir) else {
            return warnings;
        };

        let mut files: Vec<_> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        files.sort();

        for path in files {
            let parsed = fs::read_to_string(&path)
                .map_err(|e| ConfigError::io("read", &path, e))
                .and_then(|raw| {
                    serde_json::from_str::<ProfileTypeDef>(&raw)
                        .map_err(|e| ConfigError::malformed(path.display().to_string(), raw.clone(), e))
                });
            match parsed {
                Ok(def) => self.register(def),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping profile type definition");
                    warnings.push(Warning::from(e).with_location(path.display().to_string()));
                }
            }
        }
        warnings
    }
}

fn base_profile() -> ProfileTypeDef {
    let mut def = ProfileTypeDef::new("base", "Base Profile")
        .property(
            "host",
            PropertyDef::new(JsonType::String)
                .describe("Host name of the service on the mainframe.")
                .in_template(),
        )
        .property(
            "port",
            PropertyDef::new(JsonType::Number).describe("Port number of the service on the mainframe."),
        )
        .property(
            "user",
            PropertyDef::new(JsonType::String)
                .describe("User name to authenticate to the service on the mainframe.")
                .secure()
                .in_template(),
        )
        .property(
            "password",
            PropertyDef::new(JsonType::String)
                .describe("Password to authenticate to the service on the mainframe.")
                .secure()
                .in_template(),
        )
        .property(
            "rejectUnauthorized",
            PropertyDef::new(JsonType::Boolean)
                .describe("Reject self-signed certificates.")
                .with_default(json!(true))
                .in_template(),
        )
        .property(
            "tokenType",
            PropertyDef::new(JsonType::String)
                .describe("The type of token to get and use for the API."),
        )
        .property(
            "tokenValue",
            PropertyDef::new(JsonType::String)
                .describe("The value of the token to pass to the API.")
                .secure(),
        )
        .property(
            "certFile",
            PropertyDef::new(JsonType::String)
                .describe("The file path to a certificate file to use for authentication"),
        )
        .property(
            "certKeyFile",
            PropertyDef::new(JsonType::String)
                .describe("The file path to a certificate key file to use for authentication"),
        );
    def.schema.description =
        Some("Base profile that stores values shared by multiple service profiles".to_string());
    def
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_builtin_base() {
        let registry = ProfileTypeRegistry::with_builtin();
        let base = registry.get("base").unwrap();
        assert_eq!(base.secure_properties(), vec!["password", "tokenValue", "user"]);
        assert_eq!(registry.names(), vec!["base"]);
    }

    #[test]
    fn test_load_dir_registers_and_reports() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("zosmf.json"),
            r#"{"type": "zosmf", "schema": {"title": "z/OSMF", "properties": {"host": {"type": "string"}, "password": {"type": "string", "secure": true}}}}"#,
        )
        .unwrap();
        fs::write(temp.path().join("broken.json"), "{ not json").unwrap();
        fs::write(temp.path().join("notes.txt"), "ignored").unwrap();

        let mut registry = ProfileTypeRegistry::with_builtin();
        let warnings = registry.load_dir(temp.path());

        assert_eq!(registry.names(), vec!["base", "zosmf"]);
        assert_eq!(registry.get("zosmf").unwrap().secure_properties(), vec!["password"]);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, crate::error::ErrorKind::Malformed);
    }

    #[test]
    fn test_load_missing_dir_is_empty() {
        let mut registry = ProfileTypeRegistry::new();
        assert!(registry.load_dir(Path::new("/definitely/not/here")).is_empty());
        assert!(registry.is_empty());
    }
}
