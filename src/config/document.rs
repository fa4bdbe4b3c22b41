//! One configuration layer held in memory.
//!
//! The JSON content never carries secure values: those live in a side
//! table keyed by dot-path and only reach disk through the vault.

use super::dot_path;
use super::paths::{Layer, LayerLocation};
use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Placeholder shown in place of a secure value.
pub const SECURE_PLACEHOLDER: &str = "(secure value)";

const INDENT: &[u8] = b"    ";

/// How secure values appear in a document view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretView {
    /// Secure properties are absent, as on disk.
    Omit,
    /// Secure properties show the placeholder.
    Mask,
    /// Secure properties carry their values.
    Reveal,
}

/// Typed view of one profile entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secure: Vec<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub profiles: Map<String, Value>,
}

impl Profile {
    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}

/// Resolved `$schema` reference of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaInfo {
    pub original: String,
    /// Absolute file path for local schemas, the URL otherwise.
    pub resolved: String,
    pub local: bool,
}

#[derive(Debug, Clone)]
pub struct ConfigDocument {
    layer: Layer,
    path: Option<PathBuf>,
    exists: bool,
    content: Value,
    secrets: Map<String, Value>,
    dirty: bool,
}

impl ConfigDocument {
    pub fn empty(layer: Layer, path: Option<PathBuf>) -> Self {
        Self {
            layer,
            path,
            exists: false,
            content: empty_content(),
            secrets: Map::new(),
            dirty: false,
        }
    }

    /// Load a layer from disk. A missing file yields an empty document.
    pub fn load(location: &LayerLocation) -> Result<Self> {
        let Some(path) = location.path.as_ref().filter(|_| location.exists) else {
            return Ok(Self::empty(location.layer, location.path.clone()));
        };

        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::io("read", path, e))?;
        let content = parse_document(&path.display().to_string(), &raw)?;

        let mut doc = Self {
            layer: location.layer,
            path: Some(path.clone()),
            exists: true,
            content,
            secrets: Map::new(),
            dirty: false,
        };
        doc.ensure_sections();
        doc.detach_plaintext_secrets();
        debug!(layer = %doc.layer, path = %path.display(), "loaded config layer");
        Ok(doc)
    }

    pub fn layer(&self) -> Layer {
        self.layer
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Raw content as it would be written to disk.
    pub fn content(&self) -> &Value {
        &self.content
    }

    pub fn secrets(&self) -> &Map<String, Value> {
        &self.secrets
    }

    pub(crate) fn set_path(&mut self, path: PathBuf) {
        if self.path.as_ref() != Some(&path) {
            self.path = Some(path);
            self.exists = self.path.as_ref().is_some_and(|p| p.is_file());
        }
    }

    pub fn profiles(&self) -> Option<&Map<String, Value>> {
        self.content.get("profiles").and_then(Value::as_object)
    }

    pub fn defaults(&self) -> Option<&Map<String, Value>> {
        self.content.get("defaults").and_then(Value::as_object)
    }

    pub fn auto_store(&self) -> Option<bool> {
        self.content.get("autoStore").and_then(Value::as_bool)
    }

    /// True when the document holds no profiles, defaults or other settings.
    pub fn is_blank(&self) -> bool {
        let Some(map) = self.content.as_object() else {
            return true;
        };
        map.iter().all(|(key, value)| match key.as_str() {
            "$schema" => true,
            _ => value.as_object().is_some_and(Map::is_empty),
        })
    }

    pub fn schema_ref(&self) -> Option<&str> {
        self.content.get("$schema").and_then(Value::as_str)
    }

    /// Set `$schema`, inserting it as the first key when absent.
    pub fn set_schema_ref(&mut self, uri: &str) {
        let Value::Object(map) = &mut self.content else {
            return;
        };
        if let Some(existing) = map.get_mut("$schema") {
            *existing = Value::String(uri.to_string());
        } else {
            let mut reordered = Map::new();
            reordered.insert("$schema".to_string(), Value::String(uri.to_string()));
            reordered.extend(std::mem::take(map));
            *map = reordered;
        }
        self.dirty = true;
    }

    pub fn schema_info(&self) -> Option<SchemaInfo> {
        let original = self.schema_ref()?.to_string();
        let stripped = original.strip_prefix("file://").unwrap_or(&original);
        if is_url(stripped) {
            return Some(SchemaInfo {
                resolved: original.clone(),
                original,
                local: false,
            });
        }
        let base = self
            .path
            .as_ref()
            .and_then(|p| p.parent())
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let candidate = Path::new(stripped);
        let resolved = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            base.join(candidate)
        };
        Some(SchemaInfo {
            original,
            resolved: normalize(&resolved).display().to_string(),
            local: true,
        })
    }

    /// Every secure property dot-path declared in this document.
    pub fn secure_fields(&self) -> Vec<String> {
        match self.content.get("profiles") {
            Some(profiles) => find_secure(profiles, "profiles"),
            None => Vec::new(),
        }
    }

    pub fn is_secure(&self, path: &str) -> bool {
        match secure_info_for_prop(path) {
            Some((array_path, prop)) => dot_path::get(&self.content, &array_path)
                .and_then(Value::as_array)
                .is_some_and(|items| items.iter().any(|i| i.as_str() == Some(prop.as_str()))),
            None => false,
        }
    }

    /// Value stored at `path` in this layer, including secure values.
    pub fn stored_value(&self, path: &str) -> Option<&Value> {
        self.secrets
            .get(path)
            .or_else(|| dot_path::get(&self.content, path))
    }

    /// Write a value into this layer.
    ///
    /// `secure: Some(true)` routes it to the secret table and lists the
    /// property in the profile's `secure` array, `Some(false)` stores it
    /// in plaintext and unlists it, `None` keeps the current routing.
    pub fn set_value(&mut self, path: &str, value: Value, secure: Option<bool>) -> Result<()> {
        let snapshot = (self.content.clone(), self.secrets.clone());
        let result = self.apply_set(path, value, secure);
        if result.is_err() {
            (self.content, self.secrets) = snapshot;
        }
        result
    }

    fn apply_set(&mut self, path: &str, value: Value, secure: Option<bool>) -> Result<()> {
        let info = secure_info_for_prop(path);
        if secure == Some(true) && info.is_none() {
            return Err(ConfigError::invalid_path(
                path,
                "the secure option is only valid when setting a single profile property",
            ));
        }

        let route_secure = secure.unwrap_or_else(|| self.is_secure(path));
        if route_secure {
            dot_path::remove(&mut self.content, path);
            self.secrets.insert(path.to_string(), value);
            if let Some((array_path, prop)) = &info {
                self.list_secure(array_path, prop, path)?;
            }
            // Keep the parent properties object in place for the profile.
            if let Some(parent) = path.rsplit_once('.').map(|(p, _)| p)
                && dot_path::get(&self.content, parent).is_none()
            {
                dot_path::set(&mut self.content, parent, Value::Object(Map::new()))?;
            }
        } else {
            self.secrets.shift_remove(path);
            dot_path::set(&mut self.content, path, value)?;
            if secure == Some(false)
                && let Some((array_path, prop)) = &info
            {
                self.unlist_secure(array_path, prop);
            }
        }
        self.dirty = true;
        Ok(())
    }

    /// Remove a node. Secure properties are also unlisted.
    pub fn remove_value(&mut self, path: &str) -> bool {
        let removed_plain = dot_path::remove(&mut self.content, path).is_some();
        let removed_secret = self.secrets.shift_remove(path).is_some();

        // Secrets stored under a removed subtree go with it.
        let prefix = format!("{path}.");
        let nested: Vec<String> = self
            .secrets
            .keys()
            .filter(|k| k.starts_with(&prefix))
            .cloned()
            .collect();
        for key in &nested {
            self.secrets.shift_remove(key);
        }

        let mut unlisted = false;
        if let Some((array_path, prop)) = secure_info_for_prop(path) {
            unlisted = self.unlist_secure(&array_path, &prop);
        }

        let changed = removed_plain || removed_secret || unlisted || !nested.is_empty();
        if changed {
            self.dirty = true;
        }
        changed
    }

    /// Move the node at `from` to `to`, carrying secrets stored beneath it.
    /// Fails without changes when `to` already exists.
    pub fn move_node(&mut self, from: &str, to: &str) -> Result<()> {
        if dot_path::contains(&self.content, to) {
            return Err(ConfigError::invalid_path(to, "target already exists"));
        }
        let mut staged = self.content.clone();
        let Some(node) = dot_path::remove(&mut staged, from) else {
            return Err(ConfigError::not_found("profile", from));
        };
        dot_path::set(&mut staged, to, node)?;
        self.content = staged;

        let prefix = format!("{from}.");
        let moved: Vec<String> = self
            .secrets
            .keys()
            .filter(|k| k.starts_with(&prefix))
            .cloned()
            .collect();
        for key in moved {
            if let Some(value) = self.secrets.shift_remove(&key) {
                self.secrets
                    .insert(format!("{to}.{}", &key[prefix.len()..]), value);
            }
        }
        self.dirty = true;
        Ok(())
    }

    /// Merge another document's content into this one, the other winning.
    pub fn merge_content(&mut self, overlay: Value) {
        let base = std::mem::take(&mut self.content);
        self.content = super::merge::deep_merge(base, overlay);
        self.ensure_sections();
        self.detach_plaintext_secrets();
        self.dirty = true;
    }

    /// Replace the content wholesale, dropping secrets not re-supplied.
    pub fn replace_content(&mut self, content: Value) {
        self.content = content;
        self.secrets.clear();
        self.ensure_sections();
        self.detach_plaintext_secrets();
        self.dirty = true;
    }

    /// Load secret values fetched from the vault for this document.
    pub(crate) fn attach_secrets(&mut self, entries: &Map<String, Value>) {
        let fields = self.secure_fields();
        for (path, value) in entries {
            if fields.contains(path) && !self.secrets.contains_key(path) {
                self.secrets.insert(path.clone(), value.clone());
            }
        }
    }

    /// Secrets that are still declared secure and should be committed.
    pub fn committable_secrets(&self) -> Map<String, Value> {
        let fields = self.secure_fields();
        self.secrets
            .iter()
            .filter(|(path, _)| fields.contains(path))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Content with secure values omitted, masked or revealed.
    pub fn view(&self, mode: SecretView) -> Value {
        let mut view = self.content.clone();
        if mode == SecretView::Omit {
            return view;
        }
        for path in self.secure_fields() {
            let Some(secret) = self.secrets.get(&path) else {
                continue;
            };
            let value = match mode {
                SecretView::Mask => Value::String(SECURE_PLACEHOLDER.to_string()),
                _ => secret.clone(),
            };
            // A profile shape that cannot hold the property is left as is.
            let _ = dot_path::set(&mut view, &path, value);
        }
        view
    }

    pub fn to_json_string(&self) -> Result<String> {
        to_pretty_json(&self.content)
    }

    /// Write the content to disk atomically.
    pub fn save(&mut self) -> Result<()> {
        let Some(path) = self.path.clone() else {
            return Err(ConfigError::ambiguous(
                self.layer,
                "no config file was found and none was initialized",
            ));
        };
        let text = self.to_json_string()?;
        write_atomic(&path, text.as_bytes())?;
        self.exists = true;
        self.dirty = false;
        info!(layer = %self.layer, path = %path.display(), "saved config layer");
        Ok(())
    }

    fn ensure_sections(&mut self) {
        if !self.content.is_object() {
            self.content = empty_content();
        }
        if let Value::Object(map) = &mut self.content {
            for key in ["profiles", "defaults"] {
                if !map.get(key).is_some_and(Value::is_object) {
                    map.insert(key.to_string(), Value::Object(Map::new()));
                }
            }
        }
    }

    /// Move plaintext values of secure-listed properties into the secret table.
    fn detach_plaintext_secrets(&mut self) {
        for path in self.secure_fields() {
            if let Some(value) = dot_path::remove(&mut self.content, &path) {
                debug!(path = %path, "moved plaintext secure property out of file content");
                self.secrets.insert(path, value);
            }
        }
    }

    fn list_secure(&mut self, array_path: &str, prop: &str, full_path: &str) -> Result<()> {
        match dot_path::get_mut(&mut self.content, array_path) {
            Some(Value::Array(items)) => {
                if !items.iter().any(|i| i.as_str() == Some(prop)) {
                    items.push(Value::String(prop.to_string()));
                }
                Ok(())
            }
            Some(_) => Err(ConfigError::invalid_path(
                full_path,
                format!("{array_path} is not an array"),
            )),
            None => dot_path::set(
                &mut self.content,
                array_path,
                Value::Array(vec![Value::String(prop.to_string())]),
            ),
        }
    }

    fn unlist_secure(&mut self, array_path: &str, prop: &str) -> bool {
        if let Some(Value::Array(items)) = dot_path::get_mut(&mut self.content, array_path) {
            let before = items.len();
            items.retain(|i| i.as_str() != Some(prop));
            return items.len() != before;
        }
        false
    }
}

fn empty_content() -> Value {
    let mut map = Map::new();
    map.insert("profiles".to_string(), Value::Object(Map::new()));
    map.insert("defaults".to_string(), Value::Object(Map::new()));
    Value::Object(map)
}

/// Parse a config document, requiring a top-level object.
pub fn parse_document(source_name: &str, raw: &str) -> Result<Value> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| ConfigError::malformed(source_name, raw, e))?;
    if !value.is_object() {
        return Err(ConfigError::malformed(
            source_name,
            raw,
            "top-level value must be an object",
        ));
    }
    Ok(value)
}

/// Recursively list secure property paths under a `profiles` object.
pub fn find_secure(profiles: &Value, prefix: &str) -> Vec<String> {
    let mut found = Vec::new();
    let Some(map) = profiles.as_object() else {
        return found;
    };
    for (name, profile) in map {
        if let Some(Value::Array(secure)) = profile.get("secure") {
            for prop in secure.iter().filter_map(Value::as_str) {
                found.push(format!("{prefix}.{name}.properties.{prop}"));
            }
        }
        if let Some(nested) = profile.get("profiles") {
            found.extend(find_secure(nested, &format!("{prefix}.{name}.profiles")));
        }
    }
    found
}

/// For a profile property path, the dot-path of the owning `secure` array
/// and the entry naming the property.
///
/// `profiles.a.profiles.b.properties.password` -> (`profiles.a.profiles.b.secure`, `password`)
pub fn secure_info_for_prop(path: &str) -> Option<(String, String)> {
    let segs = dot_path::segments(path);
    let mut i = 0;
    while i + 2 < segs.len() && segs[i] == "profiles" {
        match segs[i + 2] {
            "properties" if segs.len() > i + 3 => {
                let array_path = format!("{}.secure", segs[..i + 2].join("."));
                let prop = segs[i + 3..].join(".");
                return Some((array_path, prop));
            }
            "profiles" => i += 2,
            _ => return None,
        }
    }
    None
}

pub fn to_pretty_json(value: &Value) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(INDENT);
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut ser)
        .map_err(|e| ConfigError::malformed("document", "", e))?;
    buf.push(b'\n');
    String::from_utf8(buf).map_err(|e| ConfigError::malformed("document", "", e))
}

/// Replace `path` with `bytes` via a sibling temp file and rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::io("create directory", &dir, e))?;

    let mut tmp = tempfile::NamedTempFile::new_in(&dir)
        .map_err(|e| ConfigError::io("create temp file in", &dir, e))?;
    tmp.write_all(bytes)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| ConfigError::io("write", tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| ConfigError::io("replace", path, e.error))?;
    Ok(())
}

pub fn is_url(text: &str) -> bool {
    text.starts_with("http://") || text.starts_with("https://")
}

fn normalize(path: &Path) -> PathBuf {
    use std::path::Component;
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn doc_with(content: Value) -> ConfigDocument {
        let mut doc = ConfigDocument::empty(Layer::Project, Some(PathBuf::from("/tmp/x.config.json")));
        doc.replace_content(content);
        doc
    }

    #[test]
    fn test_secure_info_for_prop() {
        assert_eq!(
            secure_info_for_prop("profiles.base.properties.password"),
            Some(("profiles.base.secure".into(), "password".into()))
        );
        assert_eq!(
            secure_info_for_prop("profiles.lpar.profiles.zosmf.properties.user"),
            Some(("profiles.lpar.profiles.zosmf.secure".into(), "user".into()))
        );
        assert_eq!(
            secure_info_for_prop("profiles.properties.properties.x"),
            Some(("profiles.properties.secure".into(), "x".into()))
        );
        assert_eq!(secure_info_for_prop("profiles.base.type"), None);
        assert_eq!(secure_info_for_prop("defaults.base"), None);
    }

    #[test]
    fn test_find_secure_recurses() {
        let profiles = json!({
            "lpar": {
                "secure": ["password"],
                "profiles": {"zosmf": {"secure": ["user"]}}
            },
            "base": {}
        });
        assert_eq!(
            find_secure(&profiles, "profiles"),
            vec![
                "profiles.lpar.properties.password",
                "profiles.lpar.profiles.zosmf.properties.user"
            ]
        );
    }

    #[test]
    fn test_set_secure_moves_value_out_of_content() {
        let mut doc = doc_with(json!({"profiles": {"base": {"type": "base", "properties": {"secret": "plain"}}}}));
        doc.set_value("profiles.base.properties.secret", json!("s3cr3t"), Some(true))
            .unwrap();

        assert!(dot_path::get(doc.content(), "profiles.base.properties.secret").is_none());
        assert_eq!(doc.content()["profiles"]["base"]["secure"], json!(["secret"]));
        assert_eq!(
            doc.stored_value("profiles.base.properties.secret"),
            Some(&json!("s3cr3t"))
        );
    }

    #[test]
    fn test_set_already_secure_stays_secure() {
        let mut doc = doc_with(json!({"profiles": {"base": {"properties": {}, "secure": ["password"]}}}));
        doc.set_value("profiles.base.properties.password", json!("pw"), None)
            .unwrap();
        assert!(doc.secrets().contains_key("profiles.base.properties.password"));
        assert!(dot_path::get(doc.content(), "profiles.base.properties.password").is_none());
    }

    #[test]
    fn test_set_insecure_unlists_and_stores_plaintext() {
        let mut doc = doc_with(json!({"profiles": {"base": {"properties": {}, "secure": ["password"]}}}));
        doc.set_value("profiles.base.properties.password", json!("pw"), Some(false))
            .unwrap();
        assert_eq!(doc.content()["profiles"]["base"]["secure"], json!([]));
        assert_eq!(doc.content()["profiles"]["base"]["properties"]["password"], json!("pw"));
        assert!(doc.secrets().is_empty());
    }

    #[test]
    fn test_secure_flag_requires_property_path() {
        let mut doc = doc_with(json!({}));
        let err = doc.set_value("defaults.base", json!("x"), Some(true)).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidPath);
    }

    #[test]
    fn test_plaintext_secure_value_detached_on_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("app.config.json");
        fs::write(
            &path,
            r#"{"profiles": {"base": {"properties": {"host": "h", "password": "leak"}, "secure": ["password"]}}}"#,
        )
        .unwrap();

        let location = LayerLocation {
            layer: Layer::Project,
            path: Some(path),
            exists: true,
        };
        let doc = ConfigDocument::load(&location).unwrap();
        assert!(dot_path::get(doc.content(), "profiles.base.properties.password").is_none());
        assert_eq!(
            doc.secrets().get("profiles.base.properties.password"),
            Some(&json!("leak"))
        );
    }

    #[test]
    fn test_load_malformed_reports_raw_text() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("app.config.json");
        fs::write(&path, "{ \"profiles\": ").unwrap();
        let location = LayerLocation {
            layer: Layer::Global,
            path: Some(path),
            exists: true,
        };
        let err = ConfigDocument::load(&location).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Malformed);
        assert!(err.to_string().contains("{ \"profiles\": "));
    }

    #[test]
    fn test_view_masks_secure_values() {
        let mut doc = doc_with(json!({"profiles": {"base": {"properties": {"host": "h"}}}}));
        doc.set_value("profiles.base.properties.password", json!("pw"), Some(true))
            .unwrap();

        let masked = doc.view(SecretView::Mask);
        assert_eq!(masked["profiles"]["base"]["properties"]["password"], json!(SECURE_PLACEHOLDER));
        let revealed = doc.view(SecretView::Reveal);
        assert_eq!(revealed["profiles"]["base"]["properties"]["password"], json!("pw"));
        let omitted = doc.view(SecretView::Omit);
        assert!(omitted["profiles"]["base"]["properties"].get("password").is_none());
    }

    #[test]
    fn test_save_preserves_key_order_and_omits_secrets() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/app.config.json");
        let mut doc = ConfigDocument::empty(Layer::Project, Some(path.clone()));
        doc.replace_content(json!({
            "profiles": {"zeta": {"type": "base", "properties": {"b": 1, "a": 2}}},
            "defaults": {"base": "zeta"},
            "autoStore": true
        }));
        doc.set_value("profiles.zeta.properties.secret", json!("x"), Some(true))
            .unwrap();
        doc.save().unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert!(!written.contains("\"x\""));
        let b = written.find("\"b\"").unwrap();
        let a = written.find("\"a\"").unwrap();
        assert!(b < a);
        assert!(written.starts_with("{\n    \"profiles\""));
        assert!(doc.exists());
        assert!(!doc.is_dirty());
    }

    #[test]
    fn test_set_schema_ref_is_first_key() {
        let mut doc = doc_with(json!({"profiles": {}, "defaults": {}}));
        doc.set_schema_ref("./app.schema.json");
        let keys: Vec<_> = doc.content().as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys[0], "$schema");

        let info = doc.schema_info().unwrap();
        assert!(info.local);
        assert_eq!(info.resolved, "/tmp/app.schema.json");
    }

    #[test]
    fn test_schema_info_url() {
        let mut doc = doc_with(json!({}));
        doc.set_schema_ref("https://example.com/app.schema.json");
        let info = doc.schema_info().unwrap();
        assert!(!info.local);
        assert_eq!(info.resolved, "https://example.com/app.schema.json");
    }

    #[test]
    fn test_remove_secure_property_unlists() {
        let mut doc = doc_with(json!({"profiles": {"base": {"properties": {}}}}));
        doc.set_value("profiles.base.properties.password", json!("pw"), Some(true))
            .unwrap();
        assert!(doc.remove_value("profiles.base.properties.password"));
        assert_eq!(doc.content()["profiles"]["base"]["secure"], json!([]));
        assert!(doc.secrets().is_empty());
        assert!(!doc.remove_value("profiles.base.properties.password"));
    }

    #[test]
    fn test_move_node_carries_secrets() {
        let mut doc = doc_with(json!({"profiles": {"old": {"type": "base", "properties": {"host": "h"}}}}));
        doc.set_value("profiles.old.properties.password", json!("pw"), Some(true))
            .unwrap();
        doc.move_node("profiles.old", "profiles.grp.profiles.new").unwrap();

        assert!(doc.content()["profiles"].get("old").is_none());
        assert_eq!(
            doc.content()["profiles"]["grp"]["profiles"]["new"]["secure"],
            json!(["password"])
        );
        assert_eq!(
            doc.stored_value("profiles.grp.profiles.new.properties.password"),
            Some(&json!("pw"))
        );
        assert_eq!(doc.committable_secrets().len(), 1);
    }

    #[test]
    fn test_move_node_refuses_existing_target() {
        let mut doc = doc_with(json!({"profiles": {"a": {"properties": {}}, "b": {"properties": {}}}}));
        let err = doc.move_node("profiles.a", "profiles.b").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidPath);
        assert!(doc.content()["profiles"].get("a").is_some());
    }

    #[test]
    fn test_failed_set_leaves_document_unchanged() {
        let mut doc = doc_with(json!({"profiles": {"base": {"properties": {"host": "h"}, "secure": "oops"}}}));
        let before = doc.content().clone();
        assert!(doc
            .set_value("profiles.base.properties.host", json!("x"), Some(true))
            .is_err());
        assert_eq!(doc.content(), &before);
        assert!(doc.secrets().is_empty());
    }

    #[test]
    fn test_is_blank() {
        assert!(doc_with(json!({"$schema": "./x.json", "profiles": {}, "defaults": {}})).is_blank());
        assert!(!doc_with(json!({"profiles": {"a": {}}})).is_blank());
        assert!(!doc_with(json!({"autoStore": true})).is_blank());
    }
}
