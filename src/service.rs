//! Command-level operations over one invocation's layer stack.
//!
//! A `ConfigService` is built per invocation and owns everything a command
//! needs: the loaded layers, the profile type registry and the fetch
//! collaborator. Interactive input is passed to the operations that need it.

use crate::config::document::{is_url, parse_document, to_pretty_json, write_atomic};
use crate::config::{
    Layer, LayerStack, PathResolver, SecretView, SetOptions, coerce_value, dot_path, profile_path,
    secure_info_for_prop,
};
use crate::error::{ConfigError, Result, Warning};
use crate::fetch::{Fetcher, fetch_json};
use crate::migrate::{self, ConvertReport};
use crate::prompt::Prompter;
use crate::schema::{self, JsonType, ProfileTypeRegistry};
use crate::vault::SecureVault;
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Directories never descended into by `update_schemas`.
const SKIPPED_DIRS: &[&str] = &["node_modules", "target"];

#[derive(Debug, Clone, Copy, Default)]
pub struct InitOptions {
    pub target: Layer,
    /// Ask for secure template values.
    pub prompt: bool,
    pub overwrite: bool,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InitStatus {
    Created,
    Overwritten,
    Skipped,
    DryRun,
}

#[derive(Debug, Serialize)]
pub struct InitOutcome {
    pub layer: Layer,
    pub path: PathBuf,
    pub status: InitStatus,
    /// The would-be document for a dry run, secure values masked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub path: Option<String>,
    /// Group output by layer file.
    pub locations: bool,
    /// Top-level keys only.
    pub root: bool,
    pub name_only: bool,
    pub show_secure: bool,
}

#[derive(Debug, Clone)]
pub struct SetRequest {
    pub target: Layer,
    pub path: String,
    pub value: String,
    pub options: SetOptions,
}

#[derive(Debug, Serialize)]
pub struct SecureOutcome {
    pub layer: Layer,
    pub path: PathBuf,
    pub updated: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pruned: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// URL or local file path of the config to import.
    pub location: String,
    pub target: Layer,
    pub overwrite: bool,
}

#[derive(Debug, Serialize)]
pub struct ImportOutcome {
    pub layer: Layer,
    pub path: PathBuf,
    pub imported: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaUpdate {
    Updated,
    /// `$schema` points at a URL.
    Remote,
    /// The config has no `$schema`.
    Unreferenced,
}

pub struct ConfigService {
    stack: LayerStack,
    registry: ProfileTypeRegistry,
    fetcher: Box<dyn Fetcher>,
}

impl std::fmt::Debug for ConfigService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigService")
            .field("stack", &self.stack)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl ConfigService {
    /// Load the layers and register profile types.
    ///
    /// Types come from the built-in set, `<home>/profile-types/*.json`, and
    /// any local schema files the existing layers reference.
    pub fn open(resolver: PathResolver, vault: SecureVault, fetcher: Box<dyn Fetcher>) -> Result<Self> {
        let types_dir = resolver.profile_types_dir();
        let mut stack = LayerStack::load(resolver, vault)?;

        let mut registry = ProfileTypeRegistry::with_builtin();
        for warning in registry.load_dir(&types_dir) {
            stack.push_warning(warning);
        }

        let schema_files: Vec<PathBuf> = stack
            .layers()
            .filter(|d| d.exists())
            .filter_map(|d| d.schema_info())
            .filter(|info| info.local)
            .map(|info| PathBuf::from(info.resolved))
            .collect();
        for path in schema_files {
            match read_json(&path) {
                Ok(value) => {
                    for def in schema::parse(&value) {
                        if !registry.contains(&def.name) {
                            registry.register(def);
                        }
                    }
                }
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "schema file not readable");
                    stack.push_warning(Warning::from(e));
                }
            }
        }

        Ok(Self {
            stack,
            registry,
            fetcher,
        })
    }

    pub fn stack(&self) -> &LayerStack {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut LayerStack {
        &mut self.stack
    }

    pub fn registry(&self) -> &ProfileTypeRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ProfileTypeRegistry {
        &mut self.registry
    }

    /// Warnings collected so far, drained.
    pub fn take_warnings(&mut self) -> Vec<Warning> {
        self.stack.take_warnings()
    }

    pub fn get(&self, path: &str, secure_resolve: bool) -> Option<Value> {
        self.stack.get(path, secure_resolve)
    }

    /// Create a layer from the profile template.
    ///
    /// An existing layer is left byte-for-byte untouched unless `overwrite`.
    pub fn init(&mut self, opts: InitOptions, prompter: &mut dyn Prompter) -> Result<InitOutcome> {
        let layer = opts.target;
        let path = self.stack.adopt_init_target(layer);
        let existed = self.stack.exists(layer);

        if existed && !opts.overwrite {
            info!(layer = %layer, path = %path.display(), "config already exists, skipping init");
            return Ok(InitOutcome {
                layer,
                path,
                status: InitStatus::Skipped,
                document: None,
                schema_path: None,
            });
        }

        let template = if layer.is_user() {
            user_template(&self.registry)
        } else {
            schema::template(&self.registry)
        };

        let mut secrets = Vec::new();
        if opts.prompt && !layer.is_user() {
            for (name, def) in self.registry.iter().map(|d| (d.name.clone(), d)) {
                for (prop, prop_def) in def
                    .schema
                    .properties
                    .iter()
                    .filter(|(_, p)| p.secure && p.include_in_template)
                {
                    let question = format!("{name}.{prop} (secure, leave blank to skip): ");
                    if let Some(answer) = prompter.ask_secret(&question)?
                        && !answer.is_empty()
                    {
                        let value = coerce_typed(&answer, Some(prop_def.kind.primary()));
                        secrets.push((format!("profiles.{name}.properties.{prop}"), value));
                    }
                }
            }
        }

        if opts.dry_run {
            let mut document = template;
            for (path, _) in &secrets {
                let _ = dot_path::set(&mut document, path, json!(crate::config::SECURE_PLACEHOLDER));
            }
            return Ok(InitOutcome {
                layer,
                path,
                status: InitStatus::DryRun,
                document: Some(document),
                schema_path: None,
            });
        }

        self.stack.layer_mut(layer).replace_content(template);
        let schema_path = self.stack.set_schema(layer, &schema::build(&self.registry))?;
        for (secret_path, value) in secrets {
            self.stack.set(layer, &secret_path, value, Some(true))?;
        }
        self.stack.save(layer)?;

        Ok(InitOutcome {
            layer,
            path,
            status: if existed {
                InitStatus::Overwritten
            } else {
                InitStatus::Created
            },
            document: None,
            schema_path: Some(schema_path),
        })
    }

    /// Merged configuration, or each layer separately with `locations`.
    ///
    /// Environment indirections are listed in their stored `$NAME` form.
    pub fn list(&self, opts: &ListOptions) -> Value {
        let view = if opts.show_secure {
            SecretView::Reveal
        } else {
            SecretView::Mask
        };

        if opts.locations {
            let mut by_file = Map::new();
            for doc in self.stack.layers().filter(|d| d.exists()) {
                let Some(path) = doc.path() else {
                    continue;
                };
                let shaped = shape_listing(doc.view(view), opts);
                if !shaped.is_null() {
                    by_file.insert(path.display().to_string(), shaped);
                }
            }
            return Value::Object(by_file);
        }

        shape_listing(self.stack.merged(view, false), opts)
    }

    /// Set one property from command-line text and save the layer.
    ///
    /// Without `--json`, text is coerced to the property's declared type when
    /// the profile type is known. Properties declared secure by their type
    /// are routed to the vault unless `secure` says otherwise.
    pub fn set(&mut self, req: &SetRequest) -> Result<PathBuf> {
        let mut options = req.options;
        if options.secure.is_none() && self.declared_secure(&req.path) {
            options.secure = Some(true);
        }

        let declared = self.declared_type(&req.path);
        match declared {
            Some(kind) if !options.json && kind != JsonType::Array => {
                let value = coerce_typed(&req.value, Some(kind));
                self.stack.set(req.target, &req.path, value, options.secure)?;
            }
            _ => self
                .stack
                .set_text(req.target, &req.path, &req.value, options)?,
        }
        self.stack.save(req.target)?;
        Ok(self.stack.adopt_init_target(req.target))
    }

    /// Re-prompt every secure property of a layer. Blank answers keep the current value.
    pub fn secure(&mut self, target: Layer, prune: bool, prompter: &mut dyn Prompter) -> Result<SecureOutcome> {
        let Some(path) = self
            .stack
            .layer(target)
            .path()
            .filter(|_| self.stack.exists(target))
            .map(Path::to_path_buf)
        else {
            return Err(ConfigError::not_found("config file for layer", target.to_string()));
        };

        let mut outcome = SecureOutcome {
            layer: target,
            path,
            updated: Vec::new(),
            pruned: Vec::new(),
        };

        if prune {
            outcome.pruned = self.stack.prune_unused_secrets()?;
        }

        if !self.stack.vault().is_available() {
            warn!(backend = self.stack.vault().backend_name(), "vault unavailable, secure values not prompted");
            self.stack.push_warning(Warning::vault(format!(
                "the {} credential store is unavailable; secure values were not updated",
                self.stack.vault().backend_name()
            )));
            return Ok(outcome);
        }

        for field in self.stack.secure_fields(target) {
            let has_value = self.stack.layer(target).secrets().contains_key(&field);
            let current = if has_value {
                crate::config::SECURE_PLACEHOLDER
            } else {
                "not set"
            };
            let question = format!("{field} [{current}]: ");
            let Some(answer) = prompter.ask_secret(&question)? else {
                continue;
            };
            if answer.is_empty() {
                continue;
            }
            let value = coerce_typed(&answer, self.declared_type(&field));
            self.stack.set(target, &field, value, Some(true))?;
            outcome.updated.push(field);
        }

        if !outcome.updated.is_empty() {
            self.stack.save(target)?;
        }
        Ok(outcome)
    }

    /// Import a config, and its relative schema, from a URL or local file.
    ///
    /// Both documents are read before anything is written.
    pub fn import(&mut self, opts: &ImportOptions) -> Result<ImportOutcome> {
        let layer = opts.target;
        let path = self.stack.adopt_init_target(layer);
        if self.stack.exists(layer) && !opts.overwrite {
            info!(path = %path.display(), "config already exists, skipping import");
            return Ok(ImportOutcome {
                layer,
                path,
                imported: false,
                schema_path: None,
            });
        }

        let config = self.read_location(&opts.location)?;
        let schema = match config.get("$schema").and_then(Value::as_str) {
            Some(reference) if !is_url(reference) => {
                let source = relative_location(&opts.location, reference);
                let file_name = Path::new(reference.trim_start_matches("./"))
                    .file_name()
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(self.stack.resolver().schema_name()));
                Some((file_name, self.read_location(&source)?))
            }
            _ => None,
        };

        let mut schema_path = None;
        if let Some((file_name, schema)) = schema {
            let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
            let target = dir.join(file_name);
            write_atomic(&target, to_pretty_json(&schema)?.as_bytes())?;
            info!(path = %target.display(), "imported schema");
            schema_path = Some(target);
        }

        self.stack.layer_mut(layer).replace_content(config);
        self.stack.save(layer)?;
        info!(from = %opts.location, path = %path.display(), "imported config");

        Ok(ImportOutcome {
            layer,
            path,
            imported: true,
            schema_path,
        })
    }

    /// Schema for every registered profile type.
    pub fn schema(&self) -> Value {
        schema::build(&self.registry)
    }

    /// Rewrite local schema files referenced by config layers.
    ///
    /// Covers the start directory and its ancestors, the global home, and
    /// subdirectories of the start directory down to `depth`.
    pub fn update_schemas(&mut self, depth: usize) -> Result<BTreeMap<String, SchemaUpdate>> {
        let resolver = self.stack.resolver().clone();
        let mut dirs: Vec<PathBuf> = resolver
            .start_dir()
            .ancestors()
            .filter(|d| *d != resolver.home_dir())
            .map(Path::to_path_buf)
            .collect();
        dirs.push(resolver.home_dir().to_path_buf());
        collect_subdirs(resolver.start_dir(), depth, &mut dirs);

        let schema = to_pretty_json(&self.schema())?;
        let mut results = BTreeMap::new();
        let mut written: Vec<PathBuf> = Vec::new();

        for dir in dirs {
            for name in [resolver.config_name(), resolver.user_config_name()] {
                let config_path = dir.join(&name);
                if !config_path.is_file() {
                    continue;
                }
                let config = match read_json(&config_path) {
                    Ok(config) => config,
                    Err(e) => {
                        warn!(path = %config_path.display(), error = %e, "skipping unreadable config");
                        self.stack.push_warning(Warning::from(e));
                        continue;
                    }
                };
                let status = match config.get("$schema").and_then(Value::as_str) {
                    None => SchemaUpdate::Unreferenced,
                    Some(reference) if is_url(reference) => SchemaUpdate::Remote,
                    Some(reference) => {
                        let target = dir.join(reference.trim_start_matches("./"));
                        if !written.contains(&target) {
                            write_atomic(&target, schema.as_bytes())?;
                            info!(path = %target.display(), "updated schema");
                            written.push(target.clone());
                        }
                        results.insert(target.display().to_string(), SchemaUpdate::Updated);
                        continue;
                    }
                };
                results.insert(config_path.display().to_string(), status);
            }
        }
        Ok(results)
    }

    /// Convert legacy profiles into the global layer, optionally deleting them afterwards.
    pub fn convert_profiles(&mut self, force: bool, delete: bool, prompter: &mut dyn Prompter) -> Result<ConvertReport> {
        let mut report = migrate::convert(&mut self.stack, prompter, force)?;

        if !report.converted.is_empty() {
            for def in std::mem::take(&mut report.type_defs) {
                if !self.registry.contains(&def.name) {
                    self.registry.register(def);
                }
            }
            let built = schema::build(&self.registry);
            self.stack.set_schema(Layer::Global, &built)?;
            self.stack.save(Layer::Global)?;
        }

        if delete {
            let old_dir = self.stack.resolver().legacy_old_dir();
            let confirmed = force
                || prompter.confirm(&format!(
                    "Delete the old profiles in {}? They cannot be recovered.",
                    old_dir.display()
                ))?;
            if confirmed {
                migrate::delete_old(&self.stack, &mut report)?;
            } else {
                report
                    .messages
                    .push("Old profiles were not deleted.".to_string());
            }
        }
        report.warnings.extend(self.stack.take_warnings());
        Ok(report)
    }

    pub fn profiles(&self) -> Vec<String> {
        self.stack.profile_names()
    }

    /// Persist values entered at a prompt when `autoStore` is on.
    ///
    /// Values land in the highest-precedence layer holding the profile, or
    /// the active layer. Returns the layer written, if any.
    pub fn auto_store(&mut self, profile: &str, values: Map<String, Value>) -> Result<Option<Layer>> {
        let merged = self.stack.merged(SecretView::Omit, false);
        if merged.get("autoStore").and_then(Value::as_bool) != Some(true) || values.is_empty() {
            return Ok(None);
        }

        let layer = self.stack.layer_holding_profile(profile).unwrap_or_else(|| {
            let active = self.stack.active_layer();
            if self.stack.layer(active).path().is_some() {
                active
            } else {
                Layer::Global
            }
        });

        let base = profile_path(profile);
        for (prop, value) in values {
            let path = format!("{base}.properties.{prop}");
            let secure = self.declared_secure(&path).then_some(true);
            self.stack.set(layer, &path, value, secure)?;
        }
        self.stack.save(layer)?;
        debug!(profile, layer = %layer, "stored prompted values");
        Ok(Some(layer))
    }

    pub fn move_profile(&mut self, layer: Layer, from: &str, to: &str) -> Result<()> {
        self.stack.move_profile(layer, from, to)?;
        self.stack.save(layer)
    }

    /// Schema checks of every existing layer. Never fails.
    pub fn validate(&self) -> Vec<Warning> {
        let types = self.registry.to_vec();
        let mut warnings = Vec::new();
        for doc in self.stack.layers().filter(|d| d.exists()) {
            let file = doc.path().map(|p| p.display().to_string()).unwrap_or_default();
            for mut warning in schema::validate(doc.content(), &types) {
                warning.location = Some(match warning.location {
                    Some(location) => format!("{file}: {location}"),
                    None => file.clone(),
                });
                warnings.push(warning);
            }
        }
        warnings
    }

    fn declared_type(&self, path: &str) -> Option<JsonType> {
        let merged = self.stack.merged(SecretView::Omit, false);
        schema::find_property_type(path, &merged, &self.registry.to_vec())
    }

    fn declared_secure(&self, path: &str) -> bool {
        let Some((array_path, prop)) = secure_info_for_prop(path) else {
            return false;
        };
        let Some(profile) = array_path.strip_suffix(".secure") else {
            return false;
        };
        let merged = self.stack.merged(SecretView::Omit, false);
        dot_path::get(&merged, &format!("{profile}.type"))
            .and_then(Value::as_str)
            .and_then(|kind| self.registry.get(kind))
            .is_some_and(|def| def.secure_properties().contains(&prop.as_str()))
    }

    fn read_location(&self, location: &str) -> Result<Value> {
        if is_url(location) {
            return fetch_json(self.fetcher.as_ref(), location);
        }
        let path = self.stack.resolver().start_dir().join(location);
        read_json(&path)
    }
}

fn read_json(path: &Path) -> Result<Value> {
    let raw = fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ConfigError::not_found("file", path.display().to_string()),
        _ => ConfigError::io("read", path, e),
    })?;
    parse_document(&path.display().to_string(), &raw)
}

/// Resolve a relative reference against the location of the document holding it.
fn relative_location(base: &str, reference: &str) -> String {
    let reference = reference.trim_start_matches("./");
    if is_url(base) {
        match base.rfind('/') {
            Some(idx) => format!("{}/{reference}", &base[..idx]),
            None => reference.to_string(),
        }
    } else {
        Path::new(base)
            .parent()
            .map(|dir| dir.join(reference))
            .unwrap_or_else(|| PathBuf::from(reference))
            .display()
            .to_string()
    }
}

/// Text typed to a declared JSON type, falling back to plain coercion.
fn coerce_typed(text: &str, kind: Option<JsonType>) -> Value {
    match kind {
        Some(JsonType::String) => Value::String(text.to_string()),
        Some(JsonType::Object) | Some(JsonType::Array) => {
            serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
        }
        _ => coerce_value(text),
    }
}

/// Template for a user layer: the same profiles, no values.
fn user_template(registry: &ProfileTypeRegistry) -> Value {
    let profiles: Map<String, Value> = registry
        .iter()
        .map(|def| (def.name.clone(), json!({"properties": {}})))
        .collect();
    json!({"profiles": profiles, "defaults": {}})
}

fn shape_listing(value: Value, opts: &ListOptions) -> Value {
    let value = match &opts.path {
        Some(path) => match dot_path::get(&value, path) {
            Some(node) => node.clone(),
            None => return Value::Null,
        },
        None => value,
    };
    if opts.root || opts.name_only {
        if let Value::Object(map) = &value {
            return Value::Array(map.keys().map(|k| Value::String(k.clone())).collect());
        }
    }
    value
}

fn collect_subdirs(dir: &Path, depth: usize, out: &mut Vec<PathBuf>) {
    if depth == 0 {
        return;
    }
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    let mut children: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| !n.starts_with('.') && !SKIPPED_DIRS.contains(&n))
        })
        .collect();
    children.sort();
    for child in children {
        out.push(child.clone());
        collect_subdirs(&child, depth - 1, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::ScriptedPrompter;
    use crate::vault::MemoryStore;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct NoNetwork;

    impl Fetcher for NoNetwork {
        fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            Err(ConfigError::fetch(url, None, "offline"))
        }
    }

    fn service(temp: &TempDir) -> ConfigService {
        let project = temp.path().join("proj");
        let home = temp.path().join("home");
        fs::create_dir_all(&project).unwrap();
        fs::create_dir_all(&home).unwrap();
        let resolver = PathResolver::new("app", &project, &home);
        let vault = SecureVault::new(Arc::new(MemoryStore::new()), "app");
        ConfigService::open(resolver, vault, Box::new(NoNetwork)).unwrap()
    }

    #[test]
    fn test_relative_location() {
        assert_eq!(
            relative_location("https://host/cfg/app.config.json", "./app.schema.json"),
            "https://host/cfg/app.schema.json"
        );
        assert_eq!(
            relative_location("/tmp/cfg/app.config.json", "app.schema.json"),
            "/tmp/cfg/app.schema.json"
        );
    }

    #[test]
    fn test_coerce_typed_respects_declared_type() {
        assert_eq!(coerce_typed("123", Some(JsonType::String)), json!("123"));
        assert_eq!(coerce_typed("123", Some(JsonType::Number)), json!(123));
        assert_eq!(coerce_typed("{\"a\":1}", Some(JsonType::Object)), json!({"a": 1}));
        assert_eq!(coerce_typed("true", None), json!(true));
    }

    #[test]
    fn test_init_dry_run_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let mut svc = service(&temp);
        let mut prompter = ScriptedPrompter::new().answer("admin");
        let outcome = svc
            .init(
                InitOptions {
                    target: Layer::Global,
                    prompt: true,
                    dry_run: true,
                    ..Default::default()
                },
                &mut prompter,
            )
            .unwrap();
        assert_eq!(outcome.status, InitStatus::DryRun);
        assert!(!outcome.path.exists());
        let document = outcome.document.unwrap();
        assert_eq!(document["profiles"]["base"]["properties"]["password"], json!(crate::config::SECURE_PLACEHOLDER));
    }

    #[test]
    fn test_init_prompts_for_secure_values() {
        let temp = TempDir::new().unwrap();
        let mut svc = service(&temp);
        // Template secure props of `base`, in name order: password, user.
        let mut prompter = ScriptedPrompter::new().answer("pw").answer("");
        svc.init(
            InitOptions {
                target: Layer::Global,
                prompt: true,
                ..Default::default()
            },
            &mut prompter,
        )
        .unwrap();

        assert_eq!(prompter.asked.len(), 2);
        assert_eq!(svc.get("profiles.base.properties.password", true), Some(json!("pw")));
        let on_disk = fs::read_to_string(temp.path().join("home/app.config.json")).unwrap();
        assert!(!on_disk.contains("\"pw\""));
        assert!(on_disk.starts_with("{\n    \"$schema\": \"./app.schema.json\""));
        assert!(temp.path().join("home/app.schema.json").is_file());
    }

    #[test]
    fn test_set_uses_declared_type_and_security() {
        let temp = TempDir::new().unwrap();
        let mut svc = service(&temp);
        svc.init(InitOptions { target: Layer::Global, ..Default::default() }, &mut ScriptedPrompter::new())
            .unwrap();

        svc.set(&SetRequest {
            target: Layer::Global,
            path: "profiles.base.properties.host".into(),
            value: "12345".into(),
            options: SetOptions::default(),
        })
        .unwrap();
        svc.set(&SetRequest {
            target: Layer::Global,
            path: "profiles.base.properties.tokenValue".into(),
            value: "tok".into(),
            options: SetOptions::default(),
        })
        .unwrap();

        assert_eq!(svc.get("profiles.base.properties.host", false), Some(json!("12345")));
        assert!(svc.stack().layer(Layer::Global).is_secure("profiles.base.properties.tokenValue"));
        assert_eq!(
            svc.get("profiles.base.properties.tokenValue", false),
            Some(json!(crate::config::SECURE_PLACEHOLDER))
        );
    }

    #[test]
    fn test_list_shapes() {
        let temp = TempDir::new().unwrap();
        let mut svc = service(&temp);
        svc.init(InitOptions { target: Layer::Global, ..Default::default() }, &mut ScriptedPrompter::new())
            .unwrap();

        let root = svc.list(&ListOptions { root: true, ..Default::default() });
        assert_eq!(root, json!(["profiles", "defaults", "autoStore"]));

        let names = svc.list(&ListOptions {
            path: Some("profiles".into()),
            name_only: true,
            ..Default::default()
        });
        assert_eq!(names, json!(["base"]));

        let by_file = svc.list(&ListOptions {
            path: Some("defaults".into()),
            locations: true,
            ..Default::default()
        });
        let key = temp.path().join("home/app.config.json").display().to_string();
        assert_eq!(by_file[&key], json!({"base": "base"}));
    }

    #[test]
    fn test_auto_store_requires_flag() {
        let temp = TempDir::new().unwrap();
        let mut svc = service(&temp);
        let mut values = Map::new();
        values.insert("host".into(), json!("h"));
        assert_eq!(svc.auto_store("base", values.clone()).unwrap(), None);

        svc.init(InitOptions { target: Layer::Global, ..Default::default() }, &mut ScriptedPrompter::new())
            .unwrap();
        values.insert("password".into(), json!("pw"));
        assert_eq!(svc.auto_store("base", values).unwrap(), Some(Layer::Global));
        assert_eq!(svc.get("profiles.base.properties.host", false), Some(json!("h")));
        assert!(svc.stack().layer(Layer::Global).is_secure("profiles.base.properties.password"));
    }

    #[test]
    fn test_update_schemas_rewrites_local_references() {
        let temp = TempDir::new().unwrap();
        let mut svc = service(&temp);
        svc.init(InitOptions { target: Layer::Global, ..Default::default() }, &mut ScriptedPrompter::new())
            .unwrap();
        let nested = temp.path().join("proj/sub");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("app.config.json"), r#"{"$schema": "https://example.com/s.json"}"#).unwrap();
        let schema_path = temp.path().join("home/app.schema.json");
        fs::write(&schema_path, "{}").unwrap();

        let results = svc.update_schemas(1).unwrap();
        assert_eq!(results[&schema_path.display().to_string()], SchemaUpdate::Updated);
        assert_eq!(
            results[&nested.join("app.config.json").display().to_string()],
            SchemaUpdate::Remote
        );
        assert!(fs::read_to_string(&schema_path).unwrap().contains("Missing profile type"));
    }
}
