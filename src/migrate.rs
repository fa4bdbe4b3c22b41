//! Conversion of the legacy profile store into the global layer.
//!
//! Legacy layout under the global home:
//!
//! ```text
//! profiles/
//!   <type>/
//!     <type>_meta.yaml      defaultProfile, optional configuration {type, schema}
//!     <name>.yaml           one profile, properties at top level
//! ```
//!
//! A legacy property whose value starts with `managed by` was kept in the
//! credential store under the account `<type>_<name>_<prop>`.

use crate::config::{ConfigDocument, Layer, LayerStack};
use crate::error::{ConfigError, Result, Warning};
use crate::prompt::Prompter;
use crate::schema::ProfileTypeDef;
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};

/// Legacy property names and their current spelling.
pub const PROPERTY_REMAP: &[(&str, &str)] = &[
    ("hostname", "host"),
    ("username", "user"),
    ("pass", "password"),
];

const SECURE_MARKER: &str = "managed by";

/// One profile read from the legacy store.
#[derive(Debug, Clone, Serialize)]
pub struct LegacyProfile {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(skip)]
    pub path: PathBuf,
    #[serde(skip)]
    pub modified: Option<SystemTime>,
    pub properties: Map<String, Value>,
    /// Properties whose values live in the legacy credential store.
    pub secure: Vec<String>,
}

impl LegacyProfile {
    /// Key of the converted profile in the new layer.
    pub fn map_key(&self) -> String {
        format!("{}_{}", self.kind, self.name)
    }

    /// Legacy credential-store account of one property.
    pub fn secure_account(&self, prop: &str) -> String {
        format!("{}_{}_{}", self.kind, self.name, prop.replace('.', "_"))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConvertFailure {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub reason: String,
}

/// Everything found in a legacy directory.
#[derive(Debug, Default)]
pub struct LegacyScan {
    pub profiles: Vec<LegacyProfile>,
    /// Type -> profile name marked default in the meta file.
    pub defaults: BTreeMap<String, String>,
    pub type_defs: Vec<ProfileTypeDef>,
    pub failures: Vec<ConvertFailure>,
}

impl LegacyScan {
    pub fn count(&self) -> usize {
        self.profiles.len()
    }
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertReport {
    pub profiles_found: usize,
    /// Type -> converted profile names.
    pub converted: BTreeMap<String, Vec<String>>,
    pub failed: Vec<ConvertFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_dir: Option<PathBuf>,
    pub deleted: bool,
    pub messages: Vec<String>,
    #[serde(skip)]
    pub type_defs: Vec<ProfileTypeDef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
}

/// Read every legacy profile under `dir`. Unreadable profiles are reported, not fatal.
pub fn scan(dir: &Path) -> LegacyScan {
    let mut result = LegacyScan::default();
    for kind in subdirectories(dir) {
        let type_dir = dir.join(&kind);
        let meta_name = format!("{kind}_meta");

        let mut files: Vec<PathBuf> = match fs::read_dir(&type_dir) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "yaml"))
                .collect(),
            Err(e) => {
                result.failures.push(ConvertFailure {
                    kind: kind.clone(),
                    name: None,
                    reason: e.to_string(),
                });
                continue;
            }
        };
        files.sort();

        for path in files {
            let Some(name) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
                continue;
            };
            if name == meta_name {
                continue;
            }
            match read_profile(&kind, &name, &path) {
                Ok(profile) => result.profiles.push(profile),
                Err(e) => {
                    warn!(profile_type = %kind, profile = %name, error = %e, "failed to read legacy profile");
                    result.failures.push(ConvertFailure {
                        kind: kind.clone(),
                        name: Some(name),
                        reason: e.to_string(),
                    });
                }
            }
        }

        let meta_path = type_dir.join(format!("{meta_name}.yaml"));
        if meta_path.is_file() {
            match read_meta(&meta_path) {
                Ok((default, type_def)) => {
                    if let Some(default) = default {
                        result.defaults.insert(kind.clone(), default);
                    }
                    match type_def {
                        Some(Ok(def)) => result.type_defs.push(def),
                        Some(Err(e)) => {
                            warn!(profile_type = %kind, error = %e, "unreadable legacy type configuration");
                            result.failures.push(ConvertFailure {
                                kind: kind.clone(),
                                name: None,
                                reason: format!("failed to read profile type configuration: {e}"),
                            });
                        }
                        None => {}
                    }
                }
                Err(e) => result.failures.push(ConvertFailure {
                    kind: kind.clone(),
                    name: None,
                    reason: format!("failed to read default profile: {e}"),
                }),
            }
        }
    }
    debug!(dir = %dir.display(), count = result.count(), "scanned legacy profiles");
    result
}

fn subdirectories(dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .filter_map(|e| e.file_name().to_str().map(str::to_string))
        .collect();
    names.sort();
    names
}

fn read_yaml(path: &Path) -> Result<Value> {
    let raw = fs::read_to_string(path).map_err(|e| ConfigError::io("read", path, e))?;
    let yaml: serde_yaml::Value = serde_yaml::from_str(&raw)
        .map_err(|e| ConfigError::malformed(path.display().to_string(), raw.as_str(), e))?;
    serde_json::to_value(yaml)
        .map_err(|e| ConfigError::malformed(path.display().to_string(), raw.as_str(), e))
}

fn read_profile(kind: &str, name: &str, path: &Path) -> Result<LegacyProfile> {
    let properties = match read_yaml(path)? {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        _ => {
            return Err(ConfigError::malformed(
                path.display().to_string(),
                "",
                "profile is not a mapping",
            ));
        }
    };
    let secure = properties
        .iter()
        .filter(|(_, v)| v.as_str().is_some_and(|s| s.starts_with(SECURE_MARKER)))
        .map(|(k, _)| k.clone())
        .collect();
    let modified = fs::metadata(path).and_then(|m| m.modified()).ok();

    Ok(LegacyProfile {
        kind: kind.to_string(),
        name: name.to_string(),
        path: path.to_path_buf(),
        modified,
        properties,
        secure,
    })
}

type MetaContents = (Option<String>, Option<Result<ProfileTypeDef>>);

fn read_meta(path: &Path) -> Result<MetaContents> {
    let meta = read_yaml(path)?;
    let default = meta
        .get("defaultProfile")
        .and_then(Value::as_str)
        .map(str::to_string);
    let type_def = meta.get("configuration").filter(|c| c.is_object()).map(|c| {
        serde_json::from_value::<ProfileTypeDef>(c.clone()).map_err(|e| {
            ConfigError::malformed(path.display().to_string(), c.to_string(), e)
        })
    });
    Ok((default, type_def))
}

fn remap(name: &str) -> &str {
    PROPERTY_REMAP
        .iter()
        .find(|(old, _)| *old == name)
        .map(|(_, new)| *new)
        .unwrap_or(name)
}

/// Build the converted layer content from a scan.
///
/// Secure values are fetched through `load_secret`; a property whose
/// secret cannot be found is dropped.
pub fn build_config(
    scan: &LegacyScan,
    mut load_secret: impl FnMut(&str) -> Option<Value>,
) -> (Value, BTreeMap<String, Vec<String>>) {
    let mut profiles = Map::new();
    let mut converted: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for profile in &scan.profiles {
        let mut properties = Map::new();
        let mut secure = Vec::new();
        for (key, value) in &profile.properties {
            let new_key = remap(key).to_string();
            if profile.secure.contains(key) {
                match load_secret(&profile.secure_account(key)) {
                    Some(secret) => {
                        properties.insert(new_key.clone(), secret);
                        secure.push(Value::String(new_key));
                    }
                    None => debug!(profile = %profile.name, property = %key, "dropping legacy secure property with no stored value"),
                }
            } else {
                properties.insert(new_key, value.clone());
            }
        }
        profiles.insert(
            profile.map_key(),
            json!({"type": profile.kind, "properties": properties, "secure": secure}),
        );
        converted
            .entry(profile.kind.clone())
            .or_default()
            .push(profile.name.clone());
    }

    let mut defaults = Map::new();
    for kind in converted.keys() {
        let named = scan
            .defaults
            .get(kind)
            .filter(|name| scan.profiles.iter().any(|p| &p.kind == kind && &p.name == *name));
        let chosen = named.cloned().or_else(|| most_recent(scan, kind));
        if let Some(name) = chosen {
            defaults.insert(kind.clone(), json!(format!("{kind}_{name}")));
        }
    }

    (
        json!({"profiles": profiles, "defaults": defaults, "autoStore": true}),
        converted,
    )
}

fn most_recent(scan: &LegacyScan, kind: &str) -> Option<String> {
    scan.profiles
        .iter()
        .filter(|p| p.kind == kind)
        .max_by_key(|p| p.modified)
        .map(|p| p.name.clone())
}

/// Convert the legacy store into the global layer.
///
/// Existing global content needs confirmation unless `force` is set.
/// The layer is saved before the legacy directory is renamed; if the
/// rename fails the layer is restored.
pub fn convert(stack: &mut LayerStack, prompter: &mut dyn Prompter, force: bool) -> Result<ConvertReport> {
    let legacy_dir = stack.resolver().legacy_profiles_dir();
    let old_dir = stack.resolver().legacy_old_dir();
    let scan = scan(&legacy_dir);

    let mut report = ConvertReport {
        profiles_found: scan.count(),
        failed: scan.failures.clone(),
        type_defs: scan.type_defs.clone(),
        ..Default::default()
    };
    if scan.count() == 0 {
        report
            .messages
            .push("No old profiles found to convert.".to_string());
        return Ok(report);
    }

    let target = Layer::Global;
    if !stack.layer(target).is_blank() && !force {
        let question = format!(
            "{} already has content. Merge {} old profile(s) into it?",
            stack.adopt_init_target(target).display(),
            scan.count()
        );
        if !prompter.confirm(&question)? {
            return Err(ConfigError::Cancelled(
                "existing configuration left unchanged".to_string(),
            ));
        }
    }

    let vault = stack.vault().clone();
    let mut missing_secrets = Vec::new();
    let (converted, by_type) = build_config(&scan, |account| {
        let secret = vault
            .get_raw(account)
            .ok()
            .flatten()
            .and_then(|raw| serde_json::from_str(&raw).ok());
        if secret.is_none() {
            missing_secrets.push(account.to_string());
        }
        secret
    });
    for account in missing_secrets {
        report.warnings.push(Warning::vault(format!(
            "no stored value for legacy secure property {account}; it was not converted"
        )));
    }

    let config_path = stack.adopt_init_target(target);
    let previous: ConfigDocument = stack.layer(target).clone();
    let existed = previous.exists();

    stack.layer_mut(target).merge_content(converted);
    stack.save(target)?;

    if let Err(e) = fs::rename(&legacy_dir, &old_dir) {
        warn!(error = %e, "failed to rename legacy profiles, restoring configuration");
        restore(stack, target, previous, existed, &config_path);
        return Err(ConfigError::io("rename", &legacy_dir, e));
    }
    info!(from = %legacy_dir.display(), to = %old_dir.display(), "renamed legacy profiles");

    for profile in &scan.profiles {
        for prop in &profile.secure {
            if let Err(e) = vault.delete_raw(&profile.secure_account(prop)) {
                report.warnings.push(Warning::from(e));
            }
        }
    }

    for (kind, names) in &by_type {
        report
            .messages
            .push(format!("Converted {kind} profiles: {}", names.join(", ")));
    }
    if !report.failed.is_empty() {
        report.messages.push(format!(
            "Failed to convert {} profile(s).",
            report.failed.len()
        ));
    }
    report.messages.push(format!(
        "Your new profiles have been saved to {}.",
        config_path.display()
    ));
    report.messages.push(format!(
        "Your old profiles have been moved to {}. Delete them by re-running this operation and requesting deletion.",
        old_dir.display()
    ));
    report.converted = by_type;
    report.config_path = Some(config_path);
    report.old_dir = Some(old_dir);
    report.warnings.extend(stack.take_warnings());
    Ok(report)
}

fn restore(stack: &mut LayerStack, layer: Layer, previous: ConfigDocument, existed: bool, path: &Path) {
    *stack.layer_mut(layer) = previous;
    let result = if existed {
        stack.save(layer)
    } else {
        let cleared = stack
            .vault()
            .commit(crate::vault::SECURE_ACCOUNT, path, Map::new());
        let removed = fs::remove_file(path).map_err(|e| ConfigError::io("remove", path, e));
        cleared.and(removed)
    };
    if let Err(e) = result {
        warn!(path = %path.display(), error = %e, "failed to restore configuration");
    }
}

/// Remove the renamed legacy directory and its credential-store accounts.
pub fn delete_old(stack: &LayerStack, report: &mut ConvertReport) -> Result<()> {
    let old_dir = stack.resolver().legacy_old_dir();
    let vault = stack.vault();

    let leftovers = scan(&old_dir);
    for profile in &leftovers.profiles {
        for prop in &profile.secure {
            let account = profile.secure_account(prop);
            match vault.delete_raw(&account) {
                Ok(()) => debug!(account = %account, "deleted legacy secure value"),
                Err(e) => report.warnings.push(Warning::from(e)),
            }
        }
    }

    if old_dir.exists() {
        fs::remove_dir_all(&old_dir).map_err(|e| ConfigError::io("delete", &old_dir, e))?;
        report
            .messages
            .push(format!("Deleted the profiles directory {}.", old_dir.display()));
        info!(dir = %old_dir.display(), "deleted legacy profiles");
    }
    report.deleted = true;
    Ok(())
}
