//! The four-layer stack.
//!
//! Reads walk the merged view in precedence order; writes target exactly
//! one layer and stay in memory until [`LayerStack::save`].

use super::document::{ConfigDocument, SecretView, to_pretty_json, write_atomic};
use super::paths::{Layer, LayerPaths, PathResolver};
use super::{dot_path, env, merge};
use crate::error::{ConfigError, ErrorKind, Result, Warning};
use crate::vault::{SECURE_ACCOUNT, SecureVault, path_key};
use serde_json::Value;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// How a text value given to [`LayerStack::set_text`] is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Route through the vault (`Some(true)`), force plaintext
    /// (`Some(false)`), or keep the property's current routing.
    pub secure: Option<bool>,
    /// Parse the text as JSON instead of coercing it.
    pub json: bool,
}

#[derive(Debug)]
pub struct LayerStack {
    resolver: PathResolver,
    paths: LayerPaths,
    docs: Vec<ConfigDocument>,
    vault: SecureVault,
    /// Stored secure values could not be read, so documents may be missing
    /// some. Saves then add to the vault instead of replacing.
    vault_load_failed: bool,
    warnings: Vec<Warning>,
}

impl LayerStack {
    /// Discover and load every layer, attaching stored secure values.
    pub fn load(resolver: PathResolver, vault: SecureVault) -> Result<Self> {
        let paths = resolver.resolve();
        let mut docs = Vec::with_capacity(Layer::ALL.len());
        for location in paths.iter() {
            docs.push(ConfigDocument::load(location)?);
        }

        let mut stack = Self {
            resolver,
            paths,
            docs,
            vault,
            vault_load_failed: false,
            warnings: Vec::new(),
        };
        stack.attach_vault_secrets();
        Ok(stack)
    }

    fn attach_vault_secrets(&mut self) {
        if self.docs.iter().all(|d| d.secure_fields().is_empty()) {
            return;
        }
        let blob = match self.vault.try_load(SECURE_ACCOUNT) {
            Ok(blob) => blob,
            Err(e) => {
                debug!(error = %e, "secure values not attached");
                self.vault_load_failed = true;
                self.collect_vault_warnings();
                return;
            }
        };
        for doc in &mut self.docs {
            let Some(path) = doc.path().filter(|_| doc.exists()) else {
                continue;
            };
            if let Some(Value::Object(entries)) = blob.get(&path_key(path)) {
                doc.attach_secrets(entries);
            }
        }
        self.collect_vault_warnings();
    }

    fn collect_vault_warnings(&mut self) {
        for warning in self.vault.take_warnings() {
            if !self.warnings.contains(&warning) {
                self.warnings.push(warning);
            }
        }
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn paths(&self) -> &LayerPaths {
        &self.paths
    }

    pub fn vault(&self) -> &SecureVault {
        &self.vault
    }

    pub fn layer(&self, layer: Layer) -> &ConfigDocument {
        &self.docs[layer.index()]
    }

    pub(crate) fn layer_mut(&mut self, layer: Layer) -> &mut ConfigDocument {
        &mut self.docs[layer.index()]
    }

    pub fn layers(&self) -> impl Iterator<Item = &ConfigDocument> {
        self.docs.iter()
    }

    pub fn exists(&self, layer: Layer) -> bool {
        self.layer(layer).exists()
    }

    /// First existing layer by precedence, or the project layer.
    pub fn active_layer(&self) -> Layer {
        Layer::ALL
            .into_iter()
            .find(|l| self.exists(*l))
            .unwrap_or(Layer::Project)
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn take_warnings(&mut self) -> Vec<Warning> {
        self.collect_vault_warnings();
        std::mem::take(&mut self.warnings)
    }

    pub fn push_warning(&mut self, warning: Warning) {
        self.warnings.push(warning);
    }

    /// Give a layer with no discovered file the path it would be created at.
    pub fn adopt_init_target(&mut self, layer: Layer) -> PathBuf {
        if let Some(path) = self.layer(layer).path() {
            return path.to_path_buf();
        }
        let target = self.resolver.init_target(layer);
        debug!(layer = %layer, path = %target.display(), "adopting init target");
        self.layer_mut(layer).set_path(target.clone());
        target
    }

    /// Merged view of all layers, highest precedence winning.
    pub fn merged(&self, secrets: SecretView, resolve_env: bool) -> Value {
        let views = self.docs.iter().map(|d| d.view(secrets)).collect();
        let mut merged = merge::merge_layers(views);
        if resolve_env {
            env::resolve_tree(&mut merged);
        }
        merged
    }

    /// Read a node from the merged view.
    ///
    /// Secure values appear as the placeholder unless `secure_resolve` is set.
    /// `$NAME` strings resolve from the environment.
    pub fn get(&self, path: &str, secure_resolve: bool) -> Option<Value> {
        let view = if secure_resolve {
            SecretView::Reveal
        } else {
            SecretView::Mask
        };
        dot_path::get(&self.merged(view, true), path).cloned()
    }

    /// Write a value into one layer.
    pub fn set(&mut self, layer: Layer, path: &str, value: Value, secure: Option<bool>) -> Result<()> {
        let doc = self.layer(layer);
        if doc.path().is_none() {
            return Err(ConfigError::ambiguous(
                layer,
                "no config file was found; initialize the layer first",
            ));
        }
        if let Some(var) = doc.stored_value(path).and_then(env::active_override) {
            return Err(ConfigError::EnvManagedConflict {
                path: path.to_string(),
                var,
            });
        }

        self.layer_mut(layer).set_value(path, value, secure)?;
        debug!(layer = %layer, path, "set config value");
        Ok(())
    }

    /// Write a value given as text: JSON when requested, coerced otherwise.
    /// A coerced value set on an existing array is appended to it.
    pub fn set_text(&mut self, layer: Layer, path: &str, raw: &str, opts: SetOptions) -> Result<()> {
        let value = if opts.json {
            serde_json::from_str(raw).map_err(|e| ConfigError::malformed("--json value", raw, e))?
        } else {
            let coerced = super::profiles::coerce_value(raw);
            match self.layer(layer).stored_value(path) {
                Some(Value::Array(items)) => {
                    let mut items = items.clone();
                    items.push(coerced);
                    Value::Array(items)
                }
                _ => coerced,
            }
        };
        self.set(layer, path, value, opts.secure)
    }

    /// Remove a node from one layer. Secure entries leave the vault on save.
    pub fn delete(&mut self, layer: Layer, path: &str) -> bool {
        self.layer_mut(layer).remove_value(path)
    }

    /// Commit a layer's secure values, then write its file atomically.
    pub fn save(&mut self, layer: Layer) -> Result<()> {
        let index = layer.index();
        let Some(path) = self.docs[index].path().map(PathBuf::from) else {
            return Err(ConfigError::ambiguous(
                layer,
                "no config file was found; initialize the layer first",
            ));
        };

        let secrets = self.docs[index].committable_secrets();
        let has_secrets = !secrets.is_empty();
        let stored = if self.vault_load_failed {
            debug!(layer = %layer, "secure values were never loaded, keeping stored entries");
            self.vault.merge(SECURE_ACCOUNT, &path, secrets)
        } else {
            self.vault.commit(SECURE_ACCOUNT, &path, secrets)
        };
        match stored {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::VaultUnavailable && !has_secrets => {
                debug!(layer = %layer, error = %e, "vault unreachable, no secure values to store");
            }
            Err(e) if e.kind() == ErrorKind::VaultUnavailable => {
                warn!(layer = %layer, error = %e, "secure values were not stored");
                self.warnings.push(Warning::vault(format!(
                    "secure values for {} were not stored: {e}",
                    path.display()
                )));
            }
            Err(e) => return Err(e),
        }

        self.docs[index].save()?;
        info!(layer = %layer, path = %path.display(), "layer saved");
        Ok(())
    }

    /// Save every layer with unsaved changes.
    pub fn save_dirty(&mut self) -> Result<Vec<Layer>> {
        let dirty: Vec<Layer> = Layer::ALL
            .into_iter()
            .filter(|l| self.layer(*l).is_dirty())
            .collect();
        for layer in &dirty {
            self.save(*layer)?;
        }
        Ok(dirty)
    }

    /// Write `schema` next to a layer's file and point `$schema` at it.
    pub fn set_schema(&mut self, layer: Layer, schema: &Value) -> Result<PathBuf> {
        let path = self.adopt_init_target(layer);
        let dir = path
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let name = self.resolver.schema_name();
        let schema_path = dir.join(&name);
        write_atomic(&schema_path, to_pretty_json(schema)?.as_bytes())?;
        self.layer_mut(layer).set_schema_ref(&format!("./{name}"));
        info!(path = %schema_path.display(), "wrote schema");
        Ok(schema_path)
    }

    /// Secure dot-paths declared in one layer.
    pub fn secure_fields(&self, layer: Layer) -> Vec<String> {
        self.layer(layer).secure_fields()
    }

    /// Remove vault entries whose config file is gone.
    pub fn prune_unused_secrets(&mut self) -> Result<Vec<String>> {
        let removed = self.vault.prune_missing(SECURE_ACCOUNT)?;
        self.collect_vault_warnings();
        Ok(removed)
    }
}
