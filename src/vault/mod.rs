//! Secure value mediation.
//!
//! Every secure value for every config file lives in one blob stored under a
//! single credential-store account:
//!
//! ```text
//! base64( { "<absolute config path>": { "<dot path>": <value>, ... }, ... } )
//! ```
//!
//! The blob is re-read before each mutation and written back in one swap.
//! An unreachable backend is reported as a warning and never fails a read.

mod keychain;
mod store;

pub use keychain::KeyringStore;
pub use store::{CredentialStore, MemoryStore, StoreError, StoreKind, UnavailableStore, open_store};

use crate::error::{ConfigError, Result, Warning};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Account holding the secure property blob.
pub const SECURE_ACCOUNT: &str = "secure_config_props";

/// Decoded blob: config path -> (dot path -> value).
pub type VaultBlob = Map<String, Value>;

#[derive(Debug, Default)]
struct VaultState {
    blob: VaultBlob,
    warnings: Vec<Warning>,
}

#[derive(Debug, Clone)]
pub struct SecureVault {
    store: Arc<dyn CredentialStore>,
    service: String,
    state: Arc<Mutex<VaultState>>,
}

impl SecureVault {
    pub fn new(store: Arc<dyn CredentialStore>, service: impl Into<String>) -> Self {
        Self {
            store,
            service: service.into(),
            state: Arc::new(Mutex::new(VaultState::default())),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.name()
    }

    /// Drain warnings recorded since the last call.
    pub fn take_warnings(&self) -> Vec<Warning> {
        self.with_state(|state| std::mem::take(&mut state.warnings))
    }

    /// Read and decode the blob. Unavailable or corrupt blobs read as empty.
    pub fn load(&self, account: &str) -> VaultBlob {
        self.try_load(account).unwrap_or_default()
    }

    /// Like [`SecureVault::load`], but an unreachable backend is an error
    /// so callers can tell "nothing stored" from "could not look".
    pub fn try_load(&self, account: &str) -> Result<VaultBlob> {
        let blob = match self.store.get_secret(&self.service, account) {
            Ok(Some(encoded)) => match decode_blob(&encoded) {
                Ok(blob) => blob,
                Err(reason) => {
                    warn!(account, error = %reason, "corrupted vault blob, treating as empty");
                    self.record(Warning::vault(format!(
                        "stored secure values for {account} could not be decoded: {reason}"
                    )));
                    VaultBlob::new()
                }
            },
            Ok(None) => VaultBlob::new(),
            Err(e) => {
                warn!(account, backend = self.store.name(), error = %e, "vault unavailable");
                self.record(Warning::vault(format!(
                    "secure values could not be loaded: {e}"
                )));
                return Err(ConfigError::VaultUnavailable(e.to_string()));
            }
        };
        self.with_state(|state| state.blob = blob.clone());
        Ok(blob)
    }

    /// Whether the backend answered the last read.
    pub fn is_available(&self) -> bool {
        !matches!(
            self.store.get_secret(&self.service, SECURE_ACCOUNT),
            Err(StoreError::Unavailable(_))
        )
    }

    pub fn get(&self, account: &str, config_path: &Path, dot_path: &str) -> Option<Value> {
        self.load(account)
            .get(&path_key(config_path))
            .and_then(|entries| entries.get(dot_path))
            .cloned()
    }

    /// Secure entries stored for one config file.
    pub fn entries(&self, account: &str, config_path: &Path) -> Map<String, Value> {
        match self.load(account).get(&path_key(config_path)) {
            Some(Value::Object(entries)) => entries.clone(),
            _ => Map::new(),
        }
    }

    pub fn set(&self, account: &str, config_path: &Path, dot_path: &str, value: Value) -> Result<()> {
        let mut blob = self.fresh(account)?;
        let key = path_key(config_path);
        match blob.get_mut(&key) {
            Some(Value::Object(entries)) => {
                entries.insert(dot_path.to_string(), value);
            }
            _ => {
                let mut entries = Map::new();
                entries.insert(dot_path.to_string(), value);
                blob.insert(key, Value::Object(entries));
            }
        }
        self.persist(account, blob)?;
        debug!(path = %config_path.display(), dot_path, "stored secure value");
        Ok(())
    }

    /// Remove one entry, pruning empty sub-maps and the blob itself.
    pub fn delete(&self, account: &str, config_path: &Path, dot_path: &str) -> Result<bool> {
        let mut blob = self.fresh(account)?;
        let key = path_key(config_path);
        let Some(Value::Object(entries)) = blob.get_mut(&key) else {
            return Ok(false);
        };
        if entries.shift_remove(dot_path).is_none() {
            return Ok(false);
        }
        if entries.is_empty() {
            blob.shift_remove(&key);
        }
        self.persist(account, blob)?;
        Ok(true)
    }

    /// Replace every entry for one config file in a single write.
    pub fn commit(&self, account: &str, config_path: &Path, entries: Map<String, Value>) -> Result<()> {
        let mut blob = self.fresh(account)?;
        let key = path_key(config_path);
        let current = blob.get(&key).cloned();

        if entries.is_empty() {
            if current.is_none() {
                return Ok(());
            }
            blob.shift_remove(&key);
        } else {
            if current.as_ref() == Some(&Value::Object(entries.clone())) {
                return Ok(());
            }
            blob.insert(key, Value::Object(entries));
        }
        self.persist(account, blob)?;
        info!(path = %config_path.display(), "committed secure values");
        Ok(())
    }

    /// Add entries for one config file, keeping the ones already stored.
    pub fn merge(&self, account: &str, config_path: &Path, entries: Map<String, Value>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut blob = self.fresh(account)?;
        let key = path_key(config_path);
        let mut merged = match blob.get(&key) {
            Some(Value::Object(current)) => current.clone(),
            _ => Map::new(),
        };
        merged.extend(entries);
        blob.insert(key, Value::Object(merged));
        self.persist(account, blob)?;
        info!(path = %config_path.display(), "merged secure values");
        Ok(())
    }

    /// Drop entries whose config file no longer exists. Returns removed paths.
    pub fn prune_missing(&self, account: &str) -> Result<Vec<String>> {
        let mut blob = self.fresh(account)?;
        let missing: Vec<String> = blob
            .keys()
            .filter(|path| !Path::new(path.as_str()).exists())
            .cloned()
            .collect();
        if missing.is_empty() {
            return Ok(missing);
        }
        for path in &missing {
            blob.shift_remove(path);
        }
        self.persist(account, blob)?;
        info!(count = missing.len(), "pruned secure values of deleted config files");
        Ok(missing)
    }

    /// Raw string stored under an arbitrary account.
    pub fn get_raw(&self, account: &str) -> Result<Option<String>> {
        self.store
            .get_secret(&self.service, account)
            .map_err(|e| ConfigError::VaultUnavailable(e.to_string()))
    }

    pub fn delete_raw(&self, account: &str) -> Result<()> {
        self.store
            .delete_secret(&self.service, account)
            .map_err(|e| ConfigError::VaultUnavailable(e.to_string()))
    }

    /// Re-read the blob for a mutation. Unlike `load`, failures propagate.
    fn fresh(&self, account: &str) -> Result<VaultBlob> {
        let encoded = self
            .store
            .get_secret(&self.service, account)
            .map_err(|e| ConfigError::VaultUnavailable(e.to_string()))?;
        let blob = match encoded {
            Some(encoded) => decode_blob(&encoded).unwrap_or_else(|reason| {
                warn!(account, error = %reason, "corrupted vault blob, starting fresh");
                VaultBlob::new()
            }),
            None => VaultBlob::new(),
        };
        Ok(blob)
    }

    fn persist(&self, account: &str, blob: VaultBlob) -> Result<()> {
        let result = if blob.is_empty() {
            self.store.delete_secret(&self.service, account)
        } else {
            self.store
                .set_secret(&self.service, account, &encode_blob(&blob)?)
        };
        result.map_err(|e| ConfigError::VaultUnavailable(e.to_string()))?;
        self.with_state(|state| state.blob = blob);
        Ok(())
    }

    fn record(&self, warning: Warning) {
        self.with_state(|state| state.warnings.push(warning));
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut VaultState) -> T) -> T {
        match self.state.lock() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}

pub fn path_key(path: &Path) -> String {
    path.display().to_string()
}

pub fn encode_blob(blob: &VaultBlob) -> Result<String> {
    let json = serde_json::to_string(blob)
        .map_err(|e| ConfigError::malformed("vault blob", "", e))?;
    Ok(STANDARD.encode(json))
}

pub fn decode_blob(encoded: &str) -> std::result::Result<VaultBlob, String> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| format!("invalid base64: {e}"))?;
    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(blob)) => Ok(blob),
        Ok(_) => Err("blob is not a JSON object".to_string()),
        Err(e) => Err(format!("invalid JSON: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn memory_vault() -> (SecureVault, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (SecureVault::new(store.clone(), "teamcfg"), store)
    }

    #[test]
    fn test_set_creates_blob_lazily() {
        let (vault, store) = memory_vault();
        assert!(store.is_empty());

        let path = Path::new("/proj/teamcfg.config.json");
        vault
            .set(SECURE_ACCOUNT, path, "profiles.base.properties.secret", json!("s3cr3t"))
            .unwrap();

        let raw = store.get_secret("teamcfg", SECURE_ACCOUNT).unwrap().unwrap();
        let blob = decode_blob(&raw).unwrap();
        assert_eq!(
            Value::Object(blob),
            json!({"/proj/teamcfg.config.json": {"profiles.base.properties.secret": "s3cr3t"}})
        );
        assert_eq!(
            vault.get(SECURE_ACCOUNT, path, "profiles.base.properties.secret"),
            Some(json!("s3cr3t"))
        );
    }

    #[test]
    fn test_delete_last_entry_removes_blob() {
        let (vault, store) = memory_vault();
        let a = Path::new("/a/teamcfg.config.json");
        let b = Path::new("/b/teamcfg.config.json");
        vault.set(SECURE_ACCOUNT, a, "profiles.x.properties.p", json!(1)).unwrap();
        vault.set(SECURE_ACCOUNT, b, "profiles.y.properties.q", json!(2)).unwrap();

        assert!(vault.delete(SECURE_ACCOUNT, a, "profiles.x.properties.p").unwrap());
        let blob = vault.load(SECURE_ACCOUNT);
        assert!(!blob.contains_key("/a/teamcfg.config.json"));
        assert!(blob.contains_key("/b/teamcfg.config.json"));

        assert!(vault.delete(SECURE_ACCOUNT, b, "profiles.y.properties.q").unwrap());
        assert!(store.is_empty());
        assert!(!vault.delete(SECURE_ACCOUNT, b, "profiles.y.properties.q").unwrap());
    }

    #[test]
    fn test_commit_replaces_sub_map() {
        let (vault, _store) = memory_vault();
        let path = Path::new("/p/teamcfg.config.json");
        vault.set(SECURE_ACCOUNT, path, "old", json!("x")).unwrap();

        let mut entries = Map::new();
        entries.insert("new".to_string(), json!("y"));
        vault.commit(SECURE_ACCOUNT, path, entries).unwrap();

        assert_eq!(vault.entries(SECURE_ACCOUNT, path), json!({"new": "y"}).as_object().unwrap().clone());
    }

    #[test]
    fn test_unavailable_backend_reads_empty_with_warning() {
        let vault = SecureVault::new(Arc::new(UnavailableStore), "teamcfg");
        let blob = vault.load(SECURE_ACCOUNT);
        assert!(blob.is_empty());

        let warnings = vault.take_warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, ErrorKind::VaultUnavailable);
        assert!(vault.take_warnings().is_empty());
        assert!(!vault.is_available());
    }

    #[test]
    fn test_unavailable_backend_fails_writes() {
        let vault = SecureVault::new(Arc::new(UnavailableStore), "teamcfg");
        let err = vault
            .set(SECURE_ACCOUNT, Path::new("/x"), "a", json!(1))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::VaultUnavailable);
    }

    #[test]
    fn test_corrupted_blob_treated_as_empty() {
        let (vault, store) = memory_vault();
        store.set_secret("teamcfg", SECURE_ACCOUNT, "%%% not base64").unwrap();
        assert!(vault.load(SECURE_ACCOUNT).is_empty());
        assert_eq!(vault.take_warnings().len(), 1);
    }

    #[test]
    fn test_prune_missing() {
        let (vault, _store) = memory_vault();
        let temp = tempfile::TempDir::new().unwrap();
        let present = temp.path().join("teamcfg.config.json");
        std::fs::write(&present, "{}").unwrap();
        let gone = temp.path().join("gone/teamcfg.config.json");

        vault.set(SECURE_ACCOUNT, &present, "a", json!(1)).unwrap();
        vault.set(SECURE_ACCOUNT, &gone, "b", json!(2)).unwrap();

        let removed = vault.prune_missing(SECURE_ACCOUNT).unwrap();
        assert_eq!(removed, vec![gone.display().to_string()]);
        assert_eq!(vault.get(SECURE_ACCOUNT, &present, "a"), Some(json!(1)));
    }
}
