//! Credential-store backends.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Failure talking to a credential backend. Absence is not an error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No backend installed, locked, or access denied.
    #[error("credential store unavailable: {0}")]
    Unavailable(String),
    #[error("credential store error: {0}")]
    Backend(String),
}

/// Minimal credential-store capability: one string secret per
/// (service, account) pair.
pub trait CredentialStore: Send + Sync + fmt::Debug {
    /// `Ok(None)` when the account has no secret.
    fn get_secret(&self, service: &str, account: &str) -> Result<Option<String>, StoreError>;

    fn set_secret(&self, service: &str, account: &str, secret: &str) -> Result<(), StoreError>;

    /// Deleting an absent account succeeds.
    fn delete_secret(&self, service: &str, account: &str) -> Result<(), StoreError>;

    fn name(&self) -> &'static str;
}

/// Which backend to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum StoreKind {
    /// OS keychain (macOS Keychain, Windows Credential Manager, Linux keyutils)
    #[default]
    Keyring,
    /// Process-local map, for CI and headless use
    Memory,
    /// No backend: every access reports unavailable
    None,
}

impl std::str::FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "keyring" | "os" => Ok(StoreKind::Keyring),
            "memory" | "mem" => Ok(StoreKind::Memory),
            "none" | "off" => Ok(StoreKind::None),
            _ => Err(format!("unknown vault backend: {s}")),
        }
    }
}

pub fn open_store(kind: StoreKind) -> Arc<dyn CredentialStore> {
    match kind {
        StoreKind::Keyring => Arc::new(super::keychain::KeyringStore),
        StoreKind::Memory => Arc::new(MemoryStore::default()),
        StoreKind::None => Arc::new(UnavailableStore),
    }
}

/// In-memory backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<(String, String), String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<(String, String), String>>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }
}

impl CredentialStore for MemoryStore {
    fn get_secret(&self, service: &str, account: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .lock()?
            .get(&(service.to_string(), account.to_string()))
            .cloned())
    }

    fn set_secret(&self, service: &str, account: &str, secret: &str) -> Result<(), StoreError> {
        self.lock()?
            .insert((service.to_string(), account.to_string()), secret.to_string());
        Ok(())
    }

    fn delete_secret(&self, service: &str, account: &str) -> Result<(), StoreError> {
        self.lock()?
            .remove(&(service.to_string(), account.to_string()));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Backend that is never reachable.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableStore;

impl CredentialStore for UnavailableStore {
    fn get_secret(&self, _service: &str, _account: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Unavailable("no credential backend configured".to_string()))
    }

    fn set_secret(&self, _service: &str, _account: &str, _secret: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("no credential backend configured".to_string()))
    }

    fn delete_secret(&self, _service: &str, _account: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("no credential backend configured".to_string()))
    }

    fn name(&self) -> &'static str {
        "none"
    }
}
