//! OS keychain backend.

use super::store::{CredentialStore, StoreError};
use keyring::Entry;

#[derive(Debug, Default, Clone, Copy)]
pub struct KeyringStore;

fn entry(service: &str, account: &str) -> Result<Entry, StoreError> {
    Entry::new(service, account).map_err(map_error)
}

fn map_error(err: keyring::Error) -> StoreError {
    match err {
        keyring::Error::NoStorageAccess(e) => StoreError::Unavailable(e.to_string()),
        keyring::Error::PlatformFailure(e) => StoreError::Unavailable(e.to_string()),
        other => StoreError::Backend(other.to_string()),
    }
}

impl CredentialStore for KeyringStore {
    fn get_secret(&self, service: &str, account: &str) -> Result<Option<String>, StoreError> {
        match entry(service, account)?.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(map_error(e)),
        }
    }

    fn set_secret(&self, service: &str, account: &str, secret: &str) -> Result<(), StoreError> {
        entry(service, account)?
            .set_password(secret)
            .map_err(map_error)?;

        // Read back through a new entry. A backend that only keeps the
        // value on the entry instance has not persisted anything.
        match entry(service, account)?.get_password() {
            Ok(stored) if stored == secret => Ok(()),
            Ok(_) => Err(StoreError::Backend(
                "keyring verification failed: stored data mismatch".to_string(),
            )),
            Err(keyring::Error::NoEntry) => Err(StoreError::Unavailable(
                "keyring verification failed: credential not persisted".to_string(),
            )),
            Err(e) => Err(map_error(e)),
        }
    }

    fn delete_secret(&self, service: &str, account: &str) -> Result<(), StoreError> {
        match entry(service, account)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(map_error(e)),
        }
    }

    fn name(&self) -> &'static str {
        "keyring"
    }
}
