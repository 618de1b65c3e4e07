//! Storage for the Personal Access Token.
//!
//! The PAT is only ever handed around as a [`SecretString`]. Three stores are
//! provided:
//! - [`KeyringSecretStore`]: the OS credential store (Keychain, Credential
//!   Manager, Secret Service), which encrypts at rest
//! - [`EnvSecretStore`]: read-only, from `ADOWORK_PAT`
//! - [`MemorySecretStore`]: process-local, for tests and embedding

use secrecy::{ExposeSecret, SecretString};
use std::sync::Mutex;

use crate::error::ConfigError;

/// Environment variable read by [`EnvSecretStore`].
pub const ENV_PAT: &str = "ADOWORK_PAT";

/// Holder of the PAT.
pub trait SecretStore: Send + Sync {
    /// The stored PAT, if any.
    fn get_secret(&self) -> Option<SecretString>;

    /// Replaces the stored PAT.
    fn set_secret(&self, value: SecretString) -> Result<(), ConfigError>;

    /// Removes the stored PAT. Clearing an empty store succeeds.
    fn clear_secret(&self) -> Result<(), ConfigError>;

    fn has_secret(&self) -> bool {
        self.get_secret().is_some()
    }
}

/// PAT kept in the operating system's credential store.
#[derive(Debug, Clone)]
pub struct KeyringSecretStore {
    service: String,
    account: String,
}

impl KeyringSecretStore {
    pub const DEFAULT_SERVICE: &'static str = "adowork";
    pub const DEFAULT_ACCOUNT: &'static str = "pat";

    pub fn new(service: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            account: account.into(),
        }
    }

    fn entry(&self) -> Result<keyring::Entry, ConfigError> {
        keyring::Entry::new(&self.service, &self.account)
            .map_err(|e| ConfigError::SecretStore(e.to_string()))
    }
}

impl Default for KeyringSecretStore {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SERVICE, Self::DEFAULT_ACCOUNT)
    }
}

impl SecretStore for KeyringSecretStore {
    fn get_secret(&self) -> Option<SecretString> {
        let entry = match self.entry() {
            Ok(entry) => entry,
            Err(e) => {
                tracing::error!(error = %e, "Failed to open keyring entry");
                return None;
            }
        };
        match entry.get_password() {
            Ok(pat) if !pat.is_empty() => Some(SecretString::from(pat)),
            Ok(_) | Err(keyring::Error::NoEntry) => None,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read PAT from keyring");
                None
            }
        }
    }

    fn set_secret(&self, value: SecretString) -> Result<(), ConfigError> {
        self.entry()?
            .set_password(value.expose_secret())
            .map_err(|e| ConfigError::SecretStore(e.to_string()))?;
        tracing::info!(service = %self.service, "Stored PAT in keyring");
        Ok(())
    }

    fn clear_secret(&self) -> Result<(), ConfigError> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(ConfigError::SecretStore(e.to_string())),
        }
    }
}

/// PAT read from an environment variable. Writes are rejected.
#[derive(Debug, Clone)]
pub struct EnvSecretStore {
    var: String,
}

impl EnvSecretStore {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }

    fn read_only(&self) -> ConfigError {
        ConfigError::SecretStore(format!(
            "PAT is read from ${} and cannot be changed here",
            self.var
        ))
    }
}

impl Default for EnvSecretStore {
    fn default() -> Self {
        Self::new(ENV_PAT)
    }
}

impl SecretStore for EnvSecretStore {
    fn get_secret(&self) -> Option<SecretString> {
        std::env::var(&self.var)
            .ok()
            .filter(|v| !v.is_empty())
            .map(SecretString::from)
    }

    fn set_secret(&self, _value: SecretString) -> Result<(), ConfigError> {
        Err(self.read_only())
    }

    fn clear_secret(&self) -> Result<(), ConfigError> {
        Err(self.read_only())
    }
}

/// PAT held in process memory.
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    secret: Mutex<Option<SecretString>>,
}

impl MemorySecretStore {
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: Mutex::new(secret.map(SecretString::from)),
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<SecretString>> {
        self.secret
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SecretStore for MemorySecretStore {
    fn get_secret(&self) -> Option<SecretString> {
        self.slot().clone()
    }

    fn set_secret(&self, value: SecretString) -> Result<(), ConfigError> {
        *self.slot() = Some(value);
        Ok(())
    }

    fn clear_secret(&self) -> Result<(), ConfigError> {
        *self.slot() = None;
        Ok(())
    }
}
