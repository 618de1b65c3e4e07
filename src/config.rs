//! Configuration management for adowork.
//!
//! Connection settings come from two sources:
//! - A TOML file following the XDG Base Directory specification
//!   (`$XDG_CONFIG_HOME/adowork/config.toml`)
//! - Environment variables (`ADOWORK_ORGANIZATION_URL`, `ADOWORK_PROJECT`,
//!   `ADOWORK_DEFAULT_AREA_PATH`), which take precedence over the file
//!
//! Consumers never hold a config value across calls; they ask a
//! [`ConfigStore`] each time.
//!
//! ## Example
//!
//! ```rust
//! use adowork::config::{AdoConfig, ConfigStore, MemoryConfigStore};
//!
//! let store = MemoryConfigStore::default();
//! assert!(store.get_config().is_none());
//!
//! store
//!     .set_config(AdoConfig::new("https://dev.azure.com/my-org/", "my-project"))
//!     .unwrap();
//! let config = store.get_config().unwrap();
//! assert_eq!(config.organization_url, "https://dev.azure.com/my-org");
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::ConfigError;

/// Environment variable overriding the organization URL.
pub const ENV_ORGANIZATION_URL: &str = "ADOWORK_ORGANIZATION_URL";
/// Environment variable overriding the project name.
pub const ENV_PROJECT: &str = "ADOWORK_PROJECT";
/// Environment variable overriding the default area path.
pub const ENV_DEFAULT_AREA_PATH: &str = "ADOWORK_DEFAULT_AREA_PATH";

/// Connection settings for one Azure DevOps project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdoConfig {
    /// e.g. `https://dev.azure.com/my-org`, without trailing slash.
    pub organization_url: String,
    pub project_name: String,
    /// Area used by `create` and parent lookups when none is given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_area_path: Option<String>,
}

impl AdoConfig {
    /// Creates a config, stripping trailing slashes from the URL.
    pub fn new(organization_url: impl Into<String>, project_name: impl Into<String>) -> Self {
        Self {
            organization_url: organization_url.into().trim_end_matches('/').to_string(),
            project_name: project_name.into(),
            default_area_path: None,
        }
    }

    #[must_use]
    pub fn with_default_area_path(mut self, area_path: impl Into<String>) -> Self {
        self.default_area_path = Some(area_path.into());
        self
    }
}

/// Source of the current [`AdoConfig`].
pub trait ConfigStore: Send + Sync {
    /// The current configuration, or `None` when incomplete.
    fn get_config(&self) -> Option<AdoConfig>;

    /// Like [`get_config`](Self::get_config), but reports why the
    /// configuration could not be read. Stores that cannot fail keep the
    /// default.
    fn load_config(&self) -> Result<Option<AdoConfig>, ConfigError> {
        Ok(self.get_config())
    }

    /// Persists `config`, replacing what was there.
    fn set_config(&self, config: AdoConfig) -> Result<(), ConfigError>;
}

/// On-disk shape; every key is optional so partial files still load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct ConfigFile {
    organization_url: Option<String>,
    project_name: Option<String>,
    default_area_path: Option<String>,
}

impl ConfigFile {
    fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            organization_url: var(ENV_ORGANIZATION_URL),
            project_name: var(ENV_PROJECT),
            default_area_path: var(ENV_DEFAULT_AREA_PATH),
        }
    }

    /// Merge with another, preferring values from `other` when they exist.
    fn merge(self, other: Self) -> Self {
        Self {
            organization_url: other.organization_url.or(self.organization_url),
            project_name: other.project_name.or(self.project_name),
            default_area_path: other.default_area_path.or(self.default_area_path),
        }
    }

    fn into_config(self) -> Option<AdoConfig> {
        let config = AdoConfig::new(self.organization_url?, self.project_name?);
        Some(AdoConfig {
            default_area_path: self.default_area_path.filter(|p| !p.is_empty()),
            ..config
        })
    }
}

impl From<AdoConfig> for ConfigFile {
    fn from(config: AdoConfig) -> Self {
        Self {
            organization_url: Some(config.organization_url),
            project_name: Some(config.project_name),
            default_area_path: config.default_area_path,
        }
    }
}

/// Config stored in a TOML file, optionally overlaid with environment
/// variables.
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
    env_overrides: bool,
}

impl FileConfigStore {
    /// Store backed by `path`, ignoring the environment.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            env_overrides: false,
        }
    }

    /// Store at the XDG location, with environment overrides enabled.
    pub fn default_location() -> Result<Self, ConfigError> {
        Ok(Self::new(Self::default_path()?).with_env_overrides())
    }

    /// `$XDG_CONFIG_HOME/adowork/config.toml`, falling back to
    /// `~/.config/adowork/config.toml`.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let config_dir = match std::env::var("XDG_CONFIG_HOME") {
            Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => dirs::home_dir()
                .ok_or(ConfigError::NoConfigDir)?
                .join(".config"),
        };
        Ok(config_dir.join("adowork").join("config.toml"))
    }

    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        self.env_overrides = true;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_file(&self) -> Result<ConfigFile, ConfigError> {
        if !self.path.exists() {
            return Ok(ConfigFile::default());
        }
        let content = fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }

    /// File contents merged with the environment, or the first I/O or
    /// parse failure.
    pub fn load(&self) -> Result<Option<AdoConfig>, ConfigError> {
        let mut merged = self.load_file()?;
        if self.env_overrides {
            merged = merged.merge(ConfigFile::from_env());
        }
        Ok(merged.into_config())
    }
}

impl ConfigStore for FileConfigStore {
    fn get_config(&self) -> Option<AdoConfig> {
        match self.load() {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                None
            }
        }
    }

    fn load_config(&self) -> Result<Option<AdoConfig>, ConfigError> {
        self.load()
    }

    fn set_config(&self, config: AdoConfig) -> Result<(), ConfigError> {
        let write_error = |e: &dyn std::fmt::Display| ConfigError::Write {
            path: self.path.clone(),
            message: e.to_string(),
        };

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| write_error(&e))?;
        }
        let content =
            toml::to_string_pretty(&ConfigFile::from(config)).map_err(|e| write_error(&e))?;
        fs::write(&self.path, content).map_err(|e| write_error(&e))?;
        tracing::info!(path = %self.path.display(), "Saved configuration");
        Ok(())
    }
}

/// Config held in memory, for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    config: Mutex<Option<AdoConfig>>,
}

impl MemoryConfigStore {
    pub fn new(config: Option<AdoConfig>) -> Self {
        Self {
            config: Mutex::new(config),
        }
    }
}

impl ConfigStore for MemoryConfigStore {
    fn get_config(&self) -> Option<AdoConfig> {
        self.config
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn set_config(&self, config: AdoConfig) -> Result<(), ConfigError> {
        *self
            .config
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(config);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::file_serial;
    use std::env;
    use tempfile::TempDir;

    fn clear_env() {
        unsafe {
            env::remove_var(ENV_ORGANIZATION_URL);
            env::remove_var(ENV_PROJECT);
            env::remove_var(ENV_DEFAULT_AREA_PATH);
        }
    }

    #[test]
    fn test_new_strips_trailing_slash() {
        let config = AdoConfig::new("https://dev.azure.com/org//", "proj");
        assert_eq!(config.organization_url, "https://dev.azure.com/org");
        assert!(config.default_area_path.is_none());
    }

    /// # Missing File
    ///
    /// Tests that an absent config file means "not configured".
    ///
    /// ## Test Scenario
    /// - Points the store at a path that does not exist
    ///
    /// ## Expected Outcome
    /// - get_config returns None; load returns Ok(None)
    #[test]
    fn test_missing_file_is_unconfigured() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileConfigStore::new(temp_dir.path().join("config.toml"));
        assert!(store.get_config().is_none());
        assert!(matches!(store.load(), Ok(None)));
    }

    /// # Save and Reload
    ///
    /// Tests that a saved config reads back unchanged.
    ///
    /// ## Test Scenario
    /// - Saves into a nested directory that does not exist yet
    /// - Reads it back through a second store instance
    ///
    /// ## Expected Outcome
    /// - Directory is created and the config round-trips
    #[test]
    fn test_set_then_get() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("adowork").join("config.toml");
        let config = AdoConfig::new("https://dev.azure.com/org", "proj")
            .with_default_area_path("proj\\Team");

        FileConfigStore::new(&path)
            .set_config(config.clone())
            .unwrap();

        assert!(path.exists());
        assert_eq!(FileConfigStore::new(&path).get_config(), Some(config));
    }

    /// # Partial and Invalid Files
    ///
    /// Tests files that lack required keys or are not TOML.
    ///
    /// ## Test Scenario
    /// - File has only organization_url
    /// - File contains invalid TOML
    ///
    /// ## Expected Outcome
    /// - Partial file is unconfigured
    /// - Invalid file yields ConfigError::Parse from load and load_config,
    ///   and None from get_config
    #[test]
    fn test_partial_and_invalid_files() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        fs::write(&path, "organization_url = \"https://dev.azure.com/org\"\n").unwrap();
        assert!(FileConfigStore::new(&path).get_config().is_none());

        fs::write(&path, "this is = = not toml").unwrap();
        let store = FileConfigStore::new(&path);
        assert!(matches!(store.load(), Err(ConfigError::Parse { .. })));
        assert!(matches!(store.load_config(), Err(ConfigError::Parse { .. })));
        assert!(store.get_config().is_none());
    }

    /// # Environment Overrides
    ///
    /// Tests that environment variables take precedence over the file.
    ///
    /// ## Test Scenario
    /// - File sets organization and project
    /// - Environment overrides the project and adds a default area path
    ///
    /// ## Expected Outcome
    /// - Organization from file, project and area from environment
    /// - A store without overrides ignores the environment
    #[test]
    #[file_serial(env_tests)]
    fn test_env_overrides_file() {
        clear_env();
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(
            &path,
            "organization_url = \"https://dev.azure.com/file-org/\"\nproject_name = \"file-proj\"\n",
        )
        .unwrap();

        unsafe {
            env::set_var(ENV_PROJECT, "env-proj");
            env::set_var(ENV_DEFAULT_AREA_PATH, "env-proj\\Team");
        }

        let with_env = FileConfigStore::new(&path).with_env_overrides().get_config();
        let without_env = FileConfigStore::new(&path).get_config();
        clear_env();

        let config = with_env.unwrap();
        assert_eq!(config.organization_url, "https://dev.azure.com/file-org");
        assert_eq!(config.project_name, "env-proj");
        assert_eq!(config.default_area_path.as_deref(), Some("env-proj\\Team"));

        assert_eq!(without_env.unwrap().project_name, "file-proj");
    }

    #[test]
    #[file_serial(env_tests)]
    fn test_env_only_configuration() {
        clear_env();
        let temp_dir = TempDir::new().unwrap();
        unsafe {
            env::set_var(ENV_ORGANIZATION_URL, "https://dev.azure.com/env-org");
            env::set_var(ENV_PROJECT, "env-proj");
        }
        let config = FileConfigStore::new(temp_dir.path().join("missing.toml"))
            .with_env_overrides()
            .get_config();
        clear_env();

        assert_eq!(
            config,
            Some(AdoConfig::new("https://dev.azure.com/env-org", "env-proj"))
        );
    }

    /// # XDG Config Path
    ///
    /// Tests that XDG_CONFIG_HOME determines the default location.
    ///
    /// ## Test Scenario
    /// - Sets XDG_CONFIG_HOME to a temp dir
    ///
    /// ## Expected Outcome
    /// - Path is `<dir>/adowork/config.toml`
    #[test]
    #[file_serial(env_tests)]
    fn test_default_path_uses_xdg_config_home() {
        let temp_dir = TempDir::new().unwrap();
        let original_xdg = env::var("XDG_CONFIG_HOME").ok();
        unsafe {
            env::set_var("XDG_CONFIG_HOME", temp_dir.path());
        }

        let path = FileConfigStore::default_path();

        match original_xdg {
            Some(val) => unsafe {
                env::set_var("XDG_CONFIG_HOME", val);
            },
            None => unsafe {
                env::remove_var("XDG_CONFIG_HOME");
            },
        }

        assert_eq!(
            path.unwrap(),
            temp_dir.path().join("adowork").join("config.toml")
        );
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryConfigStore::default();
        assert!(store.get_config().is_none());
        let config = AdoConfig::new("https://dev.azure.com/org", "proj");
        store.set_config(config.clone()).unwrap();
        assert_eq!(store.get_config(), Some(config));
    }
}
