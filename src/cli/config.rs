//! confirmgate configuration file handling
//!
//! Provides default configuration generation and loading for the operator
//! CLI. Configuration files are TOML.
//!
//! The confirm phrase is deliberately NOT configurable: it is a fixed
//! constant shared by every proposal.

use confirmgate::proposals::{ProposalSettings, DEFAULT_CONFIRM_WINDOW, DEFAULT_KEY_PREFIX};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default log level
const DEFAULT_LOG_LEVEL: &str = "info";

/// Environment variable overriding `confirm.window` (whole seconds)
pub const WINDOW_ENV_VAR: &str = "CONFIRMGATE_CONFIRM_WINDOW_SECS";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Failed to write config file '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid confirm window '{value}': {reason}")]
    InvalidWindow { value: String, reason: String },
}

/// confirmgate operator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Shared proposal store
    pub store: StoreConfig,

    /// Confirmation settings
    #[serde(default)]
    pub confirm: ConfirmConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which shared store backs the proposals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Database file shared by every process that opens it
    #[default]
    Sqlite,
    /// Private to one process (dry runs only)
    Memory,
}

/// Store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Path to the SQLite database (ignored by the memory backend)
    pub path: PathBuf,

    /// Namespace prepended to every proposal key
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

/// Confirmation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmConfig {
    /// How long a proposal waits for confirmation (humantime, e.g. "120s", "2m")
    #[serde(default = "default_window")]
    pub window: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    pub file: Option<PathBuf>,
}

fn default_key_prefix() -> String {
    DEFAULT_KEY_PREFIX.to_string()
}

fn default_window() -> String {
    format!("{}s", DEFAULT_CONFIRM_WINDOW.as_secs())
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for ConfirmConfig {
    fn default() -> Self {
        Self {
            window: default_window(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            file: None,
        }
    }
}

impl GateConfig {
    /// Create a new configuration with the given database path
    pub fn new(store_path: PathBuf) -> Self {
        Self {
            store: StoreConfig {
                backend: StoreBackend::Sqlite,
                path: store_path,
                key_prefix: default_key_prefix(),
            },
            confirm: ConfirmConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Load configuration from a TOML file, then apply environment overrides
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config: GateConfig =
            toml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        config.apply_window_override(std::env::var(WINDOW_ENV_VAR).ok());
        config.confirm_window()?;

        Ok(config)
    }

    /// Resolve the configuration for a command
    ///
    /// 1. `--config` path if provided (must exist)
    /// 2. Default config file if it exists
    /// 3. Built-in defaults with the default database path
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load(path);
        }

        let default_path = default_config_path();
        if default_path.exists() {
            return Self::load(&default_path);
        }

        let mut config = Self::new(default_store_path());
        config.apply_window_override(std::env::var(WINDOW_ENV_VAR).ok());
        config.confirm_window()?;
        Ok(config)
    }

    /// Replace the confirm window with `secs` seconds when set
    pub fn apply_window_override(&mut self, secs: Option<String>) {
        if let Some(secs) = secs {
            let secs = secs.trim();
            self.confirm.window = if secs.chars().all(|c| c.is_ascii_digit()) {
                format!("{}s", secs)
            } else {
                secs.to_string()
            };
        }
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        write_file(path, &contents)
    }

    /// Parsed confirm window
    pub fn confirm_window(&self) -> Result<Duration, ConfigError> {
        let value = self.confirm.window.trim();
        if value == "0" {
            return Ok(Duration::ZERO);
        }
        humantime::parse_duration(value).map_err(|e| ConfigError::InvalidWindow {
            value: value.to_string(),
            reason: e.to_string(),
        })
    }

    /// Library settings derived from this configuration
    pub fn proposal_settings(&self) -> Result<ProposalSettings, ConfigError> {
        Ok(ProposalSettings {
            confirm_window: self.confirm_window()?,
            key_prefix: self.store.key_prefix.clone(),
        })
    }

    /// Generate default configuration content as a string with comments
    pub fn generate_default_toml(store_path: &Path) -> String {
        format!(
            r#"# confirmgate Configuration
#
# Destructive actions are proposed first and confirmed later with a
# single-use token. Proposals live in a shared store so the confirm step
# may run in a different process than the propose step.
#
# The confirm phrase is fixed ("CONFIRM DELETE") and is not configurable.

[store]
# Backend: "sqlite" (shared by every process using the same file) or
# "memory" (private to one process, dry runs only)
backend = "sqlite"

# SQLite database holding live proposals
path = "{store_path}"

# Namespace for proposal keys
key_prefix = "{key_prefix}"

[confirm]
# How long a proposal can wait for its confirmation (e.g. "120s", "2m")
# Override with {env_var}=<seconds>
window = "{window}"

[logging]
# Log level: trace, debug, info, warn, error (RUST_LOG takes precedence)
level = "info"

# Log file path (optional, logs to stderr if not specified)
# file = "/var/log/confirmgate/confirmgate.log"
"#,
            store_path = store_path.display(),
            key_prefix = DEFAULT_KEY_PREFIX,
            env_var = WINDOW_ENV_VAR,
            window = default_window(),
        )
    }

    /// Create and save a default configuration file
    pub fn create_default(config_path: &Path, store_path: &Path) -> Result<(), ConfigError> {
        write_file(config_path, &Self::generate_default_toml(store_path))
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), ConfigError> {
    let write_err = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };

    // Create parent directory if needed
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }

    fs::write(path, contents).map_err(write_err)
}

/// Default config file path: `<config dir>/confirmgate/config.toml`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("confirmgate")
        .join("config.toml")
}

/// Default database path: `<data dir>/confirmgate/proposals.db`
pub fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("confirmgate")
        .join("proposals.db")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let store_path = PathBuf::from("/data/confirmgate/proposals.db");
        let config = GateConfig::new(store_path.clone());

        assert_eq!(config.store.path, store_path);
        assert_eq!(config.store.backend, StoreBackend::Sqlite);
        assert_eq!(config.store.key_prefix, "confirmgate:proposal:");
        assert_eq!(config.confirm_window().unwrap(), Duration::from_secs(120));
        assert_eq!(config.proposal_settings().unwrap(), ProposalSettings::default());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        let store_path = PathBuf::from("/data/confirmgate/proposals.db");

        let mut config = GateConfig::new(store_path.clone());
        config.confirm.window = "5m".to_string();
        config.save(&config_path).unwrap();

        let loaded = GateConfig::load(&config_path).unwrap();
        assert_eq!(loaded.store.path, store_path);
        assert_eq!(loaded.confirm.window, "5m");
        assert_eq!(loaded.logging.level, "info");
    }

    #[test]
    fn test_create_default_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");
        let store_path = temp_dir.path().join("proposals.db");

        GateConfig::create_default(&config_path, &store_path).unwrap();

        assert!(config_path.exists());

        // Verify it can be loaded
        let config = GateConfig::load(&config_path).unwrap();
        assert_eq!(config.store.path, store_path);
        assert_eq!(config.store.backend, StoreBackend::Sqlite);
    }

    #[test]
    fn test_generate_default_toml() {
        let store_path = PathBuf::from("/data/confirmgate/proposals.db");
        let toml = GateConfig::generate_default_toml(&store_path);

        assert!(toml.contains("path = \"/data/confirmgate/proposals.db\""));
        assert!(toml.contains("window = \"120s\""));
        assert!(toml.contains(WINDOW_ENV_VAR));
        // The phrase is a constant, never a setting
        assert!(!toml.contains("confirm_phrase ="));
    }

    #[test]
    fn test_load_config_with_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        // Write minimal config (only required fields)
        let minimal_config = r#"
[store]
path = "/tmp/proposals.db"
"#;
        fs::write(&config_path, minimal_config).unwrap();

        let config = GateConfig::load(&config_path).unwrap();

        // Verify defaults are applied
        assert_eq!(config.store.backend, StoreBackend::Sqlite);
        assert_eq!(config.store.key_prefix, "confirmgate:proposal:");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_memory_backend() {
        let config: GateConfig = toml::from_str(
            r#"
[store]
backend = "memory"
path = "unused"
"#,
        )
        .unwrap();
        assert_eq!(config.store.backend, StoreBackend::Memory);
    }

    #[test]
    fn test_load_rejects_bad_window() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(
            &config_path,
            "[store]\npath = \"/tmp/p.db\"\n[confirm]\nwindow = \"soon\"\n",
        )
        .unwrap();

        let err = GateConfig::load(&config_path).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidWindow { .. }));
    }

    #[test]
    fn test_resolve_explicit_path() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        let store_path = temp_dir.path().join("proposals.db");
        GateConfig::create_default(&config_path, &store_path).unwrap();

        let config = GateConfig::resolve(Some(&config_path)).unwrap();
        assert_eq!(config.store.path, store_path);
    }

    #[test]
    fn test_load_missing_file() {
        let err = GateConfig::load(Path::new("/nonexistent/confirmgate.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_window_parsing() {
        let mut config = GateConfig::new(PathBuf::from("/tmp/p.db"));

        config.confirm.window = "2m".to_string();
        assert_eq!(config.confirm_window().unwrap(), Duration::from_secs(120));

        config.confirm.window = "0".to_string();
        assert_eq!(config.confirm_window().unwrap(), Duration::ZERO);

        config.confirm.window = "90 seconds".to_string();
        assert_eq!(config.confirm_window().unwrap(), Duration::from_secs(90));
    }

    #[test]
    fn test_window_override() {
        let mut config = GateConfig::new(PathBuf::from("/tmp/p.db"));

        config.apply_window_override(None);
        assert_eq!(config.confirm_window().unwrap(), Duration::from_secs(120));

        config.apply_window_override(Some("30".to_string()));
        assert_eq!(config.confirm_window().unwrap(), Duration::from_secs(30));

        let settings = config.proposal_settings().unwrap();
        assert_eq!(settings.confirm_window, Duration::from_secs(30));
        assert_eq!(settings.key_prefix, "confirmgate:proposal:");
    }

    #[test]
    fn test_default_paths() {
        assert!(default_config_path().ends_with("confirmgate/config.toml"));
        assert!(default_store_path().ends_with("confirmgate/proposals.db"));
    }
}
