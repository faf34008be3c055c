//! TOML-based configuration.
//!
//! Supports a config file (relman.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [executor]
//! path = "${RELMAN_DB}"
//! busy_timeout_ms = 5000
//!
//! [insert]
//! default_mode = "insert_or_abort"
//!
//! [prefetch]
//! chunk_size = 500
//!
//! [logging]
//! log_statements = true
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::sql::InsertMode;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "RELMAN_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "relman.toml";

/// Path that selects an in-memory database.
pub const MEMORY_PATH: &str = ":memory:";

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Statement executor configuration.
    pub executor: ExecutorSettings,

    /// Insert defaults.
    pub insert: InsertSettings,

    /// Reference prefetching.
    pub prefetch: PrefetchSettings,

    /// Logging configuration.
    pub logging: LoggingSettings,
}

/// Executor configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ExecutorSettings {
    /// Database file (supports ${ENV_VAR} expansion). `None` or `:memory:`
    /// opens an in-memory database.
    pub path: Option<String>,

    /// How long a writer waits on a locked database, in milliseconds.
    pub busy_timeout_ms: u64,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: 5000,
        }
    }
}

impl ExecutorSettings {
    /// Database path with environment variables expanded.
    ///
    /// Returns `None` for an in-memory database.
    pub fn resolved_path(&self) -> Result<Option<PathBuf>, SettingsError> {
        match &self.path {
            None => Ok(None),
            Some(p) => {
                let expanded = expand_env_vars(p)?;
                if expanded == MEMORY_PATH {
                    Ok(None)
                } else {
                    Ok(Some(PathBuf::from(expanded)))
                }
            }
        }
    }
}

/// Insert defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct InsertSettings {
    /// Mode used by `create` when no explicit mode is given.
    pub default_mode: InsertMode,
}

/// Reference prefetching configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PrefetchSettings {
    /// Maximum number of keys bound into one `IN (...)` lookup.
    pub chunk_size: usize,
}

impl Default for PrefetchSettings {
    fn default() -> Self {
        Self { chunk_size: 500 }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Emit every executed statement at debug level.
    pub log_statements: bool,
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate settings from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `RELMAN_CONFIG`
    /// 2. `./relman.toml`
    ///
    /// Falls back to defaults when neither exists.
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var(CONFIG_ENV_VAR) {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        Ok(Settings::default())
    }

    /// Check value ranges serde cannot express.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.prefetch.chunk_size == 0 {
            return Err(SettingsError::InvalidConfig(
                "prefetch.chunk_size must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let mut var_name = String::new();
        if chars.peek() == Some(&'{') {
            chars.next();
            for ch in chars.by_ref() {
                if ch == '}' {
                    break;
                }
                var_name.push(ch);
            }
        } else {
            while let Some(ch) = chars.next_if(|ch| ch.is_alphanumeric() || *ch == '_') {
                var_name.push(ch);
            }
            if var_name.is_empty() {
                // Lone $, keep it
                result.push('$');
                continue;
            }
        }

        let value =
            env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
