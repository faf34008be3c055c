//! Configuration module.
//!
//! Handles the TOML settings file and environment variable expansion.

mod settings;

pub use settings::{
    expand_env_vars, ExecutorSettings, InsertSettings, LoggingSettings, PrefetchSettings,
    Settings, SettingsError,
};
