//! Configuration module for sheetsql.
//!
//! Handles the TOML settings file and environment variable expansion.

mod settings;

pub use settings::{
    expand_env_vars, Backend, EngineSettings, ExportSettings, LoggingSettings, Settings,
    SettingsError, SheetsSettings, StagingSettings, CONFIG_ENV,
};
