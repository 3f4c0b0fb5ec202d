//! TOML-based configuration for sheetsql.
//!
//! Supports a config file (sheetsql.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [engine]
//! path = "./data/staging.db"
//! load_strategy = "batched"
//! batch_rows = 500
//!
//! [staging]
//! table = "sheet_data"
//! default_range = "A1:Z1000"
//! duplicate_headers = "suffix"
//!
//! [export]
//! tab_prefix = "Query Result"
//! spreadsheet_prefix = "SQL Export"
//!
//! [sheets]
//! backend = "google"
//! token = "${GOOGLE_OAUTH_TOKEN}"
//! timeout_secs = 30
//!
//! [logging]
//! level = "debug"
//! json = true
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::engine::IN_MEMORY;
use crate::pipeline::{DuplicateHeaders, LoadOptions, LoadStrategy, SessionSettings};
use crate::sheets::A1Range;
use crate::sql::is_quotable_identifier;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "SHEETSQL_CONFIG";

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
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub engine: EngineSettings,
    pub staging: StagingSettings,
    pub export: ExportSettings,
    pub sheets: SheetsSettings,
    pub logging: LoggingSettings,
}

/// Embedded engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Database file, or `:memory:` (supports ${ENV_VAR} expansion).
    pub path: String,

    /// How rows are inserted into the staging table.
    pub load_strategy: LoadStrategy,

    /// Rows per INSERT statement for the batched strategy.
    pub batch_rows: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        let load = LoadOptions::default();
        Self {
            path: IN_MEMORY.to_string(),
            load_strategy: load.strategy,
            batch_rows: load.batch_rows,
        }
    }
}

impl EngineSettings {
    /// Get the database path with environment variables expanded.
    pub fn resolved_path(&self) -> Result<String, SettingsError> {
        expand_env_vars(&self.path)
    }
}

/// Staging table configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StagingSettings {
    pub table: String,
    pub default_range: String,
    pub duplicate_headers: DuplicateHeaders,
}

impl Default for StagingSettings {
    fn default() -> Self {
        let session = SessionSettings::default();
        Self {
            table: session.load.table,
            default_range: session.default_range,
            duplicate_headers: session.duplicate_headers,
        }
    }
}

/// Export configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Prefix of generated result tab titles.
    pub tab_prefix: String,

    /// Prefix of generated destination spreadsheet titles.
    pub spreadsheet_prefix: String,

    /// Sheets API `valueInputOption` for result writes.
    pub value_input_option: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        let session = SessionSettings::default();
        Self {
            tab_prefix: session.tab_prefix,
            spreadsheet_prefix: session.spreadsheet_prefix,
            value_input_option: "USER_ENTERED".to_string(),
        }
    }
}

/// Spreadsheet backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Local JSON workbook file.
    #[default]
    Workbook,
    /// Google Sheets and Drive REST APIs.
    Google,
}

/// Spreadsheet service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SheetsSettings {
    pub backend: Backend,

    /// Workbook file for the `workbook` backend (supports ${ENV_VAR} expansion).
    pub workbook_path: String,

    /// OAuth bearer token for the `google` backend (supports ${ENV_VAR} expansion).
    pub token: String,

    pub sheets_api: String,
    pub drive_api: String,
    pub timeout_secs: u64,
}

impl Default for SheetsSettings {
    fn default() -> Self {
        Self {
            backend: Backend::Workbook,
            workbook_path: "workbook.json".to_string(),
            token: "${GOOGLE_OAUTH_TOKEN}".to_string(),
            sheets_api: crate::sheets::google::SHEETS_API.to_string(),
            drive_api: crate::sheets::google::DRIVE_API.to_string(),
            timeout_secs: 30,
        }
    }
}

impl SheetsSettings {
    pub fn resolved_workbook_path(&self) -> Result<PathBuf, SettingsError> {
        expand_env_vars(&self.workbook_path).map(PathBuf::from)
    }

    pub fn resolved_token(&self) -> Result<String, SettingsError> {
        expand_env_vars(&self.token)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive; `RUST_LOG` takes precedence.
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `SHEETSQL_CONFIG`
    /// 2. `./sheetsql.toml`
    /// 3. `~/.config/sheetsql/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var(CONFIG_ENV) {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("sheetsql.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("sheetsql").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    /// Check values that would otherwise fail later in the pipeline.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.staging.table.trim().is_empty() || !is_quotable_identifier(&self.staging.table) {
            return Err(SettingsError::InvalidConfig(format!(
                "staging.table {:?} is not a usable table name",
                self.staging.table
            )));
        }
        if A1Range::parse(&self.staging.default_range).is_err() {
            return Err(SettingsError::InvalidConfig(format!(
                "staging.default_range {:?} is not an A1 range",
                self.staging.default_range
            )));
        }
        if self.engine.batch_rows == 0 {
            return Err(SettingsError::InvalidConfig(
                "engine.batch_rows must be at least 1".to_string(),
            ));
        }
        if self.sheets.timeout_secs == 0 {
            return Err(SettingsError::InvalidConfig(
                "sheets.timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Pipeline tunables derived from these settings.
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            load: LoadOptions {
                table: self.staging.table.clone(),
                strategy: self.engine.load_strategy,
                batch_rows: self.engine.batch_rows,
            },
            default_range: self.staging.default_range.clone(),
            duplicate_headers: self.staging.duplicate_headers,
            tab_prefix: self.export.tab_prefix.clone(),
            spreadsheet_prefix: self.export.spreadsheet_prefix.clone(),
        }
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
            // $VAR ends at the first non-alphanumeric/underscore
            while let Some(ch) = chars.next_if(|ch| ch.is_alphanumeric() || *ch == '_') {
                var_name.push(ch);
            }
            if var_name.is_empty() {
                result.push('$');
                continue;
            }
        }

        let value = env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name))?;
        result.push_str(&value);
    }

    Ok(result)
}
