// Configuration loading and parsing (config/pickboard.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Shipped default configuration, written to `config/` on first run.
pub const DEFAULT_CONFIG: &str = include_str!("../defaults/pickboard.toml");

pub const CONFIG_FILE: &str = "pickboard.toml";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },

    #[error("could not determine a data directory for the board database; set storage.db_path")]
    NoDataDir,
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Explicit SQLite file. Falls back to the platform data directory.
    #[serde(default)]
    pub db_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    pub directory: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        ExportConfig {
            directory: ".".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub directory: String,
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            directory: "logs".into(),
            filter: "pickboard=info,pickboard_core=info,warn".into(),
        }
    }
}

impl Config {
    /// Resolve where the SQLite board lives: `storage.db_path` if set,
    /// otherwise `pickboard.db` under the platform data directory.
    pub fn db_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.storage.db_path {
            return Ok(PathBuf::from(path));
        }
        directories::ProjectDirs::from("", "", "pickboard")
            .map(|dirs| dirs.data_dir().join("pickboard.db"))
            .ok_or(ConfigError::NoDataDir)
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate `config/pickboard.toml` relative to `base_dir`.
///
/// This is the lower-level loading primitive that does not write defaults.
/// Prefer `load_config()` which handles default initialization automatically.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE);
    let text = read_file(&path)?;
    let config: Config = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;

    validate(&config)?;

    Ok(config)
}

/// Write the shipped default config into `base_dir/config/` unless a config
/// file is already there. Returns the files that were written.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let config_dir = base_dir.join("config");
    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let target = config_dir.join(CONFIG_FILE);
    match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&target)
    {
        Ok(mut dest) => {
            std::io::Write::write_all(&mut dest, DEFAULT_CONFIG.as_bytes()).map_err(|e| {
                ConfigError::DefaultsCopyError {
                    message: format!("failed to write {}: {e}", target.display()),
                }
            })?;
            Ok(vec![target])
        }
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(vec![]),
        Err(e) => Err(ConfigError::DefaultsCopyError {
            message: format!("failed to create {}: {e}", target.display()),
        }),
    }
}

/// Load config relative to `base_dir`, writing defaults first if needed.
pub fn load_config(base_dir: &Path) -> Result<Config, ConfigError> {
    ensure_config_files(base_dir)?;
    load_config_from(base_dir)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config
        .storage
        .db_path
        .as_deref()
        .is_some_and(|p| p.trim().is_empty())
    {
        return Err(ConfigError::ValidationError {
            field: "storage.db_path".into(),
            message: "must not be blank when set".into(),
        });
    }

    let required: &[(&str, &str)] = &[
        ("export.directory", config.export.directory.as_str()),
        ("logging.directory", config.logging.directory.as_str()),
        ("logging.filter", config.logging.filter.as_str()),
    ];
    for (name, value) in required {
        if value.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: "must not be blank".into(),
            });
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
