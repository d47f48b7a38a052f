//! Configuration system for the `TaskDeck` client.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/taskdeck/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::analytics::DEFAULT_DATE_FORMAT;
use crate::backend::file::DOCUMENTS_FILE;
use crate::store::{StoreOptions, TASKS_COLLECTION};
use crate::theme::PREFERENCE_FILE;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),
}

/// Which document store backs the task list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// JSON file in the data directory.
    #[default]
    File,
    /// Process memory; nothing survives a restart.
    Memory,
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    storage: StorageFileConfig,
    ui: UiFileConfig,
    session: SessionFileConfig,
}

/// `[storage]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct StorageFileConfig {
    data_dir: Option<PathBuf>,
    backend: Option<BackendKind>,
    collection: Option<String>,
}

/// `[ui]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct UiFileConfig {
    poll_timeout_ms: Option<u64>,
    date_format: Option<String>,
    max_task_title_len: Option<usize>,
    notice_lifetime_secs: Option<u64>,
    notice_capacity: Option<usize>,
}

/// `[session]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct SessionFileConfig {
    notice_buffer: Option<usize>,
    google_account: Option<String>,
}

// ---------------------------------------------------------------------------
// Resolved configuration (concrete types, all fields populated)
// ---------------------------------------------------------------------------

/// Fully resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    // -- Storage --
    /// Directory holding the document store and preferences.
    pub data_dir: PathBuf,
    /// Document store implementation.
    pub backend: BackendKind,
    /// Collection holding task documents.
    pub collection: String,

    // -- UI --
    /// Poll timeout for the TUI event loop.
    pub poll_timeout: Duration,
    /// Due date display format string (chrono).
    pub date_format: String,
    /// Maximum task title length in characters.
    pub max_task_title_len: usize,
    /// How long a notice stays on screen.
    pub notice_lifetime: Duration,
    /// Maximum notices shown at once.
    pub notice_capacity: usize,

    // -- Session --
    /// Capacity of the notice channel.
    pub notice_buffer: usize,
    /// Account used by the "Sign in with Google" flow.
    pub google_account: Option<String>,
}

/// Default data directory: `<data_local_dir>/taskdeck`, or the temp dir.
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("taskdeck")
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            backend: BackendKind::File,
            collection: TASKS_COLLECTION.to_string(),
            poll_timeout: Duration::from_millis(50),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            max_task_title_len: 256,
            notice_lifetime: Duration::from_secs(4),
            notice_capacity: 3,
            notice_buffer: 32,
            google_account: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// CLI args and env vars are parsed via `clap`. If `--config` is given
    /// and the file does not exist, returns an error. If no `--config` is
    /// given, the default path (`~/.config/taskdeck/config.toml`) is tried
    /// and silently ignored if missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the config file cannot be read or parsed.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, &file))
    }

    /// Resolve a `ClientConfig` from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default.
    #[must_use]
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            data_dir: cli
                .data_dir
                .clone()
                .or_else(|| file.storage.data_dir.clone())
                .unwrap_or(defaults.data_dir),
            backend: cli
                .backend
                .or(file.storage.backend)
                .unwrap_or(defaults.backend),
            collection: file
                .storage
                .collection
                .clone()
                .unwrap_or(defaults.collection),
            poll_timeout: file
                .ui
                .poll_timeout_ms
                .map_or(defaults.poll_timeout, Duration::from_millis),
            date_format: cli
                .date_format
                .clone()
                .or_else(|| file.ui.date_format.clone())
                .unwrap_or(defaults.date_format),
            max_task_title_len: file
                .ui
                .max_task_title_len
                .unwrap_or(defaults.max_task_title_len),
            notice_lifetime: file
                .ui
                .notice_lifetime_secs
                .map_or(defaults.notice_lifetime, Duration::from_secs),
            notice_capacity: file
                .ui
                .notice_capacity
                .unwrap_or(defaults.notice_capacity),
            notice_buffer: file
                .session
                .notice_buffer
                .unwrap_or(defaults.notice_buffer),
            google_account: cli
                .google_account
                .clone()
                .or_else(|| file.session.google_account.clone()),
        }
    }

    /// Task store tunables derived from this configuration.
    #[must_use]
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            collection: self.collection.clone(),
            max_title_len: self.max_task_title_len,
            notice_buffer: self.notice_buffer,
        }
    }

    /// Path of the JSON document store.
    #[must_use]
    pub fn documents_path(&self) -> PathBuf {
        self.data_dir.join(DOCUMENTS_FILE)
    }

    /// Path of the persisted theme preference.
    #[must_use]
    pub fn preference_path(&self) -> PathBuf {
        self.data_dir.join(PREFERENCE_FILE)
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Personal task manager for the terminal")]
pub struct CliArgs {
    /// Directory for stored tasks and preferences.
    #[arg(long, env = "TASKDECK_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Document store implementation.
    #[arg(long, value_enum, env = "TASKDECK_BACKEND")]
    pub backend: Option<BackendKind>,

    /// Account used by "Sign in with Google".
    #[arg(long, env = "TASKDECK_GOOGLE_ACCOUNT")]
    pub google_account: Option<String>,

    /// Path to config file (default: `~/.config/taskdeck/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Due date display format (chrono format string).
    #[arg(long)]
    pub date_format: Option<String>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "TASKDECK_LOG")]
    pub log_level: String,

    /// Path to log file (default: `$TMPDIR/taskdeck.log`).
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and missing file
/// is treated as empty config.
fn load_config_file(explicit_path: Option<&Path>) -> Result<ConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(ConfigFile::default());
        };
        config_dir.join("taskdeck").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
