//! Light/dark theme preference.
//!
//! [`ThemeController`] starts at a fixed default, then resolves the real
//! preference in a second step: a persisted choice wins, otherwise the
//! system preference. Every change is persisted immediately and broadcast on
//! a [`watch`] channel that the renderer reads its palette from.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// File name of the persisted preference inside the data directory.
pub const PREFERENCE_FILE: &str = "preferences.json";

/// Errors that can occur while reading or writing the theme preference.
#[derive(Debug, thiserror::Error)]
pub enum ThemeError {
    /// Failed to read or write the preference file.
    #[error("failed to access theme preference {path}: {source}")]
    Io {
        /// The preference file path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The preference file is not valid JSON.
    #[error("failed to parse theme preference: {0}")]
    Parse(#[from] serde_json::Error),

    /// The stored value is not a known theme.
    #[error("unknown theme: {0}")]
    Unknown(String),
}

/// Presentation theme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    /// Light background.
    #[default]
    Light,
    /// Dark background.
    Dark,
}

impl ThemeMode {
    /// Stored representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    /// The opposite theme.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

impl fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThemeMode {
    type Err = ThemeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(ThemeError::Unknown(other.to_string())),
        }
    }
}

/// Where the theme preference lives.
pub trait PreferenceStore: Send + Sync {
    /// Reads the saved theme, if one was saved.
    ///
    /// # Errors
    ///
    /// Returns [`ThemeError`] if the preference exists but cannot be read.
    fn load(&self) -> Result<Option<ThemeMode>, ThemeError>;

    /// Saves the theme.
    ///
    /// # Errors
    ///
    /// Returns [`ThemeError`] if the preference cannot be written.
    fn save(&self, mode: ThemeMode) -> Result<(), ThemeError>;
}

/// On-disk layout of the preference file.
#[derive(Debug, Serialize, Deserialize)]
struct PreferenceFile {
    theme: String,
}

/// Preference persisted as a small JSON file.
#[derive(Debug, Clone)]
pub struct FilePreferenceStore {
    path: PathBuf,
}

impl FilePreferenceStore {
    /// Uses the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> ThemeError {
        ThemeError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn load(&self) -> Result<Option<ThemeMode>, ThemeError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };
        let file: PreferenceFile = serde_json::from_str(&contents)?;
        file.theme.parse().map(Some)
    }

    fn save(&self, mode: ThemeMode) -> Result<(), ThemeError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let json = serde_json::to_string(&PreferenceFile {
            theme: mode.as_str().to_string(),
        })?;
        std::fs::write(&self.path, json).map_err(|e| self.io_error(e))
    }
}

/// Preference kept in memory only.
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    value: Mutex<Option<ThemeMode>>,
}

impl MemoryPreferenceStore {
    /// Starts with `value` saved.
    #[must_use]
    pub fn with_saved(value: ThemeMode) -> Self {
        Self {
            value: Mutex::new(Some(value)),
        }
    }

    /// The saved value.
    #[must_use]
    pub fn saved(&self) -> Option<ThemeMode> {
        *self.value.lock()
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn load(&self) -> Result<Option<ThemeMode>, ThemeError> {
        Ok(*self.value.lock())
    }

    fn save(&self, mode: ThemeMode) -> Result<(), ThemeError> {
        *self.value.lock() = Some(mode);
        Ok(())
    }
}

/// Guesses whether the terminal has a dark background from `COLORFGBG`
/// (`"fg;bg"`, where background colors 0-6 and 8 are dark).
#[must_use]
pub fn system_prefers_dark() -> bool {
    std::env::var("COLORFGBG")
        .ok()
        .as_deref()
        .is_some_and(colorfgbg_is_dark)
}

fn colorfgbg_is_dark(value: &str) -> bool {
    value
        .rsplit(';')
        .next()
        .and_then(|bg| bg.parse::<u8>().ok())
        .is_some_and(|bg| bg <= 6 || bg == 8)
}

/// Tracks and persists the active theme.
pub struct ThemeController<P: PreferenceStore> {
    store: P,
    mode: watch::Sender<ThemeMode>,
}

impl<P: PreferenceStore> ThemeController<P> {
    /// Creates a controller showing the default theme. Call
    /// [`initialize`](Self::initialize) to apply the saved preference.
    #[must_use]
    pub fn new(store: P) -> Self {
        let (mode, _) = watch::channel(ThemeMode::default());
        Self { store, mode }
    }

    /// Resolves the real preference: the saved theme if there is one,
    /// otherwise dark when `system_dark` is set. Read failures are logged
    /// and fall back to the system preference.
    pub fn initialize(&self, system_dark: bool) -> ThemeMode {
        let saved = self.store.load().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "could not read theme preference");
            None
        });
        let mode = match saved {
            Some(mode) => mode,
            None if system_dark => ThemeMode::Dark,
            None => ThemeMode::default(),
        };
        self.set(mode);
        mode
    }

    /// The active theme.
    #[must_use]
    pub fn mode(&self) -> ThemeMode {
        *self.mode.borrow()
    }

    /// Subscribes to theme changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ThemeMode> {
        self.mode.subscribe()
    }

    /// Switches to `mode` and persists it. A write failure is logged; the
    /// theme still changes for this session.
    pub fn set(&self, mode: ThemeMode) {
        self.mode.send_replace(mode);
        if let Err(err) = self.store.save(mode) {
            tracing::warn!(theme = %mode, error = %err, "could not save theme preference");
        }
    }

    /// Flips between light and dark, returning the new theme.
    pub fn toggle(&self) -> ThemeMode {
        let next = self.mode().toggled();
        self.set(next);
        next
    }
}
