//! Settings for drivux itself, read from an optional YAML file.
use std::{
    env, fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use tracing::debug;

use crate::{
    constants::{
        DEFAULT_ERROR_WINDOW_MINUTES, DEFAULT_EXCLUDE_MARKER, DEFAULT_FOLLOW_LINES,
        DEFAULT_LOG_LINES, DEFAULT_REFRESH_INTERVAL, DEFAULT_UNIT_MARKER, SETTINGS_DIR_NAME,
        SETTINGS_FILE_NAME,
    },
    error::SettingsError,
    registry::RegistrySettings,
};

/// Tunables for discovery, log scanning and refresh.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Substring every instance unit id contains.
    pub unit_marker: String,
    /// Units containing this substring are skipped.
    pub exclude_marker: String,
    /// Trailing window scanned for errors.
    pub error_window_minutes: u32,
    /// Lines returned by `logs`.
    pub log_lines: usize,
    /// Backlog printed before following.
    pub follow_lines: usize,
    /// Delay between refreshes in watch mode (`15`, `15s`, `2m`, `1h`).
    pub refresh_interval: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            unit_marker: DEFAULT_UNIT_MARKER.to_string(),
            exclude_marker: DEFAULT_EXCLUDE_MARKER.to_string(),
            error_window_minutes: DEFAULT_ERROR_WINDOW_MINUTES,
            log_lines: DEFAULT_LOG_LINES,
            follow_lines: DEFAULT_FOLLOW_LINES,
            refresh_interval: DEFAULT_REFRESH_INTERVAL.to_string(),
        }
    }
}

impl Settings {
    /// Registry knobs derived from these settings.
    pub fn registry_settings(&self, home: impl Into<PathBuf>) -> RegistrySettings {
        RegistrySettings {
            unit_marker: self.unit_marker.clone(),
            exclude_marker: self.exclude_marker.clone(),
            home: home.into(),
        }
    }

    /// Parsed refresh interval.
    pub fn refresh_interval(&self) -> Result<Duration, SettingsError> {
        parse_duration(&self.refresh_interval)
    }
}

/// Home directory of the current user.
pub fn home_dir() -> PathBuf {
    env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/"))
}

/// Default settings location, honouring `XDG_CONFIG_HOME`.
pub fn default_settings_path() -> PathBuf {
    let config_home = env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .filter(|path| path.is_absolute())
        .unwrap_or_else(|| home_dir().join(".config"));
    config_home.join(SETTINGS_DIR_NAME).join(SETTINGS_FILE_NAME)
}

/// Loads settings from `path`, or from the default location when `None`.
///
/// An explicit path must exist; a missing default file yields defaults.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, SettingsError> {
    let (path, required) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => (default_settings_path(), false),
    };

    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound && !required => {
            debug!("No settings file at {:?}; using defaults", path);
            return Ok(Settings::default());
        }
        Err(e) => {
            return Err(SettingsError::Read(std::io::Error::new(
                e.kind(),
                format!("{} ({})", e, path.display()),
            )));
        }
    };

    if content.trim().is_empty() {
        return Ok(Settings::default());
    }

    let settings: Settings = serde_yaml::from_str(&content)?;
    if settings.unit_marker.trim().is_empty() {
        return Err(SettingsError::EmptyValue("unit_marker"));
    }
    settings.refresh_interval()?;
    debug!("Loaded settings from {:?}", path);
    Ok(settings)
}

/// Parses `N`, `Ns`, `Nm` or `Nh` into a duration.
pub fn parse_duration(raw: &str) -> Result<Duration, SettingsError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(SettingsError::InvalidDuration(raw.to_string()));
    }

    let (amount_str, multiplier) = if let Some(stripped) = value.strip_suffix('s') {
        (stripped.trim(), 1)
    } else if let Some(stripped) = value.strip_suffix('m') {
        (stripped.trim(), 60)
    } else if let Some(stripped) = value.strip_suffix('h') {
        (stripped.trim(), 3600)
    } else {
        (value, 1)
    };

    let amount: u64 = amount_str
        .parse()
        .map_err(|_| SettingsError::InvalidDuration(raw.to_string()))?;
    if amount == 0 {
        return Err(SettingsError::InvalidDuration(raw.to_string()));
    }

    Ok(Duration::from_secs(amount.saturating_mul(multiplier)))
}
