//! Constants and fixed values used across drivux.
//!
//! Unit naming markers, external program names, default paths and the
//! documented configuration keys live here so the registry, the config store
//! and the CLI agree on them.

// ============================================================================
// Service Manager
// ============================================================================

/// Program used to query and control user units.
pub const SYSTEMCTL: &str = "systemctl";

/// Program used to read unit output.
pub const JOURNALCTL: &str = "journalctl";

/// Suffix appended to instance names to form unit ids.
pub const SERVICE_SUFFIX: &str = ".service";

/// Substring every OneDrive instance unit contains.
pub const DEFAULT_UNIT_MARKER: &str = "onedrive";

/// Units containing this substring are helper units, not sync instances.
pub const DEFAULT_EXCLUDE_MARKER: &str = "monitor";

/// Name of the primary instance, which keeps the client's default config dir.
pub const PRIMARY_INSTANCE: &str = "onedrive";

/// Unit properties fetched for a status query.
pub const STATUS_PROPERTIES: &str = "Description,ActiveState,MainPID,ExecStart";

// ============================================================================
// Config Files
// ============================================================================

/// File name of an instance config inside its config dir.
pub const CONFIG_FILE_NAME: &str = "config";

/// Suffix of the sidecar file used to serialize read-modify-write.
pub const CONFIG_LOCK_SUFFIX: &str = ".lock";

/// Directory under `$XDG_RUNTIME_DIR` holding config lock files.
pub const LOCK_DIR_NAME: &str = "drivux";

/// Key holding the local sync directory.
pub const SYNC_DIR_KEY: &str = "sync_dir";

/// Lines starting with this marker are comments.
pub const COMMENT_MARKER: char = '#';

/// Known config keys with a human description. Unknown keys are still accepted.
pub const CONFIG_KEYS: &[(&str, &str)] = &[
    ("sync_dir", "Local directory to sync"),
    ("drive_id", "SharePoint/OneDrive Drive ID"),
    ("use_device_auth", "Use device authentication flow"),
    ("disable_notifications", "Disable desktop notifications"),
    ("classify_as_big_delete", "Threshold for big delete protection"),
    ("skip_dir", "Directories to skip (regex)"),
    ("skip_file", "Files to skip (regex)"),
    ("skip_dotfiles", "Skip dotfiles"),
    ("skip_symlinks", "Skip symbolic links"),
    ("monitor_interval", "Sync interval in seconds (monitor mode)"),
    (
        "monitor_fullscan_frequency",
        "Full scan frequency (number of syncs)",
    ),
    ("download_only", "Only download, never upload"),
    ("upload_only", "Only upload, never download"),
    ("no_remote_delete", "Don't delete remote files"),
    ("check_nosync", "Check for .nosync files"),
    ("log_level", "Log verbosity (v, vv, vvv)"),
    ("rate_limit", "Bandwidth limit in bytes/s"),
];

/// Looks up the description of a known config key.
pub fn describe_key(key: &str) -> Option<&'static str> {
    CONFIG_KEYS
        .iter()
        .find(|(known, _)| *known == key)
        .map(|(_, description)| *description)
}

// ============================================================================
// Logs
// ============================================================================

/// Case-insensitive markers flagging a journal line as an error.
pub const ERROR_MARKERS: &[&str] = &["error", "cannot connect", "big_delete"];

/// Default trailing window scanned for errors.
pub const DEFAULT_ERROR_WINDOW_MINUTES: u32 = 10;

/// Default number of journal lines returned by `logs`.
pub const DEFAULT_LOG_LINES: usize = 100;

/// Backlog printed before following a journal.
pub const DEFAULT_FOLLOW_LINES: usize = 200;

/// Default interval between status refreshes in watch mode.
pub const DEFAULT_REFRESH_INTERVAL: &str = "15s";

// ============================================================================
// Settings
// ============================================================================

/// Directory name under the XDG config home holding drivux settings.
pub const SETTINGS_DIR_NAME: &str = "drivux";

/// File name of the drivux settings file.
pub const SETTINGS_FILE_NAME: &str = "drivux.yaml";

/// Label shown for the primary instance.
pub const PRIMARY_LABEL: &str = "personal";
