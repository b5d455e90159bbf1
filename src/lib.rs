//! Drivux supervises OneDrive sync client instances that run as systemd user
//! services. It discovers the instance units, reports their live state and
//! recent journal errors, starts/stops/restarts them, and edits each
//! instance's `key = "value"` config file without losing comments or ordering.

/// CLI interface.
pub mod cli;

/// Instance configuration files.
pub mod config;

/// Constants and fixed values.
pub mod constants;

/// Error handling.
pub mod error;

/// Journal access.
pub mod logs;

/// Discovery, status and control of sync instances.
pub mod registry;

/// External command boundary.
pub mod runner;

/// Settings for drivux itself.
pub mod settings;

/// Status classification and rendering.
pub mod status;

/// Test doubles.
pub mod test_utils;

/// Service manager command lines and output parsing.
pub mod units;
