//! Command-line interface for drivux.
use std::{path::PathBuf, str::FromStr};

use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;

/// Wrapper around `LevelFilter` so clap can parse log levels from either
/// string names ("info", "debug", etc.) or numeric shorthands (0-5).
#[derive(Clone, Copy, Debug)]
pub struct LogLevelArg(LevelFilter);

impl LogLevelArg {
    /// String representation suitable for `RUST_LOG`.
    pub fn as_str(&self) -> &'static str {
        match self.0 {
            LevelFilter::OFF => "off",
            LevelFilter::ERROR => "error",
            LevelFilter::WARN => "warn",
            LevelFilter::INFO => "info",
            LevelFilter::DEBUG => "debug",
            LevelFilter::TRACE => "trace",
        }
    }
}

impl FromStr for LogLevelArg {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err("log level cannot be empty".into());
        }

        if let Ok(number) = trimmed.parse::<u8>() {
            let level = match number {
                0 => LevelFilter::OFF,
                1 => LevelFilter::ERROR,
                2 => LevelFilter::WARN,
                3 => LevelFilter::INFO,
                4 => LevelFilter::DEBUG,
                5 => LevelFilter::TRACE,
                _ => {
                    return Err(format!(
                        "unsupported log level number '{number}' (expected 0-5)"
                    ));
                }
            };

            return Ok(LogLevelArg(level));
        }

        let level = match trimmed.to_ascii_lowercase().as_str() {
            "off" => Some(LevelFilter::OFF),
            "error" | "err" => Some(LevelFilter::ERROR),
            "warn" | "warning" => Some(LevelFilter::WARN),
            "info" | "information" => Some(LevelFilter::INFO),
            "debug" => Some(LevelFilter::DEBUG),
            "trace" => Some(LevelFilter::TRACE),
            _ => None,
        }
        .ok_or_else(|| format!("invalid log level '{trimmed}'"))?;

        Ok(LogLevelArg(level))
    }
}

/// Command-line interface for drivux.
#[derive(Parser)]
#[command(name = "drivux", version, author)]
#[command(about = "Supervise OneDrive sync instances running as systemd user services", long_about = None)]
pub struct Cli {
    /// Override the logging verbosity for this invocation only.
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Path to a drivux settings file (defaults to `~/.config/drivux/drivux.yaml`).
    #[arg(long, value_name = "PATH", global = true)]
    pub settings: Option<PathBuf>,

    /// The command to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for drivux.
#[derive(Subcommand)]
pub enum Commands {
    /// List discovered sync instances.
    List,

    /// Show the status of every instance, or one in detail.
    Status {
        /// Instance to inspect in detail.
        name: Option<String>,

        /// Emit machine-readable JSON output instead of a table.
        #[arg(long)]
        json: bool,

        /// Disable ANSI colors in output.
        #[arg(long = "no-color")]
        no_color: bool,

        /// Minutes of journal scanned for errors (defaults to the settings value).
        #[arg(long, value_name = "MINUTES")]
        errors_window: Option<u32>,

        /// Continuously refresh output at the provided interval (e.g., "5", "15s", "2m").
        #[arg(long, value_name = "DURATION", num_args = 0..=1, default_missing_value = "")]
        watch: Option<String>,
    },

    /// Start an instance.
    Start {
        /// Instance name (unit name without `.service`).
        name: String,
    },

    /// Stop an instance.
    Stop {
        /// Instance name (unit name without `.service`).
        name: String,
    },

    /// Restart an instance.
    Restart {
        /// Instance name (unit name without `.service`).
        name: String,
    },

    /// Restart every discovered instance.
    RestartAll,

    /// Show recent journal lines that look like errors.
    Errors {
        /// Instance name.
        name: String,

        /// Size of the trailing window in minutes (defaults to the settings value).
        #[arg(short, long)]
        minutes: Option<u32>,
    },

    /// Show journal output for an instance.
    Logs {
        /// Instance name.
        name: String,

        /// Number of lines to show (defaults to the settings value).
        #[arg(short = 'n', long)]
        lines: Option<usize>,

        /// Only show lines containing this text (case-insensitive).
        #[arg(short, long, default_value = "")]
        filter: String,

        /// Keep streaming new lines until interrupted.
        #[arg(short = 'F', long)]
        follow: bool,

        /// Disable ANSI colors in output.
        #[arg(long = "no-color")]
        no_color: bool,
    },

    /// Read or edit an instance configuration file.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Operations on instance config files.
#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print every key of an instance config.
    Show {
        /// Instance name.
        name: String,

        /// Emit machine-readable JSON output.
        #[arg(long)]
        json: bool,
    },

    /// Print one key.
    Get {
        /// Instance name.
        name: String,
        /// Config key.
        key: String,
        /// Printed when the key is unset.
        #[arg(long, default_value = "")]
        default: String,
    },

    /// Set one key, preserving the rest of the file.
    Set {
        /// Instance name.
        name: String,
        /// Config key.
        key: String,
        /// New value.
        value: String,
    },

    /// Remove one key from the file.
    Remove {
        /// Instance name.
        name: String,
        /// Config key.
        key: String,
    },

    /// List documented config keys.
    Keys,
}

/// Parses command-line arguments and returns a `Cli` struct.
pub fn parse_args() -> Cli {
    Cli::parse()
}
