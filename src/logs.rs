//! Journal access for sync instances.
use std::{
    fmt,
    io::{self, BufRead, BufReader},
    process::{Child, ChildStdout, Command, Stdio},
    sync::{Arc, Mutex},
};

use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    constants::{ERROR_MARKERS, JOURNALCTL},
    error::CommandError,
    units,
};

/// Whether `line` contains any error marker, ignoring case.
pub fn is_error_line(line: &str) -> bool {
    let lower = line.to_lowercase();
    ERROR_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Keeps the lines of `output` that look like errors, unmodified and in order.
pub fn filter_error_lines(output: &str) -> Vec<String> {
    output
        .lines()
        .filter(|line| is_error_line(line))
        .map(str::to_string)
        .collect()
}

/// Case-insensitive substring filter used by the log viewer. Empty matches all.
pub fn matches_filter(line: &str, filter: &str) -> bool {
    filter.is_empty() || line.to_lowercase().contains(&filter.to_lowercase())
}

/// Coarse classification of a journal line for highlighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogSeverity {
    Error,
    Warning,
    Download,
    Complete,
    Plain,
}

impl LogSeverity {
    /// Classifies a line by the phrases the sync client prints.
    pub fn classify(line: &str) -> Self {
        let lower = line.to_lowercase();
        if lower.contains("error") || lower.contains("cannot connect") {
            Self::Error
        } else if lower.contains("warning") || lower.contains("deprec") {
            Self::Warning
        } else if lower.contains("downloading") {
            Self::Download
        } else if lower.contains("sync with microsoft onedrive is complete") {
            Self::Complete
        } else {
            Self::Plain
        }
    }

    fn color(&self) -> Option<&'static str> {
        match self {
            Self::Error => Some("\x1b[1;31m"),
            Self::Warning => Some("\x1b[1;33m"),
            Self::Download => Some("\x1b[1;34m"),
            Self::Complete => Some("\x1b[1;32m"),
            Self::Plain => None,
        }
    }
}

/// A journal line paired with its severity, rendered with ANSI colors when enabled.
pub struct HighlightedLine<'a> {
    line: &'a str,
    severity: LogSeverity,
    color: bool,
}

impl<'a> HighlightedLine<'a> {
    pub fn new(line: &'a str, color: bool) -> Self {
        Self {
            line,
            severity: LogSeverity::classify(line),
            color,
        }
    }
}

impl fmt::Display for HighlightedLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.severity.color().filter(|_| self.color) {
            Some(code) => write!(f, "{code}{}\x1b[0m", self.line),
            None => write!(f, "{}", self.line),
        }
    }
}

/// Streams an instance's journal until the process ends or [`LogFollower::stop`] is called.
///
/// The child is shared so a signal handler can kill it while the reading
/// thread is blocked on the pipe.
pub struct LogFollower {
    child: Arc<Mutex<Option<Child>>>,
}

impl LogFollower {
    /// Spawns `journalctl -f` for `name`, printing `backlog` lines first.
    pub fn spawn(
        name: &str,
        backlog: usize,
    ) -> Result<(Self, BufReader<ChildStdout>), CommandError> {
        let args = units::journal_follow_args(name, backlog);
        debug!(program = JOURNALCTL, args = ?args, "Following journal");

        let spawn_err = |source| CommandError {
            program: JOURNALCTL.to_string(),
            source,
        };

        let mut child = Command::new(JOURNALCTL)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(spawn_err)?;

        let stdout = child.stdout.take().ok_or_else(|| {
            spawn_err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "journalctl stdout unavailable",
            ))
        })?;

        Ok((
            Self {
                child: Arc::new(Mutex::new(Some(child))),
            },
            BufReader::new(stdout),
        ))
    }

    /// Handle usable from another thread to stop the stream.
    pub fn stopper(&self) -> LogFollower {
        LogFollower {
            child: Arc::clone(&self.child),
        }
    }

    /// Kills the journal process if it is still running.
    pub fn stop(&self) {
        let mut guard = self
            .child
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(mut child) = guard.take() {
            if let Err(err) = child.kill() {
                debug!("journalctl already exited: {err}");
            }
            if let Err(err) = child.wait() {
                warn!("Failed to reap journalctl: {err}");
            }
        }
    }
}

/// Feeds every non-blank line of `reader` that passes `filter` to `on_line`.
pub fn pump_lines<R, F>(reader: R, filter: &str, mut on_line: F) -> io::Result<()>
where
    R: BufRead,
    F: FnMut(&str),
{
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() || !matches_filter(&line, filter) {
            continue;
        }
        on_line(&line);
    }
    Ok(())
}
