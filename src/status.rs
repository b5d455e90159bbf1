//! Health classification and rendering of instance status.
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::registry::ServiceRecord;

const GREEN_BOLD: &str = "\x1b[1;32m"; // Bright Green
const RED_BOLD: &str = "\x1b[1;31m"; // Bright Red
const YELLOW_BOLD: &str = "\x1b[1;33m"; // Yellow/Gold
const RESET: &str = "\x1b[0m"; // Reset color

/// Health classification for a single instance.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InstanceHealth {
    Ok,
    Stopped,
    Error,
}

impl InstanceHealth {
    /// Stopped when inactive, otherwise ok unless error lines were found.
    pub fn classify(active: bool, recent_errors: &[String]) -> Self {
        if !active {
            Self::Stopped
        } else if recent_errors.is_empty() {
            Self::Ok
        } else {
            Self::Error
        }
    }

    /// Display label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Stopped => "stopped",
            Self::Error => "error",
        }
    }

    fn color(&self) -> &'static str {
        match self {
            Self::Ok => GREEN_BOLD,
            Self::Stopped => YELLOW_BOLD,
            Self::Error => RED_BOLD,
        }
    }
}

/// Overall state across every instance.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OverallHealth {
    Healthy,
    Degraded,
}

pub fn compute_overall_health(units: &[InstanceStatus]) -> OverallHealth {
    if units
        .iter()
        .all(|unit| matches!(unit.health, InstanceHealth::Ok))
    {
        OverallHealth::Healthy
    } else {
        OverallHealth::Degraded
    }
}

/// A record paired with its health and the error lines behind it.
#[derive(Debug, Clone, Serialize)]
pub struct InstanceStatus {
    #[serde(flatten)]
    pub record: ServiceRecord,
    pub label: String,
    pub health: InstanceHealth,
    pub recent_errors: Vec<String>,
}

impl InstanceStatus {
    /// Classifies `record` given the error lines found for it.
    pub fn new(record: ServiceRecord, recent_errors: Vec<String>) -> Self {
        Self {
            label: record.label(),
            health: InstanceHealth::classify(record.active, &recent_errors),
            record,
            recent_errors,
        }
    }
}

/// Point-in-time view of every instance, as emitted by `status --json`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub captured_at: DateTime<Utc>,
    pub overall_health: OverallHealth,
    pub instances: Vec<InstanceStatus>,
}

impl StatusSnapshot {
    pub fn new(instances: Vec<InstanceStatus>) -> Self {
        Self {
            captured_at: Utc::now(),
            overall_health: compute_overall_health(&instances),
            instances,
        }
    }
}

fn paint(text: &str, color: &str, enabled: bool) -> String {
    if enabled {
        format!("{color}{text}{RESET}")
    } else {
        text.to_string()
    }
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() { "-" } else { value }
}

/// Renders one row per instance.
pub fn render_table(instances: &[InstanceStatus], color: bool) -> String {
    let label_width = instances
        .iter()
        .map(|status| status.label.len())
        .chain(std::iter::once("INSTANCE".len()))
        .max()
        .unwrap_or(8);
    let state_width = "STOPPED".len();

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<label_width$}  {:<state_width$}  {:>8}  SYNC DIR",
        "INSTANCE", "STATE", "PID"
    );

    for status in instances {
        let state = status.health.as_str().to_uppercase();
        let padded = format!("{state:<state_width$}");
        let pid = if status.record.pid == 0 {
            "-".to_string()
        } else {
            status.record.pid.to_string()
        };
        let _ = writeln!(
            out,
            "{:<label_width$}  {}  {:>8}  {}",
            status.label,
            paint(&padded, status.health.color(), color),
            pid,
            or_dash(&status.record.sync_dir)
        );
    }

    out
}

/// Renders a detailed block for one instance.
pub fn render_detail(status: &InstanceStatus, color: bool) -> String {
    let record = &status.record;
    let mut out = String::new();

    let bullet = paint("●", status.health.color(), color);
    let _ = writeln!(out, "{bullet} {} ({})", record.display_name, record.name);
    let active = if record.active {
        paint("active (running)", GREEN_BOLD, color)
    } else {
        paint("inactive", YELLOW_BOLD, color)
    };
    let _ = writeln!(out, "    Active: {active}");
    if record.pid != 0 {
        let _ = writeln!(out, "  Main PID: {}", record.pid);
    }
    let _ = writeln!(out, "    Config: {}", record.config_path().display());
    let _ = writeln!(out, "  Sync dir: {}", or_dash(&record.sync_dir));
    let _ = writeln!(
        out,
        "    Health: {}",
        paint(status.health.as_str(), status.health.color(), color)
    );

    if !status.recent_errors.is_empty() {
        let _ = writeln!(out, "    Recent errors:");
        for line in &status.recent_errors {
            let _ = writeln!(out, "      {}", paint(line, RED_BOLD, color));
        }
    }

    out
}
