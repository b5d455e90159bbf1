//! Command lines for, and output parsing of, the user service manager.
//!
//! Everything in here is pure: building argument vectors and turning
//! `systemctl` text output into values. The registry does the I/O.
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use regex::Regex;
use serde::Serialize;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use crate::constants::{PRIMARY_INSTANCE, PRIMARY_LABEL, SERVICE_SUFFIX};

/// Control actions the service manager accepts for an instance.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, EnumString, AsRefStr, Display, EnumIter,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ControlAction {
    Start,
    Stop,
    Restart,
}

static CONFDIR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:^|[\s;\[])(?:--)?confdir=(?:"([^"]*)"|'([^']*)'|([^\s;]+))"#)
        .expect("confdir pattern is valid")
});

fn unit_id(name: &str) -> String {
    format!("{name}{SERVICE_SUFFIX}")
}

fn to_args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|part| part.to_string()).collect()
}

/// Arguments listing every loaded user service unit.
pub fn list_units_args() -> Vec<String> {
    to_args(&[
        "--user",
        "list-units",
        "--type=service",
        "--all",
        "--no-legend",
        "--no-pager",
    ])
}

/// Arguments fetching `properties` (comma separated) of an instance's unit.
pub fn show_args(name: &str, properties: &str) -> Vec<String> {
    vec![
        "--user".to_string(),
        "show".to_string(),
        unit_id(name),
        format!("--property={properties}"),
        "--no-pager".to_string(),
    ]
}

/// Arguments applying `action` to an instance's unit.
pub fn control_args(action: ControlAction, name: &str) -> Vec<String> {
    vec![
        "--user".to_string(),
        action.as_ref().to_string(),
        unit_id(name),
    ]
}

/// Arguments reading journal lines emitted in the last `minutes`.
pub fn journal_since_args(name: &str, minutes: u32) -> Vec<String> {
    vec![
        "--user".to_string(),
        "-u".to_string(),
        unit_id(name),
        "--since".to_string(),
        format!("{minutes} minutes ago"),
        "--no-pager".to_string(),
        "-q".to_string(),
    ]
}

/// Arguments reading the last `lines` journal lines.
pub fn journal_tail_args(name: &str, lines: usize) -> Vec<String> {
    vec![
        "--user".to_string(),
        "-u".to_string(),
        unit_id(name),
        "-n".to_string(),
        lines.to_string(),
        "--no-pager".to_string(),
        "-q".to_string(),
    ]
}

/// Arguments following the journal after printing `lines` of backlog.
pub fn journal_follow_args(name: &str, lines: usize) -> Vec<String> {
    vec![
        "--user".to_string(),
        "-u".to_string(),
        unit_id(name),
        "-f".to_string(),
        "--no-pager".to_string(),
        "-q".to_string(),
        "-n".to_string(),
        lines.to_string(),
    ]
}

/// Extracts sync instance names from `list-units --no-legend` output.
///
/// Failed units are prefixed with a status bullet, which is skipped. An empty
/// `exclude` excludes nothing. Names are returned without the `.service`
/// suffix, in reported order, without duplicates.
pub fn parse_unit_listing(listing: &str, marker: &str, exclude: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();

    for line in listing.lines() {
        let mut tokens = line.split_whitespace();
        let Some(mut unit) = tokens.next() else {
            continue;
        };
        if matches!(unit, "●" | "*" | "○") {
            match tokens.next() {
                Some(next) => unit = next,
                None => continue,
            }
        }

        if !unit.contains(marker) || (!exclude.is_empty() && unit.contains(exclude)) {
            continue;
        }

        let name = unit.strip_suffix(SERVICE_SUFFIX).unwrap_or(unit);
        if !names.iter().any(|existing| existing == name) {
            names.push(name.to_string());
        }
    }

    names
}

/// Parses `Key=Value` lines emitted by `systemctl show`.
pub fn parse_properties(output: &str) -> HashMap<String, String> {
    output
        .lines()
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), value.to_string()))
        .collect()
}

/// Finds a `confdir=` argument in a unit's launch command.
pub fn extract_confdir(exec_start: &str, home: &Path) -> Option<PathBuf> {
    let captures = CONFDIR_PATTERN.captures(exec_start)?;
    let raw = captures
        .get(1)
        .or_else(|| captures.get(2))
        .or_else(|| captures.get(3))?
        .as_str()
        .trim_end_matches(';');

    if raw.is_empty() {
        return None;
    }

    Some(expand_home(raw, home))
}

fn expand_home(raw: &str, home: &Path) -> PathBuf {
    if raw == "~" {
        return home.to_path_buf();
    }
    match raw.strip_prefix("~/") {
        Some(rest) => home.join(rest),
        None => PathBuf::from(raw),
    }
}

/// Config dir used when the launch command does not name one.
pub fn default_config_dir(home: &Path, name: &str) -> PathBuf {
    let config_root = home.join(".config");
    if name == PRIMARY_INSTANCE {
        config_root.join(PRIMARY_INSTANCE)
    } else {
        config_root.join(name)
    }
}

/// Short, UI-friendly label: `onedrive-work` becomes `work`.
pub fn short_label(name: &str) -> String {
    if name == PRIMARY_INSTANCE {
        return PRIMARY_LABEL.to_string();
    }
    name.strip_prefix(PRIMARY_INSTANCE)
        .and_then(|rest| rest.strip_prefix('-'))
        .filter(|rest| !rest.is_empty())
        .unwrap_or(name)
        .to_string()
}
