//! Discovery, status and control of OneDrive sync instances.
//!
//! The registry is a thin layer over `systemctl --user` and `journalctl --user`.
//! Queries degrade to empty or default values when the service manager is
//! unavailable; control actions report failure through [`ControlOutcome`].
use std::{
    env,
    path::{Path, PathBuf},
};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    config::ConfigStore,
    constants::{
        CONFIG_FILE_NAME, DEFAULT_EXCLUDE_MARKER, DEFAULT_UNIT_MARKER, JOURNALCTL,
        STATUS_PROPERTIES, SYNC_DIR_KEY, SYSTEMCTL,
    },
    logs,
    runner::{CommandOutput, CommandRunner, SystemRunner},
    status::{InstanceHealth, InstanceStatus},
    units::{self, ControlAction},
};

/// One discovered sync instance, merged from unit state and its config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceRecord {
    /// Unit name without the `.service` suffix.
    pub name: String,
    /// Unit description, or `name` when it has none.
    pub display_name: String,
    /// Whether the unit is currently active.
    pub active: bool,
    /// Main process id, `0` when not running.
    pub pid: u32,
    /// Directory holding the instance's config file.
    pub config_dir: PathBuf,
    /// Local sync directory from the config file, empty when unset.
    pub sync_dir: String,
}

impl ServiceRecord {
    /// Path of the instance config file.
    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE_NAME)
    }

    /// Short, UI-friendly label for the instance.
    pub fn label(&self) -> String {
        units::short_label(&self.name)
    }
}

/// Result of a start, stop or restart request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlOutcome {
    /// Whether the service manager accepted the request.
    pub success: bool,
    /// Error text from the service manager; never empty on failure.
    pub message: String,
}

impl ControlOutcome {
    fn from_output(action: ControlAction, output: CommandOutput) -> Self {
        let stderr = output.stderr.trim().to_string();
        if output.success {
            return Self {
                success: true,
                message: stderr,
            };
        }

        let message = if stderr.is_empty() {
            match output.exit_code {
                Some(code) => format!("{SYSTEMCTL} {action} exited with status {code}"),
                None => format!("{SYSTEMCTL} {action} was terminated by a signal"),
            }
        } else {
            stderr
        };

        Self {
            success: false,
            message,
        }
    }

    /// `(success, message)` pair.
    pub fn into_tuple(self) -> (bool, String) {
        (self.success, self.message)
    }
}

/// Knobs that decide which units are instances and where configs live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrySettings {
    /// Substring every instance unit id contains.
    pub unit_marker: String,
    /// Units containing this substring are skipped.
    pub exclude_marker: String,
    /// Home directory used for the default config dir.
    pub home: PathBuf,
}

impl RegistrySettings {
    /// Default markers with the given home directory.
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        Self {
            unit_marker: DEFAULT_UNIT_MARKER.to_string(),
            exclude_marker: DEFAULT_EXCLUDE_MARKER.to_string(),
            home: home.into(),
        }
    }
}

impl Default for RegistrySettings {
    fn default() -> Self {
        let home = env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/"));
        Self::with_home(home)
    }
}

/// Registry of sync instances backed by a [`CommandRunner`].
pub struct ServiceRegistry<R = SystemRunner> {
    runner: R,
    settings: RegistrySettings,
    services: Vec<String>,
}

impl ServiceRegistry<SystemRunner> {
    /// Registry driving the real service manager.
    pub fn new(settings: RegistrySettings) -> Self {
        Self::with_runner(SystemRunner, settings)
    }
}

impl<R: CommandRunner> ServiceRegistry<R> {
    /// Registry driving `runner`. Nothing is discovered until [`Self::discover`] runs.
    pub fn with_runner(runner: R, settings: RegistrySettings) -> Self {
        Self {
            runner,
            settings,
            services: Vec::new(),
        }
    }

    /// Settings in effect.
    pub fn settings(&self) -> &RegistrySettings {
        &self.settings
    }

    /// Underlying command runner.
    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Instance names from the last discovery.
    pub fn services(&self) -> &[String] {
        &self.services
    }

    fn query(&self, program: &str, args: &[String]) -> Option<String> {
        match self.runner.run(program, args) {
            Ok(output) if output.success => Some(output.stdout),
            Ok(output) => {
                warn!(
                    "{program} {} exited with {:?}: {}",
                    args.join(" "),
                    output.exit_code,
                    output.stderr.trim()
                );
                None
            }
            Err(err) => {
                warn!("{err}");
                None
            }
        }
    }

    /// Lists the instance units and remembers them as the current snapshot.
    pub fn discover(&mut self) -> Vec<String> {
        let services = self
            .query(SYSTEMCTL, &units::list_units_args())
            .map(|listing| {
                units::parse_unit_listing(
                    &listing,
                    &self.settings.unit_marker,
                    &self.settings.exclude_marker,
                )
            })
            .unwrap_or_default();

        debug!("Discovered {} sync instance(s): {:?}", services.len(), services);
        self.services = services.clone();
        services
    }

    /// Live status of one instance. Missing pieces fall back to defaults.
    pub fn status(&self, name: &str) -> ServiceRecord {
        let props = self
            .query(SYSTEMCTL, &units::show_args(name, STATUS_PROPERTIES))
            .map(|output| units::parse_properties(&output))
            .unwrap_or_default();

        let display_name = props
            .get("Description")
            .map(|description| description.trim())
            .filter(|description| !description.is_empty())
            .unwrap_or(name)
            .to_string();
        let active = props
            .get("ActiveState")
            .is_some_and(|state| state.trim() == "active");
        let pid = props
            .get("MainPID")
            .and_then(|pid| pid.trim().parse::<u32>().ok())
            .unwrap_or(0);

        let exec_start = props.get("ExecStart").map(String::as_str);
        let config_dir = self.resolve_config_dir(name, exec_start);
        let sync_dir = read_sync_dir(&config_dir);

        ServiceRecord {
            name: name.to_string(),
            display_name,
            active,
            pid,
            config_dir,
            sync_dir,
        }
    }

    /// Status of every instance in the last snapshot, in snapshot order.
    pub fn all_statuses(&self) -> Vec<ServiceRecord> {
        self.services.iter().map(|name| self.status(name)).collect()
    }

    /// Applies `action` to one instance.
    pub fn control(&self, action: ControlAction, name: &str) -> ControlOutcome {
        info!("Requesting {action} of '{name}'");
        let outcome = match self.runner.run(SYSTEMCTL, &units::control_args(action, name)) {
            Ok(output) => ControlOutcome::from_output(action, output),
            Err(err) => ControlOutcome {
                success: false,
                message: err.to_string(),
            },
        };

        if !outcome.success {
            warn!("Failed to {action} '{name}': {}", outcome.message);
        }
        outcome
    }

    /// Starts one instance.
    pub fn start(&self, name: &str) -> ControlOutcome {
        self.control(ControlAction::Start, name)
    }

    /// Stops one instance.
    pub fn stop(&self, name: &str) -> ControlOutcome {
        self.control(ControlAction::Stop, name)
    }

    /// Restarts one instance.
    pub fn restart(&self, name: &str) -> ControlOutcome {
        self.control(ControlAction::Restart, name)
    }

    /// Restarts every instance in the snapshot, one after another.
    pub fn restart_all(&self) -> Vec<(String, ControlOutcome)> {
        self.services
            .iter()
            .map(|name| (name.clone(), self.restart(name)))
            .collect()
    }

    /// Journal lines from the last `window_minutes` that carry an error marker.
    pub fn recent_errors(&self, name: &str, window_minutes: u32) -> Vec<String> {
        self.query(JOURNALCTL, &units::journal_since_args(name, window_minutes))
            .map(|output| logs::filter_error_lines(&output))
            .unwrap_or_default()
    }

    /// The last `max_lines` raw journal lines.
    pub fn logs(&self, name: &str, max_lines: usize) -> String {
        self.query(JOURNALCTL, &units::journal_tail_args(name, max_lines))
            .unwrap_or_default()
    }

    /// Configuration directory of an instance.
    pub fn config_dir(&self, name: &str) -> PathBuf {
        let exec_start = self
            .query(SYSTEMCTL, &units::show_args(name, "ExecStart"))
            .and_then(|output| units::parse_properties(&output).remove("ExecStart"));
        self.resolve_config_dir(name, exec_start.as_deref())
    }

    /// Store for an instance's config file.
    pub fn config_store(&self, name: &str) -> ConfigStore {
        ConfigStore::new(self.config_dir(name).join(CONFIG_FILE_NAME))
    }

    /// Health of an already fetched record, scanning the journal only when active.
    pub fn health(&self, record: &ServiceRecord, window_minutes: u32) -> InstanceHealth {
        InstanceHealth::classify(record.active, &self.active_errors(record, window_minutes))
    }

    /// Pairs a record with its health and the error lines behind it.
    pub fn instance_status(&self, record: ServiceRecord, window_minutes: u32) -> InstanceStatus {
        let recent_errors = self.active_errors(&record, window_minutes);
        InstanceStatus::new(record, recent_errors)
    }

    fn active_errors(&self, record: &ServiceRecord, window_minutes: u32) -> Vec<String> {
        if record.active {
            self.recent_errors(&record.name, window_minutes)
        } else {
            Vec::new()
        }
    }

    fn resolve_config_dir(&self, name: &str, exec_start: Option<&str>) -> PathBuf {
        exec_start
            .and_then(|exec| units::extract_confdir(exec, &self.settings.home))
            .unwrap_or_else(|| units::default_config_dir(&self.settings.home, name))
    }
}

fn read_sync_dir(config_dir: &Path) -> String {
    let store = ConfigStore::new(config_dir.join(CONFIG_FILE_NAME));
    match store.get(SYNC_DIR_KEY, "") {
        Ok(sync_dir) => sync_dir,
        Err(err) => {
            warn!("{err}");
            String::new()
        }
    }
}
