use std::fs;

use drivux::{
    config::ConfigStore,
    registry::{RegistrySettings, ServiceRegistry},
    runner::CommandOutput,
    status::{InstanceHealth, InstanceStatus, OverallHealth, StatusSnapshot},
    test_utils::ScriptedRunner,
    units::ControlAction,
};
use tempfile::tempdir;

const LISTING: &str = "\
onedrive.service                loaded active   running OneDrive Personal
onedrive-work.service           loaded inactive dead    OneDrive Work
onedrive-monitor.service        loaded active   running OneDrive tray monitor
";

#[test]
fn discover_then_status_of_every_instance() {
    let home = tempdir().unwrap();
    let work_dir = home.path().join(".config/onedrive-work");
    fs::create_dir_all(&work_dir).unwrap();
    fs::write(
        work_dir.join("config"),
        "# account: work\nsync_dir = \"~/OneDrive-Work\"\n",
    )
    .unwrap();

    let runner = ScriptedRunner::new()
        .with_units(LISTING)
        .with_show(
            "onedrive",
            "Description=OneDrive Personal\nActiveState=active\nMainPID=1234\nExecStart=\n",
        )
        .with_show(
            "onedrive-work",
            "Description=OneDrive Work\nActiveState=inactive\nMainPID=0\nExecStart=\n",
        )
        .with_journal_since("onedrive", 10, "Sync with Microsoft OneDrive is complete\n");
    let mut registry =
        ServiceRegistry::with_runner(runner, RegistrySettings::with_home(home.path()));

    assert_eq!(registry.discover(), vec!["onedrive", "onedrive-work"]);

    let records = registry.all_statuses();
    assert_eq!(records.len(), 2);
    assert!(records[0].active);
    assert_eq!(records[0].pid, 1234);
    assert_eq!(records[0].sync_dir, "");
    assert!(!records[1].active);
    assert_eq!(records[1].pid, 0);
    assert_eq!(records[1].sync_dir, "~/OneDrive-Work");
    assert_eq!(records[1].config_path(), work_dir.join("config"));

    let instances: Vec<_> = records
        .into_iter()
        .map(|record| {
            let errors = registry.recent_errors(&record.name, 10);
            InstanceStatus::new(record, errors)
        })
        .collect();
    assert_eq!(instances[0].health, InstanceHealth::Ok);
    assert_eq!(instances[1].health, InstanceHealth::Stopped);
    assert_eq!(
        StatusSnapshot::new(instances).overall_health,
        OverallHealth::Degraded
    );
}

#[test]
fn error_scan_keeps_only_marked_lines() {
    let journal = "\
Starting a sync with Microsoft OneDrive
ERROR: Cannot connect to Microsoft OneDrive - no internet connection
Skipping item - excluded by skip_dir config: .cache
Deleting big_delete candidate detected
";
    let runner = ScriptedRunner::new().with_journal_since("onedrive", 5, journal);
    let registry = ServiceRegistry::with_runner(runner, RegistrySettings::with_home("/home/u"));

    assert_eq!(
        registry.recent_errors("onedrive", 5),
        vec![
            "ERROR: Cannot connect to Microsoft OneDrive - no internet connection",
            "Deleting big_delete candidate detected",
        ]
    );
}

#[test]
fn control_requests_reach_the_manager() {
    let runner = ScriptedRunner::new()
        .with_control(ControlAction::Stop, "onedrive", CommandOutput::ok(""))
        .with_control(
            ControlAction::Start,
            "onedrive-work",
            CommandOutput::failed(
                1,
                "Job for onedrive-work.service failed because the control process exited with error code.\n",
            ),
        );
    let registry = ServiceRegistry::with_runner(runner, RegistrySettings::with_home("/home/u"));

    assert_eq!(registry.stop("onedrive").into_tuple(), (true, String::new()));

    let (success, message) = registry.start("onedrive-work").into_tuple();
    assert!(!success);
    assert!(message.starts_with("Job for onedrive-work.service failed"));

    assert_eq!(
        registry.runner().calls(),
        vec![
            "systemctl --user stop onedrive.service",
            "systemctl --user start onedrive-work.service",
        ]
    );
}

#[test]
fn config_edits_through_registry_preserve_comments() {
    let home = tempdir().unwrap();
    let confdir = home.path().join("od/work");
    fs::create_dir_all(&confdir).unwrap();
    fs::write(
        confdir.join("config"),
        "# drive\nsync_dir = \"~/Work\"\n# monitor_interval = \"300\"\nskip_dotfiles = \"false\"\n",
    )
    .unwrap();

    let runner = ScriptedRunner::new().with_exec_start(
        "onedrive-work",
        "ExecStart={ argv[]=/usr/bin/onedrive --monitor --confdir=~/od/work ; }\n",
    );
    let registry = ServiceRegistry::with_runner(runner, RegistrySettings::with_home(home.path()));

    let store = registry.config_store("onedrive-work");
    assert_eq!(store.path(), confdir.join("config"));

    store.set("skip_dotfiles", "true").unwrap();
    store.set("download_only", "true").unwrap();
    store.remove("sync_dir").unwrap();

    assert_eq!(
        fs::read_to_string(confdir.join("config")).unwrap(),
        "# drive\n# monitor_interval = \"300\"\nskip_dotfiles = \"true\"\ndownload_only = \"true\"\n"
    );
    assert_eq!(
        ConfigStore::new(confdir.join("config")).get("sync_dir", "none").unwrap(),
        "none"
    );
}
