#[path = "common/mod.rs"]
mod common;

use std::fs;

use predicates::prelude::*;
use serde_json::Value;

use common::{LIST_UNITS, Reply, Sandbox, show_exec_start, show_status};

const LISTING: &str = "\
onedrive.service        loaded active   running OneDrive Personal
onedrive-work.service   loaded inactive dead    OneDrive Work
onedrive-monitor.service loaded active  running OneDrive tray monitor
";

#[test]
fn config_keys_are_listed() {
    let sandbox = Sandbox::new();

    sandbox
        .drivux()
        .args(["config", "keys"])
        .assert()
        .success()
        .stdout(predicate::str::contains("sync_dir"))
        .stdout(predicate::str::contains("monitor_interval"));
}

#[test]
fn config_set_get_remove_in_default_confdir() {
    let sandbox = Sandbox::new();
    sandbox.stub("systemctl", &[]);
    let config_dir = sandbox.config_dir("onedrive-work");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(
        config_dir.join("config"),
        "# Work account\nsync_dir = \"~/Work\"\n\n# skip_dotfiles = \"true\"\n",
    )
    .unwrap();

    sandbox
        .drivux()
        .args(["config", "set", "onedrive-work", "monitor_interval", "600"])
        .assert()
        .success();

    let content = fs::read_to_string(config_dir.join("config")).unwrap();
    assert_eq!(
        content,
        "# Work account\nsync_dir = \"~/Work\"\n\n# skip_dotfiles = \"true\"\nmonitor_interval = \"600\"\n"
    );

    sandbox
        .drivux()
        .args(["config", "get", "onedrive-work", "monitor_interval"])
        .assert()
        .success()
        .stdout("600\n");

    sandbox
        .drivux()
        .args(["config", "remove", "onedrive-work", "sync_dir"])
        .assert()
        .success();

    sandbox
        .drivux()
        .args(["config", "get", "onedrive-work", "sync_dir", "--default", "unset"])
        .assert()
        .success()
        .stdout("unset\n");

    let content = fs::read_to_string(config_dir.join("config")).unwrap();
    assert!(content.starts_with("# Work account\n"));
    assert!(content.contains("# skip_dotfiles = \"true\"\n"));
}

#[test]
fn config_show_follows_confdir_flag() {
    let sandbox = Sandbox::new();
    let custom = sandbox.home.join("drives/personal");
    fs::create_dir_all(&custom).unwrap();
    fs::write(custom.join("config"), "sync_dir = \"/data/od\"\nlog_dir=/tmp/od\n").unwrap();

    let exec = format!(
        "ExecStart={{ path=/usr/bin/onedrive ; argv[]=/usr/bin/onedrive --monitor --confdir={} ; }}",
        custom.display()
    );
    sandbox.stub(
        "systemctl",
        &[(show_exec_start("onedrive").as_str(), Reply::Stdout(&exec))],
    );

    let output = sandbox
        .drivux()
        .args(["config", "show", "onedrive", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let values: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(values["sync_dir"], "/data/od");
    assert_eq!(values["log_dir"], "/tmp/od");
}

#[test]
fn list_prints_instances_with_labels() {
    let sandbox = Sandbox::new();
    sandbox.stub("systemctl", &[(LIST_UNITS, Reply::Stdout(LISTING))]);

    sandbox
        .drivux()
        .arg("list")
        .assert()
        .success()
        .stdout("onedrive\tpersonal\nonedrive-work\twork\n");
}

#[test]
fn list_without_instances_fails() {
    let sandbox = Sandbox::new();
    sandbox.stub(
        "systemctl",
        &[(LIST_UNITS, Reply::Stdout("pipewire.service loaded active running PipeWire\n"))],
    );

    sandbox
        .drivux()
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No OneDrive service found"));
}

#[test]
fn status_json_reports_each_instance() {
    let sandbox = Sandbox::new();
    let work_dir = sandbox.config_dir("onedrive-work");
    fs::create_dir_all(&work_dir).unwrap();
    fs::write(work_dir.join("config"), "sync_dir = \"~/Work\"\n").unwrap();

    let personal = "Description=OneDrive Personal\nActiveState=active\nMainPID=4242\nExecStart=\n";
    let work = "Description=OneDrive Work\nActiveState=inactive\nMainPID=0\nExecStart=\n";
    sandbox.stub(
        "systemctl",
        &[
            (LIST_UNITS, Reply::Stdout(LISTING)),
            (show_status("onedrive").as_str(), Reply::Stdout(personal)),
            (show_status("onedrive-work").as_str(), Reply::Stdout(work)),
        ],
    );
    sandbox.stub(
        "journalctl",
        &[(
            "--user -u onedrive.service --since 10 minutes ago --no-pager -q",
            Reply::Stdout("Syncing changes\nERROR: cannot connect to Microsoft OneDrive\n"),
        )],
    );

    let output = sandbox.drivux().args(["status", "--json"]).output().unwrap();
    assert!(output.status.success());

    let snapshot: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(snapshot["overall_health"], "degraded");

    let instances = snapshot["instances"].as_array().unwrap();
    assert_eq!(instances.len(), 2);

    assert_eq!(instances[0]["name"], "onedrive");
    assert_eq!(instances[0]["label"], "personal");
    assert_eq!(instances[0]["active"], true);
    assert_eq!(instances[0]["pid"], 4242);
    assert_eq!(instances[0]["health"], "error");
    assert_eq!(
        instances[0]["recent_errors"][0],
        "ERROR: cannot connect to Microsoft OneDrive"
    );

    assert_eq!(instances[1]["name"], "onedrive-work");
    assert_eq!(instances[1]["display_name"], "OneDrive Work");
    assert_eq!(instances[1]["active"], false);
    assert_eq!(instances[1]["pid"], 0);
    assert_eq!(instances[1]["sync_dir"], "~/Work");
    assert_eq!(instances[1]["health"], "stopped");
}

#[test]
fn restart_of_unknown_instance_reports_manager_error() {
    let sandbox = Sandbox::new();
    sandbox.stub(
        "systemctl",
        &[(
            "--user restart nonexistent.service",
            Reply::Fail(
                "Failed to restart nonexistent.service: Unit nonexistent.service not found.",
                5,
            ),
        )],
    );

    sandbox
        .drivux()
        .args(["restart", "nonexistent"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "nonexistent: Failed to restart nonexistent.service: Unit nonexistent.service not found.",
        ));
}

#[test]
fn start_reports_request() {
    let sandbox = Sandbox::new();
    sandbox.stub(
        "systemctl",
        &[("--user start onedrive-work.service", Reply::Stdout(""))],
    );

    sandbox
        .drivux()
        .args(["start", "onedrive-work"])
        .assert()
        .success()
        .stdout("onedrive-work: start requested\n");
}

#[test]
fn errors_prints_matching_lines() {
    let sandbox = Sandbox::new();
    sandbox.stub(
        "journalctl",
        &[(
            "--user -u onedrive-work.service --since 30 minutes ago --no-pager -q",
            Reply::Stdout(
                "Starting a sync with Microsoft OneDrive\nERROR: big_delete threshold reached\nSync with Microsoft OneDrive is complete\n",
            ),
        )],
    );

    sandbox
        .drivux()
        .args(["errors", "onedrive-work", "--minutes", "30"])
        .assert()
        .success()
        .stdout("ERROR: big_delete threshold reached\n");
}

#[test]
fn logs_filter_without_color() {
    let sandbox = Sandbox::new();
    sandbox.stub(
        "journalctl",
        &[(
            "--user -u onedrive.service -n 5 --no-pager -q",
            Reply::Stdout("Uploading file a.txt ... done\nDownloading file b.txt ... done\nRemote change discovered\n"),
        )],
    );

    sandbox
        .drivux()
        .args(["logs", "onedrive", "-n", "5", "--filter", "FILE", "--no-color"])
        .assert()
        .success()
        .stdout("Uploading file a.txt ... done\nDownloading file b.txt ... done\n");
}

#[test]
fn invalid_settings_file_is_rejected() {
    let sandbox = Sandbox::new();
    let settings = sandbox.home.join("drivux.yaml");
    fs::write(&settings, "unit_marker: onedrive\nbogus: 1\n").unwrap();

    sandbox
        .drivux()
        .arg("--settings")
        .arg(&settings)
        .args(["config", "keys"])
        .assert()
        .failure();
}

#[test]
fn settings_change_unit_marker() {
    let sandbox = Sandbox::new();
    let settings_dir = sandbox.home.join(".config/drivux");
    fs::create_dir_all(&settings_dir).unwrap();
    fs::write(settings_dir.join("drivux.yaml"), "unit_marker: od-\n").unwrap();
    sandbox.stub(
        "systemctl",
        &[(
            LIST_UNITS,
            Reply::Stdout("od-home.service loaded active running OneDrive\nonedrive.service loaded active running OneDrive\n"),
        )],
    );

    sandbox
        .drivux()
        .arg("list")
        .assert()
        .success()
        .stdout("od-home\tod-home\n");
}

#[test]
fn config_set_warns_about_undocumented_key() {
    let sandbox = Sandbox::new();
    sandbox.stub("systemctl", &[]);

    sandbox
        .drivux()
        .args(["config", "set", "onedrive", "sync_dirr", "/data"])
        .assert()
        .success()
        .stderr(predicate::str::contains("'sync_dirr' is not a documented config key"));

    sandbox
        .drivux()
        .args(["config", "set", "onedrive", "sync_dir", "/data"])
        .assert()
        .success()
        .stderr(predicate::str::contains("not a documented").not());

    assert_eq!(
        fs::read_to_string(sandbox.config_dir("onedrive").join("config")).unwrap(),
        "sync_dirr = \"/data\"\nsync_dir = \"/data\"\n"
    );
}
