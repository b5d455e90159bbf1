#![allow(dead_code)]

use std::{
    fs,
    path::{Path, PathBuf},
};

use assert_cmd::Command;
use tempfile::{TempDir, tempdir};

/// What a stubbed program does for one exact argument list.
pub enum Reply<'a> {
    /// Print the text on stdout and exit 0.
    Stdout(&'a str),
    /// Print the text on stderr and exit with the code.
    Fail(&'a str, i32),
}

/// Isolated HOME plus a PATH holding only stubbed programs.
pub struct Sandbox {
    _temp: TempDir,
    pub home: PathBuf,
    pub bin: PathBuf,
}

impl Sandbox {
    pub fn new() -> Self {
        let temp = tempdir().expect("failed to create tempdir");
        let home = temp.path().join("home");
        let bin = temp.path().join("bin");
        fs::create_dir_all(&home).expect("failed to create home dir");
        fs::create_dir_all(&bin).expect("failed to create bin dir");
        Self {
            _temp: temp,
            home,
            bin,
        }
    }

    /// Installs a `/bin/sh` stub for `program` that answers each argument list.
    /// Anything else fails like an unknown unit.
    pub fn stub(&self, program: &str, cases: &[(&str, Reply<'_>)]) {
        let mut script = String::from("#!/bin/sh\ncase \"$*\" in\n");
        for (args, reply) in cases {
            script.push_str(&format!("  {})\n", quote(args)));
            match reply {
                Reply::Stdout(text) => {
                    for line in text.lines() {
                        script.push_str(&format!("    printf '%s\\n' {}\n", quote(line)));
                    }
                    script.push_str("    exit 0\n    ;;\n");
                }
                Reply::Fail(text, code) => {
                    script.push_str(&format!("    printf '%s\\n' {} >&2\n", quote(text)));
                    script.push_str(&format!("    exit {code}\n    ;;\n"));
                }
            }
        }
        script.push_str("  *)\n    printf '%s\\n' \"Unit not found: $*\" >&2\n    exit 5\n    ;;\nesac\n");

        let path = self.bin.join(program);
        fs::write(&path, script).expect("failed to write stub");
        make_executable(&path);
    }

    pub fn config_dir(&self, name: &str) -> PathBuf {
        self.home.join(".config").join(name)
    }

    /// `drivux` with HOME, XDG config and PATH pointed into the sandbox.
    pub fn drivux(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("drivux"));
        cmd.env_clear()
            .env("HOME", &self.home)
            .env("XDG_CONFIG_HOME", self.home.join(".config"))
            .env("PATH", &self.bin);
        cmd
    }
}

fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "'\\''"))
}

#[cfg(unix)]
fn make_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .expect("failed to mark stub executable");
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) {}

pub const LIST_UNITS: &str = "--user list-units --type=service --all --no-legend --no-pager";

pub fn show_status(name: &str) -> String {
    format!(
        "--user show {name}.service --property=Description,ActiveState,MainPID,ExecStart --no-pager"
    )
}

pub fn show_exec_start(name: &str) -> String {
    format!("--user show {name}.service --property=ExecStart --no-pager")
}
