//! Test doubles shared by unit and integration tests.
use std::{
    collections::HashMap,
    io,
    sync::{Mutex, OnceLock},
};

use crate::{
    error::CommandError,
    runner::{CommandOutput, CommandRunner},
    units::{self, ControlAction},
};

/// Global lock for environment variable modifications in tests.
/// All tests that modify environment variables (especially HOME) should acquire this lock
/// to prevent race conditions between parallel test executions.
pub static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

pub fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

enum Scripted {
    Output(CommandOutput),
    SpawnFailure(io::ErrorKind),
}

/// [`CommandRunner`] returning canned output keyed by the full command line.
///
/// Unscripted commands behave like a unit that does not exist: a non-zero exit
/// with an explanatory stderr.
#[derive(Default)]
pub struct ScriptedRunner {
    responses: HashMap<String, Scripted>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(program: &str, args: &[String]) -> String {
        std::iter::once(program.to_string())
            .chain(args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Scripts `output` for the exact invocation.
    pub fn respond(mut self, program: &str, args: &[String], output: CommandOutput) -> Self {
        self.responses
            .insert(Self::key(program, args), Scripted::Output(output));
        self
    }

    /// Makes the invocation fail to spawn.
    pub fn spawn_failure(mut self, program: &str, args: &[String]) -> Self {
        self.responses.insert(
            Self::key(program, args),
            Scripted::SpawnFailure(io::ErrorKind::NotFound),
        );
        self
    }

    /// Scripts the `list-units` output used by discovery.
    pub fn with_units(self, listing: &str) -> Self {
        self.respond(
            crate::constants::SYSTEMCTL,
            &units::list_units_args(),
            CommandOutput::ok(listing),
        )
    }

    /// Scripts the status property query for `name`.
    pub fn with_show(self, name: &str, properties: &str) -> Self {
        self.respond(
            crate::constants::SYSTEMCTL,
            &units::show_args(name, crate::constants::STATUS_PROPERTIES),
            CommandOutput::ok(properties),
        )
    }

    /// Scripts the `ExecStart`-only query for `name`.
    pub fn with_exec_start(self, name: &str, properties: &str) -> Self {
        self.respond(
            crate::constants::SYSTEMCTL,
            &units::show_args(name, "ExecStart"),
            CommandOutput::ok(properties),
        )
    }

    /// Scripts the result of a control action.
    pub fn with_control(self, action: ControlAction, name: &str, output: CommandOutput) -> Self {
        self.respond(
            crate::constants::SYSTEMCTL,
            &units::control_args(action, name),
            output,
        )
    }

    /// Scripts the journal lines emitted within the trailing window.
    pub fn with_journal_since(self, name: &str, minutes: u32, lines: &str) -> Self {
        self.respond(
            crate::constants::JOURNALCTL,
            &units::journal_since_args(name, minutes),
            CommandOutput::ok(lines),
        )
    }

    /// Scripts the last `count` journal lines.
    pub fn with_journal_tail(self, name: &str, count: usize, lines: &str) -> Self {
        self.respond(
            crate::constants::JOURNALCTL,
            &units::journal_tail_args(name, count),
            CommandOutput::ok(lines),
        )
    }

    /// Command lines received so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, CommandError> {
        let key = Self::key(program, args);
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(key.clone());

        match self.responses.get(&key) {
            Some(Scripted::Output(output)) => Ok(output.clone()),
            Some(Scripted::SpawnFailure(kind)) => Err(CommandError {
                program: program.to_string(),
                source: io::Error::new(*kind, "scripted spawn failure"),
            }),
            None => Ok(CommandOutput::failed(
                5,
                format!("no scripted response for '{key}'"),
            )),
        }
    }
}
