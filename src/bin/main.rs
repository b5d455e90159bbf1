use std::{
    error::Error,
    io::{self, IsTerminal, Write},
    process::ExitCode,
    thread,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use drivux::{
    cli::{Cli, Commands, ConfigCommands, parse_args},
    config::ConfigValues,
    constants::{CONFIG_KEYS, SERVICE_SUFFIX, describe_key},
    logs::{self, HighlightedLine, LogFollower},
    registry::ServiceRegistry,
    settings::{home_dir, load_settings, parse_duration},
    status::{self, StatusSnapshot},
    units::{ControlAction, short_label},
};

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

fn main() -> Result<ExitCode, Box<dyn Error>> {
    let args = parse_args();
    init_logging(&args);

    let settings = load_settings(args.settings.as_deref())?;
    let mut registry = ServiceRegistry::new(settings.registry_settings(home_dir()));

    let code = match args.command {
        Commands::List => {
            let services = registry.discover();
            if services.is_empty() {
                return Ok(no_instances());
            }
            for name in services {
                println!("{name}\t{}", short_label(&name));
            }
            ExitCode::SUCCESS
        }
        Commands::Status {
            name,
            json,
            no_color,
            errors_window,
            watch,
        } => {
            let window = errors_window.unwrap_or(settings.error_window_minutes);
            let color = !no_color && !json && io::stdout().is_terminal();
            let view = StatusView {
                name: name.as_deref(),
                json,
                color,
                window,
            };

            match watch {
                Some(interval) => {
                    let interval = if interval.trim().is_empty() {
                        settings.refresh_interval()?
                    } else {
                        parse_duration(&interval)?
                    };
                    info!("Refreshing status every {:?}", interval);
                    loop {
                        if color {
                            print!("{CLEAR_SCREEN}");
                        }
                        let _ = view.show(&mut registry)?;
                        io::stdout().flush()?;
                        thread::sleep(interval);
                    }
                }
                None => view.show(&mut registry)?,
            }
        }
        Commands::Start { name } => control(&registry, ControlAction::Start, &name),
        Commands::Stop { name } => control(&registry, ControlAction::Stop, &name),
        Commands::Restart { name } => control(&registry, ControlAction::Restart, &name),
        Commands::RestartAll => {
            if registry.discover().is_empty() {
                return Ok(no_instances());
            }
            let mut code = ExitCode::SUCCESS;
            for (name, outcome) in registry.restart_all() {
                if outcome.success {
                    println!("{name}: restarted");
                } else {
                    eprintln!("{name}: {}", outcome.message);
                    code = ExitCode::FAILURE;
                }
            }
            code
        }
        Commands::Errors { name, minutes } => {
            let window = minutes.unwrap_or(settings.error_window_minutes);
            let errors = registry.recent_errors(&name, window);
            for line in &errors {
                println!("{line}");
            }
            info!(
                "{} error line(s) for '{name}' in the last {window} minute(s)",
                errors.len()
            );
            ExitCode::SUCCESS
        }
        Commands::Logs {
            name,
            lines,
            filter,
            follow,
            no_color,
        } => {
            let color = !no_color && io::stdout().is_terminal();
            if follow {
                follow_logs(&name, lines.unwrap_or(settings.follow_lines), &filter, color)?;
            } else {
                let output = registry.logs(&name, lines.unwrap_or(settings.log_lines));
                logs::pump_lines(output.as_bytes(), &filter, |line| {
                    println!("{}", HighlightedLine::new(line, color));
                })?;
            }
            ExitCode::SUCCESS
        }
        Commands::Config { command } => run_config(&registry, command)?,
    };

    Ok(code)
}

fn init_logging(args: &Cli) {
    let filter = if let Some(level) = args.log_level {
        EnvFilter::new(level.as_str())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn no_instances() -> ExitCode {
    eprintln!("No OneDrive service found. Is a onedrive{SERVICE_SUFFIX} user unit installed?");
    ExitCode::FAILURE
}

struct StatusView<'a> {
    name: Option<&'a str>,
    json: bool,
    color: bool,
    window: u32,
}

impl StatusView<'_> {
    fn show(&self, registry: &mut ServiceRegistry) -> Result<ExitCode, Box<dyn Error>> {
        if let Some(name) = self.name {
            let status = registry.instance_status(registry.status(name), self.window);
            if self.json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print!("{}", status::render_detail(&status, self.color));
            }
            return Ok(ExitCode::SUCCESS);
        }

        if registry.discover().is_empty() {
            return Ok(no_instances());
        }

        let instances: Vec<_> = registry
            .all_statuses()
            .into_iter()
            .map(|record| registry.instance_status(record, self.window))
            .collect();
        let snapshot = StatusSnapshot::new(instances);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        } else {
            print!("{}", status::render_table(&snapshot.instances, self.color));
        }
        Ok(ExitCode::SUCCESS)
    }
}

fn control(registry: &ServiceRegistry, action: ControlAction, name: &str) -> ExitCode {
    let outcome = registry.control(action, name);
    if outcome.success {
        println!("{name}: {action} requested");
        ExitCode::SUCCESS
    } else {
        eprintln!("{name}: {}", outcome.message);
        ExitCode::FAILURE
    }
}

fn follow_logs(
    name: &str,
    backlog: usize,
    filter: &str,
    color: bool,
) -> Result<(), Box<dyn Error>> {
    let (follower, reader) = LogFollower::spawn(name, backlog)?;

    let stopper = follower.stopper();
    ctrlc::set_handler(move || stopper.stop())?;

    let result = logs::pump_lines(reader, filter, |line| {
        println!("{}", HighlightedLine::new(line, color));
    });
    follower.stop();
    result?;
    Ok(())
}

fn run_config(
    registry: &ServiceRegistry,
    command: ConfigCommands,
) -> Result<ExitCode, Box<dyn Error>> {
    match command {
        ConfigCommands::Show { name, json } => {
            let store = registry.config_store(&name);
            let values: ConfigValues = store.read()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&values)?);
            } else {
                println!("# {}", store.path().display());
                for (key, value) in &values {
                    println!("{key} = \"{value}\"");
                }
            }
        }
        ConfigCommands::Get { name, key, default } => {
            println!("{}", registry.config_store(&name).get(&key, &default)?);
        }
        ConfigCommands::Set { name, key, value } => {
            if describe_key(&key).is_none() {
                warn!("'{key}' is not a documented config key; see `drivux config keys`");
            }
            let store = registry.config_store(&name);
            store.set(&key, &value)?;
            info!("Set '{key}' in {:?}", store.path());
        }
        ConfigCommands::Remove { name, key } => {
            let store = registry.config_store(&name);
            if !store.read()?.contains_key(&key) {
                warn!("'{key}' is not set in {:?}", store.path());
            }
            store.remove(&key)?;
            info!("Removed '{key}' from {:?}", store.path());
        }
        ConfigCommands::Keys => {
            let width = CONFIG_KEYS
                .iter()
                .map(|(key, _)| key.len())
                .max()
                .unwrap_or(0);
            for (key, description) in CONFIG_KEYS {
                println!("{key:<width$}  {description}");
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
