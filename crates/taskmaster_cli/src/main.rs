use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::sync::Arc;
use taskmaster_cli::cli::{
    Cli, Command, collect_overrides, normalize_parse_error, reject_startup_flags,
    split_command_line,
};
use taskmaster_cli::render::{self, Palette, TerminalNotifier};
use taskmaster_core::config::{self, Config};
use taskmaster_core::error::AppError;
use taskmaster_core::notify::notifier_from_env;
use taskmaster_core::reminder::{DesktopPermission, ReminderScheduler, TokioTimers};
use taskmaster_core::storage::{FileStore, MemoryStore};
use taskmaster_core::TaskStore;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

const LOG_ENV_VAR: &str = "TASKMASTER_LOG";

fn init_logging(fallback_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(fallback_level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Store and scheduler for one process lifetime.
struct Session {
    store: TaskStore,
    reminders: ReminderScheduler,
    palette: Palette,
}

impl Session {
    fn open(config: &Config, ephemeral: bool) -> Result<Self, AppError> {
        let enabled = config.notifications_enabled();
        let desktop = notifier_from_env(enabled && config.desktop_notifications_enabled());
        let reminders = ReminderScheduler::new(
            Arc::new(TokioTimers::try_current()?),
            Arc::new(TerminalNotifier::new(desktop)),
            Arc::new(DesktopPermission::from_env(enabled)),
            config.reminder_delay(),
        );

        let store = if ephemeral {
            TaskStore::open(MemoryStore::new())
        } else {
            let files = FileStore::from_env()?;
            debug!(dir = %files.dir().display(), "using task data directory");
            TaskStore::open(files)
        };

        Ok(Self {
            store: store.with_reminders(reminders.clone()),
            reminders,
            palette: Palette::for_theme(config.theme()),
        })
    }

    async fn execute(&mut self, command: Command, json: bool) -> Result<(), AppError> {
        match command {
            Command::Add { text } => match self.store.add(&text.join(" "))? {
                Some(task) => render::print_task("Added", &task, json, &self.palette),
                None => render::print_unchanged("Nothing to add", json, &self.palette),
            },
            Command::Toggle { id } => match self.store.toggle(id)? {
                Some(task) if task.completed => {
                    render::print_task("Completed", &task, json, &self.palette)
                }
                Some(task) => render::print_task("Reopened", &task, json, &self.palette),
                None => render::print_missing(id, json),
            },
            Command::Edit { id, text } => match self.store.edit(id, &text.join(" "))? {
                Some(task) => render::print_task("Updated", &task, json, &self.palette),
                None if self.store.get(id).is_some() => {
                    render::print_unchanged("Task text unchanged", json, &self.palette)
                }
                None => render::print_missing(id, json),
            },
            Command::Delete { id } => match self.store.delete(id)? {
                Some(task) => render::print_task("Deleted", &task, json, &self.palette),
                None => render::print_missing(id, json),
            },
            Command::Filter { mode } => {
                self.store.set_filter(mode);
                if json {
                    println!("{}", serde_json::json!({ "filter": mode.as_str() }));
                } else {
                    println!("Showing {mode} tasks");
                }
            }
            Command::List { filter } => {
                if let Some(mode) = filter {
                    self.store.set_filter(mode);
                }
                render::print_list(
                    &self.store.visible_tasks(),
                    self.store.filter(),
                    self.store.remaining_count(),
                    self.store.len(),
                    json,
                    &self.palette,
                );
            }
            Command::Remind { id } => {
                let Some(text) = self.store.get(id).map(|task| task.text.clone()) else {
                    render::print_missing(id, json);
                    return Ok(());
                };
                let notice = self.reminders.schedule(id, &text).await;
                render::print_notice(id, &notice, json);
            }
            Command::Cancel { id } => {
                let cancelled = self.reminders.cancel(id);
                if json {
                    println!("{}", serde_json::json!({ "id": id, "cancelled": cancelled }));
                } else if cancelled {
                    println!("Cancelled reminder for {id}");
                } else {
                    println!("No pending reminder for {id}");
                }
            }
            Command::ClearCompleted => {
                let removed = self.store.clear_completed()?;
                if json {
                    let payload: Vec<_> = removed.iter().map(render::task_json).collect();
                    println!("{}", serde_json::Value::Array(payload));
                } else {
                    println!("Cleared {} completed task(s)", removed.len());
                }
            }
        }

        Ok(())
    }

    /// Keeps a one-shot process alive until its reminders are delivered.
    async fn wait_for_reminders(&self) {
        tokio::select! {
            _ = self.reminders.wait_idle() => {}
            _ = tokio::signal::ctrl_c() => {
                self.reminders.cancel_all();
            }
        }
    }

    fn shutdown(&self) {
        self.reminders.cancel_all();
    }
}

fn print_help() {
    let mut cmd = Cli::command();
    let help = cmd.render_help();
    println!("{help}");
}

async fn run_interactive(session: &mut Session) -> Result<(), AppError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        if line == "help" || line == "?" {
            print_help();
            continue;
        }

        let args = match split_command_line(line) {
            Ok(args) => args,
            Err(err) => {
                eprintln!("ERROR: {}", err);
                continue;
            }
        };

        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push("taskmaster".to_string());
        argv.extend(args);

        let cli = match Cli::try_parse_from(argv) {
            Ok(cli) => cli,
            Err(err) if err.kind() == ErrorKind::DisplayHelp => {
                let _ = err.print();
                continue;
            }
            Err(err) => {
                eprintln!("ERROR: {}", normalize_parse_error(err));
                continue;
            }
        };

        if let Err(err) = reject_startup_flags(&cli) {
            eprintln!("ERROR: {}", err);
            continue;
        }

        let Some(command) = cli.command else {
            print_help();
            continue;
        };

        if let Err(err) = session.execute(command, cli.json).await {
            eprintln!("ERROR: {}", err);
        }
    }

    Ok(())
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let loaded = config::load_config_with_fallback();
    let overrides = collect_overrides(&cli.config_override)?;
    let config = config::merge_overrides(&loaded.config, &overrides);

    init_logging(config.log_level());
    if let Some(err) = loaded.error {
        warn!(error = %err, "using default configuration");
    }

    let mut session = Session::open(&config, cli.ephemeral)?;
    match cli.command {
        Some(command) => {
            session.execute(command, cli.json).await?;
            session.wait_for_reminders().await;
        }
        None => run_interactive(&mut session).await?,
    }
    session.shutdown();

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = err.print();
            return;
        }
        Err(err) => {
            eprintln!("ERROR: {}", normalize_parse_error(err));
            std::process::exit(1);
        }
    };

    let code = match run(cli).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("ERROR: {}", err);
            1
        }
    };

    // A blocked stdin read cannot be cancelled, so don't wait for runtime teardown.
    std::process::exit(code);
}
