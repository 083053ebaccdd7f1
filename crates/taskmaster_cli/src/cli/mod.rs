use clap::{Parser, Subcommand};
use taskmaster_core::Filter;
use taskmaster_core::config::ConfigOverrides;
use taskmaster_core::error::AppError;

#[derive(Parser, Debug)]
#[command(name = "taskmaster", author, version, about, long_about = None)]
pub struct Cli {
    /// Command to run; without one an interactive shell starts
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Keep tasks in memory only, nothing is read from or written to disk
    #[arg(long, global = true)]
    pub ephemeral: bool,

    /// Override configuration values (format KEY=VALUE)
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    pub config_override: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a new task
    ///
    /// Example: taskmaster add Buy milk
    Add { text: Vec<String> },
    /// Flip a task between active and completed
    ///
    /// Example: taskmaster toggle 1734000000000
    Toggle { id: u64 },
    /// Replace a task's text
    ///
    /// Example: taskmaster edit 1734000000000 "Buy oat milk"
    Edit { id: u64, text: Vec<String> },
    /// Delete a task and its pending reminder
    ///
    /// Example: taskmaster delete 1734000000000
    Delete { id: u64 },
    /// Choose which tasks `list` shows in this session
    ///
    /// Example: filter active
    Filter { mode: Filter },
    /// List tasks
    ///
    /// Example: taskmaster list --filter completed
    List {
        #[arg(long, value_name = "MODE")]
        filter: Option<Filter>,
    },
    /// Set a reminder that fires after the configured delay
    ///
    /// Example: taskmaster remind 1734000000000
    Remind { id: u64 },
    /// Cancel a pending reminder
    ///
    /// Example: cancel 1734000000000
    Cancel { id: u64 },
    /// Delete every completed task
    ///
    /// Example: taskmaster clear-completed
    ClearCompleted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOverrideTarget {
    Theme,
    ReminderDelaySecs,
    Notifications,
    DesktopNotifications,
    LogLevel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedConfigOverride {
    pub target: ConfigOverrideTarget,
    pub value: String,
}

/// Parse a raw `KEY=VALUE` override string into a structured target.
pub fn parse_config_override(raw: &str) -> Result<ParsedConfigOverride, String> {
    let (key_raw, value_raw) = raw
        .trim()
        .split_once('=')
        .ok_or_else(|| "override must be in KEY=VALUE format".to_string())?;

    let field =
        canonicalize_flag_name(key_raw).ok_or_else(|| "override key cannot be empty".to_string())?;

    let target = match field.as_str() {
        "theme" => ConfigOverrideTarget::Theme,
        "reminder_delay_secs" | "reminder_delay" | "delay" => {
            ConfigOverrideTarget::ReminderDelaySecs
        }
        "notifications" => ConfigOverrideTarget::Notifications,
        "desktop_notifications" => ConfigOverrideTarget::DesktopNotifications,
        "log_level" => ConfigOverrideTarget::LogLevel,
        other => return Err(format!("unknown config field '{other}'")),
    };

    Ok(ParsedConfigOverride {
        target,
        value: value_raw.trim().to_string(),
    })
}

fn parse_bool(field: &str, value: &str) -> Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        _ => Err(format!("{field} expects true or false, got '{value}'")),
    }
}

/// Fold every `--config-override` value into one set of overrides; later
/// values win.
pub fn collect_overrides(raw: &[String]) -> Result<ConfigOverrides, AppError> {
    let mut overrides = ConfigOverrides::default();

    for entry in raw {
        let parsed = parse_config_override(entry).map_err(AppError::invalid_input)?;
        let value = parsed.value;
        match parsed.target {
            ConfigOverrideTarget::Theme => overrides.theme = Some(value.parse()?),
            ConfigOverrideTarget::ReminderDelaySecs => {
                let secs = value
                    .parse::<u64>()
                    .ok()
                    .filter(|secs| *secs > 0)
                    .ok_or_else(|| {
                        AppError::invalid_input(format!(
                            "reminder_delay_secs must be a positive integer, got '{value}'"
                        ))
                    })?;
                overrides.reminder_delay_secs = Some(secs);
            }
            ConfigOverrideTarget::Notifications => {
                let enabled =
                    parse_bool("notifications", &value).map_err(AppError::invalid_input)?;
                overrides.notifications = Some(enabled);
            }
            ConfigOverrideTarget::DesktopNotifications => {
                let enabled = parse_bool("desktop_notifications", &value)
                    .map_err(AppError::invalid_input)?;
                overrides.desktop_notifications = Some(enabled);
            }
            ConfigOverrideTarget::LogLevel => overrides.log_level = Some(value),
        }
    }

    Ok(overrides)
}

fn canonicalize_flag_name(name: &str) -> Option<String> {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Split a shell line into arguments, honouring double quotes and `\"`.
pub fn split_command_line(line: &str) -> Result<Vec<String>, AppError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut quoted = false;
    let mut escape = false;

    for ch in line.chars() {
        if escape {
            if ch != '"' && ch != '\\' {
                current.push('\\');
            }
            current.push(ch);
            escape = false;
            continue;
        }

        if in_quotes && ch == '\\' {
            escape = true;
            continue;
        }

        if ch == '"' {
            in_quotes = !in_quotes;
            quoted = true;
            continue;
        }

        if ch.is_whitespace() && !in_quotes {
            if !current.is_empty() || quoted {
                args.push(std::mem::take(&mut current));
            }
            quoted = false;
            continue;
        }

        current.push(ch);
    }

    if in_quotes {
        return Err(AppError::invalid_input("unterminated quote in command"));
    }

    if !current.is_empty() || quoted {
        args.push(current);
    }

    Ok(args)
}

/// Flags that configure the whole process cannot change inside a running shell.
pub fn reject_startup_flags(cli: &Cli) -> Result<(), AppError> {
    if cli.ephemeral {
        return Err(AppError::invalid_input(
            "--ephemeral only applies when starting taskmaster",
        ));
    }
    if !cli.config_override.is_empty() {
        return Err(AppError::invalid_input(
            "--config-override only applies when starting taskmaster",
        ));
    }
    Ok(())
}

/// First line of a clap error, without its `error: ` prefix.
pub fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::invalid_input(message)
}
