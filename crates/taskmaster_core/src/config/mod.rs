use crate::error::AppError;
use crate::reminder::DEFAULT_REMINDER_DELAY;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_ENV_VAR: &str = "TASKMASTER_CONFIG_PATH";

/// Colour scheme for terminal output. Stored by its canonical name.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Theme {
    #[default]
    Plain,
    Noir,
    Solarized,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Noir => "noir",
            Self::Solarized => "solarized",
        }
    }
}

impl FromStr for Theme {
    type Err = AppError;

    /// Case and separators are ignored, so `Dark Mode` and `dark-mode` both
    /// select [`Theme::Noir`].
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let key: String = raw
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .map(|ch| ch.to_ascii_lowercase())
            .collect();

        match key.as_str() {
            "" | "plain" | "default" | "vanilla" | "light" => Ok(Self::Plain),
            "noir" | "dark" | "darkmode" => Ok(Self::Noir),
            "solarized" => Ok(Self::Solarized),
            _ => Err(AppError::invalid_input(format!("unknown theme '{}'", raw.trim()))),
        }
    }
}

impl TryFrom<String> for Theme {
    type Error = AppError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

impl From<Theme> for String {
    fn from(theme: Theme) -> Self {
        theme.as_str().to_string()
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub theme: Option<Theme>,
    #[serde(default)]
    pub reminder_delay_secs: Option<u64>,
    #[serde(default)]
    pub notifications: Option<bool>,
    #[serde(default)]
    pub desktop_notifications: Option<bool>,
    #[serde(default)]
    pub log_level: Option<String>,
}

impl Config {
    pub fn theme(&self) -> Theme {
        self.theme.unwrap_or_default()
    }

    pub fn reminder_delay(&self) -> Duration {
        self.reminder_delay_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_REMINDER_DELAY)
    }

    pub fn notifications_enabled(&self) -> bool {
        self.notifications.unwrap_or(true)
    }

    /// Reminders are always echoed in the terminal; this toggles the desktop popup.
    pub fn desktop_notifications_enabled(&self) -> bool {
        self.desktop_notifications.unwrap_or(true)
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("warn")
    }
}

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: Config,
    pub error: Option<AppError>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub theme: Option<Theme>,
    pub reminder_delay_secs: Option<u64>,
    pub notifications: Option<bool>,
    pub desktop_notifications: Option<bool>,
    pub log_level: Option<String>,
}

pub fn config_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata)
            .join("taskmaster")
            .join(CONFIG_FILE_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("taskmaster")
            .join(CONFIG_FILE_NAME))
    }
}

pub fn load_config_with_fallback() -> ConfigLoad {
    match config_path() {
        Ok(path) => load_config_with_fallback_from_path(&path),
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_with_fallback_from_path(path: &Path) -> ConfigLoad {
    if !path.exists() {
        return ConfigLoad {
            config: Config::default(),
            error: None,
        };
    }

    match load_config_from_path(path) {
        Ok(config) => ConfigLoad {
            config,
            error: None,
        },
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_from_path(path: &Path) -> Result<Config, AppError> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;
    let config: Config = serde_json::from_str(&content).map_err(|err| {
        AppError::invalid_data(format!("invalid JSON in {}: {}", path.display(), err))
    })?;
    validate(&config)
        .map_err(|err| AppError::invalid_data(format!("{}: {}", path.display(), err.message())))?;
    Ok(config)
}

fn validate(config: &Config) -> Result<(), AppError> {
    if config.reminder_delay_secs == Some(0) {
        return Err(AppError::invalid_data(
            "reminder_delay_secs must be at least 1",
        ));
    }
    Ok(())
}

pub fn merge_overrides(base: &Config, overrides: &ConfigOverrides) -> Config {
    let mut merged = base.clone();
    if let Some(theme) = overrides.theme {
        merged.theme = Some(theme);
    }
    if let Some(secs) = overrides.reminder_delay_secs {
        merged.reminder_delay_secs = Some(secs);
    }
    if let Some(enabled) = overrides.notifications {
        merged.notifications = Some(enabled);
    }
    if let Some(enabled) = overrides.desktop_notifications {
        merged.desktop_notifications = Some(enabled);
    }
    if let Some(level) = overrides.log_level.as_ref() {
        merged.log_level = Some(level.clone());
    }

    merged
}
