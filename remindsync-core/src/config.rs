//! User configuration at ~/.config/remindsync/config.toml.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;
use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};
use crate::source::{ColorRetry, DEFAULT_COLOR_RETRY_ATTEMPTS};
use crate::window::{DEFAULT_LOOKAHEAD_DAYS, SyncWindow};

static DEFAULT_PROVIDER: &str = "eventkit";
static DEFAULT_COLOR_RETRY_DELAY: &str = "1s";
static ENV_PREFIX: &str = "REMINDSYNC";

fn default_provider() -> String {
    DEFAULT_PROVIDER.to_string()
}

fn default_lookahead_days() -> i64 {
    DEFAULT_LOOKAHEAD_DAYS
}

fn default_color_retry_attempts() -> u32 {
    DEFAULT_COLOR_RETRY_ATTEMPTS
}

fn default_color_retry_delay() -> String {
    DEFAULT_COLOR_RETRY_DELAY.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Provider binary suffix: `remindsync-provider-<provider>`
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default = "default_lookahead_days")]
    pub lookahead_days: i64,

    #[serde(default = "default_color_retry_attempts")]
    pub color_retry_attempts: u32,

    /// Humantime duration, e.g. "1s" or "500ms"
    #[serde(default = "default_color_retry_delay")]
    pub color_retry_delay: String,

    /// IANA time zone used to pick a reminder's due date. UTC if unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            provider: default_provider(),
            lookahead_days: default_lookahead_days(),
            color_retry_attempts: default_color_retry_attempts(),
            color_retry_delay: default_color_retry_delay(),
            timezone: None,
        }
    }
}

impl Settings {
    pub fn config_path() -> SyncResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| SyncError::Config("Could not determine config directory".into()))?
            .join("remindsync");

        Ok(config_dir.join("config.toml"))
    }

    /// Load the user's config, writing a commented default file on first run.
    pub fn load() -> SyncResult<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
        }

        Self::load_from(&config_path)
    }

    /// Load `path` (if it exists) with `REMINDSYNC_*` environment overrides on top.
    pub fn load_from(path: &Path) -> SyncResult<Self> {
        let settings: Settings = Config::builder()
            .add_source(File::from(path.to_path_buf()).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .map_err(|e| SyncError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| SyncError::Config(e.to_string()))?;

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> SyncResult<()> {
        if self.lookahead_days < 0 {
            return Err(SyncError::Config(format!(
                "lookahead_days must not be negative, got {}",
                self.lookahead_days
            )));
        }
        SyncWindow::lookahead(self.lookahead_days).map_err(SyncError::Config)?;
        self.color_retry()?;
        self.timezone()?;
        Ok(())
    }

    pub fn color_retry(&self) -> SyncResult<ColorRetry> {
        let delay: Duration = humantime::parse_duration(&self.color_retry_delay).map_err(|e| {
            SyncError::Config(format!(
                "Invalid color_retry_delay '{}': {e}",
                self.color_retry_delay
            ))
        })?;

        Ok(ColorRetry {
            max_attempts: self.color_retry_attempts,
            delay,
        })
    }

    pub fn timezone(&self) -> SyncResult<Option<Tz>> {
        self.timezone
            .as_deref()
            .map(|name| {
                name.parse::<Tz>()
                    .map_err(|_| SyncError::Config(format!("Unknown timezone '{}'", name)))
            })
            .transpose()
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> SyncResult<()> {
        let contents = format!(
            "\
# remindsync configuration

# Provider binary to talk to (remindsync-provider-<name>):
# provider = \"{}\"

# How many days ahead to mirror:
# lookahead_days = {}

# How long to wait for calendar colors after access is granted:
# color_retry_attempts = {}
# color_retry_delay = \"{}\"

# Time zone for reminder due dates (defaults to UTC):
# timezone = \"Europe/Berlin\"
",
            DEFAULT_PROVIDER,
            DEFAULT_LOOKAHEAD_DAYS,
            DEFAULT_COLOR_RETRY_ATTEMPTS,
            DEFAULT_COLOR_RETRY_DELAY
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                SyncError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| SyncError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }

    pub fn to_toml(&self) -> SyncResult<String> {
        toml::to_string_pretty(self).map_err(|e| SyncError::Config(e.to_string()))
    }
}
