//! Application configuration.

use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use super::args::CliArgs;
use crate::DEFAULT_SERVER_URL;
use crate::application::{ConnectionConfig, SessionConfig};

pub(crate) const APP_QUALIFIER: &str = "com";
pub(crate) const APP_ORGANIZATION: &str = "okey";
pub(crate) const APP_NAME: &str = "okeylink";

const LOG_FILE_NAME: &str = "okeylink.log";

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Everything, including frame-level detail.
    Trace,
    /// Transport events and state changes.
    Debug,
    /// Lifecycle milestones.
    #[default]
    Info,
    /// Recoverable problems.
    Warn,
    /// Failures only.
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Application configuration, read from `config.toml` and overridden by CLI
/// arguments.
#[derive(Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// Configuration file path.
    #[serde(skip)]
    pub config: Option<PathBuf>,

    /// Game server endpoint, `http(s)://host[:port]`.
    #[serde(default)]
    pub server_url: Option<String>,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Log file path.
    #[serde(default)]
    pub log_path: Option<PathBuf>,

    /// Directory holding the persisted session.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Reconnect policy.
    #[serde(default)]
    pub connection: ConnectionSettings,

    /// Notification behaviour.
    #[serde(default)]
    pub notifications: NotificationSettings,

    /// Log to stderr instead of the log file.
    #[serde(skip)]
    pub log_stderr: bool,

    /// Keep the session in memory only.
    #[serde(skip)]
    pub ephemeral: bool,
}

/// Reconnection policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSettings {
    /// Reconnects allowed before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed delay between reconnect attempts.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Upper bound on opening one link.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

/// Notification behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationSettings {
    /// How long a notification stays visible.
    #[serde(default = "default_notification_duration_ms")]
    pub duration_ms: u64,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            duration_ms: default_notification_duration_ms(),
        }
    }
}

const fn default_max_attempts() -> u32 {
    5
}

const fn default_retry_delay_ms() -> u64 {
    3000
}

const fn default_connect_timeout_ms() -> u64 {
    10_000
}

const fn default_notification_duration_ms() -> u64 {
    5000
}

impl AppConfig {
    /// Merges CLI arguments into the configuration.
    pub fn merge_with_args(&mut self, args: &CliArgs) {
        if let Some(config_path) = &args.config {
            self.config = Some(config_path.clone());
        }
        if let Some(server_url) = &args.server_url {
            self.server_url = Some(server_url.clone());
        }
        if let Some(log_path) = &args.log_path {
            self.log_path = Some(log_path.clone());
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
        if let Some(data_dir) = &args.data_dir {
            self.data_dir = Some(data_dir.clone());
        }
        self.log_stderr |= args.log_stderr;
        self.ephemeral |= args.ephemeral;
    }

    /// Returns the configured endpoint, or the local development server.
    #[must_use]
    pub fn effective_server_url(&self) -> String {
        self.server_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .unwrap_or(DEFAULT_SERVER_URL)
            .to_string()
    }

    /// Connection manager settings derived from this configuration.
    #[must_use]
    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig::new(self.effective_server_url())
            .with_max_reconnect_attempts(self.connection.max_attempts)
            .with_reconnect_delay(Duration::from_millis(self.connection.retry_delay_ms))
            .with_connect_timeout(Duration::from_millis(self.connection.connect_timeout_ms))
    }

    /// Session settings derived from this configuration.
    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::new(self.connection_config()).with_notification_duration(
            Duration::from_millis(self.notifications.duration_ms),
        )
    }

    /// Returns default config directory.
    #[must_use]
    pub fn default_config_dir() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Returns default config file path.
    #[must_use]
    pub fn default_config_path() -> Option<PathBuf> {
        Self::default_config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Returns default data directory.
    #[must_use]
    pub fn default_data_dir() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.data_dir().to_path_buf())
    }

    /// Returns effective config path.
    #[must_use]
    pub fn effective_config_path(&self) -> Option<PathBuf> {
        self.config.clone().or_else(Self::default_config_path)
    }

    /// Returns effective data directory.
    #[must_use]
    pub fn effective_data_dir(&self) -> Option<PathBuf> {
        self.data_dir.clone().or_else(Self::default_data_dir)
    }

    /// Returns effective log path.
    #[must_use]
    pub fn effective_log_path(&self) -> Option<PathBuf> {
        self.log_path
            .clone()
            .or_else(|| self.effective_data_dir().map(|dir| dir.join(LOG_FILE_NAME)))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config: None,
            server_url: None,
            log_level: LogLevel::Info,
            log_path: None,
            data_dir: None,
            connection: ConnectionSettings::default(),
            notifications: NotificationSettings::default(),
            log_stderr: false,
            ephemeral: false,
        }
    }
}
