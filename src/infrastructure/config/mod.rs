//! Application configuration.

/// Configuration values and their defaults.
pub mod app_config;
/// Command-line arguments.
pub mod args;
/// Configuration file loading.
pub mod loader;

pub use app_config::{AppConfig, ConnectionSettings, LogLevel, NotificationSettings};
pub use args::{CliArgs, Command, RunArgs};
pub use loader::{ConfigError, ConfigLoader};
