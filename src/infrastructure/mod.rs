//! Infrastructure layer with storage, transport and configuration adapters.

/// Application configuration.
pub mod config;
/// WebSocket realtime transport.
pub mod realtime;
/// Session storage adapters.
pub mod storage;

pub use config::{AppConfig, CliArgs, Command, ConfigLoader, LogLevel, RunArgs};
pub use realtime::{WebSocketTransport, WebSocketTransportPort};
pub use storage::{FileSessionStorage, MemorySessionStorage};
