//! okeylink - session and realtime connection layer for the Okey game client.
//!
//! Keeps the signed-in player's profile and token on disk, drives one
//! authenticated realtime connection with a fixed reconnect policy, holds the
//! single visible notification and decides which screens a player may see.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing session services and the session context.
pub mod application;
/// Domain layer containing entities, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing adapters for storage, transport and configuration.
pub mod infrastructure;

/// Server endpoint used when none is configured.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:5000";

/// Current version of the application.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const NAME: &str = "okeylink";
