//! Application layer: session services, DTOs and the session context.

/// Data transfer objects.
pub mod dto;
/// Stateful services owned by the session.
pub mod services;
/// Session context and event loop.
pub mod session;

pub use dto::{Credentials, ProfileUpdate};
pub use services::{AccessDecision, ConnectionConfig, ConnectionManager, NotificationCenter, SessionStore};
pub use session::{Session, SessionCommand, SessionConfig, SessionEvent};
