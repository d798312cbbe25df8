//! Stateful services owned by the session, plus the access gate.

/// Navigation gate keyed on token presence.
pub mod access_gate;
/// Connect, authenticate and reconnect state machine.
pub mod connection_manager;
/// Single visible notification with auto-dismiss.
pub mod notification_center;
/// Current player and its persisted record.
pub mod session_store;

pub use access_gate::{AccessDecision, HOME_PATH, LOGIN_PATH, RouteKind};
pub use connection_manager::{
    CONNECT_TIMEOUT, ConnectionConfig, ConnectionInput, ConnectionManager, MAX_RECONNECT_ATTEMPTS,
    RECONNECT_DELAY,
};
pub use notification_center::NotificationCenter;
pub use session_store::{SESSION_KEY, SessionStore};
