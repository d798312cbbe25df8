//! Realtime connection lifecycle states and the signals published on each change.

use std::fmt;

/// Why a connection ended up in [`ConnectionState::Failed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureReason {
    /// The server rejected the token.
    Unauthorized,
    /// Every reconnection attempt failed.
    Exhausted,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::Exhausted => write!(f, "exhausted"),
        }
    }
}

/// Where the realtime connection currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No token, no transport.
    #[default]
    Idle,
    /// A transport is opening its link.
    Connecting,
    /// The link is open and the auth payload is on its way.
    Authenticating,
    /// The server accepted the token.
    Connected,
    /// Waiting out the delay before reconnect `attempt`.
    Reconnecting {
        /// Failures since the last successful connection, starting at 1.
        attempt: u32,
    },
    /// Terminal until the next start or explicit retry.
    Failed(FailureReason),
}

impl ConnectionState {
    /// States in which a transport instance is alive.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(
            self,
            Self::Connecting | Self::Authenticating | Self::Connected
        )
    }

    /// Whether the connection gave up.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Authenticating => write!(f, "Authenticating"),
            Self::Connected => write!(f, "Connected"),
            Self::Reconnecting { attempt } => write!(f, "Reconnecting (attempt {attempt})"),
            Self::Failed(reason) => write!(f, "Failed ({reason})"),
        }
    }
}

/// Lifecycle signal published to observers of the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionSignal {
    /// The state moved, or a new transport was built in the same state.
    StateChanged {
        /// State before the change.
        from: ConnectionState,
        /// State after the change.
        to: ConnectionState,
    },
    /// The server accepted the token.
    Connected,
    /// The server rejected the token; it has been dropped.
    AuthFailed {
        /// Message sent by the server.
        reason: String,
    },
    /// The link failed and a reconnect is scheduled.
    TransientError {
        /// Reconnect attempt about to be made.
        attempt: u32,
        /// What went wrong.
        reason: String,
    },
    /// Reconnecting gave up.
    Exhausted {
        /// Attempts made before giving up.
        attempts: u32,
    },
}
