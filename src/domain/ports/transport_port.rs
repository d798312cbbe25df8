use std::time::Duration;

use tokio::sync::mpsc;

use crate::domain::entities::AuthToken;

/// Events reported by one transport instance, in the order they happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The link to the server is open.
    Connect,
    /// An open link dropped.
    Disconnect {
        /// Close reason or transport error.
        reason: String,
    },
    /// The link could not be opened.
    ConnectError {
        /// Why opening failed.
        error: String,
    },
    /// The server accepted the auth payload.
    Authenticated,
    /// The server rejected the auth payload.
    Unauthorized {
        /// Message sent by the server.
        message: String,
    },
}

impl TransportEvent {
    /// Wire-level event name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Disconnect { .. } => "disconnect",
            Self::ConnectError { .. } => "connect_error",
            Self::Authenticated => "authenticated",
            Self::Unauthorized { .. } => "unauthorized",
        }
    }

    /// Link failures that are worth reconnecting after.
    #[must_use]
    pub const fn is_transient_failure(&self) -> bool {
        matches!(self, Self::Disconnect { .. } | Self::ConnectError { .. })
    }

    /// Detail carried by failure events.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Disconnect { reason } => Some(reason),
            Self::ConnectError { error } => Some(error),
            Self::Unauthorized { message } => Some(message),
            Self::Connect | Self::Authenticated => None,
        }
    }
}

/// Settings a transport instance is created with.
///
/// The token travels with the connection itself; there is no separate login
/// message for callers to send.
#[derive(Debug, Clone)]
pub struct TransportOptions {
    /// Server endpoint, `http(s)://` or `ws(s)://`.
    pub endpoint: String,
    /// Token sent in the auth payload.
    pub token: AuthToken,
    /// Upper bound on opening the link.
    pub connect_timeout: Duration,
}

impl TransportOptions {
    /// Options with the default connect timeout.
    #[must_use]
    pub fn new(endpoint: impl Into<String>, token: AuthToken) -> Self {
        Self {
            endpoint: endpoint.into(),
            token,
            connect_timeout: Duration::from_secs(10),
        }
    }

    /// Sets the connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// One transport instance. Created idle; nothing happens until `connect`.
pub trait Transport: Send {
    /// Opens the link and starts reporting events.
    fn connect(&mut self);

    /// Closes the link. No events are delivered after this returns.
    fn disconnect(&mut self);
}

/// Port for creating transport instances.
pub trait TransportPort: Send + Sync {
    /// Creates an idle transport that reports on `events`.
    fn create(
        &self,
        options: TransportOptions,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Box<dyn Transport>;
}
