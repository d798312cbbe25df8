//! User-facing notifications.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// How long an expiring notification stays visible.
pub const DEFAULT_NOTIFICATION_DURATION: Duration = Duration::from_millis(5000);

/// Severity, used for styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    /// Neutral status, e.g. a reconnect in progress.
    Info,
    /// Something the player should act on.
    Error,
    /// Confirmation of a completed action.
    Success,
}

/// A message shown to the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Severity.
    pub kind: NotificationKind,
    /// Text shown to the player.
    pub message: String,
    /// When the notification was created.
    pub created_at: DateTime<Utc>,
    /// `None` keeps the notification until it is cleared or superseded.
    pub duration: Option<Duration>,
}

impl Notification {
    /// Notification expiring after [`DEFAULT_NOTIFICATION_DURATION`].
    #[must_use]
    pub fn new(kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            created_at: Utc::now(),
            duration: Some(DEFAULT_NOTIFICATION_DURATION),
        }
    }

    /// Info notification.
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Info, message)
    }

    /// Success notification.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Success, message)
    }

    /// Error notification.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Error, message)
    }

    /// Sets how long it stays visible.
    #[must_use]
    pub const fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Keeps it visible until cleared or superseded.
    #[must_use]
    pub const fn persistent(mut self) -> Self {
        self.duration = None;
        self
    }

    /// Whether it never expires on its own.
    #[must_use]
    pub const fn is_persistent(&self) -> bool {
        self.duration.is_none()
    }
}
