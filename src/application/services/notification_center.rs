use std::future;
use std::pin::Pin;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Sleep, sleep};
use tracing::debug;

use crate::domain::{DEFAULT_NOTIFICATION_DURATION, Notification, NotificationKind};

/// Holds at most one user-facing notification and its expiry timer.
///
/// A new post replaces the current notification and restarts the timer;
/// nothing is queued.
#[derive(Debug)]
pub struct NotificationCenter {
    current: Option<Notification>,
    expiry: Option<Pin<Box<Sleep>>>,
    default_duration: Duration,
    tx: watch::Sender<Option<Notification>>,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new(DEFAULT_NOTIFICATION_DURATION)
    }
}

impl NotificationCenter {
    /// Empty center; notifications expire after `default_duration` unless
    /// posted with their own.
    #[must_use]
    pub fn new(default_duration: Duration) -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            current: None,
            expiry: None,
            default_duration,
            tx,
        }
    }

    /// Shows `notification`, replacing whatever is visible.
    pub fn post(&mut self, notification: Notification) {
        debug!(
            kind = ?notification.kind,
            message = %notification.message,
            persistent = notification.is_persistent(),
            "Posting notification"
        );

        self.expiry = notification
            .duration
            .map(|duration| Box::pin(sleep(duration)));
        self.current = Some(notification);
        self.publish();
    }

    /// Shows `message` with the default duration.
    pub fn notify(&mut self, kind: NotificationKind, message: impl Into<String>) {
        let notification = Notification::new(kind, message).with_duration(self.default_duration);
        self.post(notification);
    }

    /// Shows an info message.
    pub fn info(&mut self, message: impl Into<String>) {
        self.notify(NotificationKind::Info, message);
    }

    /// Shows a success message.
    pub fn success(&mut self, message: impl Into<String>) {
        self.notify(NotificationKind::Success, message);
    }

    /// Shows an error message.
    pub fn error(&mut self, message: impl Into<String>) {
        self.notify(NotificationKind::Error, message);
    }

    /// Posts an error that stays until cleared or superseded.
    pub fn persistent_error(&mut self, message: impl Into<String>) {
        self.post(Notification::error(message).persistent());
    }

    /// Removes the current notification and cancels its timer.
    pub fn clear(&mut self) {
        self.expiry = None;
        if self.current.take().is_some() {
            self.publish();
        }
    }

    /// Resolves when the current notification expires, after clearing it.
    ///
    /// Never resolves while nothing is pending. Cancel-safe.
    pub async fn wait_expiry(&mut self) {
        match self.expiry.as_mut() {
            Some(timer) => timer.await,
            None => future::pending().await,
        }

        debug!("Notification expired");
        self.clear();
    }

    /// The visible notification.
    #[must_use]
    pub const fn current(&self) -> Option<&Notification> {
        self.current.as_ref()
    }

    /// Whether the visible notification will expire on its own.
    #[must_use]
    pub const fn has_pending_expiry(&self) -> bool {
        self.expiry.is_some()
    }

    /// Watches the visible notification.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Notification>> {
        self.tx.subscribe()
    }

    fn publish(&self) {
        self.tx.send_replace(self.current.clone());
    }
}
