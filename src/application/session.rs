//! The application context: one signed-in (or anonymous) player, their
//! realtime connection and the notification they are looking at.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::application::dto::{Credentials, ProfileUpdate};
use crate::application::services::access_gate::{self, AccessDecision};
use crate::application::services::{
    ConnectionConfig, ConnectionInput, ConnectionManager, NotificationCenter, SessionStore,
};
use crate::domain::errors::SessionError;
use crate::domain::ports::{SessionStoragePort, TransportPort};
use crate::domain::{
    ConnectionSignal, ConnectionState, DEFAULT_NOTIFICATION_DURATION, Notification, User,
};

/// Shown while a reconnect is pending.
pub const MSG_RECONNECTING: &str = "Connection to the server was lost. Reconnecting...";
/// Shown after the server rejected the token.
pub const MSG_AUTH_FAILED: &str = "Your session has expired. Please sign in again.";
/// Shown, until dismissed, after reconnecting gave up.
pub const MSG_EXHAUSTED: &str = "Could not reach the server.";
/// Shown after a saved profile change.
pub const MSG_PROFILE_UPDATED: &str = "Profile updated!";
/// Shown when the session could not be persisted.
pub const MSG_SAVE_FAILED: &str = "Could not save your session on this device.";

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Connection manager settings.
    pub connection: ConnectionConfig,
    /// Default lifetime of a notification.
    pub notification_duration: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            notification_duration: DEFAULT_NOTIFICATION_DURATION,
        }
    }
}

impl SessionConfig {
    /// Default notification lifetime with `connection`.
    #[must_use]
    pub fn new(connection: ConnectionConfig) -> Self {
        Self {
            connection,
            ..Self::default()
        }
    }

    /// Sets the default notification lifetime.
    #[must_use]
    pub const fn with_notification_duration(mut self, duration: Duration) -> Self {
        self.notification_duration = duration;
        self
    }
}

/// Something the event loop woke up for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Input for the connection manager.
    Connection(ConnectionInput),
    /// The visible notification timed out.
    NotificationExpired,
}

/// Requests accepted by [`Session::run`] from the outside.
#[derive(Debug, Clone)]
pub enum SessionCommand {
    /// See [`Session::login`].
    Login(Credentials),
    /// See [`Session::logout`].
    Logout,
    /// See [`Session::update_profile`].
    UpdateProfile(ProfileUpdate),
    /// See [`Session::retry`].
    Retry,
    /// See [`Session::dismiss_notification`].
    DismissNotification,
}

/// Owns the session store, the connection manager and the notification
/// center, and routes control flow between them.
///
/// Token changes in the store restart the connection; a rejected token
/// revokes it in the store. Both paths report to the notification center.
pub struct Session {
    store: SessionStore,
    connection: ConnectionManager,
    notifications: NotificationCenter,
}

impl Session {
    /// Restores the persisted user. Nothing connects until [`Session::start`].
    #[must_use]
    pub fn new(
        storage: Arc<dyn SessionStoragePort>,
        transport: Arc<dyn TransportPort>,
        config: SessionConfig,
    ) -> Self {
        let store = SessionStore::load(storage);
        let connection = ConnectionManager::new(config.connection, transport);
        let notifications = NotificationCenter::new(config.notification_duration);

        Self {
            store,
            connection,
            notifications,
        }
    }

    /// Connects with the stored token, if there is one.
    pub fn start(&mut self) {
        info!(
            name = %self.store.user().display_name(),
            authenticated = self.store.has_token(),
            "Starting session"
        );
        self.connection.start(self.store.token().cloned());
    }

    /// Closes the connection. The stored session is kept.
    pub fn stop(&mut self) {
        info!("Stopping session");
        self.connection.stop();
    }

    /// Signs in and reconnects when the token changed or the connection is
    /// not running.
    ///
    /// # Errors
    /// Returns error if the session could not be persisted. The login still
    /// takes effect for this run.
    pub fn login(&mut self, credentials: Credentials) -> Result<(), SessionError> {
        let previous = self.store.token().cloned();
        let result = self.store.login(credentials);

        let token = self.store.token().cloned();
        let state = self.connection.state();
        if token != previous || state.is_failed() || state == ConnectionState::Idle {
            self.connection.start(token);
        } else {
            debug!("Token unchanged, keeping connection");
        }

        self.report(result)
    }

    /// Disconnects, then signs out and forgets the persisted session.
    ///
    /// # Errors
    /// Returns error if the persisted session could not be removed.
    pub fn logout(&mut self) -> Result<(), SessionError> {
        self.connection.stop();
        let result = self.store.logout();
        self.report(result)
    }

    /// Saves profile changes and confirms them with a notification. An
    /// update without changes does nothing.
    ///
    /// # Errors
    /// Returns error if the session could not be persisted.
    pub fn update_profile(&mut self, update: ProfileUpdate) -> Result<(), SessionError> {
        if update.is_empty() {
            debug!("Empty profile update, nothing to save");
            return Ok(());
        }

        match self.store.update_profile(update) {
            Ok(()) => {
                self.notifications.success(MSG_PROFILE_UPDATED);
                Ok(())
            }
            Err(e) => self.report(Err(e)),
        }
    }

    /// Reconnects after the connection gave up. Returns `false` if there is
    /// nothing to retry.
    pub fn retry(&mut self) -> bool {
        let retried = self.connection.retry();
        if retried {
            self.notifications.clear();
        }
        retried
    }

    /// Hides the visible notification.
    pub fn dismiss_notification(&mut self) {
        self.notifications.clear();
    }

    /// Checks navigation to `path` against the current token.
    #[must_use]
    pub fn access(&self, path: &str) -> AccessDecision {
        access_gate::decide(self.store.has_token(), path)
    }

    /// The current player.
    #[must_use]
    pub const fn user(&self) -> &User {
        self.store.user()
    }

    /// Current connection state.
    #[must_use]
    pub const fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// The visible notification, if any.
    #[must_use]
    pub const fn notification(&self) -> Option<&Notification> {
        self.notifications.current()
    }

    /// True until the first authentication for the held token settles.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.connection.is_loading()
    }

    /// Watches the current player.
    #[must_use]
    pub fn subscribe_user(&self) -> watch::Receiver<User> {
        self.store.subscribe()
    }

    /// Watches the connection state.
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.connection.subscribe_state()
    }

    /// Receives connection lifecycle signals.
    #[must_use]
    pub fn subscribe_signals(&self) -> broadcast::Receiver<ConnectionSignal> {
        self.connection.subscribe_signals()
    }

    /// Watches the visible notification.
    #[must_use]
    pub fn subscribe_notifications(&self) -> watch::Receiver<Option<Notification>> {
        self.notifications.subscribe()
    }

    /// Waits for the next transport event or timer. Cancel-safe.
    pub async fn next_event(&mut self) -> SessionEvent {
        tokio::select! {
            input = self.connection.next_input() => SessionEvent::Connection(input),
            () = self.notifications.wait_expiry() => SessionEvent::NotificationExpired,
        }
    }

    /// Applies one event from [`Session::next_event`].
    pub fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Connection(input) => {
                if let Some(signal) = self.connection.handle(input) {
                    self.on_signal(signal);
                }
            }
            // Already cleared by the notification center.
            SessionEvent::NotificationExpired => {}
        }
    }

    /// Applies one command. Failures are already reported as notifications.
    pub fn apply(&mut self, command: SessionCommand) {
        let result = match command {
            SessionCommand::Login(credentials) => self.login(credentials),
            SessionCommand::Logout => self.logout(),
            SessionCommand::UpdateProfile(update) => self.update_profile(update),
            SessionCommand::Retry => {
                if !self.retry() {
                    debug!("Nothing to retry");
                }
                Ok(())
            }
            SessionCommand::DismissNotification => {
                self.dismiss_notification();
                Ok(())
            }
        };

        if let Err(e) = result {
            debug!(error = %e, "Command finished with error");
        }
    }

    /// Drives the session until `shutdown` resolves, then stops it.
    ///
    /// Commands are applied in order. Once every command sender is gone the
    /// loop keeps serving transport events and timers.
    pub async fn run<F>(&mut self, mut commands: mpsc::UnboundedReceiver<SessionCommand>, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut commands_open = true;

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                command = commands.recv(), if commands_open => match command {
                    Some(command) => self.apply(command),
                    None => {
                        debug!("Command channel closed");
                        commands_open = false;
                    }
                },
                event = self.next_event() => self.handle_event(event),
            }
        }

        self.stop();
    }

    fn on_signal(&mut self, signal: ConnectionSignal) {
        match signal {
            ConnectionSignal::TransientError { attempt, .. } => {
                debug!(attempt, "Reporting reconnect");
                self.notifications.info(MSG_RECONNECTING);
            }
            ConnectionSignal::AuthFailed { .. } => {
                if let Err(e) = self.store.revoke_token() {
                    error!(error = %e, "Failed to remove rejected session");
                }
                self.notifications.error(MSG_AUTH_FAILED);
            }
            ConnectionSignal::Exhausted { .. } => {
                self.notifications.persistent_error(MSG_EXHAUSTED);
            }
            ConnectionSignal::Connected | ConnectionSignal::StateChanged { .. } => {}
        }
    }

    fn report(&mut self, result: Result<(), SessionError>) -> Result<(), SessionError> {
        if let Err(e) = &result {
            warn!(error = %e, "Failed to persist session");
            self.notifications.error(MSG_SAVE_FAILED);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::{LOGIN_PATH, MAX_RECONNECT_ATTEMPTS, SESSION_KEY};
    use crate::domain::entities::AuthToken;
    use crate::domain::ports::TransportEvent;
    use crate::domain::ports::mocks::{MockSessionStorage, MockTransportPort};
    use crate::domain::{FailureReason, NotificationKind};
    use tokio::time::{Instant, sleep, timeout};

    const STORED_ABC: &str = r#"{"name":"Ada","avatar":"https://example.com/a.png","token":"abc"}"#;

    fn token(value: &str) -> AuthToken {
        AuthToken::new(value).unwrap()
    }

    fn session_with(storage: &Arc<MockSessionStorage>) -> (Session, MockTransportPort) {
        let port = MockTransportPort::new();
        let session = Session::new(
            storage.clone(),
            Arc::new(port.clone()),
            SessionConfig::default(),
        );
        (session, port)
    }

    async fn step(session: &mut Session) -> SessionEvent {
        let event = session.next_event().await;
        session.handle_event(event.clone());
        event
    }

    fn states(rx: &mut broadcast::Receiver<ConnectionSignal>) -> Vec<ConnectionState> {
        let mut states = vec![ConnectionState::Idle];
        while let Ok(signal) = rx.try_recv() {
            if let ConnectionSignal::StateChanged { to, .. } = signal {
                states.push(to);
            }
        }
        states
    }

    #[tokio::test]
    async fn test_stored_token_connects_and_authenticates() {
        let storage = Arc::new(MockSessionStorage::with_entry(SESSION_KEY, STORED_ABC));
        let (mut session, port) = session_with(&storage);
        let mut signals = session.subscribe_signals();

        session.start();
        assert!(session.is_loading());
        let link = port.last().unwrap();
        assert_eq!(link.options.token.as_str(), "abc");

        link.emit(TransportEvent::Connect);
        step(&mut session).await;
        link.emit(TransportEvent::Authenticated);
        step(&mut session).await;

        assert_eq!(
            states(&mut signals),
            vec![
                ConnectionState::Idle,
                ConnectionState::Connecting,
                ConnectionState::Authenticating,
                ConnectionState::Connected,
            ]
        );
        assert!(session.notification().is_none());
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn test_rejected_token_is_revoked() {
        let storage = Arc::new(MockSessionStorage::with_entry(SESSION_KEY, STORED_ABC));
        let (mut session, port) = session_with(&storage);
        session.start();
        let link = port.last().unwrap();

        link.emit(TransportEvent::Connect);
        step(&mut session).await;
        link.emit(TransportEvent::Unauthorized {
            message: "invalid token".into(),
        });
        step(&mut session).await;

        assert_eq!(
            session.connection_state(),
            ConnectionState::Failed(FailureReason::Unauthorized)
        );
        assert!(!session.user().is_authenticated());
        assert_eq!(session.user().name(), "Ada");
        assert!(storage.raw(SESSION_KEY).is_none());
        assert!(link.is_closed());
        assert_eq!(
            session.access("/").redirect_target(),
            Some(LOGIN_PATH)
        );

        let notification = session.notification().unwrap();
        assert_eq!(notification.kind, NotificationKind::Error);
        assert_eq!(notification.message, MSG_AUTH_FAILED);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_reconnects_leave_persistent_error() {
        let storage = Arc::new(MockSessionStorage::with_entry(SESSION_KEY, STORED_ABC));
        let (mut session, port) = session_with(&storage);
        session.start();

        for attempt in 1..=MAX_RECONNECT_ATTEMPTS {
            port.last().unwrap().emit(TransportEvent::ConnectError {
                error: "connection refused".into(),
            });
            step(&mut session).await;
            assert_eq!(
                session.connection_state(),
                ConnectionState::Reconnecting { attempt }
            );
            assert_eq!(session.notification().unwrap().message, MSG_RECONNECTING);

            let event = step(&mut session).await;
            assert_eq!(event, SessionEvent::Connection(ConnectionInput::RetryElapsed));
        }

        assert_eq!(
            session.connection_state(),
            ConnectionState::Failed(FailureReason::Exhausted)
        );
        let notification = session.notification().unwrap();
        assert!(notification.is_persistent());
        assert_eq!(notification.message, MSG_EXHAUSTED);

        let quiet = timeout(Duration::from_secs(60), session.next_event()).await;
        assert!(quiet.is_err());
        assert_eq!(port.created(), MAX_RECONNECT_ATTEMPTS as usize);
        assert!(session.user().is_authenticated());

        assert!(session.retry());
        assert!(session.notification().is_none());
        assert_eq!(port.created(), MAX_RECONNECT_ATTEMPTS as usize + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_profile_update_notifies_and_expires() {
        let storage = Arc::new(MockSessionStorage::with_entry(SESSION_KEY, STORED_ABC));
        let (mut session, _port) = session_with(&storage);
        let start = Instant::now();

        session
            .update_profile(ProfileUpdate::new().with_name("Ada Lovelace"))
            .unwrap();

        assert_eq!(session.user().name(), "Ada Lovelace");
        assert_eq!(
            session.user().token().map(AuthToken::as_str),
            Some("abc")
        );
        let notification = session.notification().unwrap();
        assert_eq!(notification.kind, NotificationKind::Success);
        assert_eq!(notification.message, MSG_PROFILE_UPDATED);

        let event = step(&mut session).await;
        assert_eq!(event, SessionEvent::NotificationExpired);
        assert!(session.notification().is_none());
        assert!(start.elapsed() >= Duration::from_millis(5000));
    }

    #[tokio::test]
    async fn test_empty_profile_update_is_skipped() {
        let storage = Arc::new(MockSessionStorage::with_entry(SESSION_KEY, STORED_ABC));
        let (mut session, _port) = session_with(&storage);

        session.update_profile(ProfileUpdate::new()).unwrap();

        assert_eq!(storage.writes(), 0);
        assert!(session.notification().is_none());
        assert_eq!(session.user().name(), "Ada");
    }

    #[tokio::test]
    async fn test_anonymous_start_opens_nothing() {
        let storage = Arc::new(MockSessionStorage::new());
        let (mut session, port) = session_with(&storage);

        session.start();

        assert_eq!(port.created(), 0);
        assert_eq!(session.connection_state(), ConnectionState::Idle);
        assert!(!session.is_loading());
        assert!(!session.access("/room/1").is_allowed());
        assert!(session.access("/auth").is_allowed());
    }

    #[tokio::test]
    async fn test_login_connects_only_on_token_change() {
        let storage = Arc::new(MockSessionStorage::new());
        let (mut session, port) = session_with(&storage);
        session.start();

        session
            .login(Credentials::new(token("abc")).with_name("Ada"))
            .unwrap();
        assert_eq!(port.created(), 1);
        assert!(session.access("/auth").redirect_target().is_some());

        session
            .login(Credentials::new(token("abc")).with_name("Ada L."))
            .unwrap();
        assert_eq!(port.created(), 1);
        assert_eq!(session.user().name(), "Ada L.");

        session.login(Credentials::new(token("xyz"))).unwrap();
        assert_eq!(port.created(), 2);
        assert!(port.link(0).unwrap().is_closed());
    }

    #[tokio::test]
    async fn test_logout_tears_down_and_clears_record() {
        let storage = Arc::new(MockSessionStorage::with_entry(SESSION_KEY, STORED_ABC));
        let (mut session, port) = session_with(&storage);
        session.start();
        let link = port.last().unwrap();

        session.logout().unwrap();

        assert!(link.is_closed());
        assert_eq!(session.connection_state(), ConnectionState::Idle);
        assert_eq!(session.user(), &User::anonymous());
        assert!(storage.raw(SESSION_KEY).is_none());

        session.logout().unwrap();
        assert_eq!(port.created(), 1);
    }

    #[tokio::test]
    async fn test_save_failure_is_reported() {
        let storage = Arc::new(MockSessionStorage::new());
        storage.set_fail_writes(true);
        let (mut session, port) = session_with(&storage);

        let result = session.login(Credentials::new(token("abc")));

        assert!(result.is_err());
        assert!(session.user().is_authenticated());
        assert_eq!(port.created(), 1);
        assert_eq!(session.notification().unwrap().message, MSG_SAVE_FAILED);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_applies_commands_until_shutdown() {
        let storage = Arc::new(MockSessionStorage::new());
        let (mut session, port) = session_with(&storage);
        let (tx, rx) = mpsc::unbounded_channel();

        tx.send(SessionCommand::Login(Credentials::new(token("abc"))))
            .unwrap();
        tx.send(SessionCommand::UpdateProfile(
            ProfileUpdate::new().with_name("Bob"),
        ))
        .unwrap();
        drop(tx);

        session.run(rx, sleep(Duration::from_secs(1))).await;

        assert_eq!(session.user().name(), "Bob");
        assert_eq!(port.created(), 1);
        assert!(port.last().unwrap().is_closed());
        assert_eq!(session.connection_state(), ConnectionState::Idle);
        assert!(storage.raw(SESSION_KEY).is_some());
    }
}
