use std::future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{Sleep, sleep};
use tracing::{debug, error, info, warn};

use crate::DEFAULT_SERVER_URL;
use crate::domain::connection::{ConnectionSignal, ConnectionState, FailureReason};
use crate::domain::entities::AuthToken;
use crate::domain::ports::{Transport, TransportEvent, TransportOptions, TransportPort};

/// Failed reconnects tolerated before giving up.
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;
/// Fixed wait before each reconnect.
pub const RECONNECT_DELAY: Duration = Duration::from_millis(3000);
/// Upper bound on opening one link.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const SIGNAL_CHANNEL_CAPACITY: usize = 64;

/// Connection manager configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Server endpoint handed to every transport.
    pub endpoint: String,
    /// Reconnects allowed after a failure before settling in `Failed`.
    pub max_reconnect_attempts: u32,
    /// Delay before each reconnect. Fixed, no backoff.
    pub reconnect_delay: Duration,
    /// Connect timeout handed to every transport.
    pub connect_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_SERVER_URL.to_string(),
            max_reconnect_attempts: MAX_RECONNECT_ATTEMPTS,
            reconnect_delay: RECONNECT_DELAY,
            connect_timeout: CONNECT_TIMEOUT,
        }
    }
}

impl ConnectionConfig {
    /// Defaults for `endpoint`.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    /// Sets the reconnect limit.
    #[must_use]
    pub const fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    /// Sets the reconnect delay.
    #[must_use]
    pub const fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Sets the connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// Something the manager reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionInput {
    /// An event from the live transport.
    Transport(TransportEvent),
    /// The reconnect delay ran out.
    RetryElapsed,
}

/// The live transport together with the only receiver of its events.
///
/// Dropping it discards any events the transport produced but the manager
/// has not seen yet.
struct ActiveTransport {
    id: u64,
    transport: Box<dyn Transport>,
    events: mpsc::UnboundedReceiver<TransportEvent>,
}

/// Drives one realtime connection through connect, authenticate and
/// reconnect for the token it was started with.
///
/// All transitions happen in [`ConnectionManager::handle`], one input at a
/// time. A transport is only ever created while a token is held, and the
/// previous transport is always closed before the next one is created.
pub struct ConnectionManager {
    config: ConnectionConfig,
    transport_port: Arc<dyn TransportPort>,
    state: ConnectionState,
    failures: u32,
    token: Option<AuthToken>,
    active: Option<ActiveTransport>,
    retry: Option<Pin<Box<Sleep>>>,
    loading: bool,
    next_transport_id: u64,
    state_tx: watch::Sender<ConnectionState>,
    signal_tx: broadcast::Sender<ConnectionSignal>,
}

impl ConnectionManager {
    /// Idle manager that builds transports through `transport_port`.
    #[must_use]
    pub fn new(config: ConnectionConfig, transport_port: Arc<dyn TransportPort>) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Idle);
        let (signal_tx, _) = broadcast::channel(SIGNAL_CHANNEL_CAPACITY);

        Self {
            config,
            transport_port,
            state: ConnectionState::Idle,
            failures: 0,
            token: None,
            active: None,
            retry: None,
            loading: false,
            next_transport_id: 0,
            state_tx,
            signal_tx,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// True while a token is held and the first authentication is pending.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    /// Configuration the manager was built with.
    #[must_use]
    pub const fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Whether a transport instance is alive.
    #[must_use]
    pub const fn has_transport(&self) -> bool {
        self.active.is_some()
    }

    /// Whether a reconnect is scheduled.
    #[must_use]
    pub const fn has_pending_retry(&self) -> bool {
        self.retry.is_some()
    }

    /// Watches the current state.
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Receives every lifecycle signal from now on.
    #[must_use]
    pub fn subscribe_signals(&self) -> broadcast::Receiver<ConnectionSignal> {
        self.signal_tx.subscribe()
    }

    /// Rebuilds the connection for `token`.
    ///
    /// The current transport and any pending retry are torn down first.
    /// Without a token the manager settles in `Idle`.
    pub fn start(&mut self, token: Option<AuthToken>) {
        self.teardown();
        self.failures = 0;
        self.token = token;

        if self.token.is_some() {
            self.loading = true;
            self.open_transport();
        } else {
            debug!("No token, staying idle");
            self.loading = false;
            self.transition(ConnectionState::Idle);
        }
    }

    /// Closes the connection and forgets the token.
    pub fn stop(&mut self) {
        self.teardown();
        self.failures = 0;
        self.token = None;
        self.loading = false;
        self.transition(ConnectionState::Idle);
    }

    /// Starts over from `Failed` with the held token.
    ///
    /// Returns `false` when there is nothing to retry, e.g. after the server
    /// rejected the token.
    pub fn retry(&mut self) -> bool {
        if !self.state.is_failed() || self.token.is_none() {
            return false;
        }

        info!("Retrying connection");
        self.failures = 0;
        self.loading = true;
        self.open_transport();
        true
    }

    /// Waits for the next transport event or the retry timer. Cancel-safe.
    pub async fn next_input(&mut self) -> ConnectionInput {
        let active = &mut self.active;
        let retry = &mut self.retry;

        tokio::select! {
            event = next_transport_event(active) => ConnectionInput::Transport(event),
            () = wait_retry(retry) => ConnectionInput::RetryElapsed,
        }
    }

    /// Applies one input and returns the lifecycle signal it produced, if any.
    pub fn handle(&mut self, input: ConnectionInput) -> Option<ConnectionSignal> {
        match input {
            ConnectionInput::Transport(event) => self.handle_transport_event(event),
            ConnectionInput::RetryElapsed => self.handle_retry_elapsed(),
        }
    }

    fn handle_transport_event(&mut self, event: TransportEvent) -> Option<ConnectionSignal> {
        let transport_id = self.active.as_ref().map(|active| active.id);
        debug!(
            event = event.name(),
            reason = event.reason(),
            transport_id,
            state = %self.state,
            "Transport event"
        );

        match (self.state, event) {
            (ConnectionState::Connecting, TransportEvent::Connect) => {
                self.transition(ConnectionState::Authenticating);
                None
            }
            (ConnectionState::Authenticating, TransportEvent::Authenticated) => {
                info!(transport_id, "Connected and authenticated");
                self.failures = 0;
                self.loading = false;
                self.transition(ConnectionState::Connected);
                Some(self.emit(ConnectionSignal::Connected))
            }
            (state, TransportEvent::Unauthorized { message }) if state.is_active() => {
                Some(self.fail_unauthorized(message))
            }
            (state, event) if state.is_active() && event.is_transient_failure() => {
                let reason = event.reason().unwrap_or_default().to_string();
                Some(self.schedule_reconnect(reason))
            }
            (state, event) => {
                debug!(event = event.name(), %state, "Ignoring transport event");
                None
            }
        }
    }

    fn handle_retry_elapsed(&mut self) -> Option<ConnectionSignal> {
        self.retry = None;

        let ConnectionState::Reconnecting { attempt } = self.state else {
            return None;
        };

        if attempt >= self.config.max_reconnect_attempts {
            error!(attempts = attempt, "Max reconnection attempts exceeded");
            self.loading = false;
            self.transition(ConnectionState::Failed(FailureReason::Exhausted));
            return Some(self.emit(ConnectionSignal::Exhausted { attempts: attempt }));
        }

        info!(attempt, "Reconnecting");
        self.open_transport();
        None
    }

    fn schedule_reconnect(&mut self, reason: String) -> ConnectionSignal {
        self.teardown_transport();
        self.failures += 1;
        let attempt = self.failures;

        warn!(
            attempt,
            delay = ?self.config.reconnect_delay,
            reason = %reason,
            "Connection lost, scheduling reconnect"
        );

        self.retry = Some(Box::pin(sleep(self.config.reconnect_delay)));
        self.transition(ConnectionState::Reconnecting { attempt });
        self.emit(ConnectionSignal::TransientError { attempt, reason })
    }

    fn fail_unauthorized(&mut self, reason: String) -> ConnectionSignal {
        error!(reason = %reason, "Server rejected the token");
        self.teardown();
        self.token = None;
        self.loading = false;
        self.transition(ConnectionState::Failed(FailureReason::Unauthorized));
        self.emit(ConnectionSignal::AuthFailed { reason })
    }

    fn open_transport(&mut self) {
        let Some(token) = self.token.clone() else {
            debug!("Refusing to open a transport without a token");
            self.transition(ConnectionState::Idle);
            return;
        };

        self.teardown_transport();

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let options = TransportOptions::new(self.config.endpoint.clone(), token)
            .with_connect_timeout(self.config.connect_timeout);
        let mut transport = self.transport_port.create(options, events_tx);

        self.next_transport_id += 1;
        let id = self.next_transport_id;
        debug!(transport_id = id, endpoint = %self.config.endpoint, "Opening transport");

        // Published even when already connecting: this is a new transport.
        self.publish(ConnectionState::Connecting);
        transport.connect();

        self.active = Some(ActiveTransport {
            id,
            transport,
            events: events_rx,
        });
    }

    fn teardown(&mut self) {
        self.retry = None;
        self.teardown_transport();
    }

    fn teardown_transport(&mut self) {
        if let Some(mut active) = self.active.take() {
            debug!(transport_id = active.id, "Closing transport");
            active.transport.disconnect();
        }
    }

    fn transition(&mut self, next: ConnectionState) {
        if self.state != next {
            self.publish(next);
        }
    }

    fn publish(&mut self, next: ConnectionState) {
        let from = self.state;
        self.state = next;
        debug!(%from, to = %next, "Connection state changed");

        self.state_tx.send_replace(next);
        let _ = self
            .signal_tx
            .send(ConnectionSignal::StateChanged { from, to: next });
    }

    fn emit(&self, signal: ConnectionSignal) -> ConnectionSignal {
        let _ = self.signal_tx.send(signal.clone());
        signal
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.teardown();
    }
}

async fn next_transport_event(active: &mut Option<ActiveTransport>) -> TransportEvent {
    let Some(active) = active.as_mut() else {
        return future::pending().await;
    };

    match active.events.recv().await {
        Some(event) => event,
        None => TransportEvent::Disconnect {
            reason: "transport stopped".to_string(),
        },
    }
}

async fn wait_retry(retry: &mut Option<Pin<Box<Sleep>>>) {
    match retry.as_mut() {
        Some(timer) => timer.await,
        None => future::pending().await,
    }
}
