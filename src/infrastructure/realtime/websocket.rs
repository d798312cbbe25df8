use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, trace, warn};

use super::payloads::{ClientMessage, ServerMessage};
use crate::domain::errors::TransportError;
use crate::domain::ports::{Transport, TransportEvent, TransportOptions, TransportPort};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, WsMessage>;

/// Maps an `http(s)://` endpoint to its `ws(s)://` equivalent.
///
/// # Errors
/// Returns error for any other scheme or a missing host.
pub fn websocket_url(endpoint: &str) -> Result<String, TransportError> {
    let endpoint = endpoint.trim();

    let (scheme, rest) = endpoint
        .split_once("://")
        .ok_or_else(|| TransportError::invalid_endpoint(endpoint, "missing scheme"))?;

    let ws_scheme = match scheme.to_ascii_lowercase().as_str() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(TransportError::invalid_endpoint(
                endpoint,
                format!("unsupported scheme {other}"),
            ));
        }
    };

    if rest.is_empty() || rest.starts_with('/') {
        return Err(TransportError::invalid_endpoint(endpoint, "missing host"));
    }

    Ok(format!("{ws_scheme}://{rest}"))
}

/// Creates [`WebSocketTransport`] instances.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketTransportPort;

impl WebSocketTransportPort {
    /// Creates the port.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl TransportPort for WebSocketTransportPort {
    fn create(
        &self,
        options: TransportOptions,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Box<dyn Transport> {
        Box::new(WebSocketTransport::new(options, events))
    }
}

/// One WebSocket link, run on its own task once `connect` is called.
pub struct WebSocketTransport {
    options: TransportOptions,
    events: Option<mpsc::UnboundedSender<TransportEvent>>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl WebSocketTransport {
    /// Idle transport reporting on `events`.
    #[must_use]
    pub const fn new(
        options: TransportOptions,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Self {
        Self {
            options,
            events: Some(events),
            shutdown: None,
            task: None,
        }
    }
}

impl Transport for WebSocketTransport {
    fn connect(&mut self) {
        let Some(events) = self.events.take() else {
            debug!("Transport already started or closed");
            return;
        };

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        self.shutdown = Some(shutdown_tx);
        self.task = Some(tokio::spawn(run_link(
            self.options.clone(),
            events,
            shutdown_rx,
        )));
    }

    fn disconnect(&mut self) {
        self.events = None;
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        // The task closes the socket itself; it is not awaited here.
        self.task = None;
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        self.disconnect();
    }
}

async fn run_link(
    options: TransportOptions,
    events: mpsc::UnboundedSender<TransportEvent>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let stream = tokio::select! {
        _ = &mut shutdown => {
            debug!("Transport closed while connecting");
            return;
        }
        result = open(&options) => result,
    };

    let stream = match stream {
        Ok(stream) => stream,
        Err(e) => {
            if e.is_recoverable() {
                warn!(error = %e, endpoint = %options.endpoint, "Failed to connect");
            } else {
                error!(error = %e, endpoint = %options.endpoint, "Endpoint is unusable");
            }
            let _ = events.send(TransportEvent::ConnectError {
                error: e.to_string(),
            });
            return;
        }
    };

    info!(endpoint = %options.endpoint, "WebSocket connected");
    let (mut writer, mut reader) = stream.split();

    if events.send(TransportEvent::Connect).is_err() {
        let _ = writer.close().await;
        return;
    }

    let auth = ClientMessage::Auth {
        token: &options.token,
    };
    if let Err(e) = send(&mut writer, &auth).await {
        let _ = events.send(TransportEvent::Disconnect {
            reason: e.to_string(),
        });
        return;
    }
    debug!(token = %options.token, "Sent auth payload");

    loop {
        let message = tokio::select! {
            _ = &mut shutdown => {
                let _ = writer.close().await;
                debug!("WebSocket connection closed");
                return;
            }
            message = reader.next() => message,
        };

        let event = match message {
            Some(Ok(WsMessage::Text(text))) => match ServerMessage::parse(&text) {
                Ok(ServerMessage::Authenticated) => TransportEvent::Authenticated,
                Ok(ServerMessage::Unauthorized { message }) => {
                    TransportEvent::Unauthorized { message }
                }
                Ok(ServerMessage::Other) => continue,
                Err(e) => {
                    trace!(error = %e, "Ignoring unrecognized frame");
                    continue;
                }
            },
            Some(Ok(WsMessage::Ping(data))) => {
                let _ = writer.send(WsMessage::Pong(data)).await;
                continue;
            }
            Some(Ok(WsMessage::Binary(_) | WsMessage::Pong(_) | WsMessage::Frame(_))) => continue,
            Some(Ok(WsMessage::Close(frame))) => {
                let (code, reason) = frame.map_or_else(
                    || (1000, "Normal closure".to_string()),
                    |f| (f.code.into(), f.reason.to_string()),
                );
                disconnected(TransportError::ConnectionClosed { code, reason })
            }
            Some(Err(e)) => disconnected(TransportError::websocket(e.to_string())),
            None => disconnected(TransportError::ConnectionClosed {
                code: 1000,
                reason: "Stream ended".to_string(),
            }),
        };

        let closing = matches!(event, TransportEvent::Disconnect { .. });
        if events.send(event).is_err() || closing {
            return;
        }
    }
}

async fn open(options: &TransportOptions) -> Result<WsStream, TransportError> {
    let url = websocket_url(&options.endpoint)?;
    debug!(url = %url, "Opening WebSocket");

    let (stream, _) = timeout(options.connect_timeout, connect_async(url.as_str()))
        .await
        .map_err(|_| TransportError::timeout("connection"))?
        .map_err(|e| TransportError::connection_failed(e.to_string()))?;

    Ok(stream)
}

async fn send(writer: &mut WsWriter, message: &ClientMessage<'_>) -> Result<(), TransportError> {
    let json = message.to_json()?;
    writer
        .send(WsMessage::Text(json.into()))
        .await
        .map_err(|e| TransportError::websocket(e.to_string()))
}

fn disconnected(error: TransportError) -> TransportEvent {
    warn!(error = %error, "WebSocket disconnected");
    TransportEvent::Disconnect {
        reason: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::AuthToken;
    use std::time::Duration;
    use test_case::test_case;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    #[test_case("http://localhost:5000", "ws://localhost:5000" ; "http")]
    #[test_case("https://okey.example.com", "wss://okey.example.com" ; "https")]
    #[test_case("HTTP://host/path", "ws://host/path" ; "uppercase_scheme")]
    #[test_case("  ws://host:1 ", "ws://host:1" ; "ws_passthrough_trimmed")]
    fn test_websocket_url(endpoint: &str, expected: &str) {
        assert_eq!(websocket_url(endpoint).unwrap(), expected);
    }

    #[test_case("localhost:5000" ; "no_scheme")]
    #[test_case("ftp://host" ; "bad_scheme")]
    #[test_case("http://" ; "no_host")]
    fn test_websocket_url_rejects(endpoint: &str) {
        assert!(matches!(
            websocket_url(endpoint),
            Err(TransportError::InvalidEndpoint { .. })
        ));
    }

    fn options(endpoint: String) -> TransportOptions {
        TransportOptions::new(endpoint, AuthToken::new("abc").unwrap())
            .with_connect_timeout(Duration::from_secs(2))
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<TransportEvent>) -> TransportEvent {
        timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for transport event")
            .expect("event channel closed")
    }

    #[tokio::test]
    async fn test_handshake_against_local_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(socket).await.unwrap();
            let auth = ws.next().await.unwrap().unwrap();
            ws.send(WsMessage::Text(r#"{"type":"authenticated"}"#.into()))
                .await
                .unwrap();
            ws.close(None).await.unwrap();
            auth.to_text().unwrap().to_string()
        });

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut transport = WebSocketTransport::new(options(format!("http://{addr}")), tx);
        transport.connect();

        assert_eq!(next(&mut rx).await, TransportEvent::Connect);
        assert_eq!(next(&mut rx).await, TransportEvent::Authenticated);
        assert!(matches!(
            next(&mut rx).await,
            TransportEvent::Disconnect { .. }
        ));

        let auth = server.await.unwrap();
        assert_eq!(auth, r#"{"type":"auth","token":"abc"}"#);
    }

    #[tokio::test]
    async fn test_rejection_is_reported() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(socket).await.unwrap();
            let _ = ws.next().await;
            let _ = ws
                .send(WsMessage::Text(
                    r#"{"type":"unauthorized","message":"invalid token"}"#.into(),
                ))
                .await;
        });

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut transport = WebSocketTransport::new(options(format!("ws://{addr}")), tx);
        transport.connect();

        assert_eq!(next(&mut rx).await, TransportEvent::Connect);
        assert_eq!(
            next(&mut rx).await,
            TransportEvent::Unauthorized {
                message: "invalid token".into()
            }
        );
        transport.disconnect();
    }

    #[tokio::test]
    async fn test_refused_connection_is_connect_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut transport = WebSocketTransport::new(options(format!("http://{addr}")), tx);
        transport.connect();

        assert!(matches!(
            next(&mut rx).await,
            TransportEvent::ConnectError { .. }
        ));
    }

    #[tokio::test]
    async fn test_invalid_endpoint_is_connect_error() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut transport = WebSocketTransport::new(options("ftp://nowhere".to_string()), tx);
        transport.connect();

        let TransportEvent::ConnectError { error } = next(&mut rx).await else {
            panic!("expected connect error");
        };
        assert!(error.contains("unsupported scheme"));
    }

    #[tokio::test]
    async fn test_created_transport_does_not_connect() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let port = WebSocketTransportPort::new();
        let transport = port.create(options("http://127.0.0.1:9".to_string()), tx);

        drop(transport);

        assert!(rx.recv().await.is_none());
    }
}
