//! WebSocket realtime transport.

mod payloads;
mod websocket;

pub use payloads::{ClientMessage, ServerMessage};
pub use websocket::{WebSocketTransport, WebSocketTransportPort, websocket_url};
