//! JSON frames exchanged with the game server.

use serde::{Deserialize, Serialize};

use crate::domain::entities::AuthToken;
use crate::domain::errors::TransportError;

/// Frames the client sends.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage<'a> {
    /// Sent once, right after the link opens.
    Auth {
        /// Token being presented.
        token: &'a AuthToken,
    },
}

impl ClientMessage<'_> {
    /// Serializes the frame.
    ///
    /// # Errors
    /// Returns error if the frame cannot be serialized.
    pub fn to_json(&self) -> Result<String, TransportError> {
        serde_json::to_string(self).map_err(|e| TransportError::serialization(e.to_string()))
    }
}

/// Frames the server sends. Anything else is game traffic this layer does
/// not interpret.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The token was accepted.
    Authenticated,
    /// The token was rejected.
    Unauthorized {
        /// Reason given by the server, possibly empty.
        #[serde(default)]
        message: String,
    },
    /// Any other frame type.
    #[serde(other)]
    Other,
}

impl ServerMessage {
    /// Parses one text frame.
    ///
    /// # Errors
    /// Returns error if `text` is not a typed JSON frame.
    pub fn parse(text: &str) -> Result<Self, TransportError> {
        serde_json::from_str(text).map_err(|e| TransportError::serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_auth_frame_carries_raw_token() {
        let token = AuthToken::new("secret-token-value").unwrap();
        let json = ClientMessage::Auth { token: &token }.to_json().unwrap();

        assert_eq!(json, r#"{"type":"auth","token":"secret-token-value"}"#);
    }

    #[test_case(r#"{"type":"authenticated"}"#, ServerMessage::Authenticated ; "authenticated")]
    #[test_case(
        r#"{"type":"unauthorized","message":"jwt expired"}"#,
        ServerMessage::Unauthorized { message: "jwt expired".into() } ;
        "unauthorized"
    )]
    #[test_case(
        r#"{"type":"unauthorized"}"#,
        ServerMessage::Unauthorized { message: String::new() } ;
        "unauthorized_without_message"
    )]
    #[test_case(r#"{"type":"room_update","rooms":[]}"#, ServerMessage::Other ; "game_traffic")]
    fn test_parse_server_frames(text: &str, expected: ServerMessage) {
        assert_eq!(ServerMessage::parse(text).unwrap(), expected);
    }

    #[test]
    fn test_untyped_frame_is_error() {
        assert!(ServerMessage::parse(r#"{"hello":"world"}"#).is_err());
        assert!(ServerMessage::parse("not json").is_err());
    }
}
