//! Domain layer with core session entities and port definitions.

/// Connection lifecycle definitions.
pub mod connection;
/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// User-facing notification definitions.
pub mod notification;
/// Port definitions.
pub mod ports;
/// Serde utilities.
pub mod serde_utils;

pub use connection::{ConnectionSignal, ConnectionState, FailureReason};
pub use entities::{AuthToken, DEFAULT_AVATAR, User, UserStats};
pub use errors::{SessionError, StorageError, TransportError};
pub use notification::{DEFAULT_NOTIFICATION_DURATION, Notification, NotificationKind};
pub use ports::{SessionStoragePort, Transport, TransportEvent, TransportOptions, TransportPort};
