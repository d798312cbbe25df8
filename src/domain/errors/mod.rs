//! Domain error types.

mod session_error;
mod storage_error;
mod transport_error;

pub use session_error::SessionError;
pub use storage_error::StorageError;
pub use transport_error::TransportError;
