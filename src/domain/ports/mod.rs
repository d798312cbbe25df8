mod session_storage_port;
mod transport_port;

pub use session_storage_port::SessionStoragePort;
pub use transport_port::{Transport, TransportEvent, TransportOptions, TransportPort};

/// Test doubles for the ports.
#[cfg(test)]
pub mod mocks {
    pub use super::session_storage_port::mock::MockSessionStorage;
    pub use super::transport_port::mock::{MockLink, MockTransportPort};
}
