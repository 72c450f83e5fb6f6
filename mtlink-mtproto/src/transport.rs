//! Pluggable transport layer.
//!
//! Implement [`Transport`] over TCP, WebSocket, or any other byte-stream
//! protocol. The transport is event-reactive: `connect_to_host` only starts
//! the attempt, and the outcome is reported back to the owning connection as
//! an event (connected, disconnected, or an error with code and text).

/// Socket lifecycle as seen by the connection orchestrator.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SocketState {
    #[default]
    Unconnected,
    HostLookup,
    Connecting,
    Connected,
    Closing,
}

/// A transport-level failure.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum TransportError {
    /// The socket reported an error.
    #[error("socket error {code}: {text}")]
    Socket { code: i32, text: String },
    /// A write was attempted with no open socket.
    #[error("transport is not connected")]
    NotConnected,
}

/// A full-duplex byte-stream transport.
///
/// Implementations own their framing; the session core only hands over
/// complete packages.
pub trait Transport: Send {
    /// Begin connecting to `address:port`.
    fn connect_to_host(&mut self, address: &str, port: u16);

    /// Drop the connection (or abort the pending attempt).
    fn disconnect_from_host(&mut self);

    /// Current socket state.
    fn state(&self) -> SocketState;

    /// Send one complete package to the remote.
    fn send_package(&mut self, package: &[u8]) -> Result<(), TransportError>;
}
