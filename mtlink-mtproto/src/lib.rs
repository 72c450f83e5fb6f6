//! MTProto plumbing shared by the mtlink client and server.
//!
//! This crate owns:
//! - message-id generation with server clock correction
//! - the [`Transport`] trait the connection drives
//! - [`SendPackageHelper`], the write path shared by the sub-layers
//! - the key-exchange and RPC collaborator traits
//!
//! The handshake, encryption and framing live in the collaborators; the
//! session core only orchestrates them.

#![deny(unsafe_code)]

pub mod key_exchange;
pub mod message;
pub mod rpc;
pub mod send_helper;
pub mod transport;

pub use key_exchange::{KeyExchangeLayer, KeyExchangeState};
pub use message::{MessageId, MessageIdError, MessageIdGenerator, SendMode, format_timestamp};
pub use rpc::{
    ConnectionId, PendingRpcOperation, RpcFailure, RpcLayer, RpcResult, RpcSendError,
    ServerRpcLayer,
};
pub use send_helper::{SendPackageHelper, SharedTransport, shared_transport};
pub use transport::{SocketState, Transport, TransportError};
