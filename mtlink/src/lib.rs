//! # mtlink: MTProto session orchestration
//!
//! `mtlink` wires the workspace crates together for convenience:
//!
//! | Sub-crate        | Role                                                    |
//! |------------------|---------------------------------------------------------|
//! | `mtlink-tl`      | TL binary encoding and the records put on the wire      |
//! | `mtlink-crypto`  | SHA helpers, auth keys, random ids, password hashing    |
//! | `mtlink-mtproto` | Message ids, send helper, collaborator traits           |
//! | `mtlink-client`  | Connection state machine, DC pool, account storage      |
//! | `mtlink-server`  | Users, sessions and ordered update fan-out              |
//!
//! ## Quick start: server fan-out
//!
//! ```rust
//! use mtlink::server::{Registry, ServerConfig};
//!
//! let registry = Registry::new(ServerConfig::default());
//! let alice = registry.create_user("+15550001").unwrap();
//! let bob = registry.create_user("+15550002").unwrap();
//!
//! // No session is online, but the message is still logged.
//! let pts = registry.send_message(bob, alice, "hi").unwrap();
//! assert_eq!(pts, 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Re-export of [`mtlink_tl`]: TL encoding and wire records.
pub use mtlink_tl as tl;

/// Re-export of [`mtlink_mtproto`]: message ids and the layer traits.
pub use mtlink_mtproto as mtproto;

/// Re-export of [`mtlink_crypto`]: hashing and auth keys.
pub use mtlink_crypto as crypto;

/// Re-export of [`mtlink_client`] (requires `feature = "client"`).
#[cfg(feature = "client")]
pub use mtlink_client as client;

/// Re-export of [`mtlink_server`] (requires `feature = "server"`).
#[cfg(feature = "server")]
pub use mtlink_server as server;

// ─── Convenience re-exports ───────────────────────────────────────────────────

pub use mtlink_mtproto::{
    ConnectionId, KeyExchangeLayer, KeyExchangeState, MessageId, MessageIdGenerator,
    PendingRpcOperation, RpcLayer, SendMode, ServerRpcLayer, Transport,
};

#[cfg(feature = "client")]
pub use mtlink_client::{AccountStorage, Connection, ConnectionStatus, DcOption, DcPool};

#[cfg(feature = "server")]
pub use mtlink_server::{Registry, Session, User};
