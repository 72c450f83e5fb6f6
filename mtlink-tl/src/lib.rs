//! TL binary serialization for the mtlink session core.
//!
//! # Overview
//!
//! | Module          | Contents                                                |
//! |-----------------|---------------------------------------------------------|
//! | [`serialize`]   | [`Serializable`] and its primitive impls                |
//! | [`deserialize`] | [`Deserializable`], [`Cursor`] and primitive impls      |
//! | [`types`]       | The records this core puts on the wire                  |
//!
//! ```rust
//! use mtlink_tl::{Deserializable, Serializable, types::Peer};
//!
//! let bytes = Peer::User(42).to_bytes();
//! assert_eq!(Peer::from_bytes(&bytes).unwrap(), Peer::User(42));
//! ```

#![deny(unsafe_code)]

pub mod deserialize;
pub mod serialize;
pub mod types;

pub use deserialize::{Cursor, Deserializable};
pub use serialize::Serializable;

/// Every boxed record has a unique 32-bit constructor ID.
pub trait Identifiable {
    /// The constructor ID as specified in the TL schema.
    const CONSTRUCTOR_ID: u32;
}

/// Read the leading constructor ID of a serialized record, for logging.
pub fn first_constructor(bytes: &[u8]) -> Option<u32> {
    bytes.get(..4).map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}
