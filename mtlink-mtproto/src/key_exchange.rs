//! The key-exchange collaborator.
//!
//! The Diffie-Hellman handshake itself is out of scope for the session core.
//! A [`KeyExchangeLayer`] is driven by the connection: it is started once the
//! transport is up and reports progress through [`KeyExchangeState`]
//! transitions, which the owner feeds back into the connection as events.

use crate::send_helper::SendPackageHelper;

/// Progress of the authorization-key handshake.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum KeyExchangeState {
    #[default]
    Idle,
    PqRequested,
    ServerDhParamsRequested,
    DhGenerationResultRequested,
    HasKey,
}

impl KeyExchangeState {
    pub fn has_key(self) -> bool { self == Self::HasKey }
}

/// Performs (or restores) the authorization-key handshake.
pub trait KeyExchangeLayer: Send {
    /// Current handshake state.
    fn state(&self) -> KeyExchangeState;

    /// Attach the helper used to mint ids and write packages.
    fn set_send_package_helper(&mut self, helper: SendPackageHelper);

    /// Start the handshake from scratch.
    fn init(&mut self);

    /// Server clock minus local clock, learned during the handshake.
    fn delta_time(&self) -> i32;

    /// The negotiated key, once available.
    fn auth_key(&self) -> Option<Vec<u8>>;

    /// Identifier of the negotiated key (zero if none).
    fn auth_id(&self) -> u64;
}
