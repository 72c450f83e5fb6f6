//! MTProto message identifiers.

use std::time::{SystemTime, UNIX_EPOCH};

/// A 64-bit MTProto message identifier.
///
/// The upper 32 bits hold Unix seconds; the lower 32 bits hold the
/// sub-second fraction scaled to the full 32-bit range. Client-originated
/// identifiers are divisible by 4.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct MessageId(pub u64);

impl MessageId {
    /// `true` if this id was minted by a client (`id % 4 == 0`).
    pub fn is_client(self) -> bool { self.0 & 3 == 0 }

    /// The whole-second part of the embedded timestamp.
    pub fn unix_secs(self) -> u32 { (self.0 >> 32) as u32 }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

/// Which side of the link is minting an identifier.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SendMode {
    Client,
    Server,
}

/// Errors from [`MessageIdGenerator::new_message_id`].
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum MessageIdError {
    /// The generator was asked for an id in a role it does not serve.
    #[error("cannot mint {0:?}-side message ids in a client connection")]
    InvalidMode(SendMode),
}

/// Convert Unix milliseconds into the protocol's timestamp tick format.
pub fn format_timestamp(unix_ms: i64) -> u64 {
    const MAX_FRACTION: u64 = u32::MAX as u64;
    let ms = unix_ms.max(0) as u64;
    let secs = ms / 1000;
    let fraction = MAX_FRACTION / 1000 * (ms % 1000);
    (secs << 32) + fraction
}

/// Current wall-clock time in Unix milliseconds.
pub fn unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

/// Mints client message ids corrected by the server clock offset.
///
/// Ids are strictly increasing for the lifetime of the generator: when the
/// clock has not advanced past the previous id, the previous id plus 4 is
/// used instead. State is not persisted; monotonicity across a reconnect
/// relies on `delta_time` having been refreshed by the key exchange.
#[derive(Clone, Debug, Default)]
pub struct MessageIdGenerator {
    delta_time: i32,
    last_id:    u64,
}

impl MessageIdGenerator {
    pub fn new(delta_time: i32) -> Self {
        Self { delta_time, last_id: 0 }
    }

    /// Server clock minus local clock, in seconds.
    pub fn delta_time(&self) -> i32 { self.delta_time }

    pub fn set_delta_time(&mut self, delta_time: i32) {
        self.delta_time = delta_time;
    }

    /// The most recently issued id, or zero.
    pub fn last_id(&self) -> MessageId { MessageId(self.last_id) }

    /// Allocate a new id using the system clock.
    pub fn new_message_id(&mut self, mode: SendMode) -> Result<MessageId, MessageIdError> {
        self.new_message_id_at(unix_millis(), mode)
    }

    /// Allocate a new id as if the local clock read `unix_ms`.
    pub fn new_message_id_at(&mut self, unix_ms: i64, mode: SendMode) -> Result<MessageId, MessageIdError> {
        if mode != SendMode::Client {
            log::warn!("[message_id] refusing to mint a {mode:?} id");
            return Err(MessageIdError::InvalidMode(mode));
        }
        let corrected = unix_ms + i64::from(self.delta_time) * 1000;
        let supposed = format_timestamp(corrected) & !3;

        self.last_id = if self.last_id >= supposed {
            self.last_id + 4
        } else {
            supposed
        };
        Ok(MessageId(self.last_id))
    }
}
