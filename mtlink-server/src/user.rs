//! Server-side account record.

use std::time::{SystemTime, UNIX_EPOCH};

use mtlink_crypto::{generate_password_salt, salted_password_hash, sha256};
use mtlink_tl::types::{Message, Peer, UpdateShortMessage};
use subtle::ConstantTimeEq;

use crate::errors::ServerError;

/// User id for a phone number: the first four bytes of its SHA-256.
pub fn user_id_for_phone(phone_number: &str) -> u32 {
    let digest = sha256!(phone_number.as_bytes());
    u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]])
}

/// Seconds since the Unix epoch, saturating into `u32`.
pub(crate) fn unix_now() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u32::try_from(d.as_secs()).unwrap_or(u32::MAX))
        .unwrap_or_default()
}

/// One account hosted by this server.
///
/// Sessions are referenced by auth id; the session records themselves live
/// in the [`Registry`](crate::Registry).
pub struct User {
    id:            u32,
    phone_number:  String,
    first_name:    String,
    last_name:     String,
    password_salt: Vec<u8>,
    password_hash: Vec<u8>,
    dc_id:         u32,
    sessions:      Vec<u64>,
    messages:      Vec<Message>,
    pts:           u32,
}

impl User {
    pub fn new(phone_number: impl Into<String>) -> Self {
        let phone_number = phone_number.into();
        Self {
            id: user_id_for_phone(&phone_number),
            phone_number,
            first_name:    String::new(),
            last_name:     String::new(),
            password_salt: Vec::new(),
            password_hash: Vec::new(),
            dc_id:         0,
            sessions:      Vec::new(),
            messages:      Vec::new(),
            pts:           0,
        }
    }

    pub fn id(&self) -> u32 { self.id }

    pub fn phone_number(&self) -> &str { &self.phone_number }

    /// The id stays the one derived at creation. Goes through
    /// [`Registry::change_phone`](crate::Registry::change_phone) so the phone
    /// index follows.
    pub(crate) fn set_phone_number(&mut self, phone_number: impl Into<String>) {
        self.phone_number = phone_number.into();
    }

    pub fn first_name(&self) -> &str { &self.first_name }
    pub fn set_first_name(&mut self, first_name: impl Into<String>) {
        self.first_name = first_name.into();
    }

    pub fn last_name(&self) -> &str { &self.last_name }
    pub fn set_last_name(&mut self, last_name: impl Into<String>) {
        self.last_name = last_name.into();
    }

    pub fn dc_id(&self) -> u32 { self.dc_id }
    pub fn set_dc_id(&mut self, dc_id: u32) { self.dc_id = dc_id; }

    pub fn to_peer(&self) -> Peer { Peer::User(self.id) }

    // ── Password ─────────────────────────────────────────────────────────────

    pub fn has_password(&self) -> bool { !self.password_hash.is_empty() }

    pub fn password_salt(&self) -> &[u8] { &self.password_salt }

    pub fn password_hash(&self) -> &[u8] { &self.password_hash }

    /// Hash `password` with a fresh salt. An empty password removes it.
    pub fn set_plain_password(&mut self, password: &str) {
        if password.is_empty() {
            self.password_salt.clear();
            self.password_hash.clear();
            return;
        }
        let salt = generate_password_salt();
        let hash = salted_password_hash(&salt, password.as_bytes());
        self.set_password(salt.to_vec(), hash.to_vec());
    }

    pub fn set_password(&mut self, salt: Vec<u8>, hash: Vec<u8>) {
        tracing::debug!("[server] user {} password salt {:02x?}", self.id, salt);
        self.password_salt = salt;
        self.password_hash = hash;
    }

    /// Compare a client-supplied `SHA256(salt || password || salt)`.
    ///
    /// A mismatch is an ordinary `false`, not an error.
    pub fn check_password(&self, hash: &[u8]) -> bool {
        self.has_password() && bool::from(self.password_hash.as_slice().ct_eq(hash))
    }

    // ── Sessions and messages ────────────────────────────────────────────────

    /// Auth ids of every session ever bound to this user, oldest first.
    pub fn sessions(&self) -> &[u64] { &self.sessions }

    pub(crate) fn push_session(&mut self, auth_id: u64) {
        if !self.sessions.contains(&auth_id) {
            self.sessions.push(auth_id);
        }
    }

    pub fn messages(&self) -> &[Message] { &self.messages }

    /// Current update sequence number.
    pub fn pts(&self) -> u32 { self.pts }

    /// Append a message from `sender_id`, advancing pts by one.
    ///
    /// Returns the short update clients should receive for it. Once pts
    /// reaches `u32::MAX` nothing more is recorded.
    pub(crate) fn record_message(
        &mut self,
        sender_id: u32,
        text: &str,
        date: u32,
    ) -> Result<UpdateShortMessage, ServerError> {
        self.pts = self.pts.checked_add(1).ok_or(ServerError::PtsExhausted(self.id))?;
        self.messages.push(Message {
            out:     false,
            id:      self.pts,
            from_id: Some(sender_id),
            to_id:   self.to_peer(),
            date,
            message: text.to_owned(),
        });
        Ok(UpdateShortMessage {
            out:       false,
            id:        self.pts,
            user_id:   sender_id,
            message:   text.to_owned(),
            pts:       self.pts,
            pts_count: 1,
            date,
        })
    }
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("phone_number", &self.phone_number)
            .field("dc_id", &self.dc_id)
            .field("sessions", &self.sessions.len())
            .field("pts", &self.pts)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pts_stops_at_the_top_of_the_range() {
        let mut user = User::new("+15550001");
        user.pts = u32::MAX - 1;
        let update = user.record_message(7, "last", 0).unwrap();
        assert_eq!(update.pts, u32::MAX);

        assert_eq!(user.record_message(7, "one more", 0), Err(ServerError::PtsExhausted(user.id())));
        assert_eq!(user.pts(), u32::MAX);
        assert_eq!(user.messages().len(), 1);
    }
}
