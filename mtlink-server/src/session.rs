//! Server-side session record.

use std::sync::Arc;

use mtlink_mtproto::ServerRpcLayer;

/// One authenticated device link, keyed by its auth id.
///
/// A session outlives its network connection: on disconnect only the
/// connection is cleared, so the session can be resumed with the same key.
#[derive(Clone)]
pub struct Session {
    auth_id:    u64,
    user_id:    Option<u32>,
    connection: Option<Arc<dyn ServerRpcLayer>>,
}

impl Session {
    pub fn new(auth_id: u64) -> Self {
        Self { auth_id, user_id: None, connection: None }
    }

    pub fn auth_id(&self) -> u64 { self.auth_id }

    /// The owning user, once the session has signed in.
    pub fn user_id(&self) -> Option<u32> { self.user_id }

    pub(crate) fn set_user_id(&mut self, user_id: u32) { self.user_id = Some(user_id); }

    pub fn connection(&self) -> Option<&Arc<dyn ServerRpcLayer>> { self.connection.as_ref() }

    pub(crate) fn set_connection(&mut self, connection: Option<Arc<dyn ServerRpcLayer>>) {
        self.connection = connection;
    }

    /// `true` while a live connection is attached.
    pub fn is_active(&self) -> bool { self.connection.is_some() }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("auth_id", &format_args!("{:x}", self.auth_id))
            .field("user_id", &self.user_id)
            .field("active", &self.is_active())
            .finish()
    }
}
