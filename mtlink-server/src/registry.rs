//! The server's user and session tables, and update fan-out.
//!
//! Users live behind their own mutex so that different accounts proceed in
//! parallel while one account's pts, message log and delivery stay strictly
//! ordered. Sessions refer to users by id only, and a user keeps the id it
//! was created with for life.
//!
//! Lock order is the user table, then a user, then the session table.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use mtlink_mtproto::ServerRpcLayer;
use mtlink_tl::Serializable;
use tokio::sync::broadcast;

use crate::config::ServerConfig;
use crate::errors::ServerError;
use crate::session::Session;
use crate::user::{User, unix_now};

/// Notifications raised by the [`Registry`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RegistryEvent {
    SessionAdded { user_id: u32, auth_id: u64 },
}

#[derive(Default)]
struct UserTable {
    by_id:    HashMap<u32, Arc<Mutex<User>>>,
    by_phone: HashMap<String, u32>,
}

pub struct Registry {
    config:   ServerConfig,
    users:    RwLock<UserTable>,
    sessions: RwLock<HashMap<u64, Session>>,
    events:   broadcast::Sender<RegistryEvent>,
}

impl Registry {
    pub fn new(config: ServerConfig) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            config,
            users:    RwLock::new(UserTable::default()),
            sessions: RwLock::new(HashMap::new()),
            events,
        }
    }

    pub fn config(&self) -> &ServerConfig { &self.config }

    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events.subscribe()
    }

    // ── Users ────────────────────────────────────────────────────────────────

    /// Register a user homed on this server's DC.
    pub fn create_user(&self, phone_number: &str) -> Result<u32, ServerError> {
        let mut user = User::new(phone_number);
        user.set_dc_id(self.config.dc_id);
        let id = user.id();

        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        if users.by_phone.contains_key(phone_number) {
            return Err(ServerError::PhoneTaken(phone_number.to_owned()));
        }
        if users.by_id.contains_key(&id) {
            tracing::warn!("[server] user id {id} for {phone_number} is already in use");
            return Err(ServerError::UserIdTaken { phone_number: phone_number.to_owned(), user_id: id });
        }
        users.by_id.insert(id, Arc::new(Mutex::new(user)));
        users.by_phone.insert(phone_number.to_owned(), id);
        tracing::debug!("[server] user {id} created on DC{}", self.config.dc_id);
        Ok(id)
    }

    pub fn user(&self, user_id: u32) -> Option<Arc<Mutex<User>>> {
        self.users.read().unwrap_or_else(PoisonError::into_inner).by_id.get(&user_id).cloned()
    }

    pub fn user_by_phone(&self, phone_number: &str) -> Option<Arc<Mutex<User>>> {
        let users = self.users.read().unwrap_or_else(PoisonError::into_inner);
        let id = users.by_phone.get(phone_number)?;
        users.by_id.get(id).cloned()
    }

    /// Move a user to a new phone number. The user id, sessions and message
    /// log are unchanged.
    pub fn change_phone(&self, user_id: u32, phone_number: &str) -> Result<(), ServerError> {
        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        match users.by_phone.get(phone_number) {
            Some(&owner) if owner == user_id => return Ok(()),
            Some(_) => return Err(ServerError::PhoneTaken(phone_number.to_owned())),
            None => {}
        }
        let user = users.by_id.get(&user_id).cloned().ok_or(ServerError::UnknownUser(user_id))?;
        let mut user = lock(&user);

        users.by_phone.remove(user.phone_number());
        users.by_phone.insert(phone_number.to_owned(), user_id);
        user.set_phone_number(phone_number);
        tracing::debug!("[server] user {user_id} moved to a new phone number");
        Ok(())
    }

    /// Run `f` with exclusive access to one user.
    pub fn with_user<R>(&self, user_id: u32, f: impl FnOnce(&mut User) -> R) -> Result<R, ServerError> {
        let user = self.user(user_id).ok_or(ServerError::UnknownUser(user_id))?;
        let mut guard = lock(&user);
        Ok(f(&mut guard))
    }

    /// Check a sign-in password hash. Mismatch is `Ok(false)`.
    pub fn check_password(&self, user_id: u32, hash: &[u8]) -> Result<bool, ServerError> {
        self.with_user(user_id, |u| u.check_password(hash))
    }

    /// `true` while the user has at least one live session.
    pub fn is_online(&self, user_id: u32) -> bool {
        !self.active_sessions(user_id).is_empty()
    }

    // ── Sessions ─────────────────────────────────────────────────────────────

    /// Attach a live connection to the session for `auth_id`, creating the
    /// session on first sight of the key.
    pub fn connect_session(&self, auth_id: u64, connection: Arc<dyn ServerRpcLayer>) {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions
            .entry(auth_id)
            .or_insert_with(|| Session::new(auth_id))
            .set_connection(Some(connection));
        tracing::debug!("[server] session {auth_id:x} connected");
    }

    /// Clear the session's connection. The session itself is kept.
    pub fn disconnect_session(&self, auth_id: u64) -> Result<(), ServerError> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let session = sessions.get_mut(&auth_id).ok_or(ServerError::UnknownSession(auth_id))?;
        session.set_connection(None);
        tracing::debug!("[server] session {auth_id:x} disconnected");
        Ok(())
    }

    /// Bind a session to a user (sign-in), creating the session if needed.
    ///
    /// Binding again to the same user is a no-op.
    pub fn bind_session(&self, auth_id: u64, user_id: u32) -> Result<(), ServerError> {
        let user = self.user(user_id).ok_or(ServerError::UnknownUser(user_id))?;
        let mut user = lock(&user);
        {
            let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
            let session = sessions.entry(auth_id).or_insert_with(|| Session::new(auth_id));
            match session.user_id() {
                Some(owner) if owner == user_id => return Ok(()),
                Some(owner) => return Err(ServerError::SessionBound { auth_id, user_id: owner }),
                None => session.set_user_id(user_id),
            }
        }
        user.push_session(auth_id);
        drop(user);

        tracing::debug!("[server] session {auth_id:x} added to user {user_id}");
        let _ = self.events.send(RegistryEvent::SessionAdded { user_id, auth_id });
        Ok(())
    }

    pub fn get_session(&self, auth_id: u64) -> Option<Session> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner).get(&auth_id).cloned()
    }

    /// The user's sessions that have a live connection, oldest first.
    pub fn active_sessions(&self, user_id: u32) -> Vec<Session> {
        let Some(user) = self.user(user_id) else { return Vec::new() };
        let user = lock(&user);
        self.active_sessions_of(&user)
    }

    fn active_sessions_of(&self, user: &User) -> Vec<Session> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        user.sessions()
            .iter()
            .filter_map(|auth_id| sessions.get(auth_id))
            .filter(|s| s.is_active())
            .cloned()
            .collect()
    }

    // ── Messages ─────────────────────────────────────────────────────────────

    /// Deliver `text` from `sender_id` into `recipient_id`'s message log and
    /// push the update to every live session of the recipient.
    ///
    /// Returns the recipient's new pts. A failed push is logged and does not
    /// undo the message or the other deliveries.
    pub fn add_message(&self, recipient_id: u32, sender_id: u32, text: &str) -> Result<u32, ServerError> {
        let recipient = self.user(recipient_id).ok_or(ServerError::UnknownUser(recipient_id))?;
        let mut recipient = lock(&recipient);

        let update = recipient.record_message(sender_id, text, unix_now())?;
        let payload = update.to_bytes();

        let active = self.active_sessions_of(&recipient);
        tracing::debug!(
            "[server] user {recipient_id} pts {} → {} session(s)",
            update.pts, active.len()
        );
        for session in &active {
            let Some(connection) = session.connection() else { continue };
            if let Err(e) = connection.send_rpc_message(&payload) {
                tracing::warn!("[server] push to session {:x} failed: {e}", session.auth_id());
            }
        }
        Ok(update.pts)
    }

    /// `sender_id` writes to `recipient_id`.
    pub fn send_message(&self, sender_id: u32, recipient_id: u32, text: &str) -> Result<u32, ServerError> {
        if self.user(sender_id).is_none() {
            return Err(ServerError::UnknownUser(sender_id));
        }
        self.add_message(recipient_id, sender_id, text)
    }
}

impl Default for Registry {
    fn default() -> Self { Self::new(ServerConfig::default()) }
}

fn lock(user: &Mutex<User>) -> MutexGuard<'_, User> {
    user.lock().unwrap_or_else(PoisonError::into_inner)
}
