//! Error types for mtlink-server.

/// Failures of registry operations.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ServerError {
    #[error("user {0} does not exist")]
    UnknownUser(u32),
    #[error("a user with phone number {0} already exists")]
    PhoneTaken(String),
    /// Another phone number hashes to the same user id.
    #[error("user id {user_id} derived from {phone_number} belongs to another account")]
    UserIdTaken { phone_number: String, user_id: u32 },
    /// The user's update sequence cannot advance any further.
    #[error("pts of user {0} is exhausted")]
    PtsExhausted(u32),
    #[error("session {0:x} does not exist")]
    UnknownSession(u64),
    /// The session already belongs to another user.
    #[error("session {auth_id:x} is bound to user {user_id}")]
    SessionBound { auth_id: u64, user_id: u32 },
}
