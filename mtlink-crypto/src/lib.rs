//! Cryptographic helpers for the mtlink session core.
//!
//! Provides:
//! - SHA-1 / SHA-256 hash macros
//! - `auth_key_id`: the auth id derived from key bytes
//! - Secure random session ids and salts
//! - The salted password hash used for account 2FA checks
//!
//! Key agreement itself lives behind the key-exchange layer and is not part
//! of this crate.

#![deny(unsafe_code)]

mod auth_key;
mod sha;

pub use auth_key::auth_key_id;

use rand::RngCore;

#[doc(hidden)]
pub mod __private {
    pub use sha1;
    pub use sha2;
}

/// Length of the server-side password salt.
pub const PASSWORD_SALT_LEN: usize = 8;

/// Fill `buf` from the thread-local CSPRNG.
pub fn random_bytes(buf: &mut [u8]) {
    rand::thread_rng().fill_bytes(buf);
}

/// A random 64-bit value, e.g. a fresh session id.
///
/// Never returns zero, since zero means "no session id assigned".
pub fn random_u64() -> u64 {
    loop {
        let v = rand::thread_rng().next_u64();
        if v != 0 { return v; }
    }
}

/// A fresh password salt.
pub fn generate_password_salt() -> [u8; PASSWORD_SALT_LEN] {
    let mut salt = [0u8; PASSWORD_SALT_LEN];
    random_bytes(&mut salt);
    salt
}

/// `SHA256(salt || password || salt)`.
pub fn salted_password_hash(salt: &[u8], password: &[u8]) -> [u8; 32] {
    sha256!(salt, password, salt)
}
