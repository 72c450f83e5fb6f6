//! Authorization key identifiers.

use crate::sha1;

/// The 64-bit id of an authorization key: `SHA-1(key)[12..20]` read
/// little-endian. Servers look sessions up by this value (`auth_id`).
pub fn auth_key_id(auth_key: &[u8]) -> u64 {
    let sha = sha1!(auth_key);
    let mut id = [0u8; 8];
    id.copy_from_slice(&sha[12..20]);
    u64::from_le_bytes(id)
}
