//! # mtlink-client
//!
//! Client-side orchestration of an MTProto session.
//!
//! ## Features
//! - [`Connection`]: the `Disconnected → Connecting → Connected → Authenticated`
//!   state machine over pluggable transport, key-exchange and RPC layers
//! - Operations accepted before a session key exists are queued and released
//!   in submission order once the key is ready
//! - See-other DC redirection through [`DcPool`]
//! - Credential persistence with [`AccountStorage`] (in-memory or file)
//! - Reconnect with a restored key, skipping the handshake

#![deny(unsafe_code)]

mod errors;
mod operation;

pub mod account_storage;
pub mod connection;
pub mod dc;
pub mod dc_pool;

pub use account_storage::{AccountStorage, StorageBackend, StorageEvent};
pub use connection::{Connection, ConnectionEvent, ConnectionStatus, StatusReason};
pub use dc::{DcConfiguration, DcOption};
pub use dc_pool::{ConnectionFactory, DcPool, RestoredKey};
pub use errors::{ClientError, ErrorDetails, StorageError};
pub use operation::{ConnectOperation, OperationState};

// ─── Config ───────────────────────────────────────────────────────────────────

/// Configuration for a [`DcPool`].
#[derive(Clone, Debug)]
pub struct Config {
    /// Known DC endpoints (default: the production table).
    pub dc_configuration: DcConfiguration,
    /// DC to connect to when no credentials are stored (default: 2).
    pub home_dc_id:       u32,
    /// Credential persistence (default: binary file `"mtlink.session"`).
    pub storage:          StorageBackend,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dc_configuration: DcConfiguration::default(),
            home_dc_id:       2,
            storage:          StorageBackend::File { file_name: Some("mtlink.session".into()) },
        }
    }
}

impl Config {
    /// Open the configured storage, loading an existing file if present.
    ///
    /// An unreadable file is logged and ignored, leaving the storage empty.
    pub fn open_storage(&self) -> AccountStorage {
        let mut storage = AccountStorage::new(self.storage.clone());
        let exists = storage.file_name().is_some_and(|p| p.exists());
        if exists {
            if let Err(e) = storage.load_data() {
                tracing::warn!("[storage] ignoring stored credentials: {e}");
                storage.clear();
            }
        }
        storage
    }
}
