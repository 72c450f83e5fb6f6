//! Multi-DC connection pool.
//!
//! Keeps one [`Connection`] per DC id and routes see-other redirects to the
//! right one, creating connections on demand through a [`ConnectionFactory`].
//! The home DC's connection can be seeded with credentials restored from
//! [`AccountStorage`], and its credentials exported back.

use std::collections::HashMap;

use mtlink_crypto::auth_key_id;
use mtlink_mtproto::{ConnectionId, PendingRpcOperation};

use crate::account_storage::AccountStorage;
use crate::connection::Connection;
use crate::dc::{DcConfiguration, DcOption};
use crate::errors::ClientError;
use crate::Config;

/// Credentials restored from storage for the home DC.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RestoredKey {
    pub auth_key:   Vec<u8>,
    pub auth_id:    u64,
    pub delta_time: i32,
}

/// Builds connections (transport, key-exchange and RPC layers) for a DC.
pub trait ConnectionFactory: Send {
    /// `restored` is set when the key-exchange layer should start out
    /// holding a previously negotiated key.
    fn create_connection(&mut self, dc_option: &DcOption, restored: Option<RestoredKey>) -> Connection;
}

// ─── DcPool ───────────────────────────────────────────────────────────────────

pub struct DcPool {
    configuration: DcConfiguration,
    home_dc_id:    u32,
    factory:       Box<dyn ConnectionFactory>,
    connections:   HashMap<u32, Connection>,
}

impl DcPool {
    /// Create the pool and its home connection.
    ///
    /// When `storage` holds a minimal data set, its DC becomes the home DC
    /// and the home connection starts with the stored key.
    pub fn new(
        config:  Config,
        factory: Box<dyn ConnectionFactory>,
        storage: &AccountStorage,
    ) -> Result<Self, ClientError> {
        let mut pool = Self {
            configuration: config.dc_configuration,
            home_dc_id:    config.home_dc_id,
            factory,
            connections:   HashMap::new(),
        };

        if storage.has_minimal_data_set() {
            let dc = storage.dc_info().clone();
            tracing::info!("[dc_pool] restoring session on DC{} (key {:x})", dc.id, storage.auth_id());
            pool.home_dc_id = dc.id;
            pool.configuration.upsert(dc.clone());
            let restored = RestoredKey {
                auth_key:   storage.auth_key().to_vec(),
                auth_id:    key_id(storage.auth_key(), storage.auth_id()),
                delta_time: storage.delta_time(),
            };
            let connection = pool.factory.create_connection(&dc, Some(restored));
            pool.connections.insert(dc.id, connection);
        } else {
            pool.connection_for(pool.home_dc_id)?;
        }
        Ok(pool)
    }

    pub fn home_dc_id(&self) -> u32 { self.home_dc_id }

    pub fn configuration(&self) -> &DcConfiguration { &self.configuration }

    /// Returns true if a connection for `dc_id` already exists in the pool.
    pub fn has_connection(&self, dc_id: u32) -> bool {
        self.connections.contains_key(&dc_id)
    }

    pub fn connection(&self, dc_id: u32) -> Option<&Connection> {
        self.connections.get(&dc_id)
    }

    pub fn connection_mut(&mut self, dc_id: u32) -> Option<&mut Connection> {
        self.connections.get_mut(&dc_id)
    }

    pub fn home_connection_mut(&mut self) -> Result<&mut Connection, ClientError> {
        let home = self.home_dc_id;
        self.connections.get_mut(&home).ok_or(ClientError::NoHomeConnection(home))
    }

    /// The connection for `dc_id`, created if the DC is configured.
    pub fn connection_for(&mut self, dc_id: u32) -> Result<&mut Connection, ClientError> {
        if !self.connections.contains_key(&dc_id) {
            let option = self
                .configuration
                .option_for(dc_id)
                .cloned()
                .ok_or(ClientError::UnknownDc(dc_id))?;
            tracing::debug!("[dc_pool] new connection to DC{dc_id} {}:{}", option.address, option.port);
            let connection = self.factory.create_connection(&option, None);
            self.connections.insert(dc_id, connection);
        }
        self.connections.get_mut(&dc_id).ok_or(ClientError::UnknownDc(dc_id))
    }

    /// Re-send `operation` on the DC a see-other error pointed to.
    pub fn route_see_other(
        &mut self,
        dc_id:     u32,
        operation: PendingRpcOperation,
    ) -> Result<ConnectionId, ClientError> {
        let from = operation.connection();
        let connection = self.connection_for(dc_id)?;
        tracing::info!("[dc_pool] redirect {from:?} → DC{dc_id} ({})", connection.id());
        connection.process_see_others(operation);
        Ok(connection.id())
    }

    /// Make `dc_id` the home DC (after a user/phone migrate error).
    pub fn migrate_home(&mut self, dc_id: u32) -> Result<(), ClientError> {
        self.connection_for(dc_id)?;
        tracing::info!("[dc_pool] home DC{} → DC{dc_id}", self.home_dc_id);
        self.home_dc_id = dc_id;
        Ok(())
    }

    /// Apply queued events on every connection.
    pub fn dispatch_pending(&mut self) -> usize {
        self.connections.values_mut().map(Connection::dispatch_pending).sum()
    }

    pub fn disconnect_all(&mut self) {
        for connection in self.connections.values_mut() {
            connection.disconnect_from_dc();
        }
    }

    /// Store the home connection's credentials and sync the storage.
    pub fn export_credentials(&self, storage: &mut AccountStorage) -> Result<(), ClientError> {
        let home = self
            .connections
            .get(&self.home_dc_id)
            .ok_or(ClientError::NoHomeConnection(self.home_dc_id))?;
        let key_exchange = home.key_exchange_layer();
        let auth_key = key_exchange.auth_key().ok_or(ClientError::NoAuthKey)?;

        storage.set_auth_id(key_id(&auth_key, key_exchange.auth_id()));
        storage.set_auth_key(auth_key);
        storage.set_delta_time(key_exchange.delta_time());
        storage.set_dc_info(home.dc_option().clone());
        storage.sync()?;
        tracing::info!("[dc_pool] credentials for DC{} saved", self.home_dc_id);
        Ok(())
    }
}

/// `known`, or the id derived from the key when none was recorded.
fn key_id(auth_key: &[u8], known: u64) -> u64 {
    match known {
        0  => auth_key_id(auth_key),
        id => id,
    }
}
