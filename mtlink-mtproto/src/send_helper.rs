//! The shared write path used by both the key-exchange and RPC layers.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::message::{MessageId, MessageIdError, MessageIdGenerator, SendMode};
use crate::transport::{Transport, TransportError};

/// A transport shared between a connection and its sub-layers.
pub type SharedTransport = Arc<Mutex<dyn Transport>>;

/// Wrap a transport for sharing.
pub fn shared_transport<T: Transport + 'static>(transport: T) -> SharedTransport {
    Arc::new(Mutex::new(transport))
}

/// Mints message ids and writes packages for one connection.
///
/// Cheap to clone; every clone refers to the same transport and the same
/// id sequence, so ids stay strictly increasing no matter which layer asks.
#[derive(Clone)]
pub struct SendPackageHelper {
    transport: SharedTransport,
    ids:       Arc<Mutex<MessageIdGenerator>>,
}

impl SendPackageHelper {
    pub fn new(transport: SharedTransport) -> Self {
        Self {
            transport,
            ids: Arc::new(Mutex::new(MessageIdGenerator::default())),
        }
    }

    pub fn delta_time(&self) -> i32 {
        self.ids().delta_time()
    }

    pub fn set_delta_time(&self, delta_time: i32) {
        self.ids().set_delta_time(delta_time);
    }

    /// Allocate the next message id for this connection.
    pub fn new_message_id(&self, mode: SendMode) -> Result<MessageId, MessageIdError> {
        self.ids().new_message_id(mode)
    }

    /// Hand a complete package to the transport.
    pub fn send_package(&self, package: &[u8]) -> Result<(), TransportError> {
        self.transport().send_package(package)
    }

    /// Lock the underlying transport.
    pub fn transport(&self) -> MutexGuard<'_, dyn Transport + 'static> {
        self.transport.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ids(&self) -> MutexGuard<'_, MessageIdGenerator> {
        self.ids.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
