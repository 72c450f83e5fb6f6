//! RPC operations and the RPC-layer collaborator traits.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::oneshot;

use crate::message::{MessageId, MessageIdError};
use crate::send_helper::SendPackageHelper;
use crate::transport::TransportError;

/// Identity of a connection, stamped onto every operation routed through it.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// A process-unique id.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 { self.0 }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

/// An RPC error returned by the remote.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[error("rpc error {code}: {message}")]
pub struct RpcFailure {
    pub code:    i32,
    pub message: String,
}

/// Outcome delivered to whoever awaits an operation.
pub type RpcResult = Result<Vec<u8>, RpcFailure>;

/// Why an operation could not be written.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum RpcSendError {
    #[error("no send helper attached")]
    NoSendHelper,
    #[error(transparent)]
    MessageId(#[from] MessageIdError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// A serialized request waiting to be sent and answered.
///
/// Carries the connection it was last routed through so that a
/// see-other redirect can move it to a different datacenter.
#[derive(Debug)]
pub struct PendingRpcOperation {
    request:    Vec<u8>,
    connection: Option<ConnectionId>,
    reply:      Option<oneshot::Sender<RpcResult>>,
}

impl PendingRpcOperation {
    /// An operation nobody awaits.
    pub fn new(request: Vec<u8>) -> Self {
        Self { request, connection: None, reply: None }
    }

    /// An operation plus the receiver its result will be delivered to.
    pub fn with_reply(request: Vec<u8>) -> (Self, oneshot::Receiver<RpcResult>) {
        let (tx, rx) = oneshot::channel();
        (Self { request, connection: None, reply: Some(tx) }, rx)
    }

    pub fn request_data(&self) -> &[u8] { &self.request }

    /// The request's leading constructor id, if it has one.
    pub fn request_constructor(&self) -> Option<u32> {
        mtlink_tl::first_constructor(&self.request)
    }

    pub fn connection(&self) -> Option<ConnectionId> { self.connection }

    pub fn set_connection(&mut self, connection: ConnectionId) {
        self.connection = Some(connection);
    }

    /// Deliver the result. Dropped silently if nobody is listening.
    pub fn finish(mut self, result: RpcResult) {
        if let Some(tx) = self.reply.take() {
            let _ = tx.send(result);
        }
    }
}

/// Client-side RPC layer: frames and encrypts requests for one connection.
pub trait RpcLayer: Send {
    /// Current session id (zero if none assigned yet).
    fn session_id(&self) -> u64;

    fn set_session_id(&mut self, session_id: u64);

    /// Attach the helper used to mint ids and write packages.
    fn set_send_package_helper(&mut self, helper: SendPackageHelper);

    /// Write an operation; the layer keeps it until the reply arrives.
    fn send_rpc(&mut self, operation: PendingRpcOperation) -> Result<MessageId, RpcSendError>;
}

/// Server-side RPC layer for one client session.
///
/// Shared between the registry's session records and the connection task,
/// so methods take `&self`.
pub trait ServerRpcLayer: Send + Sync {
    /// Push an already serialized message (typically an update) to the client.
    fn send_rpc_message(&self, message: &[u8]) -> Result<MessageId, RpcSendError>;
}
