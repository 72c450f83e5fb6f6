//! The client connection orchestrator.
//!
//! A [`Connection`] glues a [`KeyExchangeLayer`] and an [`RpcLayer`] to a
//! [`Transport`](mtlink_mtproto::Transport) for one DC. It owns the status
//! state machine
//!
//! ```text
//! Disconnected → Connecting → Connected → Authenticated
//! ```
//!
//! and the queue of operations accepted before a session key exists.
//!
//! Collaborators report progress by posting [`ConnectionEvent`]s to the
//! sender returned by [`Connection::event_sender`]; the connection applies
//! them one at a time on whichever task drives it
//! ([`Connection::dispatch_pending`] or [`Connection::process_next_event`]).

use std::collections::VecDeque;
use std::mem;

use mtlink_mtproto::{
    ConnectionId, KeyExchangeLayer, KeyExchangeState, PendingRpcOperation, RpcLayer,
    SendPackageHelper, SharedTransport, SocketState,
};
use tokio::sync::{mpsc, watch};

use crate::dc::DcOption;
use crate::errors::{ClientError, ErrorDetails};
use crate::operation::{ConnectOperation, ConnectResolver};

// ─── Status ───────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Authenticated,
}

/// Which side caused a status transition.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum StatusReason {
    #[default]
    Local,
    Remote,
}

/// Notifications from the transport and the key-exchange layer.
///
/// Transports post `TransportDisconnected` and `TransportError` once their
/// socket is down. A notice that arrives while the transport reports a live
/// socket belongs to an earlier socket and is ignored.
#[derive(Clone, Debug, PartialEq)]
pub enum ConnectionEvent {
    TransportConnected,
    TransportDisconnected,
    TransportError { code: i32, text: String },
    KeyExchangeStateChanged { new_state: KeyExchangeState },
}

// ─── Connection ───────────────────────────────────────────────────────────────

/// One logical link to one DC.
pub struct Connection {
    id:              ConnectionId,
    dc_option:       DcOption,
    status:          ConnectionStatus,
    status_tx:       watch::Sender<(ConnectionStatus, StatusReason)>,
    key_exchange:    Box<dyn KeyExchangeLayer>,
    rpc:             Box<dyn RpcLayer>,
    send_helper:     SendPackageHelper,
    queued:          VecDeque<PendingRpcOperation>,
    pending_connect: Option<ConnectResolver>,
    events_tx:       mpsc::UnboundedSender<ConnectionEvent>,
    events_rx:       mpsc::UnboundedReceiver<ConnectionEvent>,
}

impl Connection {
    /// Build a connection and hand both sub-layers the shared send helper.
    pub fn new(
        dc_option:        DcOption,
        transport:        SharedTransport,
        mut key_exchange: Box<dyn KeyExchangeLayer>,
        mut rpc:          Box<dyn RpcLayer>,
    ) -> Self {
        let send_helper = SendPackageHelper::new(transport);
        key_exchange.set_send_package_helper(send_helper.clone());
        rpc.set_send_package_helper(send_helper.clone());

        let (status_tx, _) = watch::channel((ConnectionStatus::Disconnected, StatusReason::Local));
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Self {
            id: ConnectionId::next(),
            dc_option,
            status: ConnectionStatus::Disconnected,
            status_tx,
            key_exchange,
            rpc,
            send_helper,
            queued: VecDeque::new(),
            pending_connect: None,
            events_tx,
            events_rx,
        }
    }

    pub fn id(&self) -> ConnectionId { self.id }

    pub fn status(&self) -> ConnectionStatus { self.status }

    /// Observe `(status, reason)` transitions.
    pub fn status_watch(&self) -> watch::Receiver<(ConnectionStatus, StatusReason)> {
        self.status_tx.subscribe()
    }

    pub fn dc_option(&self) -> &DcOption { &self.dc_option }

    /// Point the connection at another endpoint. Only valid while disconnected.
    pub fn set_dc_option(&mut self, dc_option: DcOption) -> Result<(), ClientError> {
        if self.status != ConnectionStatus::Disconnected {
            return Err(ClientError::ConnectionActive);
        }
        self.dc_option = dc_option;
        Ok(())
    }

    pub fn rpc_layer(&self) -> &dyn RpcLayer { self.rpc.as_ref() }

    pub fn rpc_layer_mut(&mut self) -> &mut dyn RpcLayer { self.rpc.as_mut() }

    pub fn key_exchange_layer(&self) -> &dyn KeyExchangeLayer { self.key_exchange.as_ref() }

    pub fn send_helper(&self) -> &SendPackageHelper { &self.send_helper }

    /// Number of operations waiting for a session key.
    pub fn queued_operations(&self) -> usize { self.queued.len() }

    /// Where the transport and key-exchange layer post their events.
    pub fn event_sender(&self) -> mpsc::UnboundedSender<ConnectionEvent> {
        self.events_tx.clone()
    }

    // ── Control ──────────────────────────────────────────────────────────────

    /// Start connecting to the configured DC.
    ///
    /// Fails immediately unless the connection is disconnected.
    pub fn connect_to_dc(&mut self) -> ConnectOperation {
        if self.status != ConnectionStatus::Disconnected {
            tracing::warn!("[connection] {} connect requested while {:?}", self.id, self.status);
            return ConnectOperation::failed(ErrorDetails::text("Connection is already in progress"));
        }
        tracing::debug!(
            "[connection] {} connecting to DC{} {}:{}",
            self.id, self.dc_option.id, self.dc_option.address, self.dc_option.port
        );

        {
            let mut transport = self.send_helper.transport();
            if transport.state() != SocketState::Unconnected {
                transport.disconnect_from_host();
            }
        }

        let (operation, resolver) = ConnectOperation::pending();
        self.pending_connect = Some(resolver);
        self.set_status(ConnectionStatus::Connecting, StatusReason::Local);
        self.send_helper
            .transport()
            .connect_to_host(&self.dc_option.address, self.dc_option.port);
        operation
    }

    /// Drop the link. Queued operations are kept for the next connect.
    pub fn disconnect_from_dc(&mut self) {
        if self.status == ConnectionStatus::Disconnected {
            return;
        }
        tracing::debug!("[connection] {} disconnecting", self.id);
        self.send_helper.transport().disconnect_from_host();
        self.fail_pending_connect(ErrorDetails::text("Disconnected locally"));
        self.set_status(ConnectionStatus::Disconnected, StatusReason::Local);
    }

    /// Send `operation` through this connection, connecting first if needed.
    ///
    /// Nothing is transmitted before the key exchange has produced a key and
    /// the connection is authenticated; until then the operation waits in a
    /// FIFO queue.
    pub fn process_see_others(&mut self, operation: PendingRpcOperation) {
        if self.status == ConnectionStatus::Disconnected {
            let _ = self.connect_to_dc();
        }
        if !self.key_exchange.state().has_key() || self.status != ConnectionStatus::Authenticated {
            tracing::debug!(
                "[connection] {} queue operation {:#010x}",
                self.id, operation.request_constructor().unwrap_or_default()
            );
            self.queued.push_back(operation);
            return;
        }
        tracing::debug!(
            "[connection] {} send operation {:#010x}",
            self.id, operation.request_constructor().unwrap_or_default()
        );
        self.transmit(operation);
    }

    // ── Events ───────────────────────────────────────────────────────────────

    /// Apply every event already posted. Returns how many were handled.
    pub fn dispatch_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Wait for the next event and apply it.
    pub async fn process_next_event(&mut self) {
        if let Some(event) = self.events_rx.recv().await {
            self.handle_event(event);
        }
    }

    /// Connect and drive events until the attempt resolves.
    pub async fn connect(&mut self) -> Result<(), ErrorDetails> {
        let operation = self.connect_to_dc();
        while !operation.is_finished() {
            self.process_next_event().await;
        }
        operation.wait().await
    }

    pub fn handle_event(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::TransportConnected => self.on_transport_connected(),
            ConnectionEvent::TransportDisconnected => self.on_transport_disconnected(),
            ConnectionEvent::TransportError { code, text } => self.on_transport_error(code, text),
            ConnectionEvent::KeyExchangeStateChanged { new_state } => {
                self.on_key_exchange_state_changed(new_state)
            }
        }
    }

    fn on_transport_connected(&mut self) {
        if self.status != ConnectionStatus::Connecting {
            tracing::debug!("[connection] {} stale transport connect ignored", self.id);
            return;
        }
        self.set_status(ConnectionStatus::Connected, StatusReason::Remote);

        if self.key_exchange.state().has_key() {
            tracing::debug!("[connection] {} reusing restored auth key", self.id);
            self.on_key_ready();
        } else {
            self.key_exchange.init();
        }
    }

    fn on_transport_disconnected(&mut self) {
        if self.is_stale_notice() {
            return;
        }
        tracing::debug!("[connection] {} closed by remote", self.id);
        self.fail_pending_connect(ErrorDetails::text("Connection closed by remote"));
        self.set_status(ConnectionStatus::Disconnected, StatusReason::Remote);
    }

    fn on_transport_error(&mut self, code: i32, text: String) {
        if self.is_stale_notice() {
            tracing::debug!("[connection] {} stale transport error {code} ignored", self.id);
            return;
        }
        tracing::warn!("[connection] {} transport error {code}: {text}", self.id);
        self.fail_pending_connect(ErrorDetails::socket(code, text));
        self.set_status(ConnectionStatus::Disconnected, StatusReason::Remote);
    }

    /// The notice predates the current attempt, or nothing is left to tear down.
    fn is_stale_notice(&self) -> bool {
        self.send_helper.transport().state() != SocketState::Unconnected
            || self.status == ConnectionStatus::Disconnected
    }

    fn on_key_exchange_state_changed(&mut self, new_state: KeyExchangeState) {
        tracing::debug!(
            "[connection] {} DC{} key exchange state: {new_state:?}",
            self.id, self.dc_option.id
        );
        if !new_state.has_key() {
            return;
        }
        if self.status != ConnectionStatus::Connected {
            tracing::debug!("[connection] {} key ready while {:?}, ignored", self.id, self.status);
            return;
        }
        self.on_key_ready();
    }

    fn on_key_ready(&mut self) {
        self.send_helper.set_delta_time(self.key_exchange.delta_time());
        if self.rpc.session_id() == 0 {
            self.rpc.set_session_id(mtlink_crypto::random_u64());
        }

        for operation in mem::take(&mut self.queued) {
            tracing::debug!(
                "[connection] {} dequeue operation {:#010x}",
                self.id, operation.request_constructor().unwrap_or_default()
            );
            self.transmit(operation);
        }

        self.set_status(ConnectionStatus::Authenticated, StatusReason::Local);
    }

    // ── Internals ────────────────────────────────────────────────────────────

    fn transmit(&mut self, mut operation: PendingRpcOperation) {
        operation.set_connection(self.id);
        match self.rpc.send_rpc(operation) {
            Ok(message_id) => tracing::debug!("[connection] {} sent as {message_id}", self.id),
            Err(e)         => tracing::warn!("[connection] {} send failed: {e}", self.id),
        }
    }

    fn fail_pending_connect(&mut self, details: ErrorDetails) {
        if let Some(resolver) = self.pending_connect.take() {
            resolver.fail(details);
        }
    }

    fn set_status(&mut self, status: ConnectionStatus, reason: StatusReason) {
        if self.status == status {
            return;
        }
        tracing::debug!("[connection] {} status {:?} → {status:?} ({reason:?})", self.id, self.status);
        self.status = status;
        self.status_tx.send_replace((status, reason));

        if status == ConnectionStatus::Authenticated {
            if let Some(resolver) = self.pending_connect.take() {
                resolver.succeed();
            }
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("dc_option", &self.dc_option)
            .field("status", &self.status)
            .field("queued", &self.queued.len())
            .finish_non_exhaustive()
    }
}
