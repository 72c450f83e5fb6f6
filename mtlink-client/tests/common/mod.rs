#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use mtlink_client::{Connection, ConnectionEvent, ConnectionFactory, DcOption, RestoredKey};
use mtlink_mtproto::{
    ConnectionId, KeyExchangeLayer, KeyExchangeState, MessageId, PendingRpcOperation, RpcLayer,
    RpcSendError, SendMode, SendPackageHelper, SocketState, Transport, TransportError,
    shared_transport,
};
use tokio::sync::mpsc::UnboundedSender;

// ── Transport ────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct Wire {
    pub state:       SocketState,
    pub hosts:       Vec<(String, u16)>,
    pub disconnects: usize,
    pub sent:        Vec<Vec<u8>>,
    /// When set, connecting immediately reports success through this sender.
    pub events:      Option<UnboundedSender<ConnectionEvent>>,
}

pub struct MemTransport(pub Arc<Mutex<Wire>>);

impl Transport for MemTransport {
    fn connect_to_host(&mut self, address: &str, port: u16) {
        let mut w = self.0.lock().unwrap();
        w.hosts.push((address.to_owned(), port));
        w.state = SocketState::Connecting;
        if let Some(tx) = w.events.clone() {
            w.state = SocketState::Connected;
            tx.send(ConnectionEvent::TransportConnected).unwrap();
        }
    }
    fn disconnect_from_host(&mut self) {
        let mut w = self.0.lock().unwrap();
        w.disconnects += 1;
        w.state = SocketState::Unconnected;
    }
    fn state(&self) -> SocketState { self.0.lock().unwrap().state }
    fn send_package(&mut self, package: &[u8]) -> Result<(), TransportError> {
        self.0.lock().unwrap().sent.push(package.to_vec());
        Ok(())
    }
}

// ── Key exchange ─────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct Handshake {
    pub state:      KeyExchangeState,
    pub inits:      usize,
    pub delta_time: i32,
    pub key:        Option<Vec<u8>>,
    pub auth_id:    u64,
    /// When set, `init` completes the handshake at once through this sender.
    pub events:     Option<UnboundedSender<ConnectionEvent>>,
}

pub struct FakeKeyExchange(pub Arc<Mutex<Handshake>>);

impl KeyExchangeLayer for FakeKeyExchange {
    fn state(&self) -> KeyExchangeState { self.0.lock().unwrap().state }
    fn set_send_package_helper(&mut self, _helper: SendPackageHelper) {}
    fn init(&mut self) {
        let mut h = self.0.lock().unwrap();
        h.inits += 1;
        h.state = KeyExchangeState::PqRequested;
        if let Some(tx) = h.events.clone() {
            h.state = KeyExchangeState::HasKey;
            h.key = Some(vec![0x42; 256]);
            h.auth_id = 0xfeed;
            tx.send(ConnectionEvent::KeyExchangeStateChanged { new_state: KeyExchangeState::HasKey })
                .unwrap();
        }
    }
    fn delta_time(&self) -> i32 { self.0.lock().unwrap().delta_time }
    fn auth_key(&self) -> Option<Vec<u8>> { self.0.lock().unwrap().key.clone() }
    fn auth_id(&self) -> u64 { self.0.lock().unwrap().auth_id }
}

// ── RPC layer ────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RpcLog {
    pub session_id: u64,
    pub sent:       Vec<(Option<ConnectionId>, Vec<u8>, MessageId)>,
}

pub struct FakeRpc {
    pub log:    Arc<Mutex<RpcLog>>,
    pub helper: Option<SendPackageHelper>,
}

impl RpcLayer for FakeRpc {
    fn session_id(&self) -> u64 { self.log.lock().unwrap().session_id }
    fn set_session_id(&mut self, session_id: u64) {
        self.log.lock().unwrap().session_id = session_id;
    }
    fn set_send_package_helper(&mut self, helper: SendPackageHelper) {
        self.helper = Some(helper);
    }
    fn send_rpc(&mut self, operation: PendingRpcOperation) -> Result<MessageId, RpcSendError> {
        let helper = self.helper.as_ref().ok_or(RpcSendError::NoSendHelper)?;
        let id = helper.new_message_id(SendMode::Client)?;
        helper.send_package(operation.request_data())?;
        self.log.lock().unwrap().sent.push((
            operation.connection(),
            operation.request_data().to_vec(),
            id,
        ));
        Ok(id)
    }
}

// ── Harness ──────────────────────────────────────────────────────────────────

pub struct Harness {
    pub conn:      Connection,
    pub wire:      Arc<Mutex<Wire>>,
    pub handshake: Arc<Mutex<Handshake>>,
    pub rpc:       Arc<Mutex<RpcLog>>,
}

impl Harness {
    pub fn new(dc: DcOption) -> Self {
        Self::with_handshake(dc, Handshake::default())
    }

    pub fn with_handshake(dc: DcOption, handshake: Handshake) -> Self {
        let wire = Arc::new(Mutex::new(Wire::default()));
        let handshake = Arc::new(Mutex::new(handshake));
        let rpc = Arc::new(Mutex::new(RpcLog::default()));
        let conn = Connection::new(
            dc,
            shared_transport(MemTransport(wire.clone())),
            Box::new(FakeKeyExchange(handshake.clone())),
            Box::new(FakeRpc { log: rpc.clone(), helper: None }),
        );
        Self { conn, wire, handshake, rpc }
    }

    /// Make the transport and handshake complete on their own.
    pub fn loopback(self) -> Self {
        self.wire.lock().unwrap().events = Some(self.conn.event_sender());
        self.handshake.lock().unwrap().events = Some(self.conn.event_sender());
        self
    }

    pub fn sent_requests(&self) -> Vec<Vec<u8>> {
        self.rpc.lock().unwrap().sent.iter().map(|(_, r, _)| r.clone()).collect()
    }

    /// The socket fails: it goes down, then reports the error.
    pub fn fail_transport(&mut self, code: i32, text: &str) {
        self.wire.lock().unwrap().state = SocketState::Unconnected;
        self.conn.handle_event(ConnectionEvent::TransportError { code, text: text.into() });
    }

    pub fn finish_handshake(&mut self) {
        self.handshake.lock().unwrap().state = KeyExchangeState::HasKey;
        self.conn.handle_event(ConnectionEvent::KeyExchangeStateChanged {
            new_state: KeyExchangeState::HasKey,
        });
    }
}

pub fn dc(id: u32) -> DcOption {
    DcOption::new(id, format!("127.0.0.{id}"), 11440 + id as u16)
}

pub fn request(tag: u32) -> PendingRpcOperation {
    PendingRpcOperation::new(tag.to_le_bytes().to_vec())
}

// ── Factory ──────────────────────────────────────────────────────────────────

/// Builds loopback-free harness connections and remembers what it was asked for.
#[derive(Clone, Default)]
pub struct RecordingFactory {
    pub created: Arc<Mutex<Vec<(DcOption, Option<RestoredKey>)>>>,
    pub rpc:     Arc<Mutex<Vec<Arc<Mutex<RpcLog>>>>>,
}

impl ConnectionFactory for RecordingFactory {
    fn create_connection(&mut self, dc_option: &DcOption, restored: Option<RestoredKey>) -> Connection {
        let handshake = match &restored {
            Some(key) => Handshake {
                state:      KeyExchangeState::HasKey,
                delta_time: key.delta_time,
                key:        Some(key.auth_key.clone()),
                auth_id:    key.auth_id,
                ..Handshake::default()
            },
            None => Handshake::default(),
        };
        self.created.lock().unwrap().push((dc_option.clone(), restored));
        let harness = Harness::with_handshake(dc_option.clone(), handshake);
        self.rpc.lock().unwrap().push(harness.rpc.clone());
        harness.conn
    }
}
