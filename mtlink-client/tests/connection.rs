mod common;

use common::{Handshake, Harness, dc, request};
use mtlink_client::{
    ClientError, ConnectOperation, ConnectionEvent, ConnectionStatus, ErrorDetails,
    OperationState, StatusReason,
};
use mtlink_mtproto::{KeyExchangeState, SocketState};

#[test]
fn queued_operations_flush_in_order_after_key() {
    let mut h = Harness::new(dc(2));

    h.conn.process_see_others(request(1));
    assert_eq!(h.conn.status(), ConnectionStatus::Connecting, "see-other connects when idle");
    h.conn.process_see_others(request(2));
    h.conn.process_see_others(request(3));
    assert_eq!(h.conn.queued_operations(), 3);

    h.conn.handle_event(ConnectionEvent::TransportConnected);
    assert_eq!(h.conn.status(), ConnectionStatus::Connected);
    assert_eq!(h.handshake.lock().unwrap().inits, 1);
    h.conn.handle_event(ConnectionEvent::KeyExchangeStateChanged {
        new_state: KeyExchangeState::PqRequested,
    });
    assert!(h.sent_requests().is_empty(), "nothing may be sent before the key exists");

    h.finish_handshake();
    let tags: Vec<Vec<u8>> = (1u32..=3).map(|t| t.to_le_bytes().to_vec()).collect();
    assert_eq!(h.sent_requests(), tags);
    assert_eq!(h.conn.queued_operations(), 0);
    assert_eq!(h.conn.status(), ConnectionStatus::Authenticated);

    let log = h.rpc.lock().unwrap();
    assert_ne!(log.session_id, 0, "a session id is assigned on key");
    assert!(log.sent.iter().all(|(conn, _, _)| *conn == Some(h.conn.id())));
    assert!(log.sent.windows(2).all(|w| w[0].2 < w[1].2), "message ids increase");
    assert!(log.sent.iter().all(|(_, _, id)| id.0 % 4 == 0));
}

#[test]
fn operations_after_key_are_sent_immediately() {
    let mut h = Harness::new(dc(2));
    let op = h.conn.connect_to_dc();
    h.conn.handle_event(ConnectionEvent::TransportConnected);
    h.finish_handshake();
    assert!(op.is_succeeded());

    h.conn.process_see_others(request(7));
    assert_eq!(h.conn.queued_operations(), 0);
    assert_eq!(h.sent_requests(), vec![7u32.to_le_bytes().to_vec()]);
}

#[test]
fn existing_session_id_is_kept() {
    let mut h = Harness::new(dc(2));
    h.rpc.lock().unwrap().session_id = 99;
    h.conn.connect_to_dc();
    h.conn.handle_event(ConnectionEvent::TransportConnected);
    h.finish_handshake();
    assert_eq!(h.rpc.lock().unwrap().session_id, 99);
}

#[test]
fn second_connect_fails_without_touching_the_first() {
    let mut h = Harness::new(dc(2));
    let first = h.conn.connect_to_dc();
    let second = h.conn.connect_to_dc();

    assert!(second.is_finished());
    assert!(!second.is_succeeded());
    assert_eq!(
        second.error_details(),
        Some(ErrorDetails::text("Connection is already in progress"))
    );
    assert!(!first.is_finished());
    assert_eq!(h.wire.lock().unwrap().hosts.len(), 1);

    h.conn.handle_event(ConnectionEvent::TransportConnected);
    h.finish_handshake();
    assert!(first.is_succeeded());
}

#[test]
fn connect_targets_the_dc_option() {
    let mut h = Harness::new(dc(4));
    h.conn.connect_to_dc();
    assert_eq!(h.wire.lock().unwrap().hosts, vec![("127.0.0.4".to_string(), 11444)]);
}

#[test]
fn stale_transport_is_dropped_before_connecting() {
    let mut h = Harness::new(dc(2));
    h.wire.lock().unwrap().state = SocketState::Connected;
    h.conn.connect_to_dc();
    assert_eq!(h.wire.lock().unwrap().disconnects, 1);
}

#[test]
fn transport_error_fails_connect_and_leaves_connection_reusable() {
    let mut h = Harness::new(dc(2));
    let op = h.conn.connect_to_dc();
    h.conn.process_see_others(request(5));

    h.fail_transport(1, "Connection refused");
    assert_eq!(op.state(), OperationState::Failed(ErrorDetails::socket(1, "Connection refused")));
    assert_eq!(h.conn.status(), ConnectionStatus::Disconnected);
    assert_eq!(*h.conn.status_watch().borrow(), (ConnectionStatus::Disconnected, StatusReason::Remote));
    assert_eq!(h.conn.queued_operations(), 1, "queued operations survive the failure");

    let retry = h.conn.connect_to_dc();
    assert!(!retry.is_finished());
    h.conn.handle_event(ConnectionEvent::TransportConnected);
    h.finish_handshake();
    assert!(retry.is_succeeded());
    assert_eq!(h.sent_requests(), vec![5u32.to_le_bytes().to_vec()]);
}

#[test]
fn restored_key_skips_the_handshake() {
    let handshake = Handshake {
        state:      KeyExchangeState::HasKey,
        delta_time: -5,
        key:        Some(vec![1; 256]),
        ..Handshake::default()
    };
    let mut h = Harness::with_handshake(dc(2), handshake);
    h.conn.process_see_others(request(1));
    assert_eq!(h.conn.queued_operations(), 1, "no sending before the transport is up");

    h.conn.handle_event(ConnectionEvent::TransportConnected);
    assert_eq!(h.conn.status(), ConnectionStatus::Authenticated);
    assert_eq!(h.handshake.lock().unwrap().inits, 0);
    assert_eq!(h.conn.send_helper().delta_time(), -5);
    assert_eq!(h.sent_requests().len(), 1);
}

#[test]
fn local_disconnect_fails_pending_connect() {
    let mut h = Harness::new(dc(2));
    let op = h.conn.connect_to_dc();
    h.conn.disconnect_from_dc();

    assert_eq!(op.error_details(), Some(ErrorDetails::text("Disconnected locally")));
    assert_eq!(*h.conn.status_watch().borrow(), (ConnectionStatus::Disconnected, StatusReason::Local));
    assert_eq!(h.wire.lock().unwrap().state, SocketState::Unconnected);
}

#[test]
fn remote_close_moves_to_disconnected() {
    let mut h = Harness::new(dc(2));
    h.conn.connect_to_dc();
    h.conn.handle_event(ConnectionEvent::TransportConnected);
    h.finish_handshake();

    h.wire.lock().unwrap().state = SocketState::Unconnected;
    h.conn.handle_event(ConnectionEvent::TransportDisconnected);
    assert_eq!(*h.conn.status_watch().borrow(), (ConnectionStatus::Disconnected, StatusReason::Remote));
}

#[test]
fn stale_disconnect_notice_is_ignored() {
    let mut h = Harness::new(dc(2));
    h.conn.connect_to_dc();
    // The transport is mid-connect, so the notice belongs to a previous socket.
    h.conn.handle_event(ConnectionEvent::TransportDisconnected);
    assert_eq!(h.conn.status(), ConnectionStatus::Connecting);
}

#[test]
fn late_error_from_previous_socket_does_not_fail_reconnect() {
    let mut h = Harness::new(dc(2));
    h.conn.connect_to_dc();
    h.conn.handle_event(ConnectionEvent::TransportConnected);
    h.finish_handshake();

    h.wire.lock().unwrap().state = SocketState::Unconnected;
    h.conn.handle_event(ConnectionEvent::TransportDisconnected);
    let retry = h.conn.connect_to_dc();

    h.conn.handle_event(ConnectionEvent::TransportError {
        code: 1,
        text: "RemoteHostClosed".into(),
    });
    assert!(!retry.is_finished());
    assert_eq!(h.conn.status(), ConnectionStatus::Connecting);

    h.conn.handle_event(ConnectionEvent::TransportConnected);
    assert!(retry.is_succeeded(), "the restored key finishes the retry");
}

#[test]
fn error_after_local_disconnect_keeps_local_reason() {
    let mut h = Harness::new(dc(2));
    h.conn.connect_to_dc();
    h.conn.disconnect_from_dc();

    h.fail_transport(7, "late");
    assert_eq!(*h.conn.status_watch().borrow(), (ConnectionStatus::Disconnected, StatusReason::Local));
}

#[test]
fn dc_option_is_fixed_while_connecting() {
    let mut h = Harness::new(dc(2));
    h.conn.connect_to_dc();
    assert!(matches!(h.conn.set_dc_option(dc(3)), Err(ClientError::ConnectionActive)));

    h.conn.disconnect_from_dc();
    h.conn.set_dc_option(dc(3)).unwrap();
    assert_eq!(h.conn.dc_option().id, 3);
}

#[test]
fn status_watch_reports_each_transition() {
    let mut h = Harness::new(dc(2));
    let mut watch = h.conn.status_watch();

    h.conn.connect_to_dc();
    assert!(watch.has_changed().unwrap());
    assert_eq!(*watch.borrow_and_update(), (ConnectionStatus::Connecting, StatusReason::Local));

    h.conn.handle_event(ConnectionEvent::TransportConnected);
    assert_eq!(*watch.borrow_and_update(), (ConnectionStatus::Connected, StatusReason::Remote));

    h.finish_handshake();
    assert_eq!(*watch.borrow_and_update(), (ConnectionStatus::Authenticated, StatusReason::Local));
}

#[tokio::test]
async fn connect_resolves_through_the_event_channel() {
    let mut h = Harness::new(dc(2)).loopback();
    h.conn.process_see_others(request(9));
    assert_eq!(h.conn.dispatch_pending(), 2);
    assert_eq!(h.conn.status(), ConnectionStatus::Authenticated);
    assert_eq!(h.sent_requests(), vec![9u32.to_le_bytes().to_vec()]);

    h.conn.disconnect_from_dc();
    h.conn.connect().await.unwrap();
    assert_eq!(h.conn.status(), ConnectionStatus::Authenticated);
}

#[tokio::test]
async fn failed_operation_resolves_immediately() {
    let op = ConnectOperation::failed(ErrorDetails::text("nope"));
    assert_eq!(op.wait().await, Err(ErrorDetails::text("nope")));
}
