use mtlink_tl::types::{Message, Peer, UpdateShortMessage};
use mtlink_tl::{Cursor, Deserializable, Identifiable, Serializable, first_constructor};

// ── Primitives ────────────────────────────────────────────────────────────────

#[test]
fn string_is_padded_to_four_bytes() {
    let long = "x".repeat(300);
    for s in ["", "a", "hello world", long.as_str()] {
        let bytes = s.to_owned().to_bytes();
        assert_eq!(bytes.len() % 4, 0, "len {} not aligned", s.len());
        assert_eq!(String::from_bytes(&bytes).unwrap(), s);
    }
}

#[test]
fn long_bytes_use_four_byte_header() {
    let data = vec![7u8; 254];
    let bytes = data.to_bytes();
    assert_eq!(bytes[0], 0xfe);
    assert_eq!(bytes[1], 254);
    assert_eq!(Vec::<u8>::from_bytes(&bytes).unwrap(), data);
}

#[test]
fn truncated_input_is_eof() {
    let bytes = 42u32.to_bytes();
    assert_eq!(
        u32::from_bytes(&bytes[..3]),
        Err(mtlink_tl::deserialize::Error::UnexpectedEof),
    );
}

#[test]
fn invalid_utf8_is_rejected() {
    let bytes = vec![0xffu8, 0xfe].to_bytes();
    assert_eq!(
        String::from_bytes(&bytes),
        Err(mtlink_tl::deserialize::Error::InvalidUtf8),
    );
}

// ── Records ───────────────────────────────────────────────────────────────────

#[test]
fn peer_rejects_unknown_constructor() {
    let mut bytes = 0xdeadbeefu32.to_bytes();
    bytes.extend(5u32.to_bytes());
    assert!(matches!(
        Peer::from_bytes(&bytes),
        Err(mtlink_tl::deserialize::Error::UnexpectedConstructor { id: 0xdeadbeef })
    ));
}

#[test]
fn message_without_sender_omits_from_id() {
    let with = Message {
        out: false, id: 1, from_id: Some(9), to_id: Peer::User(2), date: 100,
        message: "hi".into(),
    };
    let without = Message { from_id: None, ..with.clone() };
    assert_eq!(with.to_bytes().len(), without.to_bytes().len() + 4);
    assert_eq!(Message::from_bytes(&without.to_bytes()).unwrap(), without);
}

#[test]
fn update_short_message_layout() {
    let upd = UpdateShortMessage {
        out: false, id: 3, user_id: 77, message: "ping".into(),
        pts: 3, pts_count: 1, date: 1_700_000_000,
    };
    let bytes = upd.to_bytes();
    assert_eq!(first_constructor(&bytes), Some(UpdateShortMessage::CONSTRUCTOR_ID));

    let mut cur = Cursor::from_slice(&bytes);
    let decoded = UpdateShortMessage::deserialize(&mut cur).unwrap();
    assert_eq!(cur.remaining(), 0);
    assert_eq!(decoded, upd);
}
