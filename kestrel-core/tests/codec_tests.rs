//! Codec round-trip properties over the full message surface

use kestrel_core::codec::fields::tags;
use kestrel_core::codec::{decode, encode, message, CodecError, FixMessage};
use proptest::prelude::*;
use rust_decimal_macros::dec;

fn all_constructed_messages() -> Vec<FixMessage> {
    vec![
        message::logon(30, Some("user"), Some("pass")),
        message::logon(30, None, None),
        message::heartbeat(None),
        message::heartbeat(Some("TEST-3")),
        message::test_request("TEST-4"),
        message::resend_request(3, 7),
        message::sequence_reset_gap_fill(12),
        message::logout(Some("bye")),
        message::logout(None),
        message::new_order_single("ORD-1", "AAPL", "1", dec!(100), dec!(187.43)),
        message::order_cancel_request("CXL-1-1", "ORD-1", "AAPL", "1"),
        message::order_cancel_replace("ORD-2", "ORD-1", "AAPL", "1", dec!(50), dec!(188)),
        message::market_data_request("MD-1", "SPY", true),
        message::market_data_request("MD-2", "SPY", false),
    ]
}

#[test]
fn every_constructed_message_round_trips() {
    for (seq, mut msg) in all_constructed_messages().into_iter().enumerate() {
        msg.stamp_header(seq as u64 + 1, "KESTREL", "ARCAFIX");
        let wire = encode(&msg);
        let decoded = decode(&wire).unwrap_or_else(|e| panic!("decode failed for {}: {e}", msg.msg_type));
        assert_eq!(decoded, msg, "field mismatch for {}", msg.msg_type);
        assert_eq!(encode(&decoded), wire, "bytes differ for {}", msg.msg_type);
    }
}

#[test]
fn checksum_covers_header_and_body() {
    let mut msg = message::heartbeat(None);
    msg.stamp_header(1, "KESTREL", "ARCAFIX");
    let mut wire = encode(&msg);
    // Corrupt a header byte (inside SenderCompID)
    let pos = wire
        .windows(10)
        .position(|w| w.starts_with(b"49=KESTREL"))
        .unwrap()
        + 4;
    wire[pos] = b'X';
    assert!(matches!(
        decode(&wire),
        Err(CodecError::ChecksumMismatch { .. })
    ));
}

#[test]
fn values_containing_equals_survive() {
    let msg = FixMessage::new("B").with(tags::TEXT, "key=value; a=b");
    let decoded = decode(&encode(&msg)).unwrap();
    assert_eq!(decoded.get(tags::TEXT), Some("key=value; a=b"));
}

prop_compose! {
    fn arb_field()(
        tag in prop::sample::select(
            (1u32..200)
                .chain(260..280)
                .filter(|t| !matches!(*t, 8 | 9 | 10 | 35))
                .collect::<Vec<_>>(),
        ),
        value in "[A-Za-z0-9 .,=@#-]{0,24}",
    ) -> (u32, String) {
        (tag, value)
    }
}

proptest! {
    #[test]
    fn arbitrary_messages_round_trip(
        msg_type in "[0-9A-Z]{1,2}",
        fields in prop::collection::vec(arb_field(), 0..24),
    ) {
        let msg = FixMessage { msg_type, fields };
        let wire = encode(&msg);
        let decoded = decode(&wire).expect("own encoding must decode");
        prop_assert_eq!(&decoded, &msg);
        prop_assert_eq!(encode(&decoded), wire);
    }

    #[test]
    fn decoder_never_panics_on_garbage(data in prop::collection::vec(any::<u8>(), 0..256)) {
        // Malformed input must come back as a typed error, never a panic
        let _ = decode(&data);
    }

    #[test]
    fn single_byte_corruption_is_detected(
        seed in 0u64..1000,
        idx in 0usize..100,
        flip in 1u8..255,
    ) {
        let mut msg = message::test_request("PING");
        msg.stamp_header(seed + 1, "KESTREL", "ARCAFIX");
        let mut wire = encode(&msg);
        let idx = idx % wire.len();
        wire[idx] ^= flip;
        // Either rejected outright, or decodes to something != original
        // (corrupting a value byte and its checksum simultaneously is not
        // possible with a single flip)
        if let Ok(decoded) = decode(&wire) {
            prop_assert_ne!(decoded, msg);
        }
    }
}
