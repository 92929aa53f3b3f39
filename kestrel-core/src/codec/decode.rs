//! Validating FIX decoder
//!
//! Decoding is side-effect-free and re-entrant. Malformed input always
//! comes back as a typed [`CodecError`]; the caller (the venue session)
//! decides whether to log-and-drop or tear the connection down.

use super::encode::{checksum, BEGIN_STRING, SOH};
use super::message::FixMessage;

/// Why a byte sequence was rejected as a FIX message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// Input does not begin with `8=`.
    #[error("not a FIX message: missing BeginString")]
    NotFix,

    /// Message ended before its structure was complete.
    #[error("truncated message")]
    Truncated,

    /// BeginString is a version this engine does not speak.
    #[error("unsupported FIX version {found:?}")]
    VersionMismatch { found: String },

    /// BodyLength(9) does not match the actual body byte count.
    #[error("body length mismatch: declared {declared}, actual {actual}")]
    BodyLengthMismatch { declared: usize, actual: usize },

    /// CheckSum(10) does not match the computed byte sum.
    #[error("checksum mismatch: declared {declared}, computed {computed}")]
    ChecksumMismatch { declared: u32, computed: u32 },

    /// A field had no `=` separator or a non-numeric tag.
    #[error("malformed field {field:?}")]
    MalformedField { field: String },

    /// A field was not terminated by SOH.
    #[error("unterminated field")]
    UnterminatedField,

    /// A structurally required tag was absent.
    #[error("missing required tag {0}")]
    MissingTag(u32),
}

/// Split one `tag=value` chunk.
fn parse_field(chunk: &[u8]) -> Result<(u32, String), CodecError> {
    let text = std::str::from_utf8(chunk).map_err(|_| CodecError::MalformedField {
        field: String::from_utf8_lossy(chunk).into_owned(),
    })?;
    let (tag, value) = text.split_once('=').ok_or_else(|| CodecError::MalformedField {
        field: text.to_string(),
    })?;
    let tag: u32 = tag.parse().map_err(|_| CodecError::MalformedField {
        field: text.to_string(),
    })?;
    Ok((tag, value.to_string()))
}

/// Decode one complete wire frame into a [`FixMessage`], validating
/// BeginString, BodyLength, and CheckSum before accepting anything.
pub fn decode(data: &[u8]) -> Result<FixMessage, CodecError> {
    // BeginString ------------------------------------------------------
    if !data.starts_with(b"8=") {
        return Err(CodecError::NotFix);
    }
    let begin_end = find_soh(data, 0).ok_or(CodecError::UnterminatedField)?;
    let version = &data[2..begin_end];
    if version != BEGIN_STRING.as_bytes() {
        return Err(CodecError::VersionMismatch {
            found: String::from_utf8_lossy(version).into_owned(),
        });
    }

    // BodyLength -------------------------------------------------------
    let len_start = begin_end + 1;
    if !data[len_start..].starts_with(b"9=") {
        return Err(CodecError::MissingTag(9));
    }
    let len_end = find_soh(data, len_start).ok_or(CodecError::UnterminatedField)?;
    let declared: usize = std::str::from_utf8(&data[len_start + 2..len_end])
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| CodecError::MalformedField {
            field: String::from_utf8_lossy(&data[len_start..len_end]).into_owned(),
        })?;
    let body_start = len_end + 1;

    // CheckSum trailer: "10=NNN<SOH>", always the final 7 bytes --------
    if data.len() < body_start + 7 {
        return Err(CodecError::Truncated);
    }
    let trailer_start = data.len() - 7;
    if &data[trailer_start..trailer_start + 3] != b"10=" || data[data.len() - 1] != SOH {
        return Err(CodecError::MissingTag(10));
    }
    let declared_cks: u32 = std::str::from_utf8(&data[trailer_start + 3..data.len() - 1])
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| CodecError::MalformedField {
            field: String::from_utf8_lossy(&data[trailer_start..]).into_owned(),
        })?;

    let actual = trailer_start - body_start;
    if actual != declared {
        return Err(CodecError::BodyLengthMismatch { declared, actual });
    }

    let computed = checksum(&data[..trailer_start]) as u32;
    if computed != declared_cks {
        return Err(CodecError::ChecksumMismatch {
            declared: declared_cks,
            computed,
        });
    }

    // Body fields ------------------------------------------------------
    let body = &data[body_start..trailer_start];
    if body.last() != Some(&SOH) {
        return Err(CodecError::UnterminatedField);
    }
    let mut fields = Vec::new();
    let mut msg_type: Option<String> = None;
    for chunk in body.split(|b| *b == SOH) {
        if chunk.is_empty() {
            continue;
        }
        let (tag, value) = parse_field(chunk)?;
        if msg_type.is_none() {
            // First body field must be MsgType(35)
            if tag != 35 {
                return Err(CodecError::MissingTag(35));
            }
            msg_type = Some(value);
        } else {
            fields.push((tag, value));
        }
    }

    let msg_type = msg_type.ok_or(CodecError::MissingTag(35))?;
    Ok(FixMessage { msg_type, fields })
}

#[inline]
fn find_soh(data: &[u8], from: usize) -> Option<usize> {
    data[from..].iter().position(|b| *b == SOH).map(|p| from + p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode::encode;
    use crate::codec::message;
    use rust_decimal_macros::dec;

    #[test]
    fn round_trip_heartbeat() {
        let msg = message::heartbeat(Some("PING-1"));
        let decoded = decode(&encode(&msg)).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn round_trip_is_byte_identical() {
        let mut msg = message::new_order_single("ORD-9", "AAPL", "1", dec!(250), dec!(187.43));
        msg.stamp_header(12, "KESTREL", "ARCAFIX");
        let wire = encode(&msg);
        let decoded = decode(&wire).unwrap();
        assert_eq!(encode(&decoded), wire);
    }

    #[test]
    fn rejects_bad_checksum() {
        let mut wire = encode(&message::heartbeat(None));
        // Corrupt one checksum digit
        let len = wire.len();
        wire[len - 2] = if wire[len - 2] == b'0' { b'1' } else { b'0' };
        assert!(matches!(
            decode(&wire),
            Err(CodecError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn rejects_corrupted_body() {
        let mut wire = encode(&message::test_request("PING"));
        // Flip a body byte; the checksum no longer matches
        let idx = wire.len() / 2;
        wire[idx] ^= 0x20;
        assert!(decode(&wire).is_err());
    }

    #[test]
    fn rejects_wrong_body_length() {
        let msg = message::heartbeat(None);
        let wire = encode(&msg);
        let text = String::from_utf8(wire).unwrap();
        // Declare one byte more than reality, re-fixing the checksum so the
        // body-length check is what fires.
        let tampered = text.replace("9=5\x01", "9=6\x01");
        let mut bytes = tampered.into_bytes();
        let trailer = bytes.len() - 7;
        let cks = checksum(&bytes[..trailer]);
        let digits = format!("{:03}", cks);
        bytes[trailer + 3..trailer + 6].copy_from_slice(digits.as_bytes());
        assert!(matches!(
            decode(&bytes),
            Err(CodecError::BodyLengthMismatch {
                declared: 6,
                actual: 5
            })
        ));
    }

    #[test]
    fn rejects_non_fix_input() {
        assert_eq!(decode(b"hello world"), Err(CodecError::NotFix));
        assert_eq!(decode(b""), Err(CodecError::NotFix));
    }

    #[test]
    fn rejects_unsupported_version() {
        let wire = b"8=FIX.4.2\x019=5\x0135=0\x0110=000\x01";
        assert!(matches!(
            decode(wire),
            Err(CodecError::VersionMismatch { .. })
        ));
    }

    #[test]
    fn rejects_truncated_message() {
        let wire = encode(&message::heartbeat(None));
        assert!(decode(&wire[..wire.len() - 3]).is_err());
    }

    #[test]
    fn rejects_missing_msg_type() {
        // Body starts with 112= instead of 35=
        let body = b"112=PING\x01";
        let mut wire = format!("8=FIX.4.4\x019={}\x01", body.len()).into_bytes();
        wire.extend_from_slice(body);
        let cks = checksum(&wire);
        wire.extend_from_slice(format!("10={:03}\x01", cks).as_bytes());
        assert_eq!(decode(&wire), Err(CodecError::MissingTag(35)));
    }

    #[test]
    fn decode_does_not_mutate_input() {
        let wire = encode(&message::heartbeat(None));
        let copy = wire.clone();
        let _ = decode(&wire);
        let _ = decode(&wire);
        assert_eq!(wire, copy);
    }
}
