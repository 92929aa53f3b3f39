//! FIX tag=value wire encoding
//!
//! Layout: `8=FIX.4.4|9=<len>|35=<type>|<fields...>|10=<cks>|` where `|`
//! is SOH (0x01). BodyLength covers everything after the 9= field's SOH up
//! to and excluding `10=`; CheckSum is the byte sum mod 256 over everything
//! before `10=`, rendered as exactly three digits.

use super::message::FixMessage;

/// Field delimiter.
pub const SOH: u8 = 0x01;

/// Protocol version this engine speaks.
pub const BEGIN_STRING: &str = "FIX.4.4";

#[inline]
fn put_field(buf: &mut Vec<u8>, tag: u32, value: &str) {
    buf.extend_from_slice(tag.to_string().as_bytes());
    buf.push(b'=');
    buf.extend_from_slice(value.as_bytes());
    buf.push(SOH);
}

/// Byte sum mod 256 over `data`.
#[inline]
pub fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

/// Encode a message to its wire form. Infallible: any structured message
/// has a wire representation.
pub fn encode(msg: &FixMessage) -> Vec<u8> {
    let mut body = Vec::with_capacity(64 + msg.fields.len() * 16);
    put_field(&mut body, 35, &msg.msg_type);
    for (tag, value) in &msg.fields {
        put_field(&mut body, *tag, value);
    }

    let mut out = Vec::with_capacity(body.len() + 32);
    out.extend_from_slice(b"8=");
    out.extend_from_slice(BEGIN_STRING.as_bytes());
    out.push(SOH);
    put_field(&mut out, 9, &body.len().to_string());
    out.extend_from_slice(&body);

    let cks = checksum(&out);
    out.extend_from_slice(format!("10={:03}", cks).as_bytes());
    out.push(SOH);
    out
}
