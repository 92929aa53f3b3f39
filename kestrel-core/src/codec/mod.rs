//! FIX tag=value message codec
//!
//! Encodes structured messages to the wire and validates inbound frames
//! (BeginString, BodyLength, CheckSum) before handing them to the session.
//! Round trip is exact: `encode(decode(x))` reproduces `x` byte for byte
//! for any frame this encoder produced.

pub mod decode;
pub mod encode;
pub mod fields;
pub mod message;

pub use decode::{decode, CodecError};
pub use encode::{checksum, encode, BEGIN_STRING, SOH};
pub use message::{FixField, FixMessage};
