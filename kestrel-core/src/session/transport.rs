//! Venue transport: TCP (optionally TLS) plus wire framing
//!
//! The framing layer turns the raw byte stream back into complete FIX
//! frames. TCP gives no message boundaries, so [`FrameBuffer`] accumulates
//! bytes and yields one frame at a time once BodyLength says it is whole.

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::debug;

use crate::codec::SOH;
use crate::config::{EngineConfig, VenueConfig};
use crate::error::{EngineError, Result};

/// Unified stream type over plain TCP and TLS connections.
pub type VenueStream = Box<dyn AsyncStream>;

/// Marker for streams the session loop can read and write.
pub trait AsyncStream: AsyncRead + AsyncWrite + Send + Unpin {}
impl<T: AsyncRead + AsyncWrite + Send + Unpin> AsyncStream for T {}

/// Open a connection to one venue, honoring its TLS setting and the
/// engine-wide socket tuning flag.
pub async fn connect(config: &EngineConfig, venue: &VenueConfig) -> Result<VenueStream> {
    let addr = format!("{}:{}", venue.host, venue.port);
    debug!(venue = %venue.venue, %addr, tls = venue.enable_tls, "connecting");

    let tcp = TcpStream::connect(&addr).await.map_err(|e| EngineError::Transport {
        venue: venue.venue.clone(),
        reason: format!("connect {addr}: {e}"),
    })?;

    if config.enable_performance_optimizations {
        // Small session messages must not sit in Nagle's buffer
        tcp.set_nodelay(true).map_err(|e| EngineError::Transport {
            venue: venue.venue.clone(),
            reason: format!("set_nodelay: {e}"),
        })?;
    }

    if !venue.enable_tls {
        return Ok(Box::new(tcp));
    }

    let connector = native_tls::TlsConnector::new().map_err(|e| EngineError::Transport {
        venue: venue.venue.clone(),
        reason: format!("tls init: {e}"),
    })?;
    let connector = tokio_native_tls::TlsConnector::from(connector);
    let tls = connector
        .connect(&venue.host, tcp)
        .await
        .map_err(|e| EngineError::Transport {
            venue: venue.venue.clone(),
            reason: format!("tls handshake: {e}"),
        })?;
    Ok(Box::new(tls))
}

/// Accumulates inbound bytes and carves out complete FIX frames.
///
/// A frame is complete when `BodyLength(9)` plus the fixed 7-byte checksum
/// trailer have fully arrived. Bytes preceding a `8=` marker (partial
/// garbage after a reconnect) are discarded so the stream can resync.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buf: Vec<u8>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes read off the socket.
    pub fn extend(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Bytes currently buffered.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Pop the next complete frame, or `None` if more bytes are needed.
    /// Malformed headers are skipped a byte at a time in a loop, so a
    /// stream of garbage costs no stack depth.
    pub fn next_frame(&mut self) -> Option<Vec<u8>> {
        loop {
            self.resync();

            // "8=FIX.4.4<SOH>9=<len><SOH>" then body then "10=NNN<SOH>"
            let begin_end = position(&self.buf, 0, SOH)?;
            let len_start = begin_end + 1;
            if self.buf.len() < len_start + 2 {
                // BodyLength tag not fully arrived yet
                return None;
            }
            if !self.buf[len_start..].starts_with(b"9=") {
                // Unparseable header: drop the leading byte and resync
                self.buf.drain(..1);
                continue;
            }
            let len_end = position(&self.buf, len_start, SOH)?;
            let declared: usize = match std::str::from_utf8(&self.buf[len_start + 2..len_end])
                .ok()
                .and_then(|s| s.parse().ok())
            {
                Some(declared) => declared,
                None => {
                    // Non-numeric BodyLength: treat the frame start as garbage
                    self.buf.drain(..1);
                    continue;
                }
            };

            let total = match (len_end + 1)
                .checked_add(declared)
                .and_then(|t| t.checked_add(7))
            {
                Some(total) => total,
                None => {
                    // Absurd BodyLength: garbage
                    self.buf.drain(..1);
                    continue;
                }
            };
            if self.buf.len() < total {
                return None;
            }
            return Some(self.buf.drain(..total).collect());
        }
    }

    /// Discard bytes before the first `8=` marker.
    fn resync(&mut self) {
        if self.buf.starts_with(b"8=") {
            return;
        }
        let start = self
            .buf
            .windows(2)
            .position(|w| w == b"8=")
            .unwrap_or(self.buf.len());
        if start > 0 {
            debug!(discarded = start, "discarding bytes before frame start");
            self.buf.drain(..start);
        }
    }
}

#[inline]
fn position(data: &[u8], from: usize, byte: u8) -> Option<usize> {
    data.get(from..)?.iter().position(|b| *b == byte).map(|p| from + p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode, encode, message};

    #[test]
    fn whole_frame_in_one_read() {
        let wire = encode(&message::heartbeat(None));
        let mut fb = FrameBuffer::new();
        fb.extend(&wire);
        assert_eq!(fb.next_frame().unwrap(), wire);
        assert!(fb.next_frame().is_none());
        assert!(fb.is_empty());
    }

    #[test]
    fn frame_split_across_reads() {
        let wire = encode(&message::test_request("PING-7"));
        let mut fb = FrameBuffer::new();
        let mid = wire.len() / 2;
        fb.extend(&wire[..mid]);
        assert!(fb.next_frame().is_none());
        fb.extend(&wire[mid..]);
        assert_eq!(fb.next_frame().unwrap(), wire);
    }

    #[test]
    fn two_frames_in_one_read() {
        let a = encode(&message::heartbeat(None));
        let b = encode(&message::test_request("PING-8"));
        let mut fb = FrameBuffer::new();
        let mut joined = a.clone();
        joined.extend_from_slice(&b);
        fb.extend(&joined);
        assert_eq!(fb.next_frame().unwrap(), a);
        assert_eq!(fb.next_frame().unwrap(), b);
        assert!(fb.next_frame().is_none());
    }

    #[test]
    fn garbage_before_frame_is_discarded() {
        let wire = encode(&message::heartbeat(None));
        let mut fb = FrameBuffer::new();
        fb.extend(b"\x00\x00junk");
        fb.extend(&wire);
        let frame = fb.next_frame().unwrap();
        assert_eq!(frame, wire);
        assert!(decode(&frame).is_ok());
    }

    #[test]
    fn garbage_flood_is_consumed_iteratively() {
        // Many "8=X<SOH>" units in a row each look like a frame start
        // with a bad BodyLength tag; they must all be skipped in one call
        let mut fb = FrameBuffer::new();
        for _ in 0..10_000 {
            fb.extend(b"8=X\x01");
        }
        let wire = encode(&message::heartbeat(None));
        fb.extend(&wire);
        assert_eq!(fb.next_frame().unwrap(), wire);
        assert!(fb.is_empty());
    }

    #[test]
    fn byte_at_a_time() {
        let wire = encode(&message::heartbeat(Some("HB-1")));
        let mut fb = FrameBuffer::new();
        let mut out = None;
        for b in &wire {
            fb.extend(std::slice::from_ref(b));
            if let Some(frame) = fb.next_frame() {
                out = Some(frame);
            }
        }
        assert_eq!(out.unwrap(), wire);
    }
}
