//! Per-session sequence number tracking
//!
//! One tracker per venue session. The session task is the only writer, but
//! counters are atomic so status snapshots can read them from other tasks.

use std::sync::atomic::{AtomicU64, Ordering};

/// Outcome of observing an inbound sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceCheck {
    /// Number matched the expectation; expectation advanced by one.
    Accept(u64),
    /// Number was ahead of the expectation: messages were missed.
    /// The session should issue a ResendRequest for `expected..=received-1`
    /// and suspend application dispatch until the gap is filled.
    Gap { expected: u64, received: u64 },
    /// Number was behind the expectation: a duplicate. Acknowledge but do
    /// not reprocess.
    Duplicate { expected: u64, received: u64 },
}

/// Outbound and inbound counters for one logical session.
///
/// Both start at 1 and advance by exactly one per message in the steady
/// state. A fresh logon (with ResetSeqNumFlag) resets both to 1.
#[derive(Debug)]
pub struct SequenceTracker {
    /// Next number to stamp on an outbound message.
    next_outbound: AtomicU64,
    /// Number we expect on the next inbound message.
    next_inbound: AtomicU64,
}

impl SequenceTracker {
    /// New tracker with both directions at 1.
    pub fn new() -> Self {
        Self {
            next_outbound: AtomicU64::new(1),
            next_inbound: AtomicU64::new(1),
        }
    }

    /// Allocate the next outbound sequence number.
    #[inline]
    pub fn next_outbound(&self) -> u64 {
        self.next_outbound.fetch_add(1, Ordering::SeqCst)
    }

    /// Peek the next outbound number without allocating it.
    #[inline]
    pub fn peek_outbound(&self) -> u64 {
        self.next_outbound.load(Ordering::SeqCst)
    }

    /// Number expected on the next inbound message.
    #[inline]
    pub fn expected_inbound(&self) -> u64 {
        self.next_inbound.load(Ordering::SeqCst)
    }

    /// Compare an inbound sequence number against the expectation.
    /// Advances the expectation only on an exact match.
    pub fn observe(&self, received: u64) -> SequenceCheck {
        let expected = self.next_inbound.load(Ordering::SeqCst);
        if received == expected {
            self.next_inbound.store(expected + 1, Ordering::SeqCst);
            SequenceCheck::Accept(received)
        } else if received > expected {
            SequenceCheck::Gap { expected, received }
        } else {
            SequenceCheck::Duplicate { expected, received }
        }
    }

    /// Jump the inbound expectation forward, as directed by a
    /// SequenceReset/GapFill. Backward jumps are ignored.
    pub fn advance_inbound_to(&self, new_seq: u64) {
        let current = self.next_inbound.load(Ordering::SeqCst);
        if new_seq > current {
            self.next_inbound.store(new_seq, Ordering::SeqCst);
        }
    }

    /// Reset both directions to 1 (fresh logical session).
    pub fn reset(&self) {
        self.next_outbound.store(1, Ordering::SeqCst);
        self.next_inbound.store(1, Ordering::SeqCst);
    }
}

impl Default for SequenceTracker {
    fn default() -> Self {
        Self::new()
    }
}
