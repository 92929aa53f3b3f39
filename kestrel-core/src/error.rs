//! Engine error taxonomy
//!
//! Four categories with different handling policies:
//! - Transport: retried automatically by the reconnection supervisor
//! - Protocol: message dropped or session paused, never retried blindly
//! - Business reject: applied to the order record, reported, not retried
//! - Caller error: typed error returned to the caller, never swallowed

use crate::codec::CodecError;
use crate::orders::{OrderId, OrderState};

/// Result alias used throughout the engine.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Top-level engine error.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Connection-level failure: refused, reset, TLS handshake.
    /// Automatically retried per the reconnect policy.
    #[error("transport error on venue {venue}: {reason}")]
    Transport { venue: String, reason: String },

    /// Malformed inbound message (checksum, body length, missing tag).
    /// The session drops the message and continues.
    #[error("protocol error: {0}")]
    Protocol(#[from] CodecError),

    /// Inbound sequence gap; application dispatch is suspended
    /// until the gap is resolved by resend or SequenceReset.
    #[error("sequence gap on venue {venue}: expected {expected}, received {received}")]
    SequenceGap {
        venue: String,
        expected: u64,
        received: u64,
    },

    /// Venue rejected an order or cancel. Not retried automatically.
    #[error("order {order_id} rejected by venue: {reason}")]
    BusinessReject { order_id: OrderId, reason: String },

    /// Attempted an illegal order state transition. This is a
    /// programming or protocol bug and is surfaced, never ignored.
    #[error("invalid transition for order {order_id}: {from:?} -> {to:?}")]
    InvalidTransition {
        order_id: OrderId,
        from: OrderState,
        to: OrderState,
    },

    /// Cancel/modify referenced an order id the engine does not know.
    #[error("unknown order id {0}")]
    UnknownOrder(OrderId),

    /// Order is not in a cancelable state.
    #[error("order {order_id} not cancelable in state {state:?}")]
    NotCancelable { order_id: OrderId, state: OrderState },

    /// No venue is Active and healthy; callers may retry.
    #[error("no eligible venue for routing")]
    NoEligibleVenue,

    /// The venue owning this order is permanently unavailable.
    #[error("venue {0} is permanently unavailable")]
    VenueUnavailable(String),

    /// Engine initialization failed: zero venues could connect.
    #[error("initialization failed: no venue could be connected")]
    NoVenueConnected,

    /// Configuration rejected before any connection was attempted.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The engine (or a session command channel) is already closed.
    #[error("engine is shut down")]
    Closed,
}

impl EngineError {
    /// True for errors the reconnection supervisor retries automatically.
    /// Everything else requires explicit caller handling.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Transport { .. })
    }
}
