//! Kestrel Core - Multi-Venue FIX 4.4 Execution Engine
//!
//! Kestrel connects to multiple trading venues over FIX 4.4, routes orders
//! to the best eligible venue, and normalizes execution reports and market
//! data into a single caller-facing event surface.
//!
//! ## Architecture
//! - **One task per venue session**: each connection's socket, sequence
//!   counters, and state have exactly one writer
//! - **Shared order table** with per-id atomic updates (sharded locking)
//! - **Strict sequencing**: every inbound message passes the sequence
//!   tracker before dispatch; gaps suspend application processing
//! - **Supervised reconnection** with exponential backoff and a bounded
//!   attempt budget per venue
//!
//! ## Core Modules
//! - `codec`: FIX tag=value encoding/decoding with checksum validation
//! - `session`: sequencing, heartbeats, transport framing, venue tasks
//! - `resilience`: backoff and reconnect supervision
//! - `orders`: order state machine and shared order table
//! - `router`: priority + latency venue selection
//! - `market_data`: per-venue snapshots merged into aggregate quotes
//! - `latency`: rolling round-trip windows per venue
//! - `engine`: the public facade

pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod latency;
pub mod market_data;
pub mod orders;
pub mod resilience;
pub mod router;
pub mod session;

pub use config::{EngineConfig, VenueConfig};
pub use engine::{EngineStats, EngineStreams, FixEngine, VenueStats};
pub use error::{EngineError, Result};
pub use market_data::{AggregateQuote, MarketDataSnapshot, PriceLevel};
pub use orders::{OrderCondition, OrderId, OrderRecord, OrderState, Side};
pub use session::{SessionState, VenueStatusUpdate};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::{EngineConfig, VenueConfig};
    pub use crate::engine::{EngineStats, EngineStreams, FixEngine};
    pub use crate::error::{EngineError, Result};
    pub use crate::market_data::{AggregateQuote, PriceLevel};
    pub use crate::orders::{OrderCondition, OrderId, OrderRecord, OrderState, Side};
    pub use crate::session::{SessionState, VenueStatusUpdate};
}
