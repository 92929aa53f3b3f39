//! FIX session layer: sequencing, heartbeats, transport, and the
//! per-venue session task

pub mod heartbeat;
pub mod sequence;
pub mod state;
pub mod transport;
pub mod venue;

pub use heartbeat::HeartbeatMonitor;
pub use sequence::{SequenceCheck, SequenceTracker};
pub use state::{SessionState, StatusHistory, VenueStatusUpdate};
pub use transport::FrameBuffer;
pub use venue::{SessionCommand, SessionContext, SessionEvents, VenueHandle};
