//! Venue selection for new orders
//!
//! Eligible venues are those currently Active and healthy. Among them the
//! lowest numeric priority wins (1 = most preferred); a priority tie goes
//! to the lower rolling-average latency. Orders are sticky: once routed,
//! every later message for that order id targets the same venue.

use std::sync::Arc;

use tracing::debug;

use crate::error::{EngineError, Result};
use crate::latency::LatencyTracker;

/// One venue as the router sees it.
#[derive(Debug, Clone)]
pub struct RouteCandidate {
    pub venue: String,
    pub priority: u32,
    /// Active session with a healthy recent history.
    pub healthy: bool,
}

/// Stateless venue selector; health and latency are inputs.
#[derive(Debug)]
pub struct Router {
    latency: Arc<LatencyTracker>,
}

impl Router {
    pub fn new(latency: Arc<LatencyTracker>) -> Self {
        Self { latency }
    }

    /// Pick the destination venue for a new order.
    pub fn select<'a>(&self, candidates: &'a [RouteCandidate]) -> Result<&'a RouteCandidate> {
        let chosen = candidates
            .iter()
            .filter(|c| c.healthy)
            .min_by(|a, b| {
                a.priority
                    .cmp(&b.priority)
                    .then_with(|| self.latency_rank(&a.venue).cmp(&self.latency_rank(&b.venue)))
            })
            .ok_or(EngineError::NoEligibleVenue)?;
        debug!(venue = %chosen.venue, priority = chosen.priority, "routed");
        Ok(chosen)
    }

    /// Latency key for tie-breaking. Venues with no samples rank after
    /// venues with any, so a measured venue is preferred over an unknown.
    fn latency_rank(&self, venue: &str) -> u64 {
        self.latency.rolling_avg_ns(venue).unwrap_or(u64::MAX)
    }
}
