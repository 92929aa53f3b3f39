//! Shared order table
//!
//! One table for the whole engine, shared by the facade and every venue
//! session. DashMap's sharded locking gives per-id atomicity: an update
//! holds the entry lock for the whole read-modify-write, so two execution
//! reports for the same order apply in arrival order, never interleaved.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use dashmap::DashMap;
use tracing::warn;

use crate::error::{EngineError, Result};

use super::lifecycle;
use super::types::{ExecutionReport, OrderCondition, OrderId, OrderRecord, OrderState};

/// Engine-wide order store and id allocator.
#[derive(Debug, Default)]
pub struct OrderTable {
    orders: DashMap<OrderId, OrderRecord>,
    next_id: AtomicU64,
}

impl OrderTable {
    pub fn new() -> Self {
        Self {
            orders: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Allocate a fresh order id.
    pub fn next_id(&self) -> OrderId {
        OrderId(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Insert a new record. The id must be unused.
    pub fn insert(&self, record: OrderRecord) {
        self.orders.insert(record.id, record);
    }

    /// Snapshot of one order.
    pub fn get(&self, id: OrderId) -> Option<OrderRecord> {
        self.orders.get(&id).map(|r| r.clone())
    }

    /// Number of tracked orders.
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Mutate one order under its entry lock.
    pub fn update<F>(&self, id: OrderId, f: F) -> Result<OrderRecord>
    where
        F: FnOnce(&mut OrderRecord) -> Result<()>,
    {
        let mut entry = self.orders.get_mut(&id).ok_or(EngineError::UnknownOrder(id))?;
        f(entry.value_mut())?;
        Ok(entry.clone())
    }

    /// Move one order to a new state, validating the transition.
    pub fn transition(&self, id: OrderId, to: OrderState) -> Result<OrderRecord> {
        self.update(id, |rec| lifecycle::transition(rec, to))
    }

    /// Apply an execution report to its order. Unknown ids are an error;
    /// the session logs and continues.
    pub fn apply_execution(&self, exec: &ExecutionReport) -> Result<OrderRecord> {
        self.update(exec.order_id, |rec| {
            // An ack clears a previously flagged ack timeout
            if rec.condition == Some(OrderCondition::AckTimeout) {
                rec.condition = None;
            }
            lifecycle::apply_execution(rec, exec)
        })
    }

    /// Flag orders stuck in `PendingNew` longer than `timeout` with the
    /// ack-timeout condition. State is untouched: the order may still be
    /// live at the venue. Returns the flagged records.
    pub fn sweep_ack_timeouts(&self, timeout: Duration) -> Vec<OrderRecord> {
        let now = SystemTime::now();
        let mut flagged = Vec::new();
        for mut entry in self.orders.iter_mut() {
            let rec = entry.value_mut();
            if rec.state != OrderState::PendingNew || rec.condition.is_some() {
                continue;
            }
            let waited = now.duration_since(rec.updated_at).unwrap_or_default();
            if waited >= timeout {
                warn!(order_id = %rec.id, venue = %rec.venue, "order ack timed out");
                rec.condition = Some(OrderCondition::AckTimeout);
                flagged.push(rec.clone());
            }
        }
        flagged
    }

    /// Flag every non-terminal order on `venue` as venue-unavailable.
    /// Called when a venue reaches its terminal connection state. Returns
    /// the flagged records.
    pub fn mark_venue_unavailable(&self, venue: &str) -> Vec<OrderRecord> {
        let mut flagged = Vec::new();
        for mut entry in self.orders.iter_mut() {
            let rec = entry.value_mut();
            if rec.venue == venue && !rec.state.is_terminal() {
                rec.condition = Some(OrderCondition::VenueUnavailable);
                rec.updated_at = SystemTime::now();
                flagged.push(rec.clone());
            }
        }
        flagged
    }

    /// Count of orders currently in a terminal state.
    pub fn terminal_count(&self) -> usize {
        self.orders.iter().filter(|r| r.state.is_terminal()).count()
    }
}
