//! Engine facade
//!
//! The one public entry point: owns the venue session tasks, the shared
//! order table, the normalizer, and the router. All mutating calls are
//! asynchronous with respect to venue acknowledgment; submission enqueues
//! and returns, completion arrives on the event streams. Calls never
//! block on network I/O.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::codec::message;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::latency::LatencyTracker;
use crate::market_data::{AggregateQuote, Normalizer};
use crate::orders::{OrderId, OrderRecord, OrderState, OrderTable, Side};
use crate::resilience::ReconnectStats;
use crate::router::{RouteCandidate, Router};
use crate::session::venue::{self, SessionContext, SessionEvents, VenueHandle};
use crate::session::{SessionState, VenueStatusUpdate};

/// Capacity of each caller-facing event stream.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// How often stale pending orders are swept.
const ACK_SWEEP_INTERVAL: Duration = Duration::from_millis(500);

/// Caller-facing notification streams. Each stream is ordered within
/// itself; no ordering holds across streams.
#[derive(Debug)]
pub struct EngineStreams {
    /// Order record snapshots after every applied execution report,
    /// ack-timeout flag, or venue-unavailable flag.
    pub executions: mpsc::Receiver<OrderRecord>,
    /// Aggregate quote changes for subscribed symbols.
    pub market_data: mpsc::Receiver<AggregateQuote>,
    /// Session state transitions for every venue.
    pub status: mpsc::Receiver<VenueStatusUpdate>,
}

/// Point-in-time engine counters.
#[derive(Debug, Clone)]
pub struct EngineStats {
    pub orders_submitted: u64,
    pub cancels_requested: u64,
    pub orders_tracked: usize,
    pub orders_terminal: usize,
    pub venues: Vec<VenueStats>,
}

/// Per-venue slice of [`EngineStats`].
#[derive(Debug, Clone)]
pub struct VenueStats {
    pub venue: String,
    pub state: SessionState,
    pub healthy: bool,
    pub avg_latency_ns: Option<u64>,
    pub reconnects: ReconnectStats,
}

/// Multi-venue FIX execution engine.
#[derive(Debug)]
pub struct FixEngine {
    config: EngineConfig,
    orders: Arc<OrderTable>,
    normalizer: Arc<Normalizer>,
    latency: Arc<LatencyTracker>,
    router: Router,
    venues: Vec<VenueHandle>,
    md_req_counter: AtomicU64,
    cancel_counter: AtomicU64,
    orders_submitted: AtomicU64,
    cancels_requested: AtomicU64,
    sweeper: tokio::task::JoinHandle<()>,
}

impl FixEngine {
    /// Connect all configured venues and return the engine plus its
    /// event streams. Fails only when the config is invalid or zero
    /// venues can establish a session; a subset connecting is success
    /// with reduced capacity.
    pub async fn initialize(config: EngineConfig) -> Result<(Self, EngineStreams)> {
        config.validate().map_err(EngineError::InvalidConfig)?;

        let orders = Arc::new(OrderTable::new());
        let normalizer = Arc::new(Normalizer::new());
        let latency = Arc::new(LatencyTracker::new(config.enable_latency_monitoring));

        let (exec_tx, exec_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (md_tx, md_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (status_tx, status_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let events = SessionEvents {
            executions: exec_tx.clone(),
            market_data: md_tx,
            status: status_tx,
        };

        let mut venues = Vec::with_capacity(config.venues.len());
        for venue_config in &config.venues {
            venues.push(venue::spawn(SessionContext {
                engine: config.clone(),
                venue: venue_config.clone(),
                orders: orders.clone(),
                normalizer: normalizer.clone(),
                latency: latency.clone(),
                events: events.clone(),
            }));
        }

        wait_for_first_connection(&venues).await?;

        let sweeper = tokio::spawn(ack_sweep(orders.clone(), exec_tx, config.ack_timeout()));

        let engine = Self {
            router: Router::new(latency.clone()),
            config,
            orders,
            normalizer,
            latency,
            venues,
            md_req_counter: AtomicU64::new(1),
            cancel_counter: AtomicU64::new(1),
            orders_submitted: AtomicU64::new(0),
            cancels_requested: AtomicU64::new(0),
            sweeper,
        };
        let streams = EngineStreams {
            executions: exec_rx,
            market_data: md_rx,
            status: status_rx,
        };
        Ok((engine, streams))
    }

    /// Route and queue a new limit order. Returns the order id once the
    /// message is queued to its venue session, before any venue ack.
    pub async fn submit_order(
        &self,
        symbol: &str,
        side: Side,
        quantity: Decimal,
        price: Decimal,
    ) -> Result<OrderId> {
        let candidates = self.route_candidates();
        let venue_name = self.router.select(&candidates)?.venue.clone();
        let handle = self.handle_for(&venue_name)?;

        let id = self.orders.next_id();
        self.orders.insert(OrderRecord::new(
            id,
            symbol,
            side,
            quantity,
            price,
            venue_name.clone(),
        ));

        let msg = message::new_order_single(
            &id.cl_ord_id(),
            symbol,
            side.fix_value(),
            quantity,
            price,
        );
        self.orders.transition(id, OrderState::PendingNew)?;
        if let Err(e) = handle.send(msg).await {
            // Never reached the session queue, so it was never sent
            warn!(order_id = %id, venue = %venue_name, error = %e, "order enqueue failed");
            let _ = self.orders.update(id, |rec| {
                rec.reject_reason = Some(format!("enqueue failed: {e}"));
                crate::orders::lifecycle::transition(rec, OrderState::Rejected)
            });
            return Err(e);
        }
        self.orders_submitted.fetch_add(1, Ordering::Relaxed);
        info!(order_id = %id, %symbol, %side, %quantity, %price, venue = %venue_name, "order submitted");
        Ok(id)
    }

    /// Request cancellation of a live order. The cancel goes to the
    /// venue that owns the order, never anywhere else.
    pub async fn cancel_order(&self, id: OrderId) -> Result<()> {
        let record = self.orders.get(id).ok_or(EngineError::UnknownOrder(id))?;
        if !record.state.is_cancelable() {
            return Err(EngineError::NotCancelable {
                order_id: id,
                state: record.state,
            });
        }
        let handle = self.handle_for(&record.venue)?;

        self.orders.transition(id, OrderState::PendingCancel)?;
        let cancel_id = format!(
            "CXL-{}-{}",
            id.0,
            self.cancel_counter.fetch_add(1, Ordering::Relaxed)
        );
        let msg = message::order_cancel_request(
            &cancel_id,
            &id.cl_ord_id(),
            &record.symbol,
            record.side.fix_value(),
        );
        handle.send(msg).await?;
        self.cancels_requested.fetch_add(1, Ordering::Relaxed);
        info!(order_id = %id, venue = %record.venue, "cancel requested");
        Ok(())
    }

    /// Modify an order as cancel-then-resubmit. Returns the replacement
    /// order's id; the original moves to Canceled (or stays live if the
    /// venue rejects the cancel).
    pub async fn modify_order(
        &self,
        id: OrderId,
        quantity: Decimal,
        price: Decimal,
    ) -> Result<OrderId> {
        let record = self.orders.get(id).ok_or(EngineError::UnknownOrder(id))?;
        self.cancel_order(id).await?;
        self.submit_order(&record.symbol, record.side, quantity, price)
            .await
    }

    /// Subscribe to top-of-book and trades for a symbol on every active
    /// venue.
    pub async fn subscribe_market_data(&self, symbol: &str) -> Result<()> {
        self.normalizer.subscribe(symbol);
        self.broadcast_md_request(symbol, true).await
    }

    /// Drop a market data subscription and its cached data.
    pub async fn unsubscribe_market_data(&self, symbol: &str) -> Result<()> {
        self.normalizer.unsubscribe(symbol);
        self.broadcast_md_request(symbol, false).await
    }

    async fn broadcast_md_request(&self, symbol: &str, subscribe: bool) -> Result<()> {
        let mut sent = 0;
        for handle in &self.venues {
            if handle.state() != SessionState::Active {
                continue;
            }
            let req_id = format!("MD-{}", self.md_req_counter.fetch_add(1, Ordering::Relaxed));
            let msg = message::market_data_request(&req_id, symbol, subscribe);
            if handle.send(msg).await.is_ok() {
                sent += 1;
            }
        }
        if sent == 0 && subscribe {
            return Err(EngineError::NoEligibleVenue);
        }
        Ok(())
    }

    /// Point-in-time status of every venue.
    pub fn venue_statuses(&self) -> Vec<VenueStatusUpdate> {
        self.venues
            .iter()
            .map(|h| {
                VenueStatusUpdate::now(
                    h.venue(),
                    h.state(),
                    self.latency.rolling_avg_ns(h.venue()),
                )
            })
            .collect()
    }

    /// Counters snapshot.
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            orders_submitted: self.orders_submitted.load(Ordering::Relaxed),
            cancels_requested: self.cancels_requested.load(Ordering::Relaxed),
            orders_tracked: self.orders.len(),
            orders_terminal: self.orders.terminal_count(),
            venues: self
                .venues
                .iter()
                .map(|h| VenueStats {
                    venue: h.venue().to_string(),
                    state: h.state(),
                    healthy: h.is_healthy(),
                    avg_latency_ns: self.latency.rolling_avg_ns(h.venue()),
                    reconnects: h.reconnect_stats(),
                })
                .collect(),
        }
    }

    /// Snapshot of one order.
    pub fn order(&self, id: OrderId) -> Option<OrderRecord> {
        self.orders.get(id)
    }

    /// The configuration this engine was initialized with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Log out of every venue and stop all tasks. Resources are released
    /// before this returns.
    pub async fn close(self) {
        info!("engine shutting down");
        self.sweeper.abort();
        for handle in self.venues {
            handle.shutdown().await;
        }
        info!("engine shut down");
    }

    fn route_candidates(&self) -> Vec<RouteCandidate> {
        self.venues
            .iter()
            .map(|h| RouteCandidate {
                venue: h.venue().to_string(),
                priority: h.priority() as u32,
                healthy: h.state() == SessionState::Active && h.is_healthy(),
            })
            .collect()
    }

    fn handle_for(&self, venue: &str) -> Result<&VenueHandle> {
        let handle = self
            .venues
            .iter()
            .find(|h| h.venue() == venue)
            .ok_or_else(|| EngineError::VenueUnavailable(venue.to_string()))?;
        if handle.state().is_terminal() {
            return Err(EngineError::VenueUnavailable(venue.to_string()));
        }
        Ok(handle)
    }
}

/// Block until at least one venue is Active, or every venue has failed
/// permanently.
async fn wait_for_first_connection(venues: &[VenueHandle]) -> Result<()> {
    loop {
        if venues.iter().any(|h| h.state() == SessionState::Active) {
            return Ok(());
        }
        if venues.iter().all(|h| h.state().is_terminal()) {
            return Err(EngineError::NoVenueConnected);
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}

/// Periodic sweep flagging orders whose venue ack never arrived.
async fn ack_sweep(
    orders: Arc<OrderTable>,
    executions: mpsc::Sender<OrderRecord>,
    timeout: Duration,
) {
    let mut ticker = tokio::time::interval(ACK_SWEEP_INTERVAL);
    loop {
        ticker.tick().await;
        for record in orders.sweep_ack_timeouts(timeout) {
            if executions.send(record).await.is_err() {
                return;
            }
        }
    }
}
