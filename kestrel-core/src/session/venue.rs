//! Per-venue session task
//!
//! One tokio task owns each venue connection end to end: it is the only
//! writer of that session's socket, sequence counters, and connection
//! state. Outbound messages arrive over a FIFO command channel and are
//! written one at a time, so wire order matches submission order. Every
//! inbound message passes through the sequence tracker before dispatch;
//! a gap suspends application dispatch until resolved by resend or
//! SequenceReset.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::codec::fields::{msg_type, tags};
use crate::codec::{decode, encode, message, FixMessage};
use crate::config::{EngineConfig, VenueConfig};
use crate::error::{EngineError, Result};
use crate::latency::LatencyTracker;
use crate::market_data::{AggregateQuote, MarketDataSnapshot, Normalizer};
use crate::orders::{ExecutionReport, OrderId, OrderRecord, OrderTable};
use crate::resilience::{backoff_config, ReconnectStats, ReconnectSupervisor, SessionEnd, Verdict};

use super::heartbeat::HeartbeatMonitor;
use super::sequence::{SequenceCheck, SequenceTracker};
use super::state::{SessionState, StatusHistory, VenueStatusUpdate};
use super::transport::{self, FrameBuffer};

/// Application messages buffered while a sequence gap is outstanding.
/// Overflow tears the connection down rather than growing unboundedly.
const GAP_BUFFER_LIMIT: usize = 1024;

/// Read buffer size for the session socket.
const READ_BUF_SIZE: usize = 16 * 1024;

/// Commands the engine sends to a session task.
#[derive(Debug)]
pub enum SessionCommand {
    /// Queue an application message for transmission.
    Send(FixMessage),
    /// Log out and stop. No reconnection follows.
    Close,
}

/// Outbound event channels shared by all session tasks.
#[derive(Debug, Clone)]
pub struct SessionEvents {
    /// Updated order records after each applied execution report.
    pub executions: mpsc::Sender<OrderRecord>,
    /// Aggregate quotes that changed.
    pub market_data: mpsc::Sender<AggregateQuote>,
    /// Every session state transition.
    pub status: mpsc::Sender<VenueStatusUpdate>,
}

/// Everything a session task needs, supplied by the engine at spawn.
#[derive(Debug)]
pub struct SessionContext {
    pub engine: EngineConfig,
    pub venue: VenueConfig,
    pub orders: Arc<OrderTable>,
    pub normalizer: Arc<Normalizer>,
    pub latency: Arc<LatencyTracker>,
    pub events: SessionEvents,
}

/// Engine-side handle to a running session task.
#[derive(Debug)]
pub struct VenueHandle {
    venue: String,
    priority: u8,
    commands: mpsc::Sender<SessionCommand>,
    state: Arc<RwLock<SessionState>>,
    history: Arc<Mutex<StatusHistory>>,
    stats: Arc<Mutex<ReconnectStats>>,
    task: tokio::task::JoinHandle<()>,
}

impl VenueHandle {
    pub fn venue(&self) -> &str {
        &self.venue
    }

    pub fn priority(&self) -> u8 {
        self.priority
    }

    /// Current connection state.
    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    /// Healthy means the latest status observation shows Active.
    pub fn is_healthy(&self) -> bool {
        self.history.lock().is_healthy()
    }

    pub fn reconnect_stats(&self) -> ReconnectStats {
        *self.stats.lock()
    }

    /// Queue an application message for this venue, FIFO.
    pub async fn send(&self, msg: FixMessage) -> Result<()> {
        if self.state().is_terminal() {
            return Err(EngineError::VenueUnavailable(self.venue.clone()));
        }
        self.commands
            .send(SessionCommand::Send(msg))
            .await
            .map_err(|_| EngineError::Closed)
    }

    /// Log out, stop the task, and wait for it to finish.
    pub async fn shutdown(self) {
        let _ = self.commands.send(SessionCommand::Close).await;
        let _ = self.task.await;
    }
}

/// Spawn the session task for one venue.
pub fn spawn(ctx: SessionContext) -> VenueHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel(256);
    let state = Arc::new(RwLock::new(SessionState::Disconnected));
    let history = Arc::new(Mutex::new(StatusHistory::new()));
    let stats = Arc::new(Mutex::new(ReconnectStats::default()));
    let venue = ctx.venue.venue.clone();
    let priority = ctx.venue.priority;

    let session = Session {
        ctx,
        state: state.clone(),
        history: history.clone(),
        sequences: SequenceTracker::new(),
        md_req_counter: AtomicU64::new(1),
    };
    let task = tokio::spawn(run(session, cmd_rx, stats.clone()));

    VenueHandle {
        venue,
        priority,
        commands: cmd_tx,
        state,
        history,
        stats,
        task,
    }
}

struct Session {
    ctx: SessionContext,
    state: Arc<RwLock<SessionState>>,
    history: Arc<Mutex<StatusHistory>>,
    sequences: SequenceTracker,
    md_req_counter: AtomicU64,
}

/// Task body: connection attempts under reconnect supervision.
async fn run(session: Session, mut commands: mpsc::Receiver<SessionCommand>, stats: Arc<Mutex<ReconnectStats>>) {
    let venue = session.ctx.venue.venue.clone();
    let mut supervisor = ReconnectSupervisor::new(&venue, backoff_config(&session.ctx.engine));
    loop {
        let end = session.run_connection(&mut commands).await;
        let verdict = supervisor.on_attempt_end(end).await;
        *stats.lock() = supervisor.stats();
        match verdict {
            Verdict::Retry => continue,
            Verdict::Stop => break,
            Verdict::GiveUp => {
                session.set_state(SessionState::FailedPermanently).await;
                // Orders stranded on this venue are flagged, not dropped
                let flagged = session.ctx.orders.mark_venue_unavailable(&venue);
                if !flagged.is_empty() {
                    warn!(venue = %venue, orders = flagged.len(), "flagging stranded orders");
                }
                for record in flagged {
                    let _ = session.ctx.events.executions.send(record).await;
                }
                break;
            }
        }
    }
}

impl Session {
    fn venue_name(&self) -> &str {
        &self.ctx.venue.venue
    }

    /// Publish a state transition: update the snapshot, the bounded
    /// history, and the caller-facing status stream.
    async fn set_state(&self, next: SessionState) {
        let current = *self.state.read();
        if current == next {
            return;
        }
        if !current.can_transition_to(next) {
            warn!(venue = %self.venue_name(), %current, %next, "illegal session transition");
            return;
        }
        *self.state.write() = next;
        info!(venue = %self.venue_name(), %next, "session state");
        let update = VenueStatusUpdate::now(
            self.venue_name(),
            next,
            self.ctx.latency.rolling_avg_ns(self.venue_name()),
        );
        self.history.lock().push(update.clone());
        let _ = self.ctx.events.status.send(update).await;
    }

    /// One connection attempt, from TCP connect to disconnect.
    async fn run_connection(
        &self,
        commands: &mut mpsc::Receiver<SessionCommand>,
    ) -> std::result::Result<SessionEnd, EngineError> {
        let result = self.connection_body(commands).await;
        match &result {
            Ok(SessionEnd::Closed) => self.set_state(SessionState::Disconnected).await,
            Ok(SessionEnd::Lost { .. }) | Err(_) => self.set_state(SessionState::Recovering).await,
        }
        result
    }

    async fn connection_body(
        &self,
        commands: &mut mpsc::Receiver<SessionCommand>,
    ) -> std::result::Result<SessionEnd, EngineError> {
        self.set_state(SessionState::Connecting).await;
        let stream = transport::connect(&self.ctx.engine, &self.ctx.venue).await?;
        let (mut reader, mut writer) = tokio::io::split(stream);

        // Fresh logical session: both sides restart at 1 (141=Y)
        self.sequences.reset();
        self.ctx.latency.clear(self.venue_name());

        let interval = self.ctx.engine.heartbeat_interval();
        let mut hb = HeartbeatMonitor::new(interval);
        let mut frames = FrameBuffer::new();
        let mut read_buf = vec![0u8; READ_BUF_SIZE];

        self.logon(&mut reader, &mut writer, &mut hb, &mut frames, &mut read_buf)
            .await?;
        self.set_state(SessionState::Active).await;

        // The venue forgot our subscriptions with the sequence reset;
        // re-request market data for every subscribed symbol
        for symbol in self.ctx.normalizer.subscriptions() {
            let req_id = format!(
                "MD-{}-{}",
                self.venue_name(),
                self.md_req_counter.fetch_add(1, Ordering::Relaxed)
            );
            let request = message::market_data_request(&req_id, &symbol, true);
            self.transmit(&mut writer, &mut hb, request).await?;
        }

        // Runtime state for the steady loop
        let mut pending_test: Option<(String, Instant)> = None;
        let mut inflight: HashMap<OrderId, Instant> = HashMap::new();
        let mut gap_buffer: BTreeMap<u64, FixMessage> = BTreeMap::new();
        let mut resend_outstanding = false;

        let mut ticker = tokio::time::interval(Duration::from_millis(250));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                cmd = commands.recv() => {
                    match cmd {
                        Some(SessionCommand::Send(msg)) => {
                            // Stamp the submit time so the first execution
                            // report yields a round-trip sample
                            if msg.msg_type == msg_type::NEW_ORDER_SINGLE {
                                if let Some(id) =
                                    msg.get(tags::CL_ORD_ID).and_then(OrderId::from_cl_ord_id)
                                {
                                    inflight.insert(id, Instant::now());
                                }
                            }
                            self.transmit(&mut writer, &mut hb, msg).await?;
                        }
                        Some(SessionCommand::Close) | None => {
                            let _ = self
                                .transmit(&mut writer, &mut hb, message::logout(None))
                                .await;
                            return Ok(SessionEnd::Closed);
                        }
                    }
                }
                read = reader.read(&mut read_buf) => {
                    let n = read.map_err(|e| self.transport_err(format!("read: {e}")))?;
                    if n == 0 {
                        return Ok(SessionEnd::Lost { was_active: true });
                    }
                    frames.extend(&read_buf[..n]);
                    while let Some(frame) = frames.next_frame() {
                        let msg = match decode(&frame) {
                            Ok(msg) => msg,
                            Err(e) => {
                                warn!(venue = %self.venue_name(), error = %e, "dropping malformed frame");
                                continue;
                            }
                        };
                        let end = self
                            .handle_inbound(
                                &mut writer,
                                &mut hb,
                                &mut pending_test,
                                &mut inflight,
                                &mut gap_buffer,
                                &mut resend_outstanding,
                                msg,
                            )
                            .await?;
                        if let Some(end) = end {
                            return Ok(end);
                        }
                    }
                }
                _ = ticker.tick() => {
                    if hb.peer_timed_out() {
                        warn!(venue = %self.venue_name(), idle = ?hb.inbound_idle(), "peer silent, dropping connection");
                        return Ok(SessionEnd::Lost { was_active: true });
                    }
                    if hb.heartbeat_due() {
                        self.transmit(&mut writer, &mut hb, message::heartbeat(None)).await?;
                    }
                    if hb.test_request_due() {
                        let id = hb.next_test_req_id();
                        pending_test = Some((id.clone(), Instant::now()));
                        self.transmit(&mut writer, &mut hb, message::test_request(&id)).await?;
                    }
                }
            }
        }
    }

    /// Send Logon and wait for the venue's Logon reply, validating the
    /// CompIDs. One heartbeat interval is the deadline.
    async fn logon<R, W>(
        &self,
        reader: &mut R,
        writer: &mut W,
        hb: &mut HeartbeatMonitor,
        frames: &mut FrameBuffer,
        read_buf: &mut [u8],
    ) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let started = Instant::now();
        let logon = message::logon(
            self.ctx.engine.heartbeat_interval_secs,
            self.ctx.venue.username.as_deref(),
            self.ctx.venue.password.as_deref(),
        );
        self.transmit(writer, hb, logon).await?;
        self.set_state(SessionState::LogonSent).await;

        let deadline = self.ctx.engine.heartbeat_interval();
        let reply = tokio::time::timeout(deadline, async {
            loop {
                let n = reader
                    .read(read_buf)
                    .await
                    .map_err(|e| self.transport_err(format!("read: {e}")))?;
                if n == 0 {
                    return Err(self.transport_err("closed during logon".to_string()));
                }
                frames.extend(&read_buf[..n]);
                while let Some(frame) = frames.next_frame() {
                    let msg = decode(&frame).map_err(EngineError::Protocol)?;
                    match msg.msg_type.as_str() {
                        msg_type::LOGON => return Ok(msg),
                        msg_type::LOGOUT => {
                            return Err(self.transport_err("logon rejected".to_string()))
                        }
                        other => {
                            debug!(venue = %self.venue_name(), msg_type = other, "ignoring pre-logon message");
                        }
                    }
                }
            }
        })
        .await
        .map_err(|_| self.transport_err("logon timed out".to_string()))??;

        let sender_ok = reply.get(tags::SENDER_COMP_ID)
            == Some(self.ctx.venue.target_comp_id.as_str());
        let target_ok =
            reply.get(tags::TARGET_COMP_ID) == Some(self.ctx.engine.sender_comp_id.as_str());
        if !sender_ok || !target_ok {
            return Err(self.transport_err("logon CompID mismatch".to_string()));
        }
        if let Some(seq) = reply.seq_num() {
            self.sequences.observe(seq);
        }
        hb.on_message_received(None);
        self.ctx.latency.record(self.venue_name(), started.elapsed());
        info!(venue = %self.venue_name(), "logon complete");
        Ok(())
    }

    /// Sequence-check one inbound message, then dispatch or buffer it.
    #[allow(clippy::too_many_arguments)]
    async fn handle_inbound<W: AsyncWrite + Unpin>(
        &self,
        writer: &mut W,
        hb: &mut HeartbeatMonitor,
        pending_test: &mut Option<(String, Instant)>,
        inflight: &mut HashMap<OrderId, Instant>,
        gap_buffer: &mut BTreeMap<u64, FixMessage>,
        resend_outstanding: &mut bool,
        msg: FixMessage,
    ) -> Result<Option<SessionEnd>> {
        let test_req_id = if msg.msg_type == msg_type::HEARTBEAT {
            msg.get(tags::TEST_REQ_ID).map(str::to_string)
        } else {
            None
        };
        hb.on_message_received(test_req_id.as_deref());

        // A Heartbeat answering our TestRequest carries a latency sample
        if let Some((id, sent_at)) = pending_test.as_ref() {
            if test_req_id.as_deref() == Some(id.as_str()) {
                self.ctx.latency.record(self.venue_name(), sent_at.elapsed());
                *pending_test = None;
            }
        }

        let Some(seq) = msg.seq_num() else {
            warn!(venue = %self.venue_name(), msg_type = %msg.msg_type, "dropping message without MsgSeqNum");
            return Ok(None);
        };

        // SequenceReset jumps the expectation regardless of its own number
        if msg.msg_type == msg_type::SEQUENCE_RESET {
            let Some(new_seq) = msg.get_parsed::<u64>(tags::NEW_SEQ_NO) else {
                warn!(venue = %self.venue_name(), "SequenceReset without NewSeqNo");
                return Ok(None);
            };
            info!(venue = %self.venue_name(), new_seq, "sequence reset");
            self.sequences.advance_inbound_to(new_seq);
            gap_buffer.retain(|s, _| *s >= new_seq);
            let end = self.drain_gap_buffer(writer, hb, inflight, gap_buffer).await?;
            if gap_buffer.is_empty() {
                *resend_outstanding = false;
            }
            return Ok(end);
        }

        match self.sequences.observe(seq) {
            SequenceCheck::Duplicate { expected, received } => {
                debug!(venue = %self.venue_name(), expected, received, "dropping duplicate");
                Ok(None)
            }
            SequenceCheck::Gap { expected, received } => {
                if !*resend_outstanding {
                    warn!(venue = %self.venue_name(), expected, received, "sequence gap, requesting resend");
                    self.transmit(writer, hb, message::resend_request(expected, received - 1))
                        .await?;
                    *resend_outstanding = true;
                }
                if msg.is_admin() {
                    // Session liveness must survive the gap
                    return self.dispatch(writer, hb, inflight, msg).await;
                }
                if gap_buffer.len() >= GAP_BUFFER_LIMIT {
                    return Err(self.transport_err("gap buffer overflow".to_string()));
                }
                gap_buffer.insert(seq, msg);
                Ok(None)
            }
            SequenceCheck::Accept(_) => {
                if let Some(end) = self.dispatch(writer, hb, inflight, msg).await? {
                    return Ok(Some(end));
                }
                let end = self.drain_gap_buffer(writer, hb, inflight, gap_buffer).await?;
                if gap_buffer.is_empty() {
                    *resend_outstanding = false;
                }
                Ok(end)
            }
        }
    }

    /// Dispatch buffered post-gap messages that are now in order.
    async fn drain_gap_buffer<W: AsyncWrite + Unpin>(
        &self,
        writer: &mut W,
        hb: &mut HeartbeatMonitor,
        inflight: &mut HashMap<OrderId, Instant>,
        gap_buffer: &mut BTreeMap<u64, FixMessage>,
    ) -> Result<Option<SessionEnd>> {
        loop {
            let next = self.sequences.expected_inbound();
            let Some(msg) = gap_buffer.remove(&next) else {
                return Ok(None);
            };
            self.sequences.observe(next);
            if let Some(end) = self.dispatch(writer, hb, inflight, msg).await? {
                return Ok(Some(end));
            }
        }
    }

    /// Act on one sequence-accepted message.
    async fn dispatch<W: AsyncWrite + Unpin>(
        &self,
        writer: &mut W,
        hb: &mut HeartbeatMonitor,
        inflight: &mut HashMap<OrderId, Instant>,
        msg: FixMessage,
    ) -> Result<Option<SessionEnd>> {
        match msg.msg_type.as_str() {
            msg_type::HEARTBEAT => Ok(None),
            msg_type::TEST_REQUEST => {
                let reply = message::heartbeat(msg.get(tags::TEST_REQ_ID));
                self.transmit(writer, hb, reply).await?;
                Ok(None)
            }
            msg_type::RESEND_REQUEST => {
                // We never replay application messages: a gap-fill moves
                // the peer past everything we sent
                let reply = message::sequence_reset_gap_fill(self.sequences.peek_outbound());
                self.transmit(writer, hb, reply).await?;
                Ok(None)
            }
            msg_type::LOGOUT => {
                info!(venue = %self.venue_name(), "peer logout");
                let _ = self.transmit(writer, hb, message::logout(None)).await;
                Ok(Some(SessionEnd::Lost { was_active: true }))
            }
            msg_type::REJECT => {
                warn!(
                    venue = %self.venue_name(),
                    ref_seq = ?msg.get(tags::REF_SEQ_NUM),
                    text = ?msg.get(tags::TEXT),
                    "session-level reject"
                );
                Ok(None)
            }
            msg_type::EXECUTION_REPORT => {
                self.on_execution_report(inflight, &msg).await;
                Ok(None)
            }
            msg_type::ORDER_CANCEL_REJECT => {
                self.on_cancel_reject(&msg).await;
                Ok(None)
            }
            msg_type::MARKET_DATA_SNAPSHOT | msg_type::MARKET_DATA_INCREMENTAL => {
                self.on_market_data(&msg).await;
                Ok(None)
            }
            other => {
                debug!(venue = %self.venue_name(), msg_type = other, "unhandled message type");
                Ok(None)
            }
        }
    }

    async fn on_execution_report(&self, inflight: &mut HashMap<OrderId, Instant>, msg: &FixMessage) {
        let Some(exec) = ExecutionReport::from_fix(msg, self.venue_name()) else {
            warn!(venue = %self.venue_name(), "unparseable execution report");
            return;
        };
        if let Some(sent_at) = inflight.remove(&exec.order_id) {
            self.ctx.latency.record(self.venue_name(), sent_at.elapsed());
        }
        match self.ctx.orders.apply_execution(&exec) {
            Ok(record) => {
                trace!(venue = %self.venue_name(), order_id = %record.id, state = ?record.state, "execution applied");
                let _ = self.ctx.events.executions.send(record).await;
            }
            Err(e) => {
                warn!(venue = %self.venue_name(), order_id = %exec.order_id, error = %e, "execution report not applied");
            }
        }
    }

    async fn on_cancel_reject(&self, msg: &FixMessage) {
        let Some(exec) = ExecutionReport::from_cancel_reject(msg, self.venue_name()) else {
            warn!(venue = %self.venue_name(), "unparseable cancel reject");
            return;
        };
        match self.ctx.orders.apply_execution(&exec) {
            Ok(record) => {
                let _ = self.ctx.events.executions.send(record).await;
            }
            Err(e) => {
                warn!(venue = %self.venue_name(), order_id = %exec.order_id, error = %e, "cancel reject not applied");
            }
        }
    }

    async fn on_market_data(&self, msg: &FixMessage) {
        let Some(snapshot) = MarketDataSnapshot::from_fix(msg, self.venue_name()) else {
            debug!(venue = %self.venue_name(), "market data without symbol");
            return;
        };
        if let Some(aggregate) = self.ctx.normalizer.apply(snapshot) {
            let _ = self.ctx.events.market_data.send(aggregate).await;
        }
    }

    /// Stamp, encode, and write one message. The session task is the
    /// only writer, so messages hit the wire in submission order.
    async fn transmit<W: AsyncWrite + Unpin>(
        &self,
        writer: &mut W,
        hb: &mut HeartbeatMonitor,
        mut msg: FixMessage,
    ) -> Result<()> {
        msg.stamp_header(
            self.sequences.next_outbound(),
            &self.ctx.engine.sender_comp_id,
            &self.ctx.venue.target_comp_id,
        );
        let bytes = encode(&msg);
        writer
            .write_all(&bytes)
            .await
            .map_err(|e| self.transport_err(format!("write: {e}")))?;
        hb.on_message_sent();
        trace!(venue = %self.venue_name(), msg_type = %msg.msg_type, seq = ?msg.seq_num(), "sent");
        Ok(())
    }

    fn transport_err(&self, reason: String) -> EngineError {
        EngineError::Transport {
            venue: self.venue_name().to_string(),
            reason,
        }
    }
}
