//! End-to-end session tests against a scripted FIX venue
//!
//! Each test stands up a local TCP acceptor that speaks just enough FIX
//! to script one scenario: logon handshake, execution report flows, gap
//! recovery, and permanent venue failure.

use std::time::Duration;

use kestrel_core::codec::fields::{exec_type_values, msg_type, tags};
use kestrel_core::codec::{decode, encode, message, FixMessage};
use kestrel_core::session::FrameBuffer;
use kestrel_core::{
    EngineConfig, EngineError, FixEngine, OrderCondition, OrderState, SessionState, Side,
    VenueConfig,
};
use rust_decimal_macros::dec;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

const CLIENT: &str = "KESTREL";
const VENUE: &str = "SIMFIX";

fn config(port: u16) -> EngineConfig {
    EngineConfig {
        sender_comp_id: CLIENT.to_string(),
        venues: vec![VenueConfig::new("SIM", "127.0.0.1", port, VENUE)],
        heartbeat_interval_secs: 30,
        reconnect_attempts: 1,
        reconnect_delay_secs: 0,
        ack_timeout_ms: 10_000,
        enable_latency_monitoring: true,
        enable_performance_optimizations: false,
    }
}

/// Scripted counterparty for one connection.
struct MockVenue {
    stream: TcpStream,
    frames: FrameBuffer,
    buf: Vec<u8>,
    out_seq: u64,
}

impl MockVenue {
    async fn accept(listener: &TcpListener) -> Self {
        let (stream, _) = listener.accept().await.unwrap();
        Self {
            stream,
            frames: FrameBuffer::new(),
            buf: vec![0u8; 8192],
            out_seq: 1,
        }
    }

    async fn read_msg(&mut self) -> FixMessage {
        loop {
            if let Some(frame) = self.frames.next_frame() {
                return decode(&frame).unwrap();
            }
            let n = self.stream.read(&mut self.buf).await.unwrap();
            assert!(n > 0, "engine closed the connection unexpectedly");
            self.frames.extend(&self.buf[..n]);
        }
    }

    async fn read_until(&mut self, wanted: &str) -> FixMessage {
        loop {
            let msg = self.read_msg().await;
            if msg.msg_type == wanted {
                return msg;
            }
        }
    }

    async fn send(&mut self, msg: FixMessage) {
        let seq = self.out_seq;
        self.out_seq += 1;
        self.send_with_seq(seq, msg).await;
    }

    async fn send_with_seq(&mut self, seq: u64, mut msg: FixMessage) {
        msg.stamp_header(seq, VENUE, CLIENT);
        self.stream.write_all(&encode(&msg)).await.unwrap();
    }

    async fn complete_logon(&mut self) {
        let logon = self.read_msg().await;
        assert_eq!(logon.msg_type, msg_type::LOGON);
        assert_eq!(logon.get(tags::SENDER_COMP_ID), Some(CLIENT));
        assert_eq!(logon.get(tags::TARGET_COMP_ID), Some(VENUE));
        assert_eq!(logon.get(tags::RESET_SEQ_NUM_FLAG), Some("Y"));
        self.send(message::logon(30, None, None)).await;
    }
}

fn exec_report(cl_ord_id: &str, exec_type: &str) -> FixMessage {
    FixMessage::new(msg_type::EXECUTION_REPORT)
        .with(tags::CL_ORD_ID, cl_ord_id)
        .with(tags::EXEC_TYPE, exec_type)
}

fn fill_report(cl_ord_id: &str, qty: &str, px: &str, cum: &str) -> FixMessage {
    exec_report(cl_ord_id, exec_type_values::TRADE)
        .with(tags::LAST_QTY, qty)
        .with(tags::LAST_PX, px)
        .with(tags::CUM_QTY, cum)
}

#[tokio::test]
async fn engine_connects_logs_on_and_closes_cleanly() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let venue_task = tokio::spawn(async move {
        let mut venue = MockVenue::accept(&listener).await;
        venue.complete_logon().await;
        // Wait for the engine's clean logout
        venue.read_until(msg_type::LOGOUT).await;
    });

    let (engine, mut streams) = FixEngine::initialize(config(port)).await.unwrap();

    let mut saw_active = false;
    while let Ok(Some(update)) = timeout(Duration::from_secs(2), streams.status.recv()).await {
        if update.state == SessionState::Active {
            saw_active = true;
            break;
        }
    }
    assert!(saw_active, "status stream never reported Active");

    let statuses = engine.venue_statuses();
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0].state, SessionState::Active);

    engine.close().await;
    timeout(Duration::from_secs(2), venue_task)
        .await
        .expect("venue never saw logout")
        .unwrap();
}

#[tokio::test]
async fn order_is_acked_and_filled_to_completion() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let venue_task = tokio::spawn(async move {
        let mut venue = MockVenue::accept(&listener).await;
        venue.complete_logon().await;

        let order = venue.read_until(msg_type::NEW_ORDER_SINGLE).await;
        let cl_ord_id = order.get(tags::CL_ORD_ID).unwrap().to_string();
        assert_eq!(order.get(tags::SYMBOL), Some("AAPL"));
        assert_eq!(order.get(tags::ORDER_QTY), Some("100"));

        venue
            .send(
                exec_report(&cl_ord_id, exec_type_values::NEW)
                    .with(tags::ORDER_ID, "SIM-7001"),
            )
            .await;
        venue.send(fill_report(&cl_ord_id, "40", "100", "40")).await;
        venue.send(fill_report(&cl_ord_id, "60", "110", "100")).await;

        venue.read_until(msg_type::LOGOUT).await;
    });

    let (engine, mut streams) = FixEngine::initialize(config(port)).await.unwrap();
    let id = engine
        .submit_order("AAPL", Side::Buy, dec!(100), dec!(115))
        .await
        .unwrap();

    let mut states = Vec::new();
    while let Ok(Some(record)) = timeout(Duration::from_secs(2), streams.executions.recv()).await {
        assert_eq!(record.id, id);
        states.push(record.state);
        if record.state == OrderState::Filled {
            assert_eq!(record.filled_qty, dec!(100));
            // (40*100 + 60*110) / 100
            assert_eq!(record.avg_fill_price, dec!(106));
            // The venue's OrderID arrived with the ack and sticks
            assert_eq!(record.venue_order_id.as_deref(), Some("SIM-7001"));
            break;
        }
    }
    assert_eq!(
        states,
        vec![
            OrderState::Acknowledged,
            OrderState::PartiallyFilled,
            OrderState::Filled
        ]
    );

    engine.close().await;
    timeout(Duration::from_secs(2), venue_task).await.unwrap().unwrap();
}

#[tokio::test]
async fn sequence_gap_suspends_dispatch_until_reset() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let venue_task = tokio::spawn(async move {
        let mut venue = MockVenue::accept(&listener).await;
        venue.complete_logon().await;

        let order = venue.read_until(msg_type::NEW_ORDER_SINGLE).await;
        let cl_ord_id = order.get(tags::CL_ORD_ID).unwrap().to_string();

        // Seq 2 in order, then a fill at seq 5: a gap of 3..=4
        venue.send(exec_report(&cl_ord_id, exec_type_values::NEW)).await;
        venue
            .send_with_seq(5, fill_report(&cl_ord_id, "40", "100", "40"))
            .await;

        let resend = venue.read_until(msg_type::RESEND_REQUEST).await;
        assert_eq!(resend.get(tags::BEGIN_SEQ_NO), Some("3"));
        assert_eq!(resend.get(tags::END_SEQ_NO), Some("4"));

        // Gap-fill over the missing admin traffic; the buffered fill at
        // seq 5 may then be dispatched
        venue
            .send_with_seq(3, message::sequence_reset_gap_fill(5))
            .await;

        venue.read_until(msg_type::LOGOUT).await;
    });

    let (engine, mut streams) = FixEngine::initialize(config(port)).await.unwrap();
    let id = engine
        .submit_order("AAPL", Side::Buy, dec!(100), dec!(115))
        .await
        .unwrap();

    // The ack comes through; the post-gap fill must not
    let ack = timeout(Duration::from_secs(2), streams.executions.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ack.state, OrderState::Acknowledged);

    // The fill arrives only after the venue's SequenceReset resolves the
    // gap; until then the order stays Acknowledged
    let fill = timeout(Duration::from_secs(2), streams.executions.recv())
        .await
        .expect("fill never dispatched after gap resolution")
        .unwrap();
    assert_eq!(fill.id, id);
    assert_eq!(fill.state, OrderState::PartiallyFilled);
    assert_eq!(fill.filled_qty, dec!(40));

    engine.close().await;
    timeout(Duration::from_secs(2), venue_task).await.unwrap().unwrap();
}

#[tokio::test]
async fn failed_venue_flags_pending_orders_and_reports_reduced_capacity() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let venue_task = tokio::spawn(async move {
        let mut venue = MockVenue::accept(&listener).await;
        venue.complete_logon().await;
        // Receive the order, never ack it, then die for good
        venue.read_until(msg_type::NEW_ORDER_SINGLE).await;
        drop(venue);
        drop(listener);
    });

    let (engine, mut streams) = FixEngine::initialize(config(port)).await.unwrap();
    let id = engine
        .submit_order("AAPL", Side::Buy, dec!(100), dec!(115))
        .await
        .unwrap();
    venue_task.await.unwrap();

    let mut failed = false;
    while let Ok(Some(update)) = timeout(Duration::from_secs(5), streams.status.recv()).await {
        if update.state == SessionState::FailedPermanently {
            failed = true;
            break;
        }
    }
    assert!(failed, "venue never reached FailedPermanently");

    // The point-in-time view agrees with the status stream
    let statuses = engine.venue_statuses();
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0].venue, "SIM");
    assert_eq!(statuses[0].state, SessionState::FailedPermanently);

    // The pending order was flagged, not dropped
    let mut flagged = false;
    while let Ok(Some(record)) = timeout(Duration::from_secs(2), streams.executions.recv()).await {
        if record.id == id && record.condition == Some(OrderCondition::VenueUnavailable) {
            flagged = true;
            break;
        }
    }
    assert!(flagged, "pending order was not flagged venue-unavailable");
    assert_eq!(engine.order(id).unwrap().state, OrderState::PendingNew);

    // Reduced capacity: no venue left to route to
    let err = engine
        .submit_order("AAPL", Side::Buy, dec!(10), dec!(115))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NoEligibleVenue));

    engine.close().await;
}

#[tokio::test]
async fn market_data_subscription_is_replayed_after_reconnect() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let venue_task = tokio::spawn(async move {
        let mut venue = MockVenue::accept(&listener).await;
        venue.complete_logon().await;

        let req = venue.read_until(msg_type::MARKET_DATA_REQUEST).await;
        assert_eq!(req.get(tags::SYMBOL), Some("SPY"));
        assert_eq!(req.get(tags::SUBSCRIPTION_REQUEST_TYPE), Some("1"));
        // Drop the connection without warning
        drop(venue);

        // The engine reconnects and must re-request the subscription on
        // the fresh session without the caller doing anything
        let mut venue = MockVenue::accept(&listener).await;
        venue.complete_logon().await;
        let req = venue.read_until(msg_type::MARKET_DATA_REQUEST).await;
        assert_eq!(req.get(tags::SYMBOL), Some("SPY"));
        assert_eq!(req.get(tags::SUBSCRIPTION_REQUEST_TYPE), Some("1"));
    });

    let (engine, _streams) = FixEngine::initialize(config(port)).await.unwrap();
    engine.subscribe_market_data("SPY").await.unwrap();

    timeout(Duration::from_secs(5), venue_task)
        .await
        .expect("subscription never replayed on the new session")
        .unwrap();
    engine.close().await;
}

#[tokio::test]
async fn engine_answers_test_request_with_matching_heartbeat() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let venue_task = tokio::spawn(async move {
        let mut venue = MockVenue::accept(&listener).await;
        venue.complete_logon().await;

        venue.send(message::test_request("LIVENESS-1")).await;
        let hb = venue.read_until(msg_type::HEARTBEAT).await;
        assert_eq!(hb.get(tags::TEST_REQ_ID), Some("LIVENESS-1"));
    });

    let (engine, _streams) = FixEngine::initialize(config(port)).await.unwrap();
    // The reply is driven entirely by the session task
    timeout(Duration::from_secs(2), venue_task)
        .await
        .expect("no heartbeat reply")
        .unwrap();
    engine.close().await;
}

#[tokio::test]
async fn duplicate_execution_report_is_not_reapplied() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let venue_task = tokio::spawn(async move {
        let mut venue = MockVenue::accept(&listener).await;
        venue.complete_logon().await;

        let order = venue.read_until(msg_type::NEW_ORDER_SINGLE).await;
        let cl_ord_id = order.get(tags::CL_ORD_ID).unwrap().to_string();

        venue.send(exec_report(&cl_ord_id, exec_type_values::NEW)).await;
        venue.send(fill_report(&cl_ord_id, "40", "100", "40")).await;
        // Replay the fill with its old sequence number
        venue
            .send_with_seq(3, fill_report(&cl_ord_id, "40", "100", "40"))
            .await;
        venue.send(fill_report(&cl_ord_id, "60", "110", "100")).await;

        venue.read_until(msg_type::LOGOUT).await;
    });

    let (engine, mut streams) = FixEngine::initialize(config(port)).await.unwrap();
    let id = engine
        .submit_order("AAPL", Side::Buy, dec!(100), dec!(115))
        .await
        .unwrap();

    let mut last = None;
    while let Ok(Some(record)) = timeout(Duration::from_secs(2), streams.executions.recv()).await {
        let done = record.state == OrderState::Filled;
        last = Some(record);
        if done {
            break;
        }
    }
    let last = last.unwrap();
    assert_eq!(last.id, id);
    assert_eq!(last.state, OrderState::Filled);
    // 40 + 60, not 40 + 40 + 60
    assert_eq!(last.filled_qty, dec!(100));
    assert_eq!(last.avg_fill_price, dec!(106));

    engine.close().await;
    timeout(Duration::from_secs(2), venue_task).await.unwrap().unwrap();
}
