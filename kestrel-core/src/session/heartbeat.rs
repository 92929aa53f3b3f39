//! Heartbeat and TestRequest timing
//!
//! Tracks both directions of session liveness: when we must emit a
//! Heartbeat (idle outbound), when to escalate to a TestRequest (idle
//! inbound), and when to declare the peer silently dead.

use std::time::{Duration, Instant};

/// Heartbeat bookkeeping for one session.
#[derive(Debug)]
pub struct HeartbeatMonitor {
    interval: Duration,
    last_sent: Instant,
    last_received: Instant,
    /// TestReqID of an outstanding TestRequest, if any.
    pending_test_req: Option<String>,
    test_req_counter: u64,
}

impl HeartbeatMonitor {
    /// New monitor; both timers start now.
    pub fn new(interval: Duration) -> Self {
        let now = Instant::now();
        Self {
            interval,
            last_sent: now,
            last_received: now,
            pending_test_req: None,
            test_req_counter: 0,
        }
    }

    /// Record that any message was sent.
    #[inline]
    pub fn on_message_sent(&mut self) {
        self.last_sent = Instant::now();
    }

    /// Record that any message was received. A Heartbeat answering our
    /// outstanding TestRequest clears the pending state.
    pub fn on_message_received(&mut self, test_req_id: Option<&str>) {
        self.last_received = Instant::now();
        if let (Some(pending), Some(answered)) = (&self.pending_test_req, test_req_id) {
            if pending == answered {
                self.pending_test_req = None;
            }
        }
    }

    /// True when we have been idle on the outbound side for a full
    /// heartbeat interval and owe the peer a Heartbeat.
    pub fn heartbeat_due(&self) -> bool {
        self.last_sent.elapsed() >= self.interval
    }

    /// True when the peer has been silent past the interval plus slack
    /// and we have not yet challenged it.
    pub fn test_request_due(&self) -> bool {
        self.pending_test_req.is_none()
            && self.last_received.elapsed() >= self.interval + self.interval / 5
    }

    /// Issue a new TestReqID and remember it as outstanding.
    pub fn next_test_req_id(&mut self) -> String {
        self.test_req_counter += 1;
        let id = format!("TEST-{}", self.test_req_counter);
        self.pending_test_req = Some(id.clone());
        id
    }

    /// True when the peer is considered dead: a TestRequest is outstanding
    /// and a further interval passed with no traffic, or the peer has been
    /// silent for two full intervals.
    pub fn peer_timed_out(&self) -> bool {
        self.last_received.elapsed() >= self.interval * 2
    }

    /// Time since the last inbound message.
    #[inline]
    pub fn inbound_idle(&self) -> Duration {
        self.last_received.elapsed()
    }
}
