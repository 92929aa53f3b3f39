//! Session connection states and venue status history
//!
//! Every state transition of a venue session emits a [`VenueStatusUpdate`];
//! a bounded per-venue history of those updates backs the router's health
//! scoring. A richer model than a connected/disconnected flag: the router
//! needs the state, latency, and recent stability.

use std::collections::VecDeque;
use std::fmt;
use std::time::SystemTime;

/// Connection state of one venue session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    /// No connection.
    #[default]
    Disconnected,
    /// TCP/TLS connect in progress.
    Connecting,
    /// Logon sent, awaiting the venue's Logon reply.
    LogonSent,
    /// Session established; application traffic flows.
    Active,
    /// Connection lost or sequence unresolved; reconnecting.
    Recovering,
    /// Reconnect attempts exhausted. Terminal.
    FailedPermanently,
}

impl SessionState {
    /// True for the one terminal state.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::FailedPermanently)
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        use SessionState::*;
        match (self, next) {
            (Disconnected, Connecting) => true,
            (Connecting, LogonSent) => true,
            // Connect or logon failure drops us back or into recovery
            (Connecting, Recovering) | (Connecting, Disconnected) => true,
            (LogonSent, Active) => true,
            (LogonSent, Recovering) | (LogonSent, Disconnected) => true,
            (Active, Recovering) => true,
            (Active, Disconnected) => true,
            (Recovering, Connecting) => true,
            (Recovering, Active) => true,
            (Recovering, FailedPermanently) => true,
            _ => false,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "DISCONNECTED"),
            Self::Connecting => write!(f, "CONNECTING"),
            Self::LogonSent => write!(f, "LOGON_SENT"),
            Self::Active => write!(f, "ACTIVE"),
            Self::Recovering => write!(f, "RECOVERING"),
            Self::FailedPermanently => write!(f, "FAILED_PERMANENTLY"),
        }
    }
}

/// Point-in-time observation of a venue's connectivity and latency.
/// Immutable once created.
#[derive(Debug, Clone)]
pub struct VenueStatusUpdate {
    /// Venue identifier.
    pub venue: String,
    /// Session state at observation time.
    pub state: SessionState,
    /// Rolling average round-trip latency, if any samples exist.
    pub avg_latency_ns: Option<u64>,
    /// Observation time.
    pub timestamp: SystemTime,
}

impl VenueStatusUpdate {
    /// New observation stamped now.
    pub fn now(venue: impl Into<String>, state: SessionState, avg_latency_ns: Option<u64>) -> Self {
        Self {
            venue: venue.into(),
            state,
            avg_latency_ns,
            timestamp: SystemTime::now(),
        }
    }
}

/// Default bound on per-venue status history.
pub const STATUS_HISTORY_CAPACITY: usize = 64;

/// Bounded, append-only history of status updates for one venue.
#[derive(Debug)]
pub struct StatusHistory {
    updates: VecDeque<VenueStatusUpdate>,
    capacity: usize,
}

impl StatusHistory {
    /// New history with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(STATUS_HISTORY_CAPACITY)
    }

    /// New history bounded to `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            updates: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an observation, evicting the oldest once full.
    pub fn push(&mut self, update: VenueStatusUpdate) {
        if self.updates.len() == self.capacity {
            self.updates.pop_front();
        }
        self.updates.push_back(update);
    }

    /// Most recent observation.
    pub fn latest(&self) -> Option<&VenueStatusUpdate> {
        self.updates.back()
    }

    /// Healthy means the latest observation shows an Active session.
    pub fn is_healthy(&self) -> bool {
        self.latest()
            .map(|u| u.state == SessionState::Active)
            .unwrap_or(false)
    }

    /// Fraction of recent observations that were Active, 0.0 when empty.
    /// A flapping session scores low even while momentarily Active.
    pub fn stability(&self) -> f64 {
        if self.updates.is_empty() {
            return 0.0;
        }
        let active = self
            .updates
            .iter()
            .filter(|u| u.state == SessionState::Active)
            .count();
        active as f64 / self.updates.len() as f64
    }

    /// Number of stored observations.
    pub fn len(&self) -> usize {
        self.updates.len()
    }

    /// True when no observations are stored.
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }
}

impl Default for StatusHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_disconnected() {
        assert_eq!(SessionState::default(), SessionState::Disconnected);
    }

    #[test]
    fn happy_path_transitions_are_legal() {
        use SessionState::*;
        assert!(Disconnected.can_transition_to(Connecting));
        assert!(Connecting.can_transition_to(LogonSent));
        assert!(LogonSent.can_transition_to(Active));
        assert!(Active.can_transition_to(Recovering));
        assert!(Recovering.can_transition_to(Connecting));
        assert!(Recovering.can_transition_to(Active));
        assert!(Recovering.can_transition_to(FailedPermanently));
    }

    #[test]
    fn failed_permanently_is_terminal() {
        use SessionState::*;
        assert!(FailedPermanently.is_terminal());
        assert!(!FailedPermanently.can_transition_to(Connecting));
        assert!(!FailedPermanently.can_transition_to(Active));
        assert!(!FailedPermanently.can_transition_to(Disconnected));
    }

    #[test]
    fn illegal_shortcuts_rejected() {
        use SessionState::*;
        assert!(!Disconnected.can_transition_to(Active));
        assert!(!Connecting.can_transition_to(Active));
        assert!(!Active.can_transition_to(LogonSent));
    }

    #[test]
    fn history_is_bounded() {
        let mut history = StatusHistory::with_capacity(3);
        for _ in 0..5 {
            history.push(VenueStatusUpdate::now("ARCA", SessionState::Active, None));
        }
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn health_follows_latest_state() {
        let mut history = StatusHistory::new();
        assert!(!history.is_healthy());

        history.push(VenueStatusUpdate::now("ARCA", SessionState::Active, None));
        assert!(history.is_healthy());

        history.push(VenueStatusUpdate::now("ARCA", SessionState::Recovering, None));
        assert!(!history.is_healthy());
    }

    #[test]
    fn stability_reflects_flapping() {
        let mut history = StatusHistory::new();
        history.push(VenueStatusUpdate::now("ARCA", SessionState::Active, None));
        history.push(VenueStatusUpdate::now("ARCA", SessionState::Recovering, None));
        history.push(VenueStatusUpdate::now("ARCA", SessionState::Active, None));
        history.push(VenueStatusUpdate::now("ARCA", SessionState::Recovering, None));
        assert!((history.stability() - 0.5).abs() < f64::EPSILON);
    }
}
