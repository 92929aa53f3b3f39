//! Engine and venue configuration
//!
//! Deserialized from JSON by the binaries; every knob has a default so a
//! minimal config only needs the CompIDs and venue endpoints.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Our CompID, sent as SenderCompID(49) on every message.
    pub sender_comp_id: String,

    /// One entry per venue session.
    pub venues: Vec<VenueConfig>,

    /// Heartbeat interval in seconds (FIX HeartBtInt, tag 108).
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_interval_secs: u64,

    /// Reconnect attempts before a session is declared permanently failed.
    #[serde(default = "default_reconnect_attempts")]
    pub reconnect_attempts: u32,

    /// Initial delay between reconnect attempts (seconds); doubles per attempt.
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,

    /// Time to wait for a venue ack before flagging the order ack-timeout.
    #[serde(default = "default_ack_timeout_ms")]
    pub ack_timeout_ms: u64,

    /// Record per-message latency into the rolling windows.
    #[serde(default = "default_true")]
    pub enable_latency_monitoring: bool,

    /// Set TCP_NODELAY on venue sockets.
    #[serde(default = "default_true")]
    pub enable_performance_optimizations: bool,
}

/// Connection configuration for a single venue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueConfig {
    /// Venue identifier used in logs, routing, and status reports.
    pub venue: String,

    /// Host to connect to.
    pub host: String,

    /// Port to connect to.
    pub port: u16,

    /// Venue CompID, sent as TargetCompID(56).
    pub target_comp_id: String,

    /// Optional logon username (tag 553).
    #[serde(default)]
    pub username: Option<String>,

    /// Optional logon password (tag 554).
    #[serde(default)]
    pub password: Option<String>,

    /// Wrap the TCP connection in TLS.
    #[serde(default)]
    pub enable_tls: bool,

    /// Routing rank, 1 = most preferred.
    #[serde(default = "default_priority")]
    pub priority: u8,
}

fn default_heartbeat_secs() -> u64 {
    30
}

fn default_reconnect_attempts() -> u32 {
    3
}

fn default_reconnect_delay_secs() -> u64 {
    5
}

fn default_ack_timeout_ms() -> u64 {
    2_000
}

fn default_priority() -> u8 {
    1
}

fn default_true() -> bool {
    true
}

impl EngineConfig {
    /// Heartbeat interval as a Duration.
    #[inline]
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    /// Reconnect delay as a Duration.
    #[inline]
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    /// Ack timeout as a Duration.
    #[inline]
    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }

    /// Validate before attempting any connection.
    pub fn validate(&self) -> Result<(), String> {
        if self.sender_comp_id.is_empty() {
            return Err("sender_comp_id must not be empty".to_string());
        }
        if self.venues.is_empty() {
            return Err("at least one venue must be configured".to_string());
        }
        if self.heartbeat_interval_secs == 0 {
            return Err("heartbeat_interval_secs must be positive".to_string());
        }
        for venue in &self.venues {
            if venue.venue.is_empty() {
                return Err("venue name must not be empty".to_string());
            }
            if venue.target_comp_id.is_empty() {
                return Err(format!("venue {}: target_comp_id must not be empty", venue.venue));
            }
            if venue.priority == 0 {
                return Err(format!("venue {}: priority starts at 1", venue.venue));
            }
        }
        Ok(())
    }
}

impl VenueConfig {
    /// Convenience constructor used by tests and the simulator bin.
    pub fn new(venue: impl Into<String>, host: impl Into<String>, port: u16, target: impl Into<String>) -> Self {
        Self {
            venue: venue.into(),
            host: host.into(),
            port,
            target_comp_id: target.into(),
            username: None,
            password: None,
            enable_tls: false,
            priority: 1,
        }
    }

    /// Set the routing priority (1 = most preferred).
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    /// Set logon credentials.
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }
}
