//! Reconnection policy: exponential backoff and per-session supervision

pub mod backoff;
pub mod supervisor;

pub use backoff::{BackoffConfig, ExponentialBackoff};
pub use supervisor::{
    backoff_config, ReconnectStats, ReconnectSupervisor, SessionEnd, Verdict,
};
