//! Shared code for the Kestrel binaries

pub mod common;
