//! Runtime diagnostics.
//!
//! Counters maintained by the control loop so a field technician (or a
//! periodic log line) can tell a quiet node from a broken one: is the
//! stream delivering, are writes landing, how often does the link drop.

use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RuntimeMetrics {
    /// Control ticks executed.
    pub ticks: u64,
    /// Ticks that ran the full cycle (store reachable).
    pub connected_ticks: u64,
    /// Connected ↔ disconnected edges.
    pub link_transitions: u32,

    pub commands_applied: u32,
    pub commands_rejected: u32,
    pub commands_unknown: u32,

    pub stream_timeouts: u32,
    pub stream_errors: u32,

    pub publish_ok: u32,
    pub publish_failed: u32,
}

impl RuntimeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compact JSON for a status log line.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
