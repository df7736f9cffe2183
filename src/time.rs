//! Time utilities shared across the crate.
//!
//! Timestamps are plain Unix seconds so they serialize identically in note
//! records, version snapshots, and share envelopes.

/// Returns the current Unix timestamp in seconds.
pub fn now_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}
