//! Health state machine: per-`(group_id, key_hash)` running counters that
//! derive a `HealthStatus`, plus the background recovery prober that
//! retries unhealthy keys.
//!
//! State lives behind a `DashMap` (one lock-free entry per key, matching
//! the teacher's per-key critical-section note on its own key pool) and is
//! write-through to the `key_health` table so a restart does not forget
//! sticky 401s or forgiveness timers.

pub mod recovery;
pub mod state;

pub use state::HealthState;
