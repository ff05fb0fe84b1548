//! In-process snapshot cache fronting the registry.
//!
//! The teacher's `src/cache` module builds on Redis for cross-instance
//! sharing; this gateway caches only the registry's own read model (group
//! snapshots) in a single process, so a `moka` async cache is sufficient and
//! avoids a network round trip on the hot request path.

mod group_cache;

pub use group_cache::{CacheManager, GroupCacheConfig};
