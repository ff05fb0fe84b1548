//! Key selection: alias resolution, the unhealthy-fallback rule, and the
//! three ordering policies (`round_robin`, `random`, `least_load`), plus
//! cross-group selection for the group-agnostic `/v1` endpoints.
//!
//! Round-robin state is a per-group `AtomicUsize`, the same pattern as the
//! teacher's `RoundRobinApiKeySelector` in `src/scheduler/algorithms.rs`.

use crate::error::{ProxyError, Result};
use crate::registry::{ApiKey, GroupSnapshot};
use crate::types::{HealthStatus, ProviderKind};
use dashmap::DashMap;
use rand::Rng;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

/// The health information the selector needs, without depending on the
/// `health` module directly — `health::state::HealthState` implements this.
pub trait HealthView: Send + Sync {
    fn status(&self, group_id: i32, key_hash: &str) -> HealthStatus;
    fn avg_response_ms(&self, group_id: i32, key_hash: &str) -> f64;
}

/// Per-key in-flight request counters, incremented by the dispatcher when
/// a call starts and decremented when it finishes; used only to break
/// ties under the `least_load` policy.
#[derive(Clone, Default)]
pub struct InFlightCounts {
    counts: Arc<DashMap<String, AtomicU32>>,
}

impl InFlightCounts {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self, key_hash: &str) {
        self.counts
            .entry(key_hash.to_string())
            .or_insert_with(|| AtomicU32::new(0))
            .fetch_add(1, Ordering::SeqCst);
    }

    pub fn decrement(&self, key_hash: &str) {
        if let Some(counter) = self.counts.get(key_hash) {
            counter.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[must_use]
    pub fn get(&self, key_hash: &str) -> u32 {
        self.counts
            .get(key_hash)
            .map_or(0, |c| c.load(Ordering::SeqCst))
    }
}

/// A key chosen for a specific call, paired with the canonical model id
/// the alias map resolved the request to.
#[derive(Debug, Clone)]
pub struct SelectedKey {
    pub key: ApiKey,
    pub canonical_model: String,
}

/// Selection state shared across requests: one round-robin counter per
/// group, one per provider kind for cross-group rotation, and the
/// dispatcher-maintained in-flight counts used by `least_load`.
pub struct Selector {
    round_robin: DashMap<i32, AtomicUsize>,
    cross_group_round_robin: DashMap<ProviderKind, AtomicUsize>,
    in_flight: InFlightCounts,
}

impl Selector {
    #[must_use]
    pub fn new(in_flight: InFlightCounts) -> Self {
        Self {
            round_robin: DashMap::new(),
            cross_group_round_robin: DashMap::new(),
            in_flight,
        }
    }

    /// Runs the 4-step algorithm against a single already-chosen group.
    #[must_use]
    pub fn select_in_group(
        &self,
        snapshot: &GroupSnapshot,
        model_requested: &str,
        health: &dyn HealthView,
    ) -> Option<SelectedKey> {
        let canonical_model = snapshot.group.resolve_model(model_requested)?;
        if snapshot.keys.is_empty() {
            return None;
        }

        let statuses: Vec<HealthStatus> = snapshot
            .keys
            .iter()
            .map(|k| health.status(snapshot.group.id, &k.hash))
            .collect();
        let all_unhealthy = statuses
            .iter()
            .all(|s| matches!(s, HealthStatus::Unhealthy));

        let candidates: Vec<&ApiKey> = snapshot
            .keys
            .iter()
            .zip(statuses.iter())
            .filter(|(_, status)| all_unhealthy || status.is_selectable())
            .map(|(key, _)| key)
            .collect();

        if candidates.is_empty() {
            return None;
        }

        let chosen = self.choose(
            snapshot.group.id,
            snapshot.group.selection_policy,
            &candidates,
            health,
        );
        Some(SelectedKey {
            key: chosen,
            canonical_model,
        })
    }

    /// Enumerates usable groups matching a dialect whose resolved model set
    /// contains `model_requested`, rotating across them and falling through
    /// to the next candidate group if the chosen one yields no viable key.
    pub fn select_cross_group(
        &self,
        candidate_groups: &[Arc<GroupSnapshot>],
        model_requested: &str,
        provider_kind: ProviderKind,
        health: &dyn HealthView,
    ) -> Result<(Arc<GroupSnapshot>, SelectedKey)> {
        let matching: Vec<&Arc<GroupSnapshot>> = candidate_groups
            .iter()
            .filter(|g| g.is_usable() && g.group.resolve_model(model_requested).is_some())
            .collect();

        if matching.is_empty() {
            return Err(ProxyError::no_viable_group(format!(
                "no usable group serves model '{model_requested}'"
            )));
        }

        let counter = self
            .cross_group_round_robin
            .entry(provider_kind)
            .or_insert_with(|| AtomicUsize::new(0));
        let start = counter.fetch_add(1, Ordering::SeqCst) % matching.len();
        drop(counter);

        for offset in 0..matching.len() {
            let group = matching[(start + offset) % matching.len()];
            if let Some(selected) = self.select_in_group(group, model_requested, health) {
                return Ok((Arc::clone(group), selected));
            }
        }

        Err(ProxyError::no_viable_key(format!(
            "no viable key across groups for model '{model_requested}'"
        )))
    }

    fn choose(
        &self,
        group_id: i32,
        policy: crate::types::SelectionPolicy,
        candidates: &[&ApiKey],
        health: &dyn HealthView,
    ) -> ApiKey {
        use crate::types::SelectionPolicy;

        match policy {
            SelectionPolicy::RoundRobin => {
                let counter = self
                    .round_robin
                    .entry(group_id)
                    .or_insert_with(|| AtomicUsize::new(0));
                let idx = counter.fetch_add(1, Ordering::SeqCst) % candidates.len();
                candidates[idx].clone()
            }
            SelectionPolicy::Random => {
                let idx = rand::thread_rng().gen_range(0..candidates.len());
                candidates[idx].clone()
            }
            SelectionPolicy::LeastLoad => (*candidates
                .iter()
                .min_by(|a, b| {
                    let a_load = health.avg_response_ms(group_id, &a.hash);
                    let b_load = health.avg_response_ms(group_id, &b.hash);
                    a_load
                        .partial_cmp(&b_load)
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then_with(|| self.in_flight.get(&a.hash).cmp(&self.in_flight.get(&b.hash)))
                })
                .expect("candidates is non-empty"))
            .clone(),
        }
    }

    #[must_use]
    pub fn in_flight(&self) -> &InFlightCounts {
        &self.in_flight
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Group, ProxyConfig};
    use crate::types::SelectionPolicy;
    use std::collections::HashMap;

    struct AllHealthy;
    impl HealthView for AllHealthy {
        fn status(&self, _group_id: i32, _key_hash: &str) -> HealthStatus {
            HealthStatus::Healthy
        }
        fn avg_response_ms(&self, _group_id: i32, key_hash: &str) -> f64 {
            key_hash.len() as f64
        }
    }

    struct AllUnhealthy;
    impl HealthView for AllUnhealthy {
        fn status(&self, _group_id: i32, _key_hash: &str) -> HealthStatus {
            HealthStatus::Unhealthy
        }
        fn avg_response_ms(&self, _group_id: i32, _key_hash: &str) -> f64 {
            0.0
        }
    }

    fn test_group(policy: SelectionPolicy, key_count: usize) -> GroupSnapshot {
        let mut alias_map = HashMap::new();
        alias_map.insert("alias".to_string(), "model-a".to_string());
        let group = Group {
            id: 1,
            name: "g".to_string(),
            provider_kind: ProviderKind::OpenAiCompatibleChat,
            base_url: "https://example.com".to_string(),
            model_list: vec!["model-a".to_string()],
            alias_map,
            enabled: true,
            health_check_enabled: true,
            timeout_seconds: 30,
            max_retries: 0,
            connect_timeout_seconds: 10,
            proxy_config: None::<ProxyConfig>,
            extra_headers: HashMap::new(),
            selection_policy: policy,
            deleted: false,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        let keys = (0..key_count)
            .map(|i| ApiKey {
                id: i as i32,
                group_id: 1,
                secret: format!("secret-{i}"),
                hash: format!("hash-{i}"),
                masked: "****".to_string(),
                position: i as i32,
                last_status_code: None,
                created_at: chrono::Utc::now(),
            })
            .collect();
        GroupSnapshot { group, keys }
    }

    #[test]
    fn round_robin_rotates_through_all_keys() {
        let selector = Selector::new(InFlightCounts::new());
        let snapshot = test_group(SelectionPolicy::RoundRobin, 3);
        let health = AllHealthy;

        let mut seen = std::collections::HashSet::new();
        for _ in 0..3 {
            let selected = selector
                .select_in_group(&snapshot, "model-a", &health)
                .unwrap();
            seen.insert(selected.key.hash);
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn alias_resolves_to_canonical_model() {
        let selector = Selector::new(InFlightCounts::new());
        let snapshot = test_group(SelectionPolicy::RoundRobin, 1);
        let health = AllHealthy;

        let selected = selector
            .select_in_group(&snapshot, "alias", &health)
            .unwrap();
        assert_eq!(selected.canonical_model, "model-a");
    }

    #[test]
    fn unresolvable_model_skips_group() {
        let selector = Selector::new(InFlightCounts::new());
        let snapshot = test_group(SelectionPolicy::RoundRobin, 1);
        let health = AllHealthy;

        assert!(
            selector
                .select_in_group(&snapshot, "no-such-model", &health)
                .is_none()
        );
    }

    #[test]
    fn all_unhealthy_falls_through_to_full_candidate_list() {
        let selector = Selector::new(InFlightCounts::new());
        let snapshot = test_group(SelectionPolicy::RoundRobin, 2);
        let health = AllUnhealthy;

        let selected = selector.select_in_group(&snapshot, "model-a", &health);
        assert!(selected.is_some());
    }

    #[test]
    fn least_load_picks_lowest_avg_response() {
        let selector = Selector::new(InFlightCounts::new());
        let snapshot = test_group(SelectionPolicy::LeastLoad, 3);
        let health = AllHealthy;

        let selected = selector
            .select_in_group(&snapshot, "model-a", &health)
            .unwrap();
        assert_eq!(selected.key.hash, "hash-0");
    }
}
