use super::recovery::RecoveryProber;
use crate::error::{ErrorContext, Result};
use crate::logging::{LogComponent, LogStage};
use crate::selector::HealthView;
use crate::types::{HealthObservation, HealthStatus};
use crate::{ldebug, lerror, lwarn};
use dashmap::DashMap;
use entity::key_health;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory mirror of one `key_health` row, kept current with every
/// observation and written through to the database on each change.
#[derive(Debug, Clone)]
struct KeyHealthEntry {
    consecutive_failures: u32,
    total_checks: u64,
    successful_checks: u64,
    last_status_code: Option<i32>,
    avg_response_ms: f64,
}

impl KeyHealthEntry {
    fn status(&self) -> HealthStatus {
        HealthStatus::from_counters(self.consecutive_failures, self.successful_checks)
    }
}

/// Running health counters for every `(group_id, key_hash)` the gateway has
/// observed, write-through to `key_health` so a restart does not forget a
/// sticky 401 or reset a key's forgiveness timer.
pub struct HealthState {
    db: Arc<DatabaseConnection>,
    entries: DashMap<(i32, String), KeyHealthEntry>,
    /// Set once the recovery prober exists (the two are wired together
    /// after construction since the prober itself holds an `Arc<HealthState>`).
    /// A runtime transition into `unhealthy` schedules an immediate probe
    /// through it instead of waiting for the next full sweep.
    recovery_hook: RwLock<Option<Arc<RecoveryProber>>>,
}

impl HealthState {
    /// Loads every persisted `key_health` row into memory.
    pub async fn load(db: Arc<DatabaseConnection>) -> Result<Self> {
        let rows = key_health::Entity::find()
            .all(db.as_ref())
            .await
            .with_database_context(|| "loading key_health rows".to_string())?;

        let entries = DashMap::new();
        for row in rows {
            entries.insert(
                (row.group_id, row.key_hash.clone()),
                KeyHealthEntry {
                    consecutive_failures: row.consecutive_failures.max(0) as u32,
                    total_checks: row.total_checks.max(0) as u64,
                    successful_checks: row.successful_checks.max(0) as u64,
                    last_status_code: row.last_status_code,
                    avg_response_ms: row.avg_response_ms,
                },
            );
        }

        Ok(Self {
            db,
            entries,
            recovery_hook: RwLock::new(None),
        })
    }

    /// Wires in the recovery prober so a live transition into `unhealthy`
    /// can schedule an immediate probe rather than only recovering via the
    /// next full health-prober sweep.
    pub async fn set_recovery_prober(&self, prober: Arc<RecoveryProber>) {
        *self.recovery_hook.write().await = Some(prober);
    }

    /// Applies one observation to the named key's counters, per the
    /// transition rules: any success resets the failure streak; a 401 is
    /// sticky and jumps straight to unhealthy; rate-limit/timeout/network/
    /// server errors each increment the streak, unhealthy at 3.
    pub async fn record(
        &self,
        group_id: i32,
        key_hash: &str,
        observation: HealthObservation,
    ) -> Result<()> {
        let now = chrono::Utc::now();

        let mut entry = self
            .entries
            .entry((group_id, key_hash.to_string()))
            .or_insert_with(|| KeyHealthEntry {
                consecutive_failures: 0,
                total_checks: 0,
                successful_checks: 0,
                last_status_code: None,
                avg_response_ms: 0.0,
            });

        let previous_status = entry.status();
        entry.total_checks += 1;

        let mut last_success = false;
        let mut last_failure = false;
        let sticky_401;

        match observation {
            HealthObservation::Success {
                status,
                response_ms,
            } => {
                entry.consecutive_failures = 0;
                entry.successful_checks += 1;
                entry.last_status_code = Some(i32::from(status));
                entry.avg_response_ms = ewma(entry.avg_response_ms, response_ms as f64);
                last_success = true;
                sticky_401 = false;
            }
            HealthObservation::ClientError { status } => {
                entry.last_status_code = Some(i32::from(status));
                sticky_401 = status == 401;
                if sticky_401 {
                    entry.consecutive_failures = 3;
                } else {
                    entry.consecutive_failures += 1;
                }
                last_failure = true;
            }
            HealthObservation::RateLimited { status }
            | HealthObservation::ServerError { status } => {
                entry.last_status_code = Some(i32::from(status));
                entry.consecutive_failures += 1;
                last_failure = true;
                sticky_401 = false;
            }
            HealthObservation::Timeout | HealthObservation::Network => {
                entry.consecutive_failures += 1;
                last_failure = true;
                sticky_401 = false;
            }
        }

        let new_status = entry.status();
        let snapshot = (*entry).clone();
        drop(entry);

        self.persist(group_id, key_hash, &snapshot, now, last_success, last_failure)
            .await?;

        if sticky_401 {
            lwarn!(
                "system",
                LogStage::HealthCheck,
                LogComponent::Health,
                "sticky_401",
                "key marked unhealthy by sticky 401",
                group_id = group_id,
                key_hash = %key_hash
            );
        }

        if previous_status != HealthStatus::Unhealthy && new_status == HealthStatus::Unhealthy {
            let prober = self.recovery_hook.read().await.clone();
            if let Some(prober) = prober {
                if let Err(e) = prober.schedule(group_id, key_hash.to_string()).await {
                    lerror!(
                        "system",
                        LogStage::HealthCheck,
                        LogComponent::Health,
                        "recovery_schedule_failed",
                        "failed to schedule recovery probe for newly unhealthy key",
                        group_id = group_id,
                        key_hash = %key_hash,
                        error = %e
                    );
                }
            }
        }

        Ok(())
    }

    /// Resets an unhealthy key to a clean slate after a successful recovery
    /// probe, without requiring a full observation record.
    pub async fn mark_recovered(&self, group_id: i32, key_hash: &str) -> Result<()> {
        self.record(
            group_id,
            key_hash,
            HealthObservation::Success {
                status: 200,
                response_ms: 0,
            },
        )
        .await
    }

    /// Every key currently in the `unhealthy` state, for the recovery
    /// prober to iterate.
    #[must_use]
    pub fn unhealthy_keys(&self) -> Vec<(i32, String)> {
        self.entries
            .iter()
            .filter(|entry| entry.value().status() == HealthStatus::Unhealthy)
            .map(|entry| entry.key().clone())
            .collect()
    }

    async fn persist(
        &self,
        group_id: i32,
        key_hash: &str,
        snapshot: &KeyHealthEntry,
        now: chrono::DateTime<chrono::Utc>,
        last_success: bool,
        last_failure: bool,
    ) -> Result<()> {
        let existing = key_health::Entity::find()
            .filter(key_health::Column::GroupId.eq(group_id))
            .filter(key_health::Column::KeyHash.eq(key_hash))
            .one(self.db.as_ref())
            .await
            .with_database_context(|| "loading key_health row".to_string())?;

        let mut active = existing.map_or_else(
            || key_health::ActiveModel {
                group_id: Set(group_id),
                key_hash: Set(key_hash.to_string()),
                ..Default::default()
            },
            Into::into,
        );

        active.consecutive_failures = Set(snapshot.consecutive_failures as i32);
        active.total_checks = Set(snapshot.total_checks as i64);
        active.successful_checks = Set(snapshot.successful_checks as i64);
        active.last_status_code = Set(snapshot.last_status_code);
        active.avg_response_ms = Set(snapshot.avg_response_ms);
        active.last_checked_at = Set(Some(now));
        if last_success {
            active.last_success_at = Set(Some(now));
        }
        if last_failure {
            active.last_failure_at = Set(Some(now));
        }

        active
            .save(self.db.as_ref())
            .await
            .with_database_context(|| "saving key_health row".to_string())?;

        ldebug!(
            "system",
            LogStage::HealthCheck,
            LogComponent::Health,
            "health_recorded",
            "key health counters updated",
            group_id = group_id,
            key_hash = %key_hash
        );

        Ok(())
    }
}

impl HealthView for HealthState {
    fn status(&self, group_id: i32, key_hash: &str) -> HealthStatus {
        self.entries
            .get(&(group_id, key_hash.to_string()))
            .map_or(HealthStatus::Unknown, |e| e.status())
    }

    fn avg_response_ms(&self, group_id: i32, key_hash: &str) -> f64 {
        self.entries
            .get(&(group_id, key_hash.to_string()))
            .map_or(0.0, |e| e.avg_response_ms)
    }
}

/// Exponentially weighted moving average with a fixed smoothing factor,
/// matching the "EWMA or simple running mean" allowance.
fn ewma(previous: f64, sample: f64) -> f64 {
    const ALPHA: f64 = 0.3;
    if previous <= 0.0 {
        sample
    } else {
        ALPHA * sample + (1.0 - ALPHA) * previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ewma_seeds_from_first_sample() {
        assert_eq!(ewma(0.0, 100.0), 100.0);
    }

    #[test]
    fn ewma_smooths_towards_new_sample() {
        let next = ewma(100.0, 200.0);
        assert!(next > 100.0 && next < 200.0);
    }

    #[test]
    fn from_counters_matches_state_machine_thresholds() {
        let entry = KeyHealthEntry {
            consecutive_failures: 1,
            total_checks: 5,
            successful_checks: 4,
            last_status_code: Some(429),
            avg_response_ms: 120.0,
        };
        assert_eq!(entry.status(), HealthStatus::Warning);
    }
}
