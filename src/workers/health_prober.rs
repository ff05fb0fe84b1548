//! Provider, key, and model liveness probing: for every enabled,
//! health-check-enabled group, bounded parallel fan-out runs a
//! provider-level probe, a per-key probe, and a per-configured-model
//! presence check, persisting each as a `health_check_events` row and
//! folding the outcome into `key_health` (via [`HealthState`]),
//! `provider_health`, and `model_health`.

use crate::config::HealthCheckConfig;
use crate::error::{ErrorContext, ProxyError, Result};
use crate::health::HealthState;
use crate::http_pool::ClientPool;
use crate::logging::{LogComponent, LogStage};
use crate::provider::{ModelInfo, ProviderAdapter, adapter_for};
use crate::registry::{ApiKey, Group, Registry};
use crate::types::{CheckType, HealthObservation};
use crate::{ldebug, lerror, linfo};
use entity::{health_check_events, model_health, provider_health};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{RwLock, Semaphore};
use tokio::task::JoinHandle;

const STARTUP_GRACE: Duration = Duration::from_secs(20);

/// Outcome of a single `list_models` probe against one key.
enum ProbeOutcome {
    Success { elapsed_ms: u64, models: Vec<ModelInfo> },
    Failure { observation: HealthObservation, status: Option<u16>, elapsed_ms: u64, error: String },
}

impl ProbeOutcome {
    fn observation(&self) -> HealthObservation {
        match self {
            Self::Success { elapsed_ms, .. } => HealthObservation::Success {
                status: 200,
                response_ms: *elapsed_ms,
            },
            Self::Failure { observation, .. } => *observation,
        }
    }

    const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    fn status_code(&self) -> Option<i32> {
        match self {
            Self::Success { .. } => Some(200),
            Self::Failure { status, .. } => status.map(i32::from),
        }
    }

    const fn elapsed_ms(&self) -> i64 {
        match self {
            Self::Success { elapsed_ms, .. } | Self::Failure { elapsed_ms, .. } => *elapsed_ms as i64,
        }
    }

    fn error_message(&self) -> Option<String> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error, .. } => Some(error.clone()),
        }
    }
}

/// Runs provider/key/model probes for every eligible group on a fixed
/// interval, mirroring the shape of the other background workers: a
/// `start()`/`stop()` pair over a single `JoinHandle`, a startup grace
/// period, and a plain `sleep`-driven loop (no external cancellation signal
/// is needed since `stop()` aborts the task outright).
pub struct HealthProber {
    registry: Arc<dyn Registry>,
    health: Arc<HealthState>,
    http_pool: Arc<ClientPool>,
    db: Arc<DatabaseConnection>,
    config: HealthCheckConfig,
    task_handle: Arc<RwLock<Option<JoinHandle<()>>>>,
}

impl HealthProber {
    #[must_use]
    pub fn new(
        registry: Arc<dyn Registry>,
        health: Arc<HealthState>,
        http_pool: Arc<ClientPool>,
        db: Arc<DatabaseConnection>,
        config: HealthCheckConfig,
    ) -> Self {
        Self {
            registry,
            health,
            http_pool,
            db,
            config,
            task_handle: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn start(&self) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }

        let registry = Arc::clone(&self.registry);
        let health = Arc::clone(&self.health);
        let http_pool = Arc::clone(&self.http_pool);
        let db = Arc::clone(&self.db);
        let interval = Duration::from_secs(self.config.interval_minutes * 60);
        let run_on_startup = self.config.check_on_startup;
        let max_concurrent_groups = self.config.max_concurrent_groups.max(1);
        let probe_timeout = Duration::from_secs(self.config.check_timeout_seconds);

        let handle = tokio::spawn(async move {
            if run_on_startup {
                sweep(&registry, &health, &http_pool, &db, max_concurrent_groups, probe_timeout).await;
            } else {
                tokio::time::sleep(STARTUP_GRACE).await;
            }

            loop {
                tokio::time::sleep(interval).await;
                sweep(&registry, &health, &http_pool, &db, max_concurrent_groups, probe_timeout).await;
            }
        });

        *self.task_handle.write().await = Some(handle);
        Ok(())
    }

    pub async fn stop(&self) {
        if let Some(handle) = self.task_handle.write().await.take() {
            handle.abort();
        }
    }
}

async fn sweep(
    registry: &Arc<dyn Registry>,
    health: &Arc<HealthState>,
    http_pool: &Arc<ClientPool>,
    db: &Arc<DatabaseConnection>,
    max_concurrent_groups: usize,
    probe_timeout: Duration,
) {
    let groups = match registry.list_groups(false).await {
        Ok(groups) => groups,
        Err(e) => {
            lerror!(
                "system",
                LogStage::HealthCheck,
                LogComponent::Health,
                "health_prober_list_groups_failed",
                "failed to list groups for health probing",
                error = %e
            );
            return;
        }
    };

    let candidates: Vec<Group> = groups
        .into_iter()
        .filter(|g| g.enabled && g.health_check_enabled)
        .collect();
    if candidates.is_empty() {
        return;
    }

    let semaphore = Arc::new(Semaphore::new(max_concurrent_groups));
    let mut handles = Vec::with_capacity(candidates.len());

    for group in candidates {
        let semaphore = Arc::clone(&semaphore);
        let registry = Arc::clone(registry);
        let health = Arc::clone(health);
        let http_pool = Arc::clone(http_pool);
        let db = Arc::clone(db);

        handles.push(tokio::spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return;
            };
            let group_id = group.id;
            if let Err(e) = probe_group(&registry, &health, &http_pool, &db, &group, probe_timeout).await {
                lerror!(
                    "system",
                    LogStage::HealthCheck,
                    LogComponent::Health,
                    "health_prober_group_failed",
                    "group probe failed",
                    group_id = group_id,
                    error = %e
                );
            }
        }));
    }

    for handle in handles {
        let _ = handle.await;
    }

    linfo!(
        "system",
        LogStage::HealthCheck,
        LogComponent::Health,
        "health_prober_sweep_complete",
        "health probe sweep finished"
    );
}

async fn probe_group(
    registry: &Arc<dyn Registry>,
    health: &Arc<HealthState>,
    http_pool: &Arc<ClientPool>,
    db: &Arc<DatabaseConnection>,
    group: &Group,
    probe_timeout: Duration,
) -> Result<()> {
    let keys = registry.group_keys(group.id).await?;
    if keys.is_empty() {
        ldebug!(
            "system",
            LogStage::HealthCheck,
            LogComponent::Health,
            "health_prober_group_skipped",
            "group has no keys, skipping probe",
            group_id = group.id
        );
        return Ok(());
    }

    let client = http_pool.get_or_build(group.proxy_config.as_ref(), group.connect_timeout_seconds)?;
    let adapter = adapter_for(group.provider_kind);

    let provider_probe_key: &ApiKey = &keys[0];
    let provider_outcome = timed_list_models(
        adapter.as_ref(),
        &client,
        &group.base_url,
        &provider_probe_key.secret,
        probe_timeout,
    )
    .await;
    record_provider_health(db, group.id, &provider_outcome).await?;
    record_event(db, group.id, CheckType::Provider, None, None, &provider_outcome).await?;

    let mut last_listing: Option<Vec<ModelInfo>> = None;

    for key in &keys {
        let outcome = timed_list_models(adapter.as_ref(), &client, &group.base_url, &key.secret, probe_timeout).await;
        health.record(group.id, &key.hash, outcome.observation()).await?;
        record_event(db, group.id, CheckType::Key, Some(key.hash.clone()), None, &outcome).await?;
        if let ProbeOutcome::Success { models, .. } = outcome {
            last_listing = Some(models);
        }
    }

    if !group.model_list.is_empty() {
        let served: Option<HashSet<String>> = last_listing.map(|models| models.into_iter().map(|m| m.id).collect());

        for model_id in &group.model_list {
            let (success, error) = match &served {
                None => (false, Some("no successful upstream model listing this sweep".to_string())),
                Some(served) if served.contains(model_id) => (true, None),
                Some(_) => (false, Some("model not present in upstream listing".to_string())),
            };
            record_model_health(db, group.id, model_id, success).await?;
            record_model_event(db, group.id, model_id, success, error).await?;
        }
    }

    Ok(())
}

async fn timed_list_models(
    adapter: &dyn ProviderAdapter,
    client: &reqwest::Client,
    base_url: &str,
    key: &str,
    probe_timeout: Duration,
) -> ProbeOutcome {
    let start = Instant::now();
    let outcome = tokio::time::timeout(probe_timeout, adapter.list_models(client, base_url, key)).await;
    let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

    match outcome {
        Ok(Ok(models)) => ProbeOutcome::Success { elapsed_ms, models },
        Ok(Err(e)) => ProbeOutcome::Failure {
            observation: observation_from_error(&e),
            status: status_from_error(&e),
            elapsed_ms,
            error: e.to_string(),
        },
        Err(_) => ProbeOutcome::Failure {
            observation: HealthObservation::Timeout,
            status: None,
            elapsed_ms,
            error: "probe exceeded the configured health check timeout".to_string(),
        },
    }
}

fn observation_from_error(error: &ProxyError) -> HealthObservation {
    match error {
        ProxyError::UpstreamHttpError { status, .. } => HealthObservation::from_status(*status, 0),
        ProxyError::UpstreamTimeout { .. } => HealthObservation::Timeout,
        ProxyError::UpstreamNetwork { .. } | ProxyError::Network { .. } => HealthObservation::Network,
        _ => HealthObservation::Network,
    }
}

fn status_from_error(error: &ProxyError) -> Option<u16> {
    match error {
        ProxyError::UpstreamHttpError { status, .. } => Some(*status),
        _ => None,
    }
}

async fn record_provider_health(db: &DatabaseConnection, group_id: i32, outcome: &ProbeOutcome) -> Result<()> {
    let now = chrono::Utc::now();
    let existing = provider_health::Entity::find()
        .filter(provider_health::Column::GroupId.eq(group_id))
        .one(db)
        .await
        .with_database_context(|| "loading provider_health row".to_string())?;

    let (prev_failures, prev_total, prev_success, prev_avg) = existing
        .as_ref()
        .map_or((0, 0, 0, 0.0), |m| (m.consecutive_failures, m.total_checks, m.successful_checks, m.avg_response_ms));

    let success = outcome.is_success();
    let consecutive_failures = if success { 0 } else { prev_failures + 1 };
    let total_checks = prev_total + 1;
    let successful_checks = if success { prev_success + 1 } else { prev_success };
    let avg_response_ms = if success {
        ewma(prev_avg, outcome.elapsed_ms() as f64)
    } else {
        prev_avg
    };

    let mut active = existing.map_or_else(
        || provider_health::ActiveModel {
            group_id: Set(group_id),
            ..Default::default()
        },
        Into::into,
    );
    active.consecutive_failures = Set(consecutive_failures);
    active.total_checks = Set(total_checks);
    active.successful_checks = Set(successful_checks);
    active.last_status_code = Set(outcome.status_code());
    active.avg_response_ms = Set(avg_response_ms);
    active.last_checked_at = Set(Some(now));
    if success {
        active.last_success_at = Set(Some(now));
    } else {
        active.last_failure_at = Set(Some(now));
    }

    active
        .save(db)
        .await
        .with_database_context(|| "saving provider_health row".to_string())?;
    Ok(())
}

async fn record_model_health(db: &DatabaseConnection, group_id: i32, model_id: &str, success: bool) -> Result<()> {
    let now = chrono::Utc::now();
    let existing = model_health::Entity::find()
        .filter(model_health::Column::GroupId.eq(group_id))
        .filter(model_health::Column::ModelId.eq(model_id))
        .one(db)
        .await
        .with_database_context(|| "loading model_health row".to_string())?;

    let (prev_failures, prev_total, prev_success, prev_avg) = existing
        .as_ref()
        .map_or((0, 0, 0, 0.0), |m| (m.consecutive_failures, m.total_checks, m.successful_checks, m.avg_response_ms));

    let consecutive_failures = if success { 0 } else { prev_failures + 1 };
    let total_checks = prev_total + 1;
    let successful_checks = if success { prev_success + 1 } else { prev_success };

    let mut active = existing.map_or_else(
        || model_health::ActiveModel {
            group_id: Set(group_id),
            model_id: Set(model_id.to_string()),
            ..Default::default()
        },
        Into::into,
    );
    active.consecutive_failures = Set(consecutive_failures);
    active.total_checks = Set(total_checks);
    active.successful_checks = Set(successful_checks);
    active.last_status_code = Set(if success { Some(200) } else { None });
    active.avg_response_ms = Set(prev_avg);
    active.last_checked_at = Set(Some(now));
    if success {
        active.last_success_at = Set(Some(now));
    } else {
        active.last_failure_at = Set(Some(now));
    }

    active
        .save(db)
        .await
        .with_database_context(|| "saving model_health row".to_string())?;
    Ok(())
}

async fn record_event(
    db: &DatabaseConnection,
    group_id: i32,
    check_type: CheckType,
    key_hash: Option<String>,
    model_id: Option<String>,
    outcome: &ProbeOutcome,
) -> Result<()> {
    let active = health_check_events::ActiveModel {
        group_id: Set(group_id),
        check_type: Set(check_type.as_str().to_string()),
        key_hash: Set(key_hash),
        model_id: Set(model_id),
        status_code: Set(outcome.status_code()),
        response_ms: Set(Some(outcome.elapsed_ms())),
        success: Set(outcome.is_success()),
        error: Set(outcome.error_message()),
        checked_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    active
        .insert(db)
        .await
        .with_database_context(|| "inserting health_check_events row".to_string())?;
    Ok(())
}

async fn record_model_event(
    db: &DatabaseConnection,
    group_id: i32,
    model_id: &str,
    success: bool,
    error: Option<String>,
) -> Result<()> {
    let active = health_check_events::ActiveModel {
        group_id: Set(group_id),
        check_type: Set(CheckType::Model.as_str().to_string()),
        key_hash: Set(None),
        model_id: Set(Some(model_id.to_string())),
        status_code: Set(None),
        response_ms: Set(None),
        success: Set(success),
        error: Set(error),
        checked_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    active
        .insert(db)
        .await
        .with_database_context(|| "inserting health_check_events row".to_string())?;
    Ok(())
}

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
        assert_eq!(ewma(0.0, 50.0), 50.0);
    }

    #[test]
    fn ewma_blends_toward_new_sample() {
        let first = ewma(0.0, 100.0);
        let second = ewma(first, 0.0);
        assert!(second < first);
        assert!(second > 0.0);
    }

    #[test]
    fn success_outcome_reports_200() {
        let outcome = ProbeOutcome::Success {
            elapsed_ms: 12,
            models: vec![],
        };
        assert_eq!(outcome.status_code(), Some(200));
        assert!(outcome.is_success());
        assert!(outcome.error_message().is_none());
    }

    #[test]
    fn failure_outcome_carries_status_and_error() {
        let outcome = ProbeOutcome::Failure {
            observation: HealthObservation::ClientError { status: 401 },
            status: Some(401),
            elapsed_ms: 5,
            error: "boom".to_string(),
        };
        assert_eq!(outcome.status_code(), Some(401));
        assert!(!outcome.is_success());
        assert_eq!(outcome.error_message().as_deref(), Some("boom"));
    }
}
