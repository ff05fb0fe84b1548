//! Background recovery prober: retries `unhealthy` keys at a configurable
//! interval (default 5 minutes), promoting a key back to `healthy` on a
//! successful probe and leaving its counters untouched on failure.
//!
//! Structured the way the teacher's `ApiKeyRateLimitResetTask` restores
//! pending resets from the database into a `tokio_util::time::DelayQueue`
//! at startup: every currently-unhealthy key gets a timer, new unhealthy
//! transitions schedule one via a command channel, and a probe that still
//! fails reschedules itself for the next interval.

use super::HealthState;
use crate::error::Result;
use crate::http_pool::ClientPool;
use crate::logging::{LogComponent, LogStage};
use crate::provider;
use crate::registry::Registry;
use crate::{lerror, linfo};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_util::time::DelayQueue;

const COMMAND_CHANNEL_CAPACITY: usize = 128;

#[derive(Debug, Clone)]
struct ScheduleProbeCommand {
    group_id: i32,
    key_hash: String,
    delay: Duration,
}

/// Owns the background probe loop's lifecycle; cheap to clone, shares the
/// running task via the inner `Arc`s.
#[derive(Clone)]
pub struct RecoveryProber {
    health: Arc<HealthState>,
    registry: Arc<dyn Registry>,
    http_pool: Arc<ClientPool>,
    interval: Duration,
    command_sender: Arc<RwLock<Option<mpsc::Sender<ScheduleProbeCommand>>>>,
    task_handle: Arc<RwLock<Option<JoinHandle<()>>>>,
}

impl RecoveryProber {
    #[must_use]
    pub fn new(
        health: Arc<HealthState>,
        registry: Arc<dyn Registry>,
        http_pool: Arc<ClientPool>,
        interval: Duration,
    ) -> Self {
        Self {
            health,
            registry,
            http_pool,
            interval,
            command_sender: Arc::new(RwLock::new(None)),
            task_handle: Arc::new(RwLock::new(None)),
        }
    }

    /// Starts the probe loop, restoring a timer for every key currently
    /// unhealthy in the loaded health state.
    pub async fn start(&self) -> Result<()> {
        let (command_sender, command_receiver) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let pending = self.health.unhealthy_keys();

        let task_handle = tokio::spawn(run(
            Arc::clone(&self.health),
            Arc::clone(&self.registry),
            Arc::clone(&self.http_pool),
            self.interval,
            command_sender.clone(),
            command_receiver,
            pending,
        ));

        *self.command_sender.write().await = Some(command_sender);
        *self.task_handle.write().await = Some(task_handle);

        linfo!(
            "system",
            LogStage::Startup,
            LogComponent::Health,
            "recovery_prober_started",
            "key recovery prober started"
        );
        Ok(())
    }

    pub async fn stop(&self) {
        let handle = self.task_handle.write().await.take();
        if let Some(handle) = handle {
            handle.abort();
            let _ = handle.await;
        }
        *self.command_sender.write().await = None;

        linfo!(
            "system",
            LogStage::Shutdown,
            LogComponent::Health,
            "recovery_prober_stopped",
            "key recovery prober stopped"
        );
    }

    /// Schedules a recovery probe for a key that just transitioned to
    /// unhealthy, rather than waiting for the next full sweep.
    pub async fn schedule(&self, group_id: i32, key_hash: String) -> Result<()> {
        if let Some(sender) = self.command_sender.read().await.as_ref() {
            sender
                .send(ScheduleProbeCommand {
                    group_id,
                    key_hash,
                    delay: self.interval,
                })
                .await
                .map_err(|e| {
                    crate::error::ProxyError::internal_with_source(
                        "failed to schedule recovery probe",
                        anyhow::anyhow!(e.to_string()),
                    )
                })?;
        }
        Ok(())
    }
}

#[allow(clippy::too_many_arguments)]
async fn run(
    health: Arc<HealthState>,
    registry: Arc<dyn Registry>,
    http_pool: Arc<ClientPool>,
    interval: Duration,
    self_sender: mpsc::Sender<ScheduleProbeCommand>,
    mut command_receiver: mpsc::Receiver<ScheduleProbeCommand>,
    pending: Vec<(i32, String)>,
) {
    let mut queue: DelayQueue<(i32, String)> = DelayQueue::new();

    for (group_id, key_hash) in pending {
        queue.insert((group_id, key_hash), interval);
    }

    loop {
        tokio::select! {
            Some(expired) = queue.next() => {
                let (group_id, key_hash) = expired.into_inner();
                let health = Arc::clone(&health);
                let registry = Arc::clone(&registry);
                let http_pool = Arc::clone(&http_pool);
                let self_sender = self_sender.clone();

                tokio::spawn(async move {
                    let recovered = probe_one(&registry, &http_pool, group_id, &key_hash)
                        .await
                        .unwrap_or(false);

                    if recovered {
                        if let Err(e) = health.mark_recovered(group_id, &key_hash).await {
                            lerror!(
                                "system", LogStage::HealthCheck, LogComponent::Health,
                                "recovery_mark_failed", "failed to persist recovered key",
                                group_id = group_id, key_hash = %key_hash, error = %e
                            );
                        } else {
                            linfo!(
                                "system", LogStage::HealthCheck, LogComponent::Health,
                                "key_recovered", "key passed recovery probe",
                                group_id = group_id, key_hash = %key_hash
                            );
                        }
                    } else {
                        let _ = self_sender
                            .send(ScheduleProbeCommand { group_id, key_hash, delay: interval })
                            .await;
                    }
                });
            }
            Some(command) = command_receiver.recv() => {
                queue.insert((command.group_id, command.key_hash), command.delay);
            }
            else => break,
        }
    }
}

/// Issues a minimal upstream call (model listing) for one key, returning
/// whether it should be considered recovered.
async fn probe_one(
    registry: &Arc<dyn Registry>,
    http_pool: &Arc<ClientPool>,
    group_id: i32,
    key_hash: &str,
) -> Result<bool> {
    let Some(snapshot) = registry.group_snapshot(group_id).await? else {
        return Ok(false);
    };
    if snapshot.group.deleted || !snapshot.group.enabled {
        return Ok(false);
    }
    let Some(key) = snapshot.keys.iter().find(|k| k.hash == key_hash) else {
        return Ok(false);
    };

    let adapter = provider::adapter_for(snapshot.group.provider_kind);
    let client = http_pool.get_or_build(
        snapshot.group.proxy_config.as_ref(),
        snapshot.group.connect_timeout_seconds,
    )?;

    Ok(adapter
        .list_models(&client, &snapshot.group.base_url, &key.secret)
        .await
        .is_ok())
}
