use crate::config::{QueueFullStrategy, RequestLogQueueConfig};
use crate::error::{ErrorContext, Result};
use crate::logging::{LogComponent, LogStage};
use crate::{ldebug, lerror, lwarn};
use chrono::{DateTime, Utc};
use entity::request_logs;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;
use tokio::sync::{Notify, RwLock, oneshot};
use tokio::task::JoinHandle;

/// The `insert` half of a log item: everything known at enqueue time.
#[derive(Debug, Clone)]
pub struct NewRequestLog {
    pub request_id: String,
    pub proxy_key_id: Option<i32>,
    pub arrival_time: DateTime<Utc>,
    pub method: String,
    pub path: String,
    pub model_requested: Option<String>,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    pub is_streaming: bool,
    pub has_tools: bool,
}

/// The `update` half: everything only known once the upstream call settles.
#[derive(Debug, Clone, Default)]
pub struct RequestLogUpdate {
    pub request_id: String,
    pub model_resolved: Option<String>,
    pub group_id: Option<i32>,
    pub provider_kind: Option<String>,
    pub key_hash: Option<String>,
    pub prompt_tokens: Option<i64>,
    pub completion_tokens: Option<i64>,
    pub total_tokens: Option<i64>,
    pub status_code: Option<i32>,
    pub duration_ms: Option<i64>,
    pub error_message: Option<String>,
    pub response_body: Option<String>,
    pub response_headers: Option<String>,
    pub content_truncated: bool,
}

#[derive(Debug, Clone)]
pub enum LogItem {
    Insert(NewRequestLog),
    Update(RequestLogUpdate),
}

#[derive(Debug, Clone)]
struct Envelope {
    item: LogItem,
    retry_count: u32,
}

/// Point-in-time snapshot of the pipeline's health, surfaced by the admin
/// liveness route.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct QueueStats {
    pub pending: usize,
    pub processed: u64,
    pub failed: u64,
    pub dropped: u64,
    pub last_processed_at: Option<DateTime<Utc>>,
    pub avg_batch_ms: f64,
}

impl QueueStats {
    #[must_use]
    pub fn health_string(&self) -> &'static str {
        if self.pending == 0 {
            "idle"
        } else if self.dropped > 0 {
            "degraded"
        } else {
            "active"
        }
    }
}

struct Inner {
    ring: StdMutex<VecDeque<Envelope>>,
    capacity: usize,
    policy: QueueFullStrategy,
    item_ready: Notify,
    space_freed: Notify,
    stats: RwLock<QueueStats>,
}

/// Owns the bounded queue and the background worker's lifecycle.
pub struct LogPipeline {
    inner: Arc<Inner>,
    db: Arc<DatabaseConnection>,
    config: RequestLogQueueConfig,
    shutdown: StdMutex<Option<oneshot::Sender<()>>>,
    task_handle: StdMutex<Option<JoinHandle<()>>>,
}

impl LogPipeline {
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>, config: RequestLogQueueConfig) -> Self {
        let inner = Arc::new(Inner {
            ring: StdMutex::new(VecDeque::with_capacity(config.max_capacity)),
            capacity: config.max_capacity,
            policy: config.full_strategy,
            item_ready: Notify::new(),
            space_freed: Notify::new(),
            stats: RwLock::new(QueueStats::default()),
        });
        Self {
            inner,
            db,
            config,
            shutdown: StdMutex::new(None),
            task_handle: StdMutex::new(None),
        }
    }

    pub fn start(&self) {
        let (tx, rx) = oneshot::channel();
        *self.shutdown.lock().unwrap() = Some(tx);

        let inner = Arc::clone(&self.inner);
        let db = Arc::clone(&self.db);
        let tick = Duration::from_millis(self.config.processing_interval_ms);
        let batch_size = self.config.batch_size;
        let max_retries = self.config.max_retries;
        let retry_delay = Duration::from_millis(self.config.retry_delay_ms);
        let drain_timeout = Duration::from_millis(self.config.graceful_shutdown_timeout_ms);

        let handle = tokio::spawn(run(
            inner,
            db,
            tick,
            batch_size,
            max_retries,
            retry_delay,
            drain_timeout,
            rx,
        ));
        *self.task_handle.lock().unwrap() = Some(handle);
    }

    pub async fn stop(&self) {
        if let Some(tx) = self.shutdown.lock().unwrap().take() {
            let _ = tx.send(());
        }
        let handle = self.task_handle.lock().unwrap().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    /// Enqueues an item, applying the configured back-pressure policy.
    /// `block` awaits until space frees up rather than returning immediately.
    pub async fn enqueue(&self, item: LogItem) {
        loop {
            let mut accepted = false;
            let mut dropped = false;
            {
                let mut ring = self.inner.ring.lock().unwrap();
                if ring.len() < self.inner.capacity {
                    ring.push_back(Envelope {
                        item: item.clone(),
                        retry_count: 0,
                    });
                    accepted = true;
                } else {
                    match self.inner.policy {
                        QueueFullStrategy::DropOldest => {
                            ring.pop_front();
                            ring.push_back(Envelope {
                                item: item.clone(),
                                retry_count: 0,
                            });
                            accepted = true;
                            dropped = true;
                        }
                        QueueFullStrategy::RejectNew => {
                            dropped = true;
                        }
                        QueueFullStrategy::Block => {}
                    }
                }
            }

            if accepted {
                self.inner.item_ready.notify_one();
                if dropped {
                    self.inner.stats.write().await.dropped += 1;
                    lwarn!(
                        "system",
                        LogStage::Logging,
                        LogComponent::LogPipeline,
                        "queue_full_drop_oldest",
                        "log queue full, evicted oldest item"
                    );
                }
                return;
            }

            if dropped {
                self.inner.stats.write().await.dropped += 1;
                return;
            }

            lwarn!(
                "system",
                LogStage::Logging,
                LogComponent::LogPipeline,
                "queue_full_block",
                "log queue full, blocking enqueue (full_strategy = block)"
            );
            self.inner.space_freed.notified().await;
        }
    }

    pub async fn stats(&self) -> QueueStats {
        let mut snapshot = self.inner.stats.read().await.clone();
        snapshot.pending = self.inner.ring.lock().unwrap().len();
        snapshot
    }
}

#[allow(clippy::too_many_arguments)]
async fn run(
    inner: Arc<Inner>,
    db: Arc<DatabaseConnection>,
    tick: Duration,
    batch_size: usize,
    max_retries: u32,
    retry_delay: Duration,
    drain_timeout: Duration,
    mut shutdown: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            () = tokio::time::sleep(tick) => {}
            () = inner.item_ready.notified() => {}
            _ = &mut shutdown => break,
        }
        drain_once(&inner, &db, batch_size, max_retries, retry_delay).await;
    }

    let deadline = tokio::time::Instant::now() + drain_timeout;
    while tokio::time::Instant::now() < deadline {
        let remaining = inner.ring.lock().unwrap().len();
        if remaining == 0 {
            break;
        }
        drain_once(&inner, &db, batch_size, max_retries, retry_delay).await;
    }
}

async fn drain_once(
    inner: &Arc<Inner>,
    db: &Arc<DatabaseConnection>,
    batch_size: usize,
    max_retries: u32,
    retry_delay: Duration,
) {
    let batch: Vec<Envelope> = {
        let mut ring = inner.ring.lock().unwrap();
        let n = batch_size.min(ring.len());
        ring.drain(..n).collect()
    };
    if batch.is_empty() {
        return;
    }
    inner.space_freed.notify_waiters();

    let started = std::time::Instant::now();
    let failed = process_batch(db, &batch).await;
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

    let mut stats = inner.stats.write().await;
    stats.processed += (batch.len() - failed.len()) as u64;
    stats.last_processed_at = Some(Utc::now());
    stats.avg_batch_ms = ewma(stats.avg_batch_ms, elapsed_ms);
    drop(stats);

    if !failed.is_empty() {
        retry_or_discard(inner, failed, max_retries, retry_delay).await;
    }
}

async fn process_batch(db: &Arc<DatabaseConnection>, batch: &[Envelope]) -> Vec<Envelope> {
    let mut failed = Vec::new();

    let inserts: Vec<&NewRequestLog> = batch
        .iter()
        .filter_map(|e| match &e.item {
            LogItem::Insert(log) => Some(log),
            LogItem::Update(_) => None,
        })
        .collect();

    if !inserts.is_empty() {
        let models: Vec<request_logs::ActiveModel> = inserts
            .iter()
            .map(|log| request_logs::ActiveModel {
                request_id: Set(log.request_id.clone()),
                proxy_key_id: Set(log.proxy_key_id),
                arrival_time: Set(log.arrival_time),
                method: Set(log.method.clone()),
                path: Set(log.path.clone()),
                model_requested: Set(log.model_requested.clone()),
                model_resolved: Set(None),
                group_id: Set(None),
                provider_kind: Set(None),
                key_hash: Set(None),
                client_ip: Set(log.client_ip.clone()),
                user_agent: Set(log.user_agent.clone()),
                is_streaming: Set(log.is_streaming),
                has_tools: Set(log.has_tools),
                prompt_tokens: Set(None),
                completion_tokens: Set(None),
                total_tokens: Set(None),
                status_code: Set(None),
                duration_ms: Set(None),
                error_message: Set(None),
                response_body: Set(None),
                response_headers: Set(None),
                content_truncated: Set(false),
            })
            .collect();

        if let Err(e) = request_logs::Entity::insert_many(models)
            .exec(db.as_ref())
            .await
        {
            lerror!(
                "system",
                LogStage::Logging,
                LogComponent::LogPipeline,
                "batch_insert_failed",
                "failed to insert request_logs batch",
                error = %e,
                count = inserts.len()
            );
            failed.extend(batch.iter().filter(|e| matches!(e.item, LogItem::Insert(_))).cloned());
        }
    }

    for envelope in batch {
        let Envelope {
            item: LogItem::Update(update),
            ..
        } = envelope
        else {
            continue;
        };
        if let Err(e) = apply_update(db, update).await {
            lerror!(
                "system",
                LogStage::Logging,
                LogComponent::LogPipeline,
                "update_failed",
                "failed to update request_logs row",
                error = %e,
                request_id = %update.request_id
            );
            failed.push(envelope.clone());
        }
    }

    failed
}

async fn apply_update(db: &Arc<DatabaseConnection>, update: &RequestLogUpdate) -> Result<()> {
    let Some(existing) = request_logs::Entity::find_by_id(update.request_id.clone())
        .one(db.as_ref())
        .await
        .with_database_context(|| "loading request_logs row for update".to_string())?
    else {
        ldebug!(
            "system",
            LogStage::Logging,
            LogComponent::LogPipeline,
            "update_missing_insert",
            "request_logs update arrived before its insert was applied",
            request_id = %update.request_id
        );
        return Ok(());
    };

    let mut active: request_logs::ActiveModel = existing.into();
    active.model_resolved = Set(update.model_resolved.clone());
    active.group_id = Set(update.group_id);
    active.provider_kind = Set(update.provider_kind.clone());
    active.key_hash = Set(update.key_hash.clone());
    active.prompt_tokens = Set(update.prompt_tokens);
    active.completion_tokens = Set(update.completion_tokens);
    active.total_tokens = Set(update.total_tokens);
    active.status_code = Set(update.status_code);
    active.duration_ms = Set(update.duration_ms);
    active.error_message = Set(update.error_message.clone());
    active.response_body = Set(update.response_body.clone());
    active.response_headers = Set(update.response_headers.clone());
    active.content_truncated = Set(update.content_truncated);

    active
        .save(db.as_ref())
        .await
        .with_database_context(|| "saving request_logs update".to_string())?;
    Ok(())
}

async fn retry_or_discard(
    inner: &Arc<Inner>,
    failed: Vec<Envelope>,
    max_retries: u32,
    retry_delay: Duration,
) {
    tokio::time::sleep(retry_delay).await;
    let mut stats = inner.stats.write().await;
    let mut ring = inner.ring.lock().unwrap();
    for mut envelope in failed {
        envelope.retry_count += 1;
        if envelope.retry_count > max_retries {
            stats.failed += 1;
            lerror!(
                "system",
                LogStage::Logging,
                LogComponent::LogPipeline,
                "item_discarded",
                "log item exceeded max_retries, discarding",
                retry_count = envelope.retry_count
            );
        } else {
            ring.push_back(envelope);
        }
    }
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
    fn stats_health_string_reflects_backlog() {
        let mut stats = QueueStats::default();
        assert_eq!(stats.health_string(), "idle");
        stats.pending = 5;
        assert_eq!(stats.health_string(), "active");
        stats.dropped = 1;
        assert_eq!(stats.health_string(), "degraded");
    }

    #[test]
    fn ewma_seeds_from_first_sample() {
        assert_eq!(ewma(0.0, 42.0), 42.0);
    }
}
