//! 后台任务集合：调度器及任务实例统一管理
//!
//! 职责：
//! - 创建和管理所有后台任务（Task 层）
//! - Task 依赖 Service/Resources，从 `AppServices`/`AppResources` 获取
//! - 统一的任务生命周期管理

use crate::app::resources::AppResources;
use crate::app::service_registry::AppServices;
use crate::app::task_scheduler::{ScheduledTask, TaskScheduler};
use crate::error::Result;
use crate::health::recovery::RecoveryProber;
use crate::log_pipeline::LogPipeline;
use crate::workers::{HealthProber, KeyRecoveryWorker, LogCleanupWorker};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// 后台任务类型枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskType {
    /// 健康探测：provider/key/model 探活
    HealthProber,
    /// 不健康 key 的恢复探测
    KeyRecovery,
    /// 过期请求日志清理
    LogCleanup,
    /// 异步日志流水线
    LogPipeline,
}

/// 后台任务集合：调度器及任务实例统一管理
pub struct AppTasks {
    scheduler: Arc<TaskScheduler>,
    /// 任务实例注册表：通过任务类型查找具体的任务实例
    task_instances: HashMap<TaskType, Arc<dyn Any + Send + Sync>>,
}

impl AppTasks {
    /// 初始化调度器并注册所有后台任务
    pub async fn initialize(resources: &Arc<AppResources>, services: &Arc<AppServices>) -> Result<Arc<Self>> {
        let scheduler = Arc::new(TaskScheduler::new());
        let mut task_instances: HashMap<TaskType, Arc<dyn Any + Send + Sync>> = HashMap::new();

        let config = resources.config();
        let database = resources.database();
        let http_pool = resources.http_pool();

        let health_prober = Arc::new(HealthProber::new(
            services.registry(),
            services.health(),
            http_pool.clone(),
            database.clone(),
            config.health_check.clone(),
        ));

        let recovery_interval =
            std::time::Duration::from_secs(config.key_health_check.interval_minutes * 60);
        let recovery_prober = Arc::new(RecoveryProber::new(
            services.health(),
            services.registry(),
            http_pool,
            recovery_interval,
        ));
        services.health().set_recovery_prober(recovery_prober.clone()).await;
        let key_recovery = Arc::new(KeyRecoveryWorker::new(recovery_prober));

        let log_cleanup = Arc::new(LogCleanupWorker::new(database, config.log_cleanup.clone()));

        let log_pipeline = services.log_pipeline();

        task_instances.insert(TaskType::HealthProber, health_prober.clone());
        task_instances.insert(TaskType::KeyRecovery, key_recovery.clone());
        task_instances.insert(TaskType::LogCleanup, log_cleanup.clone());
        task_instances.insert(TaskType::LogPipeline, log_pipeline.clone());

        scheduler
            .register_many(vec![
                ScheduledTask::builder(TaskType::LogPipeline)
                    .on_start({
                        let task = log_pipeline.clone();
                        move || {
                            let task = task.clone();
                            async move { task.start().await }
                        }
                    })
                    .on_stop({
                        let task = log_pipeline.clone();
                        move || {
                            let task = task.clone();
                            async move {
                                task.stop().await;
                                Ok(())
                            }
                        }
                    })
                    .build(),
                ScheduledTask::builder(TaskType::HealthProber)
                    .on_start({
                        let task = health_prober.clone();
                        move || {
                            let task = task.clone();
                            async move { task.start().await }
                        }
                    })
                    .on_stop({
                        let task = health_prober.clone();
                        move || {
                            let task = task.clone();
                            async move {
                                task.stop().await;
                                Ok(())
                            }
                        }
                    })
                    .build(),
                ScheduledTask::builder(TaskType::KeyRecovery)
                    .on_start({
                        let task = key_recovery.clone();
                        move || {
                            let task = task.clone();
                            async move { task.start().await }
                        }
                    })
                    .on_stop({
                        let task = key_recovery.clone();
                        move || {
                            let task = task.clone();
                            async move {
                                task.stop().await;
                                Ok(())
                            }
                        }
                    })
                    .build(),
                ScheduledTask::builder(TaskType::LogCleanup)
                    .on_start({
                        let task = log_cleanup.clone();
                        move || {
                            let task = task.clone();
                            async move { task.start().await }
                        }
                    })
                    .on_stop({
                        let task = log_cleanup.clone();
                        move || {
                            let task = task.clone();
                            async move {
                                task.stop().await;
                                Ok(())
                            }
                        }
                    })
                    .build(),
            ])
            .await;

        Ok(Arc::new(Self {
            scheduler,
            task_instances,
        }))
    }

    #[must_use]
    pub fn scheduler(&self) -> Arc<TaskScheduler> {
        Arc::clone(&self.scheduler)
    }

    /// 获取指定类型的任务实例
    #[must_use]
    pub fn get_task<T: Send + Sync + 'static>(&self, task_type: TaskType) -> Option<Arc<T>> {
        self.task_instances
            .get(&task_type)
            .and_then(|any| Arc::clone(any).downcast::<T>().ok())
    }
}
