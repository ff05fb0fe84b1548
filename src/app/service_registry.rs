use crate::app::resources::AppResources;
use crate::error::Result;
use crate::health::HealthState;
use crate::log_pipeline::LogPipeline;
use crate::registry::{Registry, SeaOrmRegistry};
use crate::selector::{InFlightCounts, Selector};
use std::sync::Arc;

/// Business services built on top of `AppResources`: the registry, the
/// selector, the health state machine, and the log pipeline. Task-level
/// orchestration (starting/stopping background loops) lives in `AppTasks`,
/// which borrows these services rather than owning their state.
pub struct AppServices {
    registry: Arc<dyn Registry>,
    selector: Arc<Selector>,
    health: Arc<HealthState>,
    log_pipeline: Arc<LogPipeline>,
}

impl AppServices {
    pub async fn initialize(resources: &Arc<AppResources>) -> Result<Arc<Self>> {
        let database = resources.database();
        let config = resources.config();

        let registry: Arc<dyn Registry> =
            Arc::new(SeaOrmRegistry::new(database.clone(), resources.cache()));

        let health = Arc::new(HealthState::load(database.clone()).await?);
        let selector = Arc::new(Selector::new(InFlightCounts::new()));

        let log_pipeline = Arc::new(LogPipeline::new(
            database.clone(),
            config.request_logging.queue.clone(),
        ));

        Ok(Arc::new(Self {
            registry,
            selector,
            health,
            log_pipeline,
        }))
    }

    #[must_use]
    pub fn registry(&self) -> Arc<dyn Registry> {
        Arc::clone(&self.registry)
    }

    #[must_use]
    pub fn selector(&self) -> Arc<Selector> {
        Arc::clone(&self.selector)
    }

    #[must_use]
    pub fn health(&self) -> Arc<HealthState> {
        Arc::clone(&self.health)
    }

    #[must_use]
    pub fn log_pipeline(&self) -> Arc<LogPipeline> {
        Arc::clone(&self.log_pipeline)
    }
}
