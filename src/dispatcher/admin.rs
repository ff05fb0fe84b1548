//! Liveness surface served on the admin port, grounded in the teacher's
//! `management::handlers::system::{get_system_info, ping_handler}` but
//! trimmed to the one route this gateway's admin surface actually needs:
//! overall health plus the log pipeline's queue stats.

use crate::app::AppServices;
use crate::log_pipeline::QueueStats;
use axum::extract::State;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

#[derive(Clone)]
pub struct AdminState {
    services: Arc<AppServices>,
    started_at: Instant,
}

#[derive(Debug, Serialize)]
struct SystemHealth {
    status: &'static str,
    uptime_seconds: u64,
    queue: QueueStats,
}

pub fn router(services: Arc<AppServices>) -> Router {
    let state = AdminState {
        services,
        started_at: Instant::now(),
    };
    Router::new()
        .route("/admin/health/system", get(system_health))
        .with_state(state)
}

async fn system_health(State(state): State<AdminState>) -> Json<SystemHealth> {
    let queue = state.services.log_pipeline().stats().await;
    Json(SystemHealth {
        status: queue.health_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        queue,
    })
}
