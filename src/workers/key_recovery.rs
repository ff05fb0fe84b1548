//! Thin `ScheduledTask` wrapper around `health::recovery::RecoveryProber` —
//! the actual probing loop lives there since `HealthState` needs to hand
//! out a prober reference when a key first turns unhealthy.

use crate::health::recovery::RecoveryProber;
use crate::error::Result;
use std::sync::Arc;

pub struct KeyRecoveryWorker {
    prober: Arc<RecoveryProber>,
}

impl KeyRecoveryWorker {
    #[must_use]
    pub const fn new(prober: Arc<RecoveryProber>) -> Self {
        Self { prober }
    }

    pub async fn start(&self) -> Result<()> {
        self.prober.start().await
    }

    pub async fn stop(&self) {
        self.prober.stop().await;
    }
}
