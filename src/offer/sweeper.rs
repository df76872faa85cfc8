//! Expiry Sweeper
//!
//! Background task that moves overdue offers and stale open requests to
//! `Expired`.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use super::service::OfferEngine;
use super::types::SweepReport;
use crate::environment::Clock;
use crate::error::FreightResult;

#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// Pause between passes
    pub interval: Duration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
        }
    }
}

pub struct ExpirySweeper {
    engine: OfferEngine,
    clock: Arc<dyn Clock>,
    config: SweeperConfig,
}

impl ExpirySweeper {
    pub fn new(engine: OfferEngine, clock: Arc<dyn Clock>, config: SweeperConfig) -> Self {
        Self {
            engine,
            clock,
            config,
        }
    }

    /// Run forever. A failed pass is logged and retried next interval.
    pub async fn run(&self) -> ! {
        info!(
            interval_secs = self.config.interval.as_secs(),
            "Starting expiry sweeper"
        );

        loop {
            if let Err(e) = self.sweep_once().await {
                error!(error = %e, "Expiry sweep failed");
            }
            tokio::time::sleep(self.config.interval).await;
        }
    }

    pub async fn sweep_once(&self) -> FreightResult<SweepReport> {
        self.engine.sweep_once(self.clock.now()).await
    }
}
