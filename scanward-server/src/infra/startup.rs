use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::infra::app_state::AppState;

/// Upper bound on how long finished jobs outlive their retention window.
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

#[async_trait]
pub trait StartupHooks: Send + Sync {
    async fn run(&self, state: &AppState) -> Result<()>;
}

/// Starts background housekeeping: finished jobs older than
/// `JOB_RETENTION_SECONDS` are purged periodically.
#[derive(Debug, Default)]
pub struct ProdStartupHooks;

#[async_trait]
impl StartupHooks for ProdStartupHooks {
    async fn run(&self, state: &AppState) -> Result<()> {
        let retention = state.config.scan.retention();
        if retention.is_zero() {
            info!("job retention disabled; finished jobs are kept");
            return Ok(());
        }

        let retention_window = chrono::Duration::from_std(retention)?;
        let registry = state.registry().clone();
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(retention.min(MAX_SWEEP_INTERVAL));
            loop {
                interval.tick().await;
                let Some(cutoff) = Utc::now().checked_sub_signed(retention_window) else {
                    warn!("retention window reaches past the earliest timestamp");
                    continue;
                };
                let purged = registry.purge_finished_before(cutoff);
                if purged > 0 {
                    info!(purged, "purged expired scan jobs");
                } else {
                    debug!("no expired scan jobs");
                }
            }
        });

        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct NoopStartupHooks;

#[async_trait]
impl StartupHooks for NoopStartupHooks {
    async fn run(&self, _state: &AppState) -> Result<()> {
        Ok(())
    }
}
