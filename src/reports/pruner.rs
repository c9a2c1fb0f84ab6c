//! Background job that drops expired incident reports and evicts sessions
//! idle for longer than the same retention window.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::AppError;
use crate::runtime::{Component, ComponentFuture};
use crate::session::SessionRegistry;

pub const PRUNE_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Ten years; keeps the chrono conversion in range.
const MAX_RETENTION_HOURS: u64 = 24 * 365 * 10;

pub struct ReportPruner {
    sessions: Arc<SessionRegistry>,
    retention: chrono::Duration,
    interval: Duration,
}

impl ReportPruner {
    pub fn new(sessions: Arc<SessionRegistry>, retention_hours: u64) -> Self {
        Self {
            sessions,
            retention: chrono::Duration::hours(retention_hours.min(MAX_RETENTION_HOURS) as i64),
            interval: PRUNE_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

impl Component for ReportPruner {
    fn id(&self) -> &str {
        "report-pruner"
    }

    fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture {
        Box::pin(run_pruner(*self, shutdown))
    }
}

async fn run_pruner(pruner: ReportPruner, shutdown: CancellationToken) -> Result<(), AppError> {
    let mut ticker = tokio::time::interval(pruner.interval);
    // First tick fires immediately; skip it so startup does no work.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                debug!("report pruner stopping");
                return Ok(());
            }
            _ = ticker.tick() => {
                let removed = pruner.sessions.prune_reports(pruner.retention).await;
                if removed > 0 {
                    info!(removed, "expired incident reports pruned");
                }
                pruner.sessions.evict_idle(pruner.retention).await;
            }
        }
    }
}
