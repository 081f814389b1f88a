// src/metrics/refresher.rs
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info, warn};

use super::{MetricsProjector, ProjectionSummary};
use crate::validate::{panic_message, ValidateError, Validator};

/// Re-runs the checks on a fixed cadence and projects them into the gauges
/// served by the metrics endpoint.
pub struct MetricsRefresher {
    validator: Arc<dyn Validator>,
    projector: Arc<MetricsProjector>,
    max_concurrent: usize,
    period: Duration,
    shutdown_tx: tokio::sync::watch::Sender<bool>,
    shutdown_rx: tokio::sync::watch::Receiver<bool>,
}

impl MetricsRefresher {
    pub fn new(
        validator: Arc<dyn Validator>,
        projector: Arc<MetricsProjector>,
        max_concurrent: usize,
        period: Duration,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

        Self {
            validator,
            projector,
            max_concurrent,
            period,
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Runs one pass immediately, then one per period until shut down.
    pub async fn start(self: Arc<Self>) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut shutdown_rx = self.shutdown_rx.clone();

        info!("Starting metrics refresher with period: {:?}", self.period);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // A panicking pass is logged; the next tick tries again.
                    match AssertUnwindSafe(self.refresh_once()).catch_unwind().await {
                        Ok(Ok(summary)) if summary.failed > 0 => warn!(
                            count = summary.count,
                            failed = summary.failed,
                            "Projected failing checks"
                        ),
                        Ok(Ok(summary)) => info!(count = summary.count, "Projected checks"),
                        Ok(Err(e)) => error!(%e, "Metrics refresh failed"),
                        Err(panic) => error!(
                            reason = %panic_message(panic.as_ref()),
                            "Metrics refresh panicked"
                        ),
                    }
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Metrics refresher shutting down");
                        break;
                    }
                }
            }
        }
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn refresh_once(&self) -> Result<ProjectionSummary, ValidateError> {
        let started = Instant::now();
        let sys = Arc::new(self.validator.snapshot().await?);
        let results = self.validator.validate(sys, self.max_concurrent);
        let summary = self.projector.project(results).await;
        tracing::debug!(elapsed = ?started.elapsed(), "metrics refresh finished");
        Ok(summary)
    }
}
