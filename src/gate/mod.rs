// src/gate/mod.rs
//! Serves a cached validation run and makes sure at most one caller
//! recomputes it at a time.
mod snapshot;

pub use snapshot::CachedSnapshot;

use futures::FutureExt;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::cache::TtlSlot;
use crate::outputs::{OutputConfig, Outputer, Rendered};
use crate::validate::{panic_message, ValidateError, Validator};

pub struct HealthGate {
    inner: Arc<Recomputer>,
    // Guards "check slot, recompute, store". Never held by cache hits.
    recompute_lock: Arc<Mutex<()>>,
}

/// Everything a recomputation needs, shared with the task that runs it.
struct Recomputer {
    validator: Arc<dyn Validator>,
    outputer: Arc<dyn Outputer>,
    output_config: OutputConfig,
    max_concurrent: usize,
    slot: Arc<TtlSlot<CachedSnapshot>>,
    recomputations: AtomicU64,
}

impl HealthGate {
    pub fn new(
        validator: Arc<dyn Validator>,
        outputer: Arc<dyn Outputer>,
        output_config: OutputConfig,
        ttl: Duration,
        max_concurrent: usize,
    ) -> Self {
        Self {
            inner: Arc::new(Recomputer {
                validator,
                outputer,
                output_config,
                max_concurrent,
                slot: Arc::new(TtlSlot::new(ttl)),
                recomputations: AtomicU64::new(0),
            }),
            recompute_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn slot(&self) -> &Arc<TtlSlot<CachedSnapshot>> {
        &self.inner.slot
    }

    /// How many times the checks have been run.
    pub fn recomputations(&self) -> u64 {
        self.inner.recomputations.load(Ordering::Relaxed)
    }

    /// Returns the current snapshot, recomputing it if it has expired.
    ///
    /// The recomputation runs on its own task that owns the lock, so a
    /// caller that goes away mid-run still leaves a stored snapshot behind
    /// for everyone queued on the lock.
    pub async fn handle(&self, remote: Option<SocketAddr>) -> Arc<CachedSnapshot> {
        if let Some(snapshot) = self.inner.slot.get() {
            debug!(age = ?snapshot.age(), "serving cached snapshot");
            return snapshot;
        }

        let guard = self.recompute_lock.clone().lock_owned().await;

        // Another caller may have stored a fresh snapshot while we waited.
        if let Some(snapshot) = self.inner.slot.get() {
            debug!(age = ?snapshot.age(), "snapshot refreshed while waiting for lock");
            return snapshot;
        }

        match remote {
            Some(remote) => info!("{}: Stale cache, running tests", remote),
            None => info!("Stale cache, running tests"),
        }

        let inner = self.inner.clone();
        let task = tokio::spawn(async move {
            let _guard = guard;
            let snapshot = inner.recompute().await;
            // Stored before the guard drops.
            inner.slot.set(snapshot)
        });

        match task.await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                let reason = if e.is_panic() {
                    let panic = e.into_panic();
                    format!("recomputation panicked: {}", panic_message(panic.as_ref()))
                } else {
                    "recomputation was cancelled".to_string()
                };
                error!(reason = %reason, "recomputation task failed");
                Arc::new(self.inner.error_snapshot(&reason))
            }
        }
    }
}

impl Recomputer {
    /// Failures and panics become an unhealthy snapshot instead of
    /// propagating.
    async fn recompute(&self) -> CachedSnapshot {
        let generation = self.recomputations.fetch_add(1, Ordering::Relaxed) + 1;
        let started = Instant::now();

        let snapshot = match AssertUnwindSafe(self.run(started)).catch_unwind().await {
            Ok(Ok(rendered)) => CachedSnapshot::new(rendered.exit_status, rendered.body),
            Ok(Err(e)) => {
                error!(%e, generation, "validation could not run");
                self.error_snapshot(&e.to_string())
            }
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                error!(reason = %reason, generation, "validation panicked");
                self.error_snapshot(&format!("validation panicked: {}", reason))
            }
        };

        info!(
            generation,
            exit_status = snapshot.exit_status,
            elapsed = ?started.elapsed(),
            outputer = self.outputer.name(),
            "Recomputed health snapshot"
        );
        snapshot
    }

    async fn run(&self, started: Instant) -> Result<Rendered, ValidateError> {
        let sys = Arc::new(self.validator.snapshot().await?);
        let results = self.validator.validate(sys, self.max_concurrent);
        Ok(self
            .outputer
            .output(results, started, &self.output_config)
            .await)
    }

    fn error_snapshot(&self, reason: &str) -> CachedSnapshot {
        CachedSnapshot::new(1, self.outputer.render_error(reason))
    }
}
