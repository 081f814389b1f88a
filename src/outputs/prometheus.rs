// src/outputs/prometheus.rs
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::error;

use super::{exit_status, OutputConfig, Outputer, Rendered};
use crate::metrics::{MetricsProjector, MetricsRegistry};
use crate::validate::OutcomeStream;

/// Projects results into the gauge family and renders the registry.
pub struct PrometheusOutputer {
    registry: MetricsRegistry,
    projector: Arc<MetricsProjector>,
}

impl PrometheusOutputer {
    pub fn new(registry: MetricsRegistry, projector: Arc<MetricsProjector>) -> Self {
        Self {
            registry,
            projector,
        }
    }
}

#[async_trait]
impl Outputer for PrometheusOutputer {
    async fn output(
        &self,
        results: OutcomeStream,
        _start_time: Instant,
        _config: &OutputConfig,
    ) -> Rendered {
        let summary = self.projector.project(results).await;

        let body = match self.registry.gather() {
            Ok(body) => body,
            Err(e) => {
                error!(%e, "failed to encode metrics");
                self.render_error(&e.to_string())
            }
        };

        Rendered {
            exit_status: exit_status(summary.failed),
            body,
        }
    }

    fn name(&self) -> &'static str {
        "prometheus"
    }
}
