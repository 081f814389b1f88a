// src/metrics/registry.rs
use anyhow::Result;
use prometheus::{Encoder, Registry, TextEncoder};

/// Owned metrics registry, scraped by the metrics endpoint.
#[derive(Clone, Default)]
pub struct MetricsRegistry {
    registry: Registry,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
        }
    }

    pub fn inner(&self) -> &Registry {
        &self.registry
    }

    /// Encodes every registered family in the Prometheus text format.
    pub fn gather(&self) -> Result<Vec<u8>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(buffer)
    }
}
