// src/metrics/projector.rs
use anyhow::Result;
use prometheus::core::Collector;
use prometheus::{GaugeVec, Opts};

use super::MetricsRegistry;
use crate::validate::{OutcomeStream, TestResult};

pub const GAUGE_NAME: &str = "goss";
pub const GAUGE_LABELS: [&str; 4] = ["resource_type", "resource_id", "property", "title"];

/// Counts from one projection pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProjectionSummary {
    pub count: usize,
    pub failed: usize,
}

/// Writes each test outcome into the `goss` gauge family.
///
/// Series are never removed: a label set that disappears from a later run
/// keeps its last value.
pub struct MetricsProjector {
    gauge: GaugeVec,
}

impl MetricsProjector {
    pub fn new(registry: &MetricsRegistry) -> Result<Self> {
        let gauge = GaugeVec::new(
            Opts::new(
                GAUGE_NAME,
                "Lets you know if goss assertions were true 0, or false 1",
            ),
            &GAUGE_LABELS,
        )?;
        registry.inner().register(Box::new(gauge.clone()))?;

        Ok(Self { gauge })
    }

    /// Drains `results`, setting 0.0 for passes and 1.0 for failures.
    pub async fn project(&self, mut results: OutcomeStream) -> ProjectionSummary {
        let mut summary = ProjectionSummary::default();
        while let Some(group) = results.recv().await {
            for result in &group {
                self.record(result);
                summary.count += 1;
                if !result.successful {
                    summary.failed += 1;
                }
            }
        }
        summary
    }

    pub fn record(&self, result: &TestResult) {
        let value = if result.successful { 0.0 } else { 1.0 };
        self.gauge
            .with_label_values(&[
                result.resource_type.as_str(),
                result.resource_id.as_str(),
                result.property.as_str(),
                result.title.as_str(),
            ])
            .set(value);
    }

    /// Current value for a label tuple, if that series exists.
    pub fn value(&self, resource_type: &str, resource_id: &str, property: &str, title: &str) -> Option<f64> {
        self.gauge
            .collect()
            .iter()
            .flat_map(|family| family.get_metric())
            .find(|metric| {
                let labels = metric.get_label();
                let wanted = [resource_type, resource_id, property, title];
                GAUGE_LABELS.iter().zip(wanted).all(|(name, value)| {
                    labels
                        .iter()
                        .any(|pair| pair.get_name() == *name && pair.get_value() == value)
                })
            })
            .map(|metric| metric.get_gauge().get_value())
    }

    /// Number of distinct label tuples ever set.
    pub fn series_count(&self) -> usize {
        self.gauge
            .collect()
            .iter()
            .map(|family| family.get_metric().len())
            .sum()
    }
}
