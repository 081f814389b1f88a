// src/outputs/mod.rs
//! Rendering of a validation run into a response body and exit status.
mod documentation;
mod json;
mod prometheus;

pub use self::documentation::DocumentationOutputer;
pub use self::json::JsonOutputer;
pub use self::prometheus::PrometheusOutputer;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

use crate::config::OutputFormat;
use crate::metrics::{MetricsProjector, MetricsRegistry};
use crate::validate::{OutcomeStream, TestResult};

/// Options handed through from configuration without interpretation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputConfig {
    pub format_options: Vec<String>,
}

impl OutputConfig {
    pub fn new(format_options: Vec<String>) -> Self {
        Self { format_options }
    }

    pub fn has_option(&self, option: &str) -> bool {
        self.format_options.iter().any(|o| o == option)
    }
}

/// A fully rendered run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub exit_status: i32,
    pub body: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("failed to encode results: {0}")]
    Encode(String),
}

#[async_trait]
pub trait Outputer: Send + Sync {
    /// Drains `results` completely and renders them.
    async fn output(
        &self,
        results: OutcomeStream,
        start_time: Instant,
        config: &OutputConfig,
    ) -> Rendered;

    /// Body used when a run could not be performed at all.
    fn render_error(&self, err: &str) -> Vec<u8> {
        format!("Error: {}\n", err).into_bytes()
    }

    fn name(&self) -> &'static str;
}

pub fn outputer(
    format: OutputFormat,
    registry: &MetricsRegistry,
    projector: &Arc<MetricsProjector>,
) -> Arc<dyn Outputer> {
    match format {
        OutputFormat::Documentation => Arc::new(DocumentationOutputer),
        OutputFormat::Json => Arc::new(JsonOutputer),
        OutputFormat::Prometheus => {
            Arc::new(PrometheusOutputer::new(registry.clone(), projector.clone()))
        }
    }
}

/// Reads every group until the producer closes the stream.
pub async fn drain(mut results: OutcomeStream) -> Vec<TestResult> {
    let mut all = Vec::new();
    while let Some(group) = results.recv().await {
        all.extend(group);
    }
    all
}

pub fn exit_status(failed: usize) -> i32 {
    if failed == 0 {
        0
    } else {
        1
    }
}
