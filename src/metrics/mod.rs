// src/metrics/mod.rs
mod projector;
mod refresher;
mod registry;

pub use projector::{MetricsProjector, ProjectionSummary, GAUGE_LABELS, GAUGE_NAME};
pub use refresher::MetricsRefresher;
pub use registry::MetricsRegistry;
