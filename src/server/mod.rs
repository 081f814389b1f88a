pub mod builder;
pub mod handler;
pub mod listener;

pub use builder::{BoundServer, ServerBuilder};
pub use handler::{HealthHandler, MetricsHandler, RemoteAddr};
