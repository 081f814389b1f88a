// src/main.rs
use anyhow::Result;
use hyper::{Body, Request, Response};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower::Service;
use tracing::{error, info};

use goss_serve::{
    config::{self, OutputFormat},
    gate::HealthGate,
    metrics::{MetricsProjector, MetricsRefresher, MetricsRegistry},
    outputs::{self, OutputConfig},
    server::{HealthHandler, MetricsHandler, ServerBuilder},
    validate::{GossValidator, Validator},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("goss_serve=info".parse()?)
                .add_directive("hyper=info".parse()?),
        )
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "goss-serve.yaml".to_string());

    info!("Loading configuration from: {}", config_path);
    let config = config::load_config(&config_path)?;
    let server = config.server.clone();
    let addr = server.socket_addr()?;

    let validator: Arc<dyn Validator> =
        Arc::new(GossValidator::from_path(&config.gossfile).await?);

    let registry = MetricsRegistry::new();
    let projector = Arc::new(MetricsProjector::new(&registry)?);

    match server.format {
        OutputFormat::Prometheus => {
            // Scrapes read the registry directly; the refresher keeps it current.
            let refresher = Arc::new(MetricsRefresher::new(
                validator,
                projector,
                server.max_concurrent,
                server.cache_ttl(),
            ));
            tokio::spawn(refresher.clone().start());

            let handler = MetricsHandler::new(registry, &server.endpoint);
            let result = run_server(addr, handler).await;
            refresher.shutdown();
            result
        }
        format => {
            let outputer = outputs::outputer(format, &registry, &projector);
            let gate = Arc::new(HealthGate::new(
                validator,
                outputer,
                OutputConfig::new(server.format_options.clone()),
                server.cache_ttl(),
                server.max_concurrent,
            ));
            let sweeper = gate.slot().spawn_sweeper(server.sweep_interval());

            let handler = HealthHandler::new(gate, &server.endpoint, format.content_type());
            let result = run_server(addr, handler).await;
            sweeper.abort();
            result
        }
    }
}

/// Binds `addr` or terminates the process; a server that cannot listen is
/// not recoverable.
async fn run_server<H>(addr: SocketAddr, handler: H) -> Result<()>
where
    H: Service<Request<Body>, Response = Response<Body>> + Send + Clone + 'static,
    H::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    H::Future: Send + 'static,
{
    let bound = match ServerBuilder::new(addr)
        .with_handler(handler)
        .with_shutdown(shutdown_signal())
        .bind()
        .await
    {
        Ok(bound) => bound,
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    };

    info!("Starting to listen on: {}", bound.local_addr());
    bound.run().await
}

// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
