// src/server/handler.rs
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Body, Request, Response, StatusCode};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::Service;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::gate::HealthGate;
use crate::metrics::MetricsRegistry;

/// Peer address of the connection a request arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteAddr(pub SocketAddr);

fn remote_addr(req: &Request<Body>) -> Option<SocketAddr> {
    req.extensions().get::<RemoteAddr>().map(|r| r.0)
}

fn respond(
    status: StatusCode,
    content_type: Option<&'static str>,
    body: impl Into<Body>,
) -> Response<Body> {
    let mut response = Response::new(body.into());
    *response.status_mut() = status;
    if let Some(content_type) = content_type {
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    }
    response
}

fn not_found() -> Response<Body> {
    respond(StatusCode::NOT_FOUND, None, "Not Found")
}

/// Serves the gate's snapshot on the configured endpoint.
#[derive(Clone)]
pub struct HealthHandler {
    gate: Arc<HealthGate>,
    endpoint: Arc<str>,
    content_type: Option<&'static str>,
}

impl HealthHandler {
    pub fn new(gate: Arc<HealthGate>, endpoint: &str, content_type: Option<&'static str>) -> Self {
        Self {
            gate,
            endpoint: Arc::from(endpoint),
            content_type,
        }
    }
}

impl Service<Request<Body>> for HealthHandler {
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = futures::future::BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let gate = self.gate.clone();
        let endpoint = self.endpoint.clone();
        let content_type = self.content_type;
        let remote = remote_addr(&req);
        let span = info_span!(
            "request",
            request_id = %Uuid::new_v4(),
            remote = ?remote,
        );

        Box::pin(
            async move {
                match remote {
                    Some(remote) => info!("{}: requesting health probe", remote),
                    None => info!("requesting health probe"),
                }
                if req.uri().path() != &*endpoint {
                    return Ok::<_, Infallible>(not_found());
                }

                let snapshot = gate.handle(remote).await;
                Ok(respond(
                    snapshot.status_code(),
                    content_type,
                    snapshot.body.clone(),
                ))
            }
            .instrument(span),
        )
    }
}

/// Exposes the metrics registry for scraping.
#[derive(Clone)]
pub struct MetricsHandler {
    registry: MetricsRegistry,
    endpoint: Arc<str>,
}

impl MetricsHandler {
    pub fn new(registry: MetricsRegistry, endpoint: &str) -> Self {
        Self {
            registry,
            endpoint: Arc::from(endpoint),
        }
    }
}

impl Service<Request<Body>> for MetricsHandler {
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = futures::future::Ready<Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        if let Some(remote) = remote_addr(&req) {
            info!("{}: scraping metrics", remote);
        }
        if req.uri().path() != &*self.endpoint {
            return futures::future::ready(Ok(not_found()));
        }

        let response = match self.registry.gather() {
            Ok(body) => respond(StatusCode::OK, Some(prometheus::TEXT_FORMAT), body),
            Err(e) => {
                tracing::error!(%e, "failed to encode metrics");
                respond(StatusCode::INTERNAL_SERVER_ERROR, None, e.to_string())
            }
        };
        futures::future::ready(Ok(response))
    }
}
