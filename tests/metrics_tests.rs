// tests/metrics_tests.rs
mod common;

use common::{gate_with_outputer, result, stream_of, Behavior, ScriptedValidator};
use hyper::{Body, Request, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use goss_serve::metrics::{MetricsProjector, MetricsRefresher, MetricsRegistry};
use goss_serve::outputs::{self, Outputer};
use goss_serve::config::OutputFormat;
use goss_serve::server::HealthHandler;

fn projector() -> (MetricsRegistry, Arc<MetricsProjector>) {
    let registry = MetricsRegistry::new();
    let projector = Arc::new(MetricsProjector::new(&registry).unwrap());
    (registry, projector)
}

#[tokio::test]
async fn every_outcome_sets_a_gauge() {
    let (_registry, projector) = projector();

    let summary = projector
        .project(stream_of(vec![
            vec![result("a", true, ""), result("b", false, "")],
            vec![result("c", true, "")],
            vec![],
            vec![result("d", false, "")],
        ]))
        .await;

    assert_eq!(summary.count, 4);
    assert_eq!(summary.failed, 2);
    assert_eq!(projector.series_count(), 4);
    assert_eq!(projector.value("command", "a", "exit-status", ""), Some(0.0));
    assert_eq!(projector.value("command", "b", "exit-status", ""), Some(1.0));
    assert_eq!(projector.value("command", "d", "exit-status", ""), Some(1.0));
    assert_eq!(projector.value("command", "zzz", "exit-status", ""), None);
}

#[tokio::test]
async fn repeated_label_tuples_keep_the_latest_value() {
    let (_registry, projector) = projector();

    projector
        .project(stream_of(vec![vec![result("a", false, "")]]))
        .await;
    projector
        .project(stream_of(vec![vec![result("a", true, "")]]))
        .await;

    assert_eq!(projector.series_count(), 1);
    assert_eq!(projector.value("command", "a", "exit-status", ""), Some(0.0));
}

#[tokio::test]
async fn series_from_earlier_runs_are_not_pruned() {
    let (registry, projector) = projector();

    projector
        .project(stream_of(vec![vec![result("x", false, "run A")]]))
        .await;
    projector
        .project(stream_of(vec![vec![result("y", true, "run B")]]))
        .await;

    assert_eq!(projector.value("command", "x", "exit-status", "run A"), Some(1.0));
    assert_eq!(projector.value("command", "y", "exit-status", "run B"), Some(0.0));
    assert_eq!(projector.series_count(), 2);

    let text = String::from_utf8(registry.gather().unwrap()).unwrap();
    assert!(text.contains("resource_id=\"x\""));
    assert!(text.contains("resource_id=\"y\""));
}

#[tokio::test]
async fn separate_registries_do_not_share_gauges() {
    let (_a_registry, a) = projector();
    let (_b_registry, b) = projector();

    a.record(&result("only-a", true, ""));
    assert_eq!(a.series_count(), 1);
    assert_eq!(b.series_count(), 0);
}

#[tokio::test]
async fn one_failure_among_three_is_unhealthy_everywhere() {
    let (registry, projector) = projector();
    let validator = Arc::new(ScriptedValidator::new(&[
        ("web", true),
        ("db", false),
        ("cache", true),
    ]));
    let outputer = outputs::outputer(OutputFormat::Prometheus, &registry, &projector);
    assert_eq!(outputer.name(), "prometheus");

    let gate = Arc::new(gate_with_outputer(validator, outputer, Duration::from_secs(5)));
    let snapshot = gate.handle(None).await;
    assert_ne!(snapshot.exit_status, 0);

    let handler = HealthHandler::new(gate, "/healthz", OutputFormat::Prometheus.content_type());
    let response = handler
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
    assert!(!body.is_empty());

    assert_eq!(projector.value("command", "db", "exit-status", "run-1"), Some(1.0));
    assert_eq!(projector.value("command", "web", "exit-status", "run-1"), Some(0.0));
    assert_eq!(projector.value("command", "cache", "exit-status", "run-1"), Some(0.0));
}

#[tokio::test]
async fn refresher_projects_a_full_run() {
    let (_registry, projector) = projector();
    let validator = Arc::new(ScriptedValidator::new(&[("web", true), ("db", false)]));
    let refresher = MetricsRefresher::new(
        validator.clone(),
        projector.clone(),
        2,
        Duration::from_secs(60),
    );

    let summary = refresher.refresh_once().await.unwrap();
    assert_eq!(summary.count, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(validator.runs(), 1);
    assert_eq!(projector.value("command", "db", "exit-status", "run-1"), Some(1.0));
}

#[tokio::test]
async fn refresher_stops_on_shutdown() {
    let (_registry, projector) = projector();
    let validator = Arc::new(ScriptedValidator::passing());
    let refresher = Arc::new(MetricsRefresher::new(
        validator.clone(),
        projector,
        2,
        Duration::from_millis(20),
    ));

    let task = tokio::spawn(refresher.clone().start());
    tokio::time::sleep(Duration::from_millis(70)).await;
    refresher.shutdown();
    tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .expect("refresher did not stop")
        .unwrap();

    assert!(validator.runs() >= 2);
}

#[tokio::test]
async fn refresher_survives_a_panicking_pass() {
    let (_registry, projector) = projector();
    let validator = Arc::new(ScriptedValidator::passing().with_behavior(Behavior::Panic));
    let refresher = Arc::new(MetricsRefresher::new(
        validator.clone(),
        projector.clone(),
        2,
        Duration::from_millis(20),
    ));

    let task = tokio::spawn(refresher.clone().start());
    tokio::time::sleep(Duration::from_millis(70)).await;
    assert!(!task.is_finished());
    refresher.shutdown();
    tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .expect("refresher did not stop")
        .expect("refresher task panicked");

    // Every tick still reached the validator.
    assert!(validator.snapshots() >= 2);
    assert_eq!(projector.series_count(), 0);
}
