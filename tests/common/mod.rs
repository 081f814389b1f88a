// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing_subscriber::fmt::MakeWriter;

use goss_serve::gate::HealthGate;
use goss_serve::outputs::{DocumentationOutputer, OutputConfig, Outputer};
use goss_serve::validate::{OutcomeGroup, OutcomeStream, System, TestResult, ValidateError, Validator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    Succeed,
    FailSnapshot,
    Panic,
}

/// Validator double that replays fixed outcomes and counts its runs.
pub struct ScriptedValidator {
    outcomes: Vec<(String, bool)>,
    delay: Duration,
    behavior: Behavior,
    snapshots: AtomicUsize,
    runs: AtomicUsize,
}

impl ScriptedValidator {
    /// `outcomes` is a list of (resource id, successful).
    pub fn new(outcomes: &[(&str, bool)]) -> Self {
        Self {
            outcomes: outcomes.iter().map(|(id, ok)| (id.to_string(), *ok)).collect(),
            delay: Duration::ZERO,
            behavior: Behavior::Succeed,
            snapshots: AtomicUsize::new(0),
            runs: AtomicUsize::new(0),
        }
    }

    pub fn passing() -> Self {
        Self::new(&[("check-a", true)])
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_behavior(mut self, behavior: Behavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// How many recomputations were attempted.
    pub fn snapshots(&self) -> usize {
        self.snapshots.load(Ordering::SeqCst)
    }

    /// How many validation streams were produced.
    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Validator for ScriptedValidator {
    async fn snapshot(&self) -> Result<System, ValidateError> {
        self.snapshots.fetch_add(1, Ordering::SeqCst);
        if self.behavior == Behavior::FailSnapshot {
            return Err(ValidateError::System("host unreachable".into()));
        }
        System::new()
    }

    fn validate(&self, _sys: Arc<System>, _max_concurrent: usize) -> OutcomeStream {
        if self.behavior == Behavior::Panic {
            panic!("check engine exploded");
        }
        let run = self.runs.fetch_add(1, Ordering::SeqCst) + 1;
        let delay = self.delay;
        let groups: Vec<OutcomeGroup> = self
            .outcomes
            .iter()
            .map(|(id, ok)| vec![result(id, *ok, &format!("run-{}", run))])
            .collect();

        let (tx, rx) = mpsc::channel(8);
        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            for group in groups {
                if tx.send(group).await.is_err() {
                    break;
                }
            }
        });
        rx
    }
}

pub fn result(resource_id: &str, successful: bool, title: &str) -> TestResult {
    let builder = TestResult::new("command", resource_id, "exit-status", title);
    if successful {
        builder.compare(0, 0)
    } else {
        builder.compare(0, 1)
    }
}

/// A closed stream carrying `groups`.
pub fn stream_of(groups: Vec<OutcomeGroup>) -> OutcomeStream {
    let (tx, rx) = mpsc::channel(groups.len().max(1));
    for group in groups {
        tx.try_send(group).expect("channel sized for every group");
    }
    rx
}

pub fn gate_with(validator: Arc<ScriptedValidator>, ttl: Duration) -> HealthGate {
    gate_with_outputer(validator, Arc::new(DocumentationOutputer), ttl)
}

pub fn gate_with_outputer(
    validator: Arc<ScriptedValidator>,
    outputer: Arc<dyn Outputer>,
    ttl: Duration,
) -> HealthGate {
    HealthGate::new(validator, outputer, OutputConfig::default(), ttl, 4)
}

/// Collects formatted log lines in memory.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// Routes this thread's events here until the guard drops.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
