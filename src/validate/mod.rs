// src/validate/mod.rs
//! Check execution. Produces a stream of result groups that closes once
//! every check has reported.
mod checks;
mod gossfile;
mod resource;
mod system;

pub use checks::Check;
pub use gossfile::{AddrCheck, CommandCheck, FileCheck, Gossfile, HttpCheck};
pub use resource::{OutcomeGroup, TestResult, TestResultBuilder};
pub use system::System;

use async_trait::async_trait;
use futures::StreamExt;
use std::any::Any;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Best-effort text of a caught panic payload.
pub fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Receiving half of a validation run.
pub type OutcomeStream = mpsc::Receiver<OutcomeGroup>;

const STREAM_BUFFER: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum ValidateError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse check-set: {0}")]
    Parse(String),

    #[error("could not capture system state: {0}")]
    System(String),
}

#[async_trait]
pub trait Validator: Send + Sync {
    /// Captures a fresh view of the host to validate against.
    async fn snapshot(&self) -> Result<System, ValidateError>;

    /// Starts every check against `sys`, at most `max_concurrent` at a time.
    fn validate(&self, sys: Arc<System>, max_concurrent: usize) -> OutcomeStream;
}

/// Runs the checks of a [`Gossfile`].
pub struct GossValidator {
    checks: Arc<Vec<Check>>,
}

impl GossValidator {
    pub fn new(gossfile: &Gossfile) -> Self {
        Self {
            checks: Arc::new(Check::all(gossfile)),
        }
    }

    pub async fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ValidateError> {
        let gossfile = Gossfile::load(path.as_ref()).await?;
        info!(
            path = %path.as_ref().display(),
            checks = gossfile.len(),
            "Loaded check-set"
        );
        Ok(Self::new(&gossfile))
    }

    pub fn check_count(&self) -> usize {
        self.checks.len()
    }
}

#[async_trait]
impl Validator for GossValidator {
    async fn snapshot(&self) -> Result<System, ValidateError> {
        System::new()
    }

    fn validate(&self, sys: Arc<System>, max_concurrent: usize) -> OutcomeStream {
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let checks = self.checks.clone();
        let limit = max_concurrent.max(1);

        tokio::spawn(async move {
            futures::stream::iter(checks.iter())
                .for_each_concurrent(limit, |check| {
                    let tx = tx.clone();
                    let sys = sys.clone();
                    async move {
                        let group = check.run_guarded(&sys).await;
                        if tx.send(group).await.is_err() {
                            debug!("result receiver dropped");
                        }
                    }
                })
                .await;
            // `tx` drops here, closing the stream.
        });

        rx
    }
}
