// src/gate/snapshot.rs
use hyper::body::Bytes;
use hyper::StatusCode;
use std::time::{Duration, SystemTime};

/// One rendered validation run. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedSnapshot {
    pub exit_status: i32,
    pub body: Bytes,
    pub created_at: SystemTime,
}

impl CachedSnapshot {
    pub fn new(exit_status: i32, body: impl Into<Bytes>) -> Self {
        Self {
            exit_status,
            body: body.into(),
            created_at: SystemTime::now(),
        }
    }

    /// Time since the run was rendered. Zero if the wall clock stepped back.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed().unwrap_or_default()
    }

    pub fn is_healthy(&self) -> bool {
        self.exit_status == 0
    }

    /// 200 when every check passed, 503 otherwise.
    pub fn status_code(&self) -> StatusCode {
        if self.is_healthy() {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
