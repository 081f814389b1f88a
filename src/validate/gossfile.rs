// src/validate/gossfile.rs
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use super::ValidateError;

/// The set of checks to run, keyed by resource id within each type.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Gossfile {
    #[serde(default)]
    pub command: BTreeMap<String, CommandCheck>,
    #[serde(default)]
    pub file: BTreeMap<String, FileCheck>,
    #[serde(default)]
    pub http: BTreeMap<String, HttpCheck>,
    #[serde(default)]
    pub addr: BTreeMap<String, AddrCheck>,
}

impl Gossfile {
    /// Reads a YAML or JSON check-set, picked by file extension.
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self, ValidateError> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ValidateError::Read {
                path: path.display().to_string(),
                source,
            })?;

        Self::parse(&contents, is_json(path))
    }

    pub fn parse(contents: &str, json: bool) -> Result<Self, ValidateError> {
        if json {
            serde_json::from_str(contents).map_err(|e| ValidateError::Parse(e.to_string()))
        } else {
            serde_yaml::from_str(contents).map_err(|e| ValidateError::Parse(e.to_string()))
        }
    }

    pub fn len(&self) -> usize {
        self.command.len() + self.file.len() + self.http.len() + self.addr.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().and_then(|s| s.to_str()) == Some("json")
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommandCheck {
    #[serde(default)]
    pub exit_status: i32,
    #[serde(default)]
    pub stdout: Vec<String>,
    #[serde(default = "default_command_timeout")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub title: String,
}

impl CommandCheck {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileCheck {
    #[serde(default = "default_true")]
    pub exists: bool,
    #[serde(default)]
    pub contains: Vec<String>,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpCheck {
    #[serde(default = "default_http_status")]
    pub status: u16,
    #[serde(default)]
    pub body: Vec<String>,
    #[serde(default = "default_http_timeout")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub title: String,
}

impl HttpCheck {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddrCheck {
    #[serde(default = "default_true")]
    pub reachable: bool,
    #[serde(default = "default_addr_timeout")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub title: String,
}

impl AddrCheck {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_true() -> bool {
    true
}

fn default_command_timeout() -> u64 {
    10_000
}

fn default_http_status() -> u16 {
    200
}

fn default_http_timeout() -> u64 {
    5_000
}

fn default_addr_timeout() -> u64 {
    500
}
