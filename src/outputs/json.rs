// src/outputs/json.rs
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::time::Instant;
use tracing::error;

use super::{drain, exit_status, OutputConfig, OutputError, Outputer, Rendered};
use crate::validate::{OutcomeStream, TestResult};

pub struct JsonOutputer;

#[derive(Serialize)]
struct Report<'a> {
    results: &'a [TestResult],
    summary: Summary,
}

#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct Summary {
    test_count: usize,
    failed_count: usize,
    /// Milliseconds.
    total_duration: u64,
    generated_at: String,
}

#[derive(Serialize)]
struct ErrorReport<'a> {
    error: &'a str,
}

impl JsonOutputer {
    fn encode<T: Serialize>(value: &T, pretty: bool) -> Result<Vec<u8>, OutputError> {
        let encoded = if pretty {
            serde_json::to_vec_pretty(value)
        } else {
            serde_json::to_vec(value)
        };
        encoded.map_err(|e| OutputError::Encode(e.to_string()))
    }
}

#[async_trait]
impl Outputer for JsonOutputer {
    async fn output(
        &self,
        results: OutcomeStream,
        start_time: Instant,
        config: &OutputConfig,
    ) -> Rendered {
        let results = drain(results).await;
        let failed_count = results.iter().filter(|r| !r.successful).count();

        let report = Report {
            results: &results,
            summary: Summary {
                test_count: results.len(),
                failed_count,
                total_duration: start_time.elapsed().as_millis() as u64,
                generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            },
        };

        match Self::encode(&report, config.has_option("pretty")) {
            Ok(body) => Rendered {
                exit_status: exit_status(failed_count),
                body,
            },
            Err(e) => {
                error!(%e, "json rendering failed");
                Rendered {
                    exit_status: 1,
                    body: self.render_error(&e.to_string()),
                }
            }
        }
    }

    fn render_error(&self, err: &str) -> Vec<u8> {
        // Serializing a single string field cannot fail.
        serde_json::to_vec(&ErrorReport { error: err }).unwrap_or_default()
    }

    fn name(&self) -> &'static str {
        "json"
    }
}
