// src/outputs/documentation.rs
use async_trait::async_trait;
use std::fmt::Write;
use std::time::Instant;

use super::{drain, exit_status, OutputConfig, Outputer, Rendered};
use crate::validate::{OutcomeStream, TestResult};

/// Plain text, one line per result followed by a failure section and totals.
pub struct DocumentationOutputer;

#[async_trait]
impl Outputer for DocumentationOutputer {
    async fn output(
        &self,
        results: OutcomeStream,
        start_time: Instant,
        _config: &OutputConfig,
    ) -> Rendered {
        let results = drain(results).await;
        let failed: Vec<&TestResult> = results.iter().filter(|r| !r.successful).collect();

        let mut out = String::new();
        for result in &results {
            let _ = writeln!(out, "{}", line(result));
        }

        if !failed.is_empty() {
            out.push_str("\n\nFailures:\n");
            for result in &failed {
                out.push('\n');
                if !result.title.is_empty() {
                    let _ = writeln!(out, "Title: {}", result.title);
                }
                let _ = writeln!(out, "{}", line(result));
            }
        }

        let _ = write!(
            out,
            "\nTotal Duration: {:.3}s\nCount: {}, Failed: {}\n",
            start_time.elapsed().as_secs_f64(),
            results.len(),
            failed.len()
        );

        Rendered {
            exit_status: exit_status(failed.len()),
            body: out.into_bytes(),
        }
    }

    fn name(&self) -> &'static str {
        "documentation"
    }
}

fn line(result: &TestResult) -> String {
    format!(
        "{}: {}: {}: {}",
        result.resource_type,
        result.resource_id,
        result.property,
        result.summary()
    )
}
