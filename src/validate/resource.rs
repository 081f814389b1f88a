// src/validate/resource.rs
use serde::Serialize;
use std::time::Duration;

/// One pass/fail assertion against one property of one resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestResult {
    pub resource_type: String,
    pub resource_id: String,
    pub property: String,
    pub title: String,
    pub successful: bool,
    pub expected: String,
    pub found: String,
    #[serde(serialize_with = "as_millis")]
    pub duration: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub err: Option<String>,
}

/// A batch of results, one per checked resource.
pub type OutcomeGroup = Vec<TestResult>;

impl TestResult {
    pub fn new(
        resource_type: &str,
        resource_id: &str,
        property: &str,
        title: &str,
    ) -> TestResultBuilder {
        TestResultBuilder {
            result: TestResult {
                resource_type: resource_type.to_string(),
                resource_id: resource_id.to_string(),
                property: property.to_string(),
                title: title.to_string(),
                successful: false,
                expected: String::new(),
                found: String::new(),
                duration: Duration::ZERO,
                err: None,
            },
        }
    }

    /// Human readable one-liner used by the text renderer.
    pub fn summary(&self) -> String {
        if let Some(err) = &self.err {
            return format!("Error: {}", err);
        }
        if self.successful {
            format!("matches expectation: {}", self.expected)
        } else {
            format!("Expected {} but got {}", self.expected, self.found)
        }
    }
}

pub struct TestResultBuilder {
    result: TestResult,
}

impl TestResultBuilder {
    pub fn duration(mut self, duration: Duration) -> Self {
        self.result.duration = duration;
        self
    }

    /// Compares `expected` to `found`.
    pub fn compare<T: PartialEq + ToString>(mut self, expected: T, found: T) -> TestResult {
        self.result.successful = expected == found;
        self.result.expected = expected.to_string();
        self.result.found = found.to_string();
        self.result
    }

    /// Passes when every needle occurs in `haystack`.
    pub fn contains_all(mut self, needles: &[String], haystack: &str) -> TestResult {
        let missing: Vec<&str> = needles
            .iter()
            .filter(|n| !haystack.contains(n.as_str()))
            .map(String::as_str)
            .collect();
        self.result.successful = missing.is_empty();
        self.result.expected = format!("{:?}", needles);
        self.result.found = if missing.is_empty() {
            self.result.expected.clone()
        } else {
            format!("missing {:?}", missing)
        };
        self.result
    }

    /// A result that could not be evaluated; always a failure.
    pub fn error(mut self, err: impl ToString) -> TestResult {
        self.result.successful = false;
        self.result.err = Some(err.to_string());
        self.result
    }
}

fn as_millis<S: serde::Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}
