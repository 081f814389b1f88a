// src/validate/system.rs
use reqwest::Client;

use super::ValidateError;

/// Client handles captured for one validation run.
#[derive(Debug, Clone)]
pub struct System {
    client: Client,
}

impl System {
    pub fn new() -> Result<Self, ValidateError> {
        let client = Client::builder()
            .user_agent(concat!("goss-serve/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ValidateError::System(e.to_string()))?;

        Ok(Self { client })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}
