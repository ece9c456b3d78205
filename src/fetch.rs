//! HTTP access to the settlement catalogue.
//!
//! The pipeline talks to the network through [`PageFetcher`] so it can be
//! driven offline in tests. [`HttpFetcher`] is the blocking `reqwest`
//! implementation used by the CLI.

use std::time::Duration;

use serde_json::Value;

use crate::config::KycConfig;
use crate::error::{HarvestError, Result};

/// A fetched page: status code plus body text.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: u16,
    pub body: String,
}

/// Source of page bodies and JSON documents.
pub trait PageFetcher {
    /// Fetch a page body. Non-success statuses are returned, not raised, so
    /// callers can report them alongside extraction failures.
    fn fetch_page(&self, url: &str) -> Result<FetchedPage>;

    /// Fetch and decode a JSON document; non-success statuses are errors.
    fn fetch_json(&self, url: &str) -> Result<Value>;
}

/// Blocking HTTP fetcher with a fixed user agent and timeout.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(config: &KycConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| fetch_error("<client>", e))?;
        Ok(Self { client })
    }
}

fn fetch_error(url: &str, e: reqwest::Error) -> HarvestError {
    HarvestError::Fetch {
        url: url.to_string(),
        message: e.to_string(),
    }
}

impl PageFetcher for HttpFetcher {
    fn fetch_page(&self, url: &str) -> Result<FetchedPage> {
        let response = self.client.get(url).send().map_err(|e| fetch_error(url, e))?;
        let status = response.status().as_u16();
        let body = response.text().map_err(|e| fetch_error(url, e))?;
        Ok(FetchedPage { status, body })
    }

    fn fetch_json(&self, url: &str) -> Result<Value> {
        self.client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.json::<Value>())
            .map_err(|e| fetch_error(url, e))
    }
}
