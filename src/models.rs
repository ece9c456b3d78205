//! Core data models used throughout geoharvest.
//!
//! These types represent the work items, decoded payloads, and normalized
//! records that flow through the extraction pipeline.

use serde_json::{Map, Value};

use crate::geometry::CanonicalGeometry;

/// Where the page body for a [`SourceItem`] comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PagePayload {
    /// Fetched over the network; subject to the inter-item delay.
    Url(String),
    /// Already in memory.
    Inline(String),
}

/// One settlement discovered in the filter endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceItem {
    pub form_id: String,
    pub ona_id: String,
    pub name: String,
    pub city: String,
    pub country: String,
    pub payload: PagePayload,
}

impl SourceItem {
    /// URL or a placeholder for inline payloads, for messages.
    pub fn location(&self) -> &str {
        match &self.payload {
            PagePayload::Url(url) => url,
            PagePayload::Inline(_) => "<inline>",
        }
    }
}

/// Attribute mapping plus raw `[lat, lon]` pairs decoded from a page.
#[derive(Debug, Clone)]
pub struct RawPayload {
    pub attributes: Map<String, Value>,
    pub shape: Vec<Vec<Value>>,
}

/// A normalized settlement ready for export.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRecord {
    pub id: u32,
    pub country: String,
    pub city: String,
    pub name: String,
    pub last_updated: String,
    pub year: Option<i32>,
    pub population: Option<u64>,
    pub area_acres: Option<f64>,
    pub structures: Option<u64>,
    pub geometry: CanonicalGeometry,
}

/// A source item that could not be turned into a record.
#[derive(Debug, Clone)]
pub struct Failure {
    pub item: SourceItem,
    pub reason: String,
}

/// Outcome of a batch: every input item lands in exactly one list.
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub records: Vec<OutputRecord>,
    pub failures: Vec<Failure>,
}

impl BatchResult {
    pub fn processed(&self) -> usize {
        self.records.len() + self.failures.len()
    }
}
