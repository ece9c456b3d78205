//! Error taxonomy for extraction and export.
//!
//! Per-item variants ([`HarvestError::Fetch`], [`HarvestError::Extraction`])
//! are recovered by the batch pipeline and recorded as failures. Geometry
//! variants are per-feature skips. [`HarvestError::EmptyResult`] ends the run.

/// Errors raised while harvesting and normalizing records.
#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    /// Network or HTTP failure reaching a source.
    #[error("fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },

    /// An embedded payload could not be located or decoded.
    #[error("could not extract {block} payload: {message}")]
    Extraction {
        block: &'static str,
        message: String,
    },

    /// Geometry type discriminant outside the supported set.
    #[error("unsupported geometry type: {0}")]
    UnsupportedGeometry(String),

    /// Geometry object is present but its coordinates are unusable.
    #[error("malformed geometry: {0}")]
    MalformedGeometry(String),

    /// Nothing left to write.
    #[error("{0}")]
    EmptyResult(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("shapefile error: {0}")]
    Shapefile(#[from] shapefile::Error),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

impl HarvestError {
    pub(crate) fn extraction(block: &'static str, message: impl Into<String>) -> Self {
        HarvestError::Extraction {
            block,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, HarvestError>;
