//! GeoJSON export of web-map layers.
//!
//! Each exported layer becomes one `FeatureCollection` file carrying a
//! `metadata` block that points back to the source web map:
//!
//! ```json
//! {
//!   "type": "FeatureCollection",
//!   "features": [...],
//!   "metadata": {
//!     "source_app_id": "...",
//!     "source_layer_id": "...",
//!     "source_layer_title": "...",
//!     "geometry_type": "esriGeometryPolygon",
//!     "feature_count": 42
//!   }
//! }
//! ```

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::geometry::CanonicalGeometry;

/// A converted feature: canonical geometry plus the source attributes.
#[derive(Debug, Clone, Serialize)]
pub struct GeoJsonFeature {
    #[serde(rename = "type")]
    kind: &'static str,
    pub geometry: CanonicalGeometry,
    pub properties: Map<String, Value>,
}

impl GeoJsonFeature {
    pub fn new(geometry: CanonicalGeometry, properties: Map<String, Value>) -> Self {
        Self {
            kind: "Feature",
            geometry,
            properties,
        }
    }
}

/// Where a layer came from.
#[derive(Debug, Clone, Serialize)]
pub struct LayerMetadata {
    pub source_app_id: String,
    pub source_layer_id: Value,
    pub source_layer_title: Value,
    pub geometry_type: String,
    pub feature_count: usize,
}

#[derive(Serialize)]
struct FeatureCollection<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    features: &'a [GeoJsonFeature],
    metadata: &'a LayerMetadata,
}

/// Lowercase snake_case slug for file names; `layer` when nothing survives.
pub fn sanitize_name(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            slug.push(c);
        } else if !slug.ends_with('_') {
            slug.push('_');
        }
    }
    let slug = slug.trim_matches('_');
    if slug.is_empty() {
        "layer".to_string()
    } else {
        slug.to_string()
    }
}

/// Hands out GeoJSON file names, suffixing repeated slugs with `_2`, `_3`, ...
#[derive(Debug, Default)]
pub struct FileNamer {
    prefix: String,
    used: HashSet<String>,
}

impl FileNamer {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            used: HashSet::new(),
        }
    }

    pub fn file_name(&mut self, layer_name: &str) -> String {
        let slug = sanitize_name(layer_name);
        let mut candidate = slug.clone();
        let mut n = 1;
        while !self.used.insert(candidate.clone()) {
            n += 1;
            candidate = format!("{}_{}", slug, n);
        }
        format!("{}{}.geojson", self.prefix, candidate)
    }
}

/// Write one layer as a FeatureCollection.
///
/// Returns `Ok(None)` without touching the filesystem when there are no
/// features. `metadata.feature_count` is set from `features`.
pub fn write_layer(
    features: &[GeoJsonFeature],
    mut metadata: LayerMetadata,
    output_path: &Path,
) -> Result<Option<PathBuf>> {
    if features.is_empty() {
        return Ok(None);
    }
    metadata.feature_count = features.len();

    let collection = FeatureCollection {
        kind: "FeatureCollection",
        features,
        metadata: &metadata,
    };
    let json = serde_json::to_string_pretty(&collection)?;

    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output_path, json)?;
    Ok(Some(output_path.to_path_buf()))
}
