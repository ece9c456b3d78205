//! Payload extraction from raw source text.
//!
//! Extraction is purely syntactic and happens in two stages: a marker
//! lookup that returns the located substring (or nothing), then a strict
//! JSON decode. No coordinate or attribute conversion happens here.
//!
//! Settlement pages embed two script assignments:
//!
//! ```text
//! var settlement = { "section_C/C11_Population_Estimate": "1200", ... };
//! var shape = [["6.51", "3.38"], ["6.52", "3.38"], ...];
//! ```
//!
//! Web-map exports need no marker search; the document is decoded into the
//! typed structs below and walked layer by layer with [`webmap_units`].

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{HarvestError, Result};
use crate::models::RawPayload;

/// Where an embedded block starts and how its body ends.
#[derive(Debug, Clone, Copy)]
pub struct BlockMarker {
    /// Block name used in error messages.
    pub name: &'static str,
    /// Text immediately preceding the JSON body.
    pub marker: &'static str,
    /// Closing token of the JSON body; it must be followed by [`STATEMENT_END`].
    pub close: &'static str,
}

/// Statement delimiter ending an inline assignment.
pub const STATEMENT_END: char = ';';

pub const SETTLEMENT_BLOCK: BlockMarker = BlockMarker {
    name: "settlement",
    marker: "var settlement = ",
    close: "}",
};

pub const SHAPE_BLOCK: BlockMarker = BlockMarker {
    name: "shape",
    marker: "var shape = ",
    close: "]]",
};

/// Find the JSON body of an embedded block.
///
/// Returns the text from just after the marker up to and including the
/// first occurrence of `close` followed by the statement delimiter.
pub fn locate_block<'a>(text: &'a str, block: &BlockMarker) -> Option<&'a str> {
    let start = text.find(block.marker)? + block.marker.len();
    let rest = &text[start..];
    let terminator = format!("{}{}", block.close, STATEMENT_END);
    let end = rest.find(&terminator)? + block.close.len();
    Some(&rest[..end])
}

fn decode_block<T: serde::de::DeserializeOwned>(text: &str, block: &BlockMarker) -> Result<T> {
    let body = locate_block(text, block).ok_or_else(|| {
        HarvestError::extraction(block.name, format!("marker `{}` not found", block.marker.trim()))
    })?;
    serde_json::from_str(body).map_err(|e| HarvestError::extraction(block.name, e.to_string()))
}

/// Extract the settlement attributes and raw shape from a settlement page.
pub fn parse_settlement_page(html: &str) -> Result<RawPayload> {
    let attributes: Map<String, Value> = decode_block(html, &SETTLEMENT_BLOCK)?;
    let shape: Vec<Vec<Value>> = decode_block(html, &SHAPE_BLOCK)?;
    if shape.is_empty() {
        return Err(HarvestError::extraction(
            SHAPE_BLOCK.name,
            "coordinate array is empty",
        ));
    }
    Ok(RawPayload { attributes, shape })
}

// ============ Web-map exports ============

/// ArcGIS web-map definition; only the parts we read are modelled.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebMap {
    #[serde(default)]
    pub operational_layers: Vec<OperationalLayer>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationalLayer {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub title: Value,
    #[serde(default)]
    pub feature_collection: Option<EmbeddedCollection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmbeddedCollection {
    #[serde(default)]
    pub layers: Vec<CollectionLayer>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionLayer {
    #[serde(default)]
    pub layer_definition: LayerDefinition,
    #[serde(default)]
    pub feature_set: FeatureSet,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerDefinition {
    #[serde(default)]
    pub geometry_type: Value,
    #[serde(default)]
    pub name: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeatureSet {
    #[serde(default)]
    pub features: Vec<EsriFeature>,
}

/// A feature as stored in the web map. Geometry and attributes stay untyped
/// so one odd feature cannot fail the whole document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EsriFeature {
    #[serde(default)]
    pub geometry: Value,
    #[serde(default)]
    pub attributes: Value,
}

impl EsriFeature {
    /// Attribute object, or an empty map when absent or not an object.
    pub fn properties(&self) -> Map<String, Value> {
        match &self.attributes {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        }
    }
}

/// Scalar rendered as text; empty strings and non-scalars are `None`.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// One sub-layer that declares a geometry type.
#[derive(Debug, Clone, Copy)]
pub struct LayerUnit<'a> {
    pub layer: &'a OperationalLayer,
    pub collection: &'a CollectionLayer,
    pub geometry_type: &'a str,
}

impl<'a> LayerUnit<'a> {
    /// Layer name, falling back to the operational layer's title, then id.
    pub fn display_name(&self) -> String {
        scalar_text(&self.collection.layer_definition.name)
            .or_else(|| scalar_text(&self.layer.title))
            .or_else(|| scalar_text(&self.layer.id))
            .unwrap_or_else(|| "layer".to_string())
    }

    pub fn features(&self) -> &'a [EsriFeature] {
        &self.collection.feature_set.features
    }
}

/// Decode a web-map export document.
pub fn parse_webmap(text: &str) -> Result<WebMap> {
    serde_json::from_str(text).map_err(|e| HarvestError::extraction("webmap", e.to_string()))
}

/// Yield one unit per embedded sub-layer with a non-empty geometry type.
pub fn webmap_units(webmap: &WebMap) -> Vec<LayerUnit<'_>> {
    webmap
        .operational_layers
        .iter()
        .filter_map(|layer| layer.feature_collection.as_ref().map(|fc| (layer, fc)))
        .flat_map(|(layer, fc)| {
            fc.layers.iter().filter_map(move |collection| {
                let geometry_type = collection
                    .layer_definition
                    .geometry_type
                    .as_str()
                    .unwrap_or("")
                    .trim();
                if geometry_type.is_empty() {
                    return None;
                }
                Some(LayerUnit {
                    layer,
                    collection,
                    geometry_type,
                })
            })
        })
        .collect()
}
