//! Geometry normalization.
//!
//! Maps ESRI JSON geometries (already decoded into [`serde_json::Value`])
//! and settlement-page coordinate arrays onto [`CanonicalGeometry`].
//!
//! Source rings never declare interior/exterior roles, so polygon holes are
//! not reconstructed: a geometry with several rings becomes a
//! `MultiPolygon` in which every ring is its own polygon.

use serde::Serialize;
use serde_json::Value;

use crate::error::{HarvestError, Result};
use crate::projection::{lat_lon_pair, mercator_to_lonlat, LonLat};

/// An ordered sequence of positions; closed when used as a polygon boundary.
pub type Ring = Vec<LonLat>;

/// Normalized geometry. Serializes as a GeoJSON geometry object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum CanonicalGeometry {
    Point(LonLat),
    LineString(Vec<LonLat>),
    MultiLineString(Vec<Vec<LonLat>>),
    Polygon(Vec<Ring>),
    MultiPolygon(Vec<Vec<Ring>>),
}

impl CanonicalGeometry {
    pub fn type_name(&self) -> &'static str {
        match self {
            CanonicalGeometry::Point(_) => "Point",
            CanonicalGeometry::LineString(_) => "LineString",
            CanonicalGeometry::MultiLineString(_) => "MultiLineString",
            CanonicalGeometry::Polygon(_) => "Polygon",
            CanonicalGeometry::MultiPolygon(_) => "MultiPolygon",
        }
    }
}

/// ESRI geometry type discriminants we know how to convert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryKind {
    Point,
    Polyline,
    Polygon,
}

impl GeometryKind {
    pub fn parse(discriminant: &str) -> Result<Self> {
        match discriminant {
            "esriGeometryPoint" => Ok(GeometryKind::Point),
            "esriGeometryPolyline" => Ok(GeometryKind::Polyline),
            "esriGeometryPolygon" => Ok(GeometryKind::Polygon),
            other => Err(HarvestError::UnsupportedGeometry(other.to_string())),
        }
    }
}

/// Close a ring in place by appending its first point when needed.
///
/// Idempotent: an already-closed ring is left untouched.
pub fn close_ring(ring: &mut Ring) {
    if let (Some(first), Some(last)) = (ring.first().copied(), ring.last()) {
        if first != *last {
            ring.push(first);
        }
    }
}

/// Convert an ESRI geometry in Web Mercator to a canonical WGS84 geometry.
///
/// Returns `Ok(None)` when the geometry is absent or has nothing left after
/// conversion.
pub fn normalize_esri(geometry: &Value, geometry_type: &str) -> Result<Option<CanonicalGeometry>> {
    let is_empty = match geometry {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    };
    if is_empty {
        return Ok(None);
    }

    match GeometryKind::parse(geometry_type)? {
        GeometryKind::Point => {
            let x = coordinate(geometry.get("x"), "x")?;
            let y = coordinate(geometry.get("y"), "y")?;
            Ok(Some(CanonicalGeometry::Point(mercator_to_lonlat(x, y))))
        }
        GeometryKind::Polyline => {
            let mut lines = convert_parts(geometry.get("paths"), "paths")?;
            lines.retain(|line| !line.is_empty());
            Ok(match lines.len() {
                0 => None,
                1 => lines.pop().map(CanonicalGeometry::LineString),
                _ => Some(CanonicalGeometry::MultiLineString(lines)),
            })
        }
        GeometryKind::Polygon => {
            let mut rings = convert_parts(geometry.get("rings"), "rings")?;
            rings.retain(|ring| !ring.is_empty());
            for ring in rings.iter_mut() {
                close_ring(ring);
            }
            Ok(match rings.len() {
                0 => None,
                1 => Some(CanonicalGeometry::Polygon(rings)),
                _ => Some(CanonicalGeometry::MultiPolygon(
                    rings.into_iter().map(|ring| vec![ring]).collect(),
                )),
            })
        }
    }
}

/// Build a closed polygon ring from settlement-page `[lat, lon]` pairs.
pub fn ring_from_lat_lon_pairs(pairs: &[Vec<Value>]) -> Result<Ring> {
    let mut ring = pairs
        .iter()
        .map(|pair| lat_lon_pair(pair))
        .collect::<Result<Ring>>()?;
    close_ring(&mut ring);
    Ok(ring)
}

fn coordinate(value: Option<&Value>, name: &str) -> Result<f64> {
    value
        .and_then(Value::as_f64)
        .ok_or_else(|| HarvestError::MalformedGeometry(format!("missing or non-numeric {}", name)))
}

/// Convert a list of paths or rings. A missing key counts as no parts.
fn convert_parts(parts: Option<&Value>, key: &str) -> Result<Vec<Vec<LonLat>>> {
    let parts = match parts {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(parts)) => parts,
        Some(_) => {
            return Err(HarvestError::MalformedGeometry(format!(
                "{} is not an array",
                key
            )))
        }
    };

    parts
        .iter()
        .map(|part| {
            let vertices = part.as_array().ok_or_else(|| {
                HarvestError::MalformedGeometry(format!("{} entry is not an array", key))
            })?;
            vertices.iter().map(|v| mercator_vertex(v, key)).collect()
        })
        .collect()
}

/// Vertices may carry z/m values after x and y; only x and y are used.
fn mercator_vertex(vertex: &Value, key: &str) -> Result<LonLat> {
    let xy = vertex
        .as_array()
        .filter(|members| members.len() >= 2)
        .and_then(|members| Some((members[0].as_f64()?, members[1].as_f64()?)));
    match xy {
        Some((x, y)) => Ok(mercator_to_lonlat(x, y)),
        None => Err(HarvestError::MalformedGeometry(format!(
            "invalid vertex in {}: {}",
            key, vertex
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn square(offset: f64) -> Value {
        json!([
            [offset, offset],
            [offset + 1000.0, offset],
            [offset + 1000.0, offset + 1000.0],
            [offset, offset]
        ])
    }

    #[test]
    fn point_converts_from_mercator() {
        let geom = normalize_esri(&json!({"x": 0.0, "y": 0.0}), "esriGeometryPoint")
            .unwrap()
            .unwrap();
        assert_eq!(geom, CanonicalGeometry::Point(LonLat(0.0, 0.0)));
    }

    #[test]
    fn point_without_y_is_malformed() {
        let err = normalize_esri(&json!({"x": 1.0}), "esriGeometryPoint").unwrap_err();
        assert!(matches!(err, HarvestError::MalformedGeometry(_)));
    }

    #[test]
    fn empty_geometry_is_none_even_for_unknown_type() {
        assert!(normalize_esri(&json!({}), "esriGeometryPolygon").unwrap().is_none());
        assert!(normalize_esri(&Value::Null, "esriGeometryMultipoint").unwrap().is_none());
    }

    #[test]
    fn single_path_is_linestring() {
        let geom = normalize_esri(
            &json!({"paths": [[[0.0, 0.0], [10.0, 10.0]]]}),
            "esriGeometryPolyline",
        )
        .unwrap()
        .unwrap();
        match geom {
            CanonicalGeometry::LineString(line) => assert_eq!(line.len(), 2),
            other => panic!("expected LineString, got {:?}", other),
        }
    }

    #[test]
    fn multiple_paths_stay_siblings() {
        let geom = normalize_esri(
            &json!({"paths": [[[0.0, 0.0], [1.0, 1.0]], [], [[2.0, 2.0, 5.0], [3.0, 3.0, 5.0]]]}),
            "esriGeometryPolyline",
        )
        .unwrap()
        .unwrap();
        match geom {
            CanonicalGeometry::MultiLineString(lines) => {
                assert_eq!(lines.len(), 2);
                assert_eq!(lines[1].len(), 2);
            }
            other => panic!("expected MultiLineString, got {:?}", other),
        }
    }

    #[test]
    fn no_paths_is_none() {
        assert!(normalize_esri(&json!({"paths": [[]]}), "esriGeometryPolyline")
            .unwrap()
            .is_none());
        assert!(normalize_esri(&json!({"spatialReference": {"wkid": 102100}}), "esriGeometryPolyline")
            .unwrap()
            .is_none());
    }

    #[test]
    fn single_ring_is_polygon() {
        let geom = normalize_esri(&json!({"rings": [square(0.0)]}), "esriGeometryPolygon")
            .unwrap()
            .unwrap();
        match geom {
            CanonicalGeometry::Polygon(rings) => {
                assert_eq!(rings.len(), 1);
                assert_eq!(rings[0].len(), 4);
            }
            other => panic!("expected Polygon, got {:?}", other),
        }
    }

    #[test]
    fn multiple_rings_become_independent_polygons() {
        let geom = normalize_esri(
            &json!({"rings": [square(0.0), [], square(5000.0)]}),
            "esriGeometryPolygon",
        )
        .unwrap()
        .unwrap();
        match geom {
            CanonicalGeometry::MultiPolygon(polygons) => {
                assert_eq!(polygons.len(), 2);
                assert!(polygons.iter().all(|p| p.len() == 1));
            }
            other => panic!("expected MultiPolygon, got {:?}", other),
        }
    }

    #[test]
    fn open_rings_are_closed_once() {
        let geom = normalize_esri(
            &json!({"rings": [[[0.0, 0.0], [1000.0, 0.0], [1000.0, 1000.0]]]}),
            "esriGeometryPolygon",
        )
        .unwrap()
        .unwrap();
        let CanonicalGeometry::Polygon(rings) = geom else {
            panic!("expected Polygon");
        };
        assert_eq!(rings[0].len(), 4);
        assert_eq!(rings[0].first(), rings[0].last());
    }

    #[test]
    fn closing_is_idempotent() {
        let mut ring = vec![LonLat(0.0, 0.0), LonLat(1.0, 0.0), LonLat(1.0, 1.0)];
        close_ring(&mut ring);
        let closed = ring.clone();
        close_ring(&mut ring);
        assert_eq!(ring, closed);
        assert_eq!(ring.len(), 4);

        let mut empty: Ring = Vec::new();
        close_ring(&mut empty);
        assert!(empty.is_empty());
    }

    #[test]
    fn multipoint_is_unsupported() {
        let err = normalize_esri(&json!({"points": [[0.0, 0.0]]}), "esriGeometryMultipoint")
            .unwrap_err();
        match err {
            HarvestError::UnsupportedGeometry(kind) => assert_eq!(kind, "esriGeometryMultipoint"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn lat_lon_pairs_build_closed_ring() {
        let pairs = vec![
            vec![json!("6.5"), json!("3.3")],
            vec![json!("6.6"), json!("3.3")],
            vec![json!("6.6"), json!("3.4")],
        ];
        let ring = ring_from_lat_lon_pairs(&pairs).unwrap();
        assert_eq!(ring.len(), 4);
        assert_eq!(ring[0], LonLat(3.3, 6.5));
        assert_eq!(ring[3], ring[0]);
    }

    #[test]
    fn geojson_serialization() {
        let geom = CanonicalGeometry::Point(LonLat(3.5, 6.5));
        let json = serde_json::to_value(&geom).unwrap();
        assert_eq!(json, json!({"type": "Point", "coordinates": [3.5, 6.5]}));

        let geom = CanonicalGeometry::MultiPolygon(vec![vec![vec![LonLat(0.0, 0.0)]]]);
        let json = serde_json::to_value(&geom).unwrap();
        assert_eq!(json["type"], "MultiPolygon");
        assert_eq!(json["coordinates"], json!([[[[0.0, 0.0]]]]));
    }

    #[test]
    fn kind_parses_supported_discriminants() {
        assert_eq!(GeometryKind::parse("esriGeometryPoint").unwrap(), GeometryKind::Point);
        assert_eq!(GeometryKind::parse("esriGeometryPolyline").unwrap(), GeometryKind::Polyline);
        assert_eq!(GeometryKind::parse("esriGeometryPolygon").unwrap(), GeometryKind::Polygon);
    }
}
