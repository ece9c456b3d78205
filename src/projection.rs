//! Coordinate reference system helpers.
//!
//! Two independent pipelines live here and must not be mixed:
//!
//! - Web-map exports carry Web Mercator (EPSG:3857) meters, inverted with
//!   [`mercator_to_lonlat`].
//! - Settlement pages carry WGS84 degrees as `[lat, lon]` pairs, which are
//!   only parsed with [`parse_degree`] and reordered.

use serde::Serialize;
use serde_json::Value;
use std::f64::consts::PI;

use crate::error::{HarvestError, Result};

/// Half the EPSG:3857 world circumference, in meters.
pub const ORIGIN_SHIFT: f64 = PI * 6_378_137.0;

/// WGS84 geographic CRS written to the `.prj` component of a bundle.
pub const WGS84_PRJ: &str = concat!(
    r#"GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563]],"#,
    r#"PRIMEM["Greenwich",0],UNIT["degree",0.0174532925199433]]"#
);

/// A longitude/latitude position in degrees. Serializes as `[lon, lat]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LonLat(pub f64, pub f64);

impl LonLat {
    pub fn lon(&self) -> f64 {
        self.0
    }

    pub fn lat(&self) -> f64 {
        self.1
    }
}

/// Convert Web Mercator meters to longitude/latitude degrees.
///
/// Spherical inverse; no special handling near the poles.
pub fn mercator_to_lonlat(x: f64, y: f64) -> LonLat {
    let lon = (x / ORIGIN_SHIFT) * 180.0;
    let lat = (y / ORIGIN_SHIFT) * 180.0;
    let lat = 180.0 / PI * (2.0 * (lat * PI / 180.0).exp().atan() - PI / 2.0);
    LonLat(lon, lat)
}

/// Parse a degree value that may arrive as a JSON number or a numeric string.
pub fn parse_degree(value: &Value) -> Result<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(HarvestError::extraction(
            "shape",
            format!("invalid coordinate value: {}", value),
        )),
    }
}

/// Parse one `[lat, lon]` pair from a settlement page into a position.
pub fn lat_lon_pair(pair: &[Value]) -> Result<LonLat> {
    match pair {
        [lat, lon] => Ok(LonLat(parse_degree(lon)?, parse_degree(lat)?)),
        _ => Err(HarvestError::extraction(
            "shape",
            format!("expected [lat, lon] pair, got {} values", pair.len()),
        )),
    }
}
