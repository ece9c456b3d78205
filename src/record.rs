//! Attribute coercion and record building.
//!
//! Settlement attributes arrive loosely typed (numbers, numeric strings,
//! `"NA"` placeholders, dates in several layouts). Every function here is
//! total: missing or unusable data becomes `None` or the `"Unknown"`
//! sentinel instead of an error.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::geometry::{ring_from_lat_lon_pairs, CanonicalGeometry};
use crate::models::{OutputRecord, RawPayload, SourceItem};

pub const FIELD_LAST_UPDATED: &str = "section_A/A1a_Last_Updated";
pub const FIELD_PROFILE_DATE: &str = "section_A/A1_Profile_Date";
pub const FIELD_AREA_ACRES: &str = "section_B/B2b_Area_acres";
pub const FIELD_STRUCTURES: &str = "section_C/C5_Structures_Total";
pub const FIELD_HOUSEHOLDS: &str = "section_C/C9_Households";
pub const FIELD_HOUSEHOLD_SIZE: &str = "section_C/C10_Household_Size";
pub const FIELD_POPULATION: &str = "section_C/C11_Population_Estimate";

/// Date returned when no date is recorded.
pub const UNKNOWN_DATE: &str = "Unknown";

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d-%m-%Y", "%Y/%m/%d", "%d.%m.%Y"];
const ISO_DATE_FORMATS: [&str; 1] = ["%Y%m%d"];
const ISO_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"];

/// Coerce a loosely typed value to a float.
pub fn coerce_float(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() || ["na", "n/a", "nan"].contains(&s.to_ascii_lowercase().as_str()) {
                return None;
            }
            s.parse::<f64>().ok()
        }
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

/// [`coerce_float`] rounded half to even.
pub fn coerce_int(value: &Value) -> Option<i64> {
    coerce_float(value).map(|n| n.round_ties_even() as i64)
}

/// Normalize a date to `DD.MM.YYYY`, returning the year when it parsed.
///
/// Unparseable input is returned verbatim with no year.
pub fn format_date(raw: Option<&str>) -> (String, Option<i32>) {
    let raw = match raw {
        Some(raw) if !raw.trim().is_empty() => raw,
        _ => return (UNKNOWN_DATE.to_string(), None),
    };

    let text = raw.trim();
    let text = text.split_once('T').map_or(text, |(date, _)| date);

    match parse_date(text) {
        Some(date) => (date.format("%d.%m.%Y").to_string(), Some(date.year())),
        None => (raw.to_string(), None),
    }
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .chain(ISO_DATE_FORMATS.iter())
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .or_else(|| {
            ISO_DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Population from an explicit estimate, else households times household size.
pub fn derive_population(estimate: &Value, households: &Value, household_size: &Value) -> Option<u64> {
    if let Some(population) = coerce_int(estimate).filter(|p| *p > 0) {
        return Some(population as u64);
    }
    let households = coerce_float(households).unwrap_or(0.0);
    let household_size = coerce_float(household_size).unwrap_or(0.0);
    let computed = (households * household_size).round_ties_even() as i64;
    (computed > 0).then_some(computed as u64)
}

/// Text of a scalar attribute; absent, null and empty values are `None`.
fn attribute_text(attributes: &Map<String, Value>, key: &str) -> Option<String> {
    match attributes.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn attribute<'a>(attributes: &'a Map<String, Value>, key: &str) -> &'a Value {
    attributes.get(key).unwrap_or(&Value::Null)
}

/// Build the output record for one successfully extracted settlement.
pub fn build_record(id: u32, item: &SourceItem, payload: &RawPayload) -> Result<OutputRecord> {
    let attrs = &payload.attributes;

    let last_updated = attribute_text(attrs, FIELD_LAST_UPDATED)
        .or_else(|| attribute_text(attrs, FIELD_PROFILE_DATE));
    let (last_updated, year) = format_date(last_updated.as_deref());

    let population = derive_population(
        attribute(attrs, FIELD_POPULATION),
        attribute(attrs, FIELD_HOUSEHOLDS),
        attribute(attrs, FIELD_HOUSEHOLD_SIZE),
    );
    let area_acres = coerce_float(attribute(attrs, FIELD_AREA_ACRES)).filter(|a| *a >= 0.0);
    let structures = coerce_int(attribute(attrs, FIELD_STRUCTURES))
        .filter(|s| *s >= 0)
        .map(|s| s as u64);

    let ring = ring_from_lat_lon_pairs(&payload.shape)?;

    Ok(OutputRecord {
        id,
        country: item.country.clone(),
        city: item.city.clone(),
        name: item.name.clone(),
        last_updated,
        year,
        population,
        area_acres,
        structures,
        geometry: CanonicalGeometry::Polygon(vec![ring]),
    })
}
