//! Settlement catalogue discovery.
//!
//! Turns the filter endpoint payload into an ordered list of
//! [`SourceItem`]s for one country:
//!
//! ```json
//! {"verified": {"Nigeria": {
//!     "info": {...},
//!     "Lagos": [{"form_id": 12, "ona_id": 345, "name": "Makoko"}]
//! }}}
//! ```
//!
//! Entries without a `form_id` or `ona_id` are skipped.

use anyhow::{bail, Result};
use serde_json::Value;
use tracing::debug;

use crate::config::KycConfig;
use crate::models::{PagePayload, SourceItem};

/// Pseudo-city key holding country metadata rather than settlements.
const INFO_KEY: &str = "info";

/// List every settlement of `country` in filter-endpoint order.
pub fn list_country_settlements(
    payload: &Value,
    country: &str,
    kyc: &KycConfig,
) -> Result<Vec<SourceItem>> {
    let Some(cities) = payload
        .get("verified")
        .and_then(|verified| verified.get(country))
        .and_then(Value::as_object)
    else {
        bail!("Country '{}' not found in filter data", country);
    };

    let mut items = Vec::new();
    for (city, entries) in cities {
        if city == INFO_KEY {
            continue;
        }
        let Some(entries) = entries.as_array() else {
            continue;
        };
        for entry in entries.iter().filter_map(Value::as_object) {
            let (Some(form_id), Some(ona_id)) = (
                id_text(entry.get("form_id")),
                id_text(entry.get("ona_id")),
            ) else {
                debug!(city = %city, "skipping entry without form_id/ona_id");
                continue;
            };
            let name = match entry.get("name") {
                None | Some(Value::Null) => "Unknown".to_string(),
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
            };
            let url = kyc.settlement_url_for(&form_id, &ona_id);
            items.push(SourceItem {
                form_id,
                ona_id,
                name,
                city: city.clone(),
                country: country.to_string(),
                payload: PagePayload::Url(url),
            });
        }
    }

    Ok(items)
}

/// Identifier text; absent, null, empty and zero ids count as missing.
fn id_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    }
}
