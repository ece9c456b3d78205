//! Harvest pipeline orchestration.
//!
//! Coordinates the two flows:
//!
//! - `kyc`: filter endpoint → settlement list → per-settlement page fetch →
//!   extraction → normalization → shapefile bundle.
//! - `webmap`: web-map export → embedded layers → per-feature geometry
//!   conversion → one GeoJSON file per layer.
//!
//! Both flows are sequential. A failing settlement or feature is recorded,
//! logged and skipped; only an empty result ends the run.

use anyhow::{Context, Result};
use std::borrow::Cow;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::bundle::write_bundle;
use crate::catalog::list_country_settlements;
use crate::config::{KycConfig, WebmapConfig};
use crate::error::HarvestError;
use crate::export::{write_layer, FileNamer, GeoJsonFeature, LayerMetadata};
use crate::extract::{parse_settlement_page, parse_webmap, webmap_units, LayerUnit};
use crate::fetch::PageFetcher;
use crate::geometry::normalize_esri;
use crate::models::{BatchResult, Failure, OutputRecord, PagePayload, SourceItem};
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::record::build_record;

/// Knobs for [`run_batch`].
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Label used in progress events (e.g. `kyc Nigeria`).
    pub source: String,
    /// Pause after every item whose page was fetched over the network.
    pub delay: Duration,
}

/// Process `items` in order, isolating per-item failures.
///
/// Record ids are 1-based positions among the successes.
pub fn run_batch(
    items: &[SourceItem],
    fetcher: &dyn PageFetcher,
    options: &BatchOptions,
    reporter: &dyn ProgressReporter,
) -> BatchResult {
    let mut result = BatchResult::default();
    let total = items.len() as u64;

    for (n, item) in items.iter().enumerate() {
        reporter.report(ProgressEvent::Fetching {
            source: options.source.clone(),
            n: n as u64 + 1,
            total,
        });

        let next_id = result.records.len() as u32 + 1;
        match harvest_item(item, fetcher, next_id) {
            Ok(record) => {
                debug!(id = record.id, name = %item.name, "settlement harvested");
                result.records.push(record);
            }
            Err(reason) => {
                warn!("{} ({}) - {}", item.name, item.location(), reason);
                result.failures.push(Failure {
                    item: item.clone(),
                    reason,
                });
            }
        }

        if matches!(item.payload, PagePayload::Url(_)) && !options.delay.is_zero() {
            std::thread::sleep(options.delay);
        }
    }

    result
}

/// Fetch (if needed), extract and build one record; errors become reasons.
fn harvest_item(
    item: &SourceItem,
    fetcher: &dyn PageFetcher,
    id: u32,
) -> std::result::Result<OutputRecord, String> {
    let (body, status) = match &item.payload {
        PagePayload::Url(url) => {
            let page = fetcher.fetch_page(url).map_err(|e| e.to_string())?;
            (Cow::Owned(page.body), Some(page.status))
        }
        PagePayload::Inline(body) => (Cow::Borrowed(body.as_str()), None),
    };

    parse_settlement_page(&body)
        .and_then(|payload| build_record(id, item, &payload))
        .map_err(|e| match status {
            Some(status) => format!("HTTP {}: {}", status, e),
            None => e.to_string(),
        })
}

/// Options for a `kyc` run that are not part of the config file.
#[derive(Debug, Clone, Default)]
pub struct KycRunOptions {
    pub limit: Option<usize>,
    pub dry_run: bool,
}

/// Outcome of a `kyc` run.
#[derive(Debug)]
pub struct KycReport {
    pub discovered: usize,
    pub batch: BatchResult,
    /// `None` for dry runs.
    pub archive: Option<PathBuf>,
}

/// Download every settlement of the configured country into a shapefile bundle.
pub fn run_kyc(
    config: &KycConfig,
    fetcher: &dyn PageFetcher,
    options: &KycRunOptions,
    reporter: &dyn ProgressReporter,
) -> Result<KycReport> {
    let delay = Duration::try_from_secs_f64(config.sleep_secs)
        .with_context(|| format!("Invalid kyc.sleep_secs: {}", config.sleep_secs))?;
    let source = format!("kyc {}", config.country);
    reporter.report(ProgressEvent::Discovering {
        source: source.clone(),
    });

    let catalogue = fetcher
        .fetch_json(&config.filter_endpoint)
        .context("Failed to fetch settlement filter data")?;
    let mut items = list_country_settlements(&catalogue, &config.country, config)?;
    if items.is_empty() {
        return Err(HarvestError::EmptyResult(format!(
            "No settlements found for country '{}'",
            config.country
        ))
        .into());
    }
    let discovered = items.len();
    if let Some(limit) = options.limit {
        items.truncate(limit);
    }
    info!(country = %config.country, discovered, selected = items.len(), "settlements discovered");

    if options.dry_run {
        println!("kyc {} (dry-run)", config.country);
        println!("  settlements found: {}", discovered);
        for item in &items {
            println!("  - {} / {} ({})", item.city, item.name, item.location());
        }
        return Ok(KycReport {
            discovered,
            batch: BatchResult::default(),
            archive: None,
        });
    }

    let batch_options = BatchOptions {
        source,
        delay,
    };
    let batch = run_batch(&items, fetcher, &batch_options, reporter);
    if batch.records.is_empty() {
        return Err(HarvestError::EmptyResult(
            "No settlements could be downloaded successfully".to_string(),
        )
        .into());
    }

    let archive = write_bundle(&batch.records, &config.output)
        .with_context(|| format!("Failed to write {}", config.output.display()))?;

    let shown = archive.canonicalize().unwrap_or_else(|_| archive.clone());
    println!(
        "Wrote {} settlements to {} ({})",
        batch.records.len(),
        archive
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default(),
        shown.display()
    );
    if !batch.failures.is_empty() {
        println!(
            "Skipped {} settlement(s); see warnings above.",
            batch.failures.len()
        );
    }

    Ok(KycReport {
        discovered,
        batch,
        archive: Some(archive),
    })
}

/// Features converted from one web-map layer.
#[derive(Debug, Default)]
pub struct LayerConversion {
    pub features: Vec<GeoJsonFeature>,
    /// Features without geometry, dropped as in the source map.
    pub empty: usize,
    /// Features whose geometry could not be converted.
    pub skipped: Vec<HarvestError>,
}

/// Convert every feature of a layer, skipping the ones that fail.
pub fn convert_layer(unit: &LayerUnit<'_>) -> LayerConversion {
    let mut conversion = LayerConversion::default();
    for feature in unit.features() {
        match normalize_esri(&feature.geometry, unit.geometry_type) {
            Ok(Some(geometry)) => {
                let properties = feature.properties();
                conversion
                    .features
                    .push(GeoJsonFeature::new(geometry, properties));
            }
            Ok(None) => conversion.empty += 1,
            Err(e) => conversion.skipped.push(e),
        }
    }
    conversion
}

/// Export every embedded web-map layer as GeoJSON under the output directory.
pub fn run_webmap(config: &WebmapConfig, reporter: &dyn ProgressReporter) -> Result<Vec<PathBuf>> {
    let text = std::fs::read_to_string(&config.input)
        .with_context(|| format!("Failed to read web map: {}", config.input.display()))?;
    let webmap = parse_webmap(&text)?;

    let mut namer = FileNamer::new(config.file_prefix.clone());
    let mut exported = Vec::new();

    for unit in webmap_units(&webmap) {
        let layer_name = unit.display_name();
        reporter.report(ProgressEvent::Exporting {
            layer: layer_name.clone(),
        });

        let conversion = convert_layer(&unit);
        if let Some(first) = conversion.skipped.first() {
            warn!(
                layer = %layer_name,
                skipped = conversion.skipped.len(),
                "skipped features with unusable geometry: {}",
                first
            );
        }
        if conversion.features.is_empty() {
            debug!(layer = %layer_name, empty = conversion.empty, "layer has no convertible features");
            continue;
        }

        let metadata = LayerMetadata {
            source_app_id: config.source_app_id.clone(),
            source_layer_id: unit.layer.id.clone(),
            source_layer_title: unit.layer.title.clone(),
            geometry_type: unit.geometry_type.to_string(),
            feature_count: conversion.features.len(),
        };
        let path = config.output_dir.join(namer.file_name(&layer_name));
        if let Some(path) = write_layer(&conversion.features, metadata, &path)? {
            info!(layer = %layer_name, features = conversion.features.len(), "layer exported");
            exported.push(path);
        }
    }

    if exported.is_empty() {
        return Err(HarvestError::EmptyResult(
            "No feature collection layers were exported.".to_string(),
        )
        .into());
    }

    println!("Exported:");
    for path in &exported {
        println!(" - {}", path.display());
    }
    Ok(exported)
}
