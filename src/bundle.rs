//! Shapefile bundle writer.
//!
//! Writes settlements as a polygon shapefile with a fixed attribute schema,
//! adds `.prj` and `.cpg` companions, zips the five components into
//! `<base>.zip` and removes the loose files.
//!
//! Loose component files never outlive [`write_bundle`]: they are removed by
//! a drop guard on success and on every error path.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use shapefile::dbase::{FieldName, FieldValue, Record, TableWriterBuilder};
use shapefile::{Point, Polygon, PolygonRing};
use tracing::debug;
use zip::write::SimpleFileOptions;

use crate::error::{HarvestError, Result};
use crate::geometry::{CanonicalGeometry, Ring};
use crate::models::OutputRecord;
use crate::projection::WGS84_PRJ;

/// Component extensions in archive order.
pub const COMPONENTS: [&str; 5] = ["cpg", "dbf", "prj", "shp", "shx"];

const CPG_ENCODING: &str = "UTF-8";

#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    Numeric { length: u8, decimals: u8 },
    Character { length: u8 },
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

const fn numeric(name: &'static str, length: u8, decimals: u8) -> FieldSpec {
    FieldSpec {
        name,
        kind: FieldKind::Numeric { length, decimals },
    }
}

const fn character(name: &'static str, length: u8) -> FieldSpec {
    FieldSpec {
        name,
        kind: FieldKind::Character { length },
    }
}

/// Attribute table layout; names are limited to 10 characters by dBase.
pub const SCHEMA: [FieldSpec; 9] = [
    numeric("Id", 6, 0),
    character("Country", 50),
    character("City", 100),
    character("Settlement", 150),
    character("Last_updat", 20),
    numeric("kyc_pop", 12, 0),
    numeric("kyc_area", 10, 3),
    numeric("kyc_struct", 10, 0),
    numeric("kyc_year", 6, 0),
];

/// Write `records` to `<output_base>.zip` and return the archive path.
pub fn write_bundle(records: &[OutputRecord], output_base: &Path) -> Result<PathBuf> {
    let rings = records
        .iter()
        .map(single_ring)
        .collect::<Result<Vec<&Ring>>>()?;

    if let Some(parent) = output_base.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let components = ComponentFiles::new(output_base);
    write_shapefile(records, &rings, &components.path("shp"), output_base)?;
    fs::write(components.path("prj"), WGS84_PRJ)?;
    fs::write(components.path("cpg"), CPG_ENCODING)?;

    if let Some(missing) = components.paths().find(|p| !p.exists()) {
        return Err(HarvestError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("shapefile component missing: {}", missing.display()),
        )));
    }

    let zip_path = with_suffix(output_base, "zip");
    if let Err(e) = archive(&components, output_base, &zip_path) {
        let _ = fs::remove_file(&zip_path);
        return Err(e);
    }
    debug!(path = %zip_path.display(), records = records.len(), "wrote shapefile bundle");
    Ok(zip_path)
}

/// The only shape this writer emits is a polygon with one outer ring.
fn single_ring(record: &OutputRecord) -> Result<&Ring> {
    match &record.geometry {
        CanonicalGeometry::Polygon(rings) if rings.len() == 1 => Ok(&rings[0]),
        other => Err(HarvestError::UnsupportedGeometry(format!(
            "{} (record {} expects a single-ring Polygon)",
            other.type_name(),
            record.id
        ))),
    }
}

fn write_shapefile(
    records: &[OutputRecord],
    rings: &[&Ring],
    shp_path: &Path,
    output_base: &Path,
) -> Result<()> {
    let mut table = TableWriterBuilder::new();
    for field in SCHEMA.iter() {
        let name = FieldName::try_from(field.name).map_err(|e| {
            HarvestError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid field name {}: {:?}", field.name, e),
            ))
        })?;
        table = match field.kind {
            FieldKind::Numeric { length, decimals } => {
                table.add_numeric_field(name, length, decimals)
            }
            FieldKind::Character { length } => table.add_character_field(name, length),
        };
    }

    // The writer finalizes headers when dropped at the end of this scope.
    let mut writer = shapefile::Writer::from_path(shp_path, table)?;
    for (record, ring) in records.iter().zip(rings) {
        let points: Vec<Point> = ring.iter().map(|p| Point::new(p.lon(), p.lat())).collect();
        let polygon = Polygon::new(PolygonRing::Outer(points));
        writer.write_shape_and_record(&polygon, &attributes(record))?;
    }
    debug!(base = %output_base.display(), "shapefile components written");
    Ok(())
}

/// Attribute row in [`SCHEMA`] order; absent values are written as 0.
fn attributes(record: &OutputRecord) -> Record {
    let values = [
        FieldValue::Numeric(Some(f64::from(record.id))),
        FieldValue::Character(Some(record.country.clone())),
        FieldValue::Character(Some(record.city.clone())),
        FieldValue::Character(Some(record.name.clone())),
        FieldValue::Character(Some(record.last_updated.clone())),
        FieldValue::Numeric(Some(record.population.unwrap_or(0) as f64)),
        FieldValue::Numeric(Some(record.area_acres.unwrap_or(0.0))),
        FieldValue::Numeric(Some(record.structures.unwrap_or(0) as f64)),
        FieldValue::Numeric(Some(f64::from(record.year.unwrap_or(0)))),
    ];
    let mut row = Record::default();
    for (field, value) in SCHEMA.iter().zip(values) {
        row.insert(field.name.to_string(), value);
    }
    row
}

fn archive(components: &ComponentFiles, output_base: &Path, zip_path: &Path) -> Result<()> {
    let stem = output_base
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let mut zip = zip::ZipWriter::new(File::create(zip_path)?);
    for ext in COMPONENTS {
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        zip.start_file(format!("{}.{}", stem, ext), options)?;
        let mut source = File::open(components.path(ext))?;
        io::copy(&mut source, &mut zip)?;
    }
    zip.finish()?;
    Ok(())
}

/// `base` with `.ext` appended (never replacing an existing extension).
fn with_suffix(base: &Path, ext: &str) -> PathBuf {
    let mut name: OsString = base.as_os_str().to_owned();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

/// Loose component paths, removed when the guard is dropped.
struct ComponentFiles {
    base: PathBuf,
}

impl ComponentFiles {
    fn new(base: &Path) -> Self {
        Self {
            base: base.to_path_buf(),
        }
    }

    fn path(&self, ext: &str) -> PathBuf {
        with_suffix(&self.base, ext)
    }

    fn paths(&self) -> impl Iterator<Item = PathBuf> + '_ {
        COMPONENTS.iter().map(|ext| self.path(ext))
    }
}

impl Drop for ComponentFiles {
    fn drop(&mut self) {
        for path in self.paths() {
            if path.exists() {
                let _ = fs::remove_file(&path);
            }
        }
    }
}
