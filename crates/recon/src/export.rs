//! Output writers for reconciliation results.
//!
//! CSV lists per direction, a GeoJSON layer of missing entities for map
//! review, QuickStatements for bulk item creation and an Overpass query for
//! pulling matched OSM objects back out.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::json;

use crate::config::OutputConfig;
use crate::error::ReconError;
use crate::model::{
    CoordinateMismatch, DirectionReport, MissingCoordinates, MissingEntity, ReconResult,
};

const MISSING_HEADER: [&str; 5] = ["identity", "name", "latitude", "longitude", "attributes"];

const MISMATCH_HEADER: [&str; 9] = [
    "source_identity",
    "source_name",
    "source_latitude",
    "source_longitude",
    "target_identity",
    "target_name",
    "target_latitude",
    "target_longitude",
    "difference_km",
];

const MISSING_COORDINATES_HEADER: [&str; 3] = ["identity", "name", "attributes"];

fn csv_err(e: impl std::fmt::Display) -> ReconError {
    ReconError::Io(format!("CSV write error: {e}"))
}

fn csv_writer<W: Write>(writer: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer)
}

fn attributes_json(attributes: &crate::model::Attributes) -> String {
    if attributes.is_empty() {
        String::new()
    } else {
        serde_json::to_string(attributes).unwrap_or_default()
    }
}

/// Round to three decimals for reporting.
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

pub fn write_missing_csv(records: &[MissingEntity], writer: impl Write) -> Result<(), ReconError> {
    let mut csv = csv_writer(writer);
    csv.write_record(MISSING_HEADER).map_err(csv_err)?;
    for r in records {
        let row: [&str; 5] = [
            &r.identity,
            r.name.as_deref().unwrap_or(""),
            &r.coordinate.latitude.to_string(),
            &r.coordinate.longitude.to_string(),
            &attributes_json(&r.attributes),
        ];
        csv.write_record(row).map_err(csv_err)?;
    }
    csv.flush().map_err(csv_err)
}

pub fn write_mismatches_csv(
    records: &[CoordinateMismatch],
    writer: impl Write,
) -> Result<(), ReconError> {
    let mut csv = csv_writer(writer);
    csv.write_record(MISMATCH_HEADER).map_err(csv_err)?;
    for r in records {
        let row: [&str; 9] = [
            &r.source_identity,
            r.source_name.as_deref().unwrap_or(""),
            &r.source_coordinate.latitude.to_string(),
            &r.source_coordinate.longitude.to_string(),
            &r.target_identity,
            r.target_name.as_deref().unwrap_or(""),
            &r.target_coordinate.latitude.to_string(),
            &r.target_coordinate.longitude.to_string(),
            &format!("{:.3}", round3(r.distance)),
        ];
        csv.write_record(row).map_err(csv_err)?;
    }
    csv.flush().map_err(csv_err)
}

pub fn write_missing_coordinates_csv(
    records: &[MissingCoordinates],
    writer: impl Write,
) -> Result<(), ReconError> {
    let mut csv = csv_writer(writer);
    csv.write_record(MISSING_COORDINATES_HEADER).map_err(csv_err)?;
    for r in records {
        let row: [&str; 3] = [
            &r.identity,
            r.name.as_deref().unwrap_or(""),
            &attributes_json(&r.attributes),
        ];
        csv.write_record(row).map_err(csv_err)?;
    }
    csv.flush().map_err(csv_err)
}

/// GeoJSON FeatureCollection of missing entities. Geometry is `[lon, lat]`.
pub fn missing_to_geojson(records: &[MissingEntity]) -> serde_json::Value {
    let features: Vec<serde_json::Value> = records
        .iter()
        .map(|r| {
            json!({
                "type": "Feature",
                "geometry": {
                    "type": "Point",
                    "coordinates": [r.coordinate.longitude, r.coordinate.latitude],
                },
                "properties": {
                    "identity": r.identity,
                    "name": r.name,
                    "attributes": r.attributes,
                },
            })
        })
        .collect();

    json!({
        "type": "FeatureCollection",
        "features": features,
    })
}

/// QuickStatements v1 script: one `CREATE` block per entity, one `LAST` line
/// per attribute, in attribute-key order. Entities without attributes are
/// skipped.
pub fn quickstatements(records: &[MissingEntity]) -> String {
    let mut lines: Vec<String> = Vec::new();
    for r in records.iter().filter(|r| !r.attributes.is_empty()) {
        lines.push("CREATE".to_string());
        for (key, value) in &r.attributes {
            lines.push(format!("LAST\t{key}\t\"{value}\""));
        }
    }
    lines.join("\n")
}

/// Overpass QL fetching OSM ways by id, with centers.
pub fn overpass_query<S: AsRef<str>>(ids: &[S]) -> String {
    let mut query = String::from("[out:json][timeout:120];\n(\n");
    for id in ids {
        query.push_str(&format!("  way({});\n", id.as_ref()));
    }
    query.push_str(");\nout body center;");
    query
}

/// Write every enabled output for both directions into `dir`. Returns the
/// paths written, in write order.
pub fn write_outputs(
    result: &ReconResult,
    dir: &Path,
    output: &OutputConfig,
) -> Result<Vec<PathBuf>, ReconError> {
    std::fs::create_dir_all(dir)
        .map_err(|e| ReconError::Io(format!("cannot create {}: {e}", dir.display())))?;

    let mut written = Vec::new();
    for direction in [&result.report.forward, &result.report.reverse] {
        write_direction(direction, dir, output, &mut written)?;
    }
    log::info!("wrote {} output file(s) to {}", written.len(), dir.display());
    Ok(written)
}

fn write_direction(
    report: &DirectionReport,
    dir: &Path,
    output: &OutputConfig,
    written: &mut Vec<PathBuf>,
) -> Result<(), ReconError> {
    let (src, tgt) = (&report.source, &report.target);

    if output.csv {
        let path = dir.join(format!("{src}_missing_in_{tgt}.csv"));
        write_missing_csv(&report.missing_in_target, create(&path)?)?;
        written.push(path);

        let path = dir.join(format!("{src}_vs_{tgt}_coordinate_mismatches.csv"));
        write_mismatches_csv(&report.coordinate_mismatches, create(&path)?)?;
        written.push(path);

        let path = dir.join(format!("{src}_missing_coordinates.csv"));
        write_missing_coordinates_csv(&report.target_missing_coordinates, create(&path)?)?;
        written.push(path);
    }

    if output.geojson {
        let path = dir.join(format!("{src}_missing_in_{tgt}.geojson"));
        let body = serde_json::to_string_pretty(&missing_to_geojson(&report.missing_in_target))
            .map_err(|e| ReconError::Io(format!("GeoJSON serialization error: {e}")))?;
        write_file(&path, body.as_bytes())?;
        written.push(path);
    }

    if output.quickstatements && !report.missing_in_target.is_empty() {
        let path = dir.join(format!("{src}_missing_in_{tgt}.qs"));
        write_file(&path, quickstatements(&report.missing_in_target).as_bytes())?;
        written.push(path);
    }

    Ok(())
}

fn create(path: &Path) -> Result<std::fs::File, ReconError> {
    std::fs::File::create(path)
        .map_err(|e| ReconError::Io(format!("cannot write {}: {e}", path.display())))
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), ReconError> {
    std::fs::write(path, bytes)
        .map_err(|e| ReconError::Io(format!("cannot write {}: {e}", path.display())))
}
