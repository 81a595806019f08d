use std::collections::BTreeMap;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::config::{ReconConfig, SourceConfig};
use crate::error::ReconError;
use crate::model::{
    Attributes, Collection, Coordinate, Entity, ReconMeta, ReconResult, ReconciliationReport,
};
use crate::reconcile::reconcile_with;
use crate::summary::compute_summary;

/// Pre-loaded collections keyed by source name.
#[derive(Debug, Default)]
pub struct ReconInput {
    pub collections: BTreeMap<String, Collection>,
}

impl ReconInput {
    pub fn insert(&mut self, source: &str, entities: Vec<Entity>) {
        self.collections
            .insert(source.to_string(), Collection::new(source, entities));
    }
}

/// Run reconciliation per config. Returns both directions + summary.
pub fn run(config: &ReconConfig, input: &ReconInput) -> Result<ReconResult, ReconError> {
    config.validate()?;
    let (left_name, _) = config.left()?;
    let (right_name, _) = config.right()?;
    let left = input.collections.get(left_name).ok_or_else(|| {
        ReconError::UnknownSource(format!("left source '{left_name}' has no data"))
    })?;
    let right = input.collections.get(right_name).ok_or_else(|| {
        ReconError::UnknownSource(format!("right source '{right_name}' has no data"))
    })?;

    log::info!(
        "recon '{}': {} {} entities vs {} {} entities",
        config.name,
        left.entities.len(),
        left_name,
        right.entities.len(),
        right_name
    );

    let report = reconcile_with(left, right, &config.thresholds)?;
    let summary = compute_summary(&report);
    let report_sha256 = fingerprint(&report)?;

    Ok(ReconResult {
        meta: ReconMeta {
            config_name: config.name.clone(),
            left: left_name.to_string(),
            right: right_name.to_string(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            report_sha256,
        },
        summary,
        report,
    })
}

/// SHA-256 over the canonical JSON of the report. Equal inputs give equal
/// digests across runs and processes.
pub fn fingerprint(report: &ReconciliationReport) -> Result<String, ReconError> {
    let bytes = serde_json::to_vec(report)
        .map_err(|e| ReconError::Io(format!("cannot serialize report: {e}")))?;
    let digest = Sha256::digest(&bytes);
    Ok(digest.iter().map(|b| format!("{b:02x}")).collect())
}

/// Read every configured source, resolving file paths against `base_dir`.
pub fn load_sources(config: &ReconConfig, base_dir: &Path) -> Result<ReconInput, ReconError> {
    let mut input = ReconInput::default();
    for (name, source) in &config.sources {
        let entities = read_source(name, source, base_dir)?;
        input.insert(name, entities);
    }
    Ok(input)
}

pub fn read_source(
    name: &str,
    source: &SourceConfig,
    base_dir: &Path,
) -> Result<Vec<Entity>, ReconError> {
    let path = base_dir.join(&source.file);
    let data = std::fs::read_to_string(&path)
        .map_err(|e| ReconError::Io(format!("cannot read {}: {e}", path.display())))?;
    load_csv_entities(name, &data, source)
}

/// Load CSV rows into entities, applying the column mapping, coordinate
/// parsing, tag decoding and the cross-reference rule.
pub fn load_csv_entities(
    source_name: &str,
    csv_data: &str,
    source: &SourceConfig,
) -> Result<Vec<Entity>, ReconError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(csv_data.trim_start_matches('\u{feff}').as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ReconError::Io(e.to_string()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let idx = |name: &str| -> Result<usize, ReconError> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| ReconError::MissingColumn {
                source: source_name.into(),
                column: name.into(),
            })
    };
    let opt_idx = |name: &Option<String>| -> Result<Option<usize>, ReconError> {
        name.as_deref().map(idx).transpose()
    };

    let col = &source.columns;
    let identity_idx = idx(&col.identity)?;
    let name_idx = idx(&col.name)?;
    let lat_idx = opt_idx(&col.latitude)?;
    let lon_idx = opt_idx(&col.longitude)?;
    let wkt_idx = opt_idx(&col.coordinates)?;
    let xref_idx = opt_idx(&col.cross_reference)?;
    let tags_idx = opt_idx(&col.tags)?;

    let mut entities = Vec::new();

    for (line, record) in reader.records().enumerate() {
        let record = record.map_err(|e| ReconError::Io(e.to_string()))?;
        let cell = |i: usize| record.get(i).unwrap_or("").trim();
        let opt_cell = |i: Option<usize>| i.map(cell).filter(|v| !v.is_empty());

        let identity = cell(identity_idx);
        if identity.is_empty() {
            log::warn!("source '{source_name}', row {}: empty identity, skipped", line + 2);
            continue;
        }

        let name = match (opt_cell(Some(name_idx)), &source.unnamed_prefix) {
            (Some(n), _) => Some(n.to_string()),
            (None, Some(prefix)) => Some(format!("{prefix}-{identity}")),
            (None, None) => None,
        };

        let coordinate = match (lat_idx, lon_idx) {
            (Some(la), Some(lo)) => parse_lat_lon(cell(la), cell(lo)),
            _ => opt_cell(wkt_idx).and_then(parse_wkt_point),
        };

        // Source order matters for the tag rule; the attribute map is sorted.
        let tags = match opt_cell(tags_idx) {
            Some(raw) => parse_tags(raw).unwrap_or_else(|| {
                log::warn!("source '{source_name}', entity '{identity}': tags are not a JSON object");
                Vec::new()
            }),
            None => Vec::new(),
        };

        let cross_reference = opt_cell(xref_idx).map(str::to_string).or_else(|| {
            source.cross_reference_tag.as_ref().and_then(|rule| {
                rule.extract(tags.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            })
        });

        let attributes: Attributes = tags.into_iter().collect();
        let mut entity = Entity::new(identity, name.as_deref()).with_attributes(attributes);
        entity.coordinate = coordinate;
        entity.cross_reference = cross_reference;
        entities.push(entity);
    }

    log::debug!("source '{source_name}': loaded {} entities", entities.len());
    Ok(entities)
}

fn parse_lat_lon(lat: &str, lon: &str) -> Option<Coordinate> {
    if lat.is_empty() || lon.is_empty() {
        return None;
    }
    match (lat.parse::<f64>(), lon.parse::<f64>()) {
        (Ok(la), Ok(lo)) => Some(Coordinate::new(la, lo)),
        _ => {
            log::warn!("unparseable coordinate ({lat}, {lon})");
            None
        }
    }
}

/// Parse a WKT `Point(lon lat)` literal. Note the longitude-first order.
pub fn parse_wkt_point(raw: &str) -> Option<Coordinate> {
    let body = raw.trim().strip_prefix("Point(")?.strip_suffix(')')?;
    let mut parts = body.split_whitespace();
    let lon: f64 = parts.next()?.parse().ok()?;
    let lat: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(Coordinate::new(lat, lon))
}

/// Decode a JSON object of tags, in the order they appear in the cell.
/// Non-string values keep their JSON text.
fn parse_tags(raw: &str) -> Option<Vec<(String, String)>> {
    let value: serde_json::Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;
    Some(
        object
            .iter()
            .map(|(k, v)| {
                let text = match v {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), text)
            })
            .collect(),
    )
}
