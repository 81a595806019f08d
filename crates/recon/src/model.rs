use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::classify::Thresholds;
use crate::error::ReconError;
use crate::normalize::normalize_name;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Opaque source metadata (e.g. OSM tags). Ordered so output is stable.
pub type Attributes = BTreeMap<String, String>;

/// A (latitude, longitude) pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Reject non-finite or out-of-range values.
    pub fn validate(self) -> Result<Self, ReconError> {
        let ok = self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude.abs() <= 90.0
            && self.longitude.abs() <= 180.0;
        if ok {
            Ok(self)
        } else {
            Err(ReconError::MalformedCoordinate {
                latitude: self.latitude,
                longitude: self.longitude,
            })
        }
    }

    /// Euclidean distance in degree space. Not great-circle: thresholds are
    /// tuned against this planar approximation.
    pub fn planar_distance(&self, other: &Coordinate) -> f64 {
        self.planar_distance_sq(other).sqrt()
    }

    pub(crate) fn planar_distance_sq(&self, other: &Coordinate) -> f64 {
        let dlat = self.latitude - other.latitude;
        let dlon = self.longitude - other.longitude;
        dlat * dlat + dlon * dlon
    }
}

/// One physical asset as reported by one source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity {
    pub identity: String,
    pub raw_name: Option<String>,
    pub normalized_name: String,
    pub coordinate: Option<Coordinate>,
    pub cross_reference: Option<String>,
    pub attributes: Attributes,
}

impl Entity {
    pub fn new(identity: impl Into<String>, raw_name: Option<&str>) -> Self {
        Self {
            identity: identity.into(),
            raw_name: raw_name.map(str::to_string),
            normalized_name: normalize_name(raw_name),
            coordinate: None,
            cross_reference: None,
            attributes: Attributes::new(),
        }
    }

    pub fn with_coordinate(mut self, latitude: f64, longitude: f64) -> Self {
        self.coordinate = Some(Coordinate::new(latitude, longitude));
        self
    }

    pub fn with_cross_reference(mut self, id: impl Into<String>) -> Self {
        self.cross_reference = Some(id.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// True when the entity carries a usable link to the other source.
    pub fn is_linked(&self) -> bool {
        self.cross_reference
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty())
    }

    /// The coordinate, if present and well-formed.
    pub fn valid_coordinate(&self) -> Option<Coordinate> {
        self.coordinate.and_then(|c| c.validate().ok())
    }
}

/// An ordered collection of entities from one source.
#[derive(Debug, Clone)]
pub struct Collection {
    pub label: String,
    pub entities: Vec<Entity>,
}

impl Collection {
    pub fn new(label: impl Into<String>, entities: Vec<Entity>) -> Self {
        Self {
            label: label.into(),
            entities,
        }
    }

    /// Entities whose coordinate is present but unusable, with the reason.
    pub fn malformed_coordinates(&self) -> Vec<(&str, ReconError)> {
        self.entities
            .iter()
            .filter_map(|e| match e.coordinate.map(Coordinate::validate) {
                Some(Err(err)) => Some((e.identity.as_str(), err)),
                _ => None,
            })
            .collect()
    }

    /// Identities must be unique within one collection.
    pub fn check_identities(&self) -> Result<(), ReconError> {
        let mut seen = BTreeSet::new();
        for e in &self.entities {
            if !seen.insert(e.identity.as_str()) {
                return Err(ReconError::DuplicateIdentity {
                    source: self.label.clone(),
                    identity: e.identity.clone(),
                });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Verdicts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "verdict")]
pub enum Verdict {
    Matched,
    Mismatched { distance: f64 },
    MissingInTarget,
    MissingCoordinates,
    ExcludedAlreadyLinked,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Matched => write!(f, "matched"),
            Self::Mismatched { distance } => write!(f, "mismatched({distance:.3})"),
            Self::MissingInTarget => write!(f, "missing_in_target"),
            Self::MissingCoordinates => write!(f, "missing_coordinates"),
            Self::ExcludedAlreadyLinked => write!(f, "excluded_already_linked"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    CrossReference,
    NameMatch,
}

/// Per-entity verdict, in source order, before deduplication.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityVerdict {
    pub identity: String,
    #[serde(flatten)]
    pub verdict: Verdict,
}

// ---------------------------------------------------------------------------
// Output records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingEntity {
    pub identity: String,
    pub name: Option<String>,
    pub coordinate: Coordinate,
    pub attributes: Attributes,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoordinateMismatch {
    pub source_identity: String,
    pub source_name: Option<String>,
    pub target_identity: String,
    pub target_name: Option<String>,
    pub source_coordinate: Coordinate,
    pub target_coordinate: Coordinate,
    pub distance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingCoordinates {
    pub identity: String,
    pub name: Option<String>,
    pub attributes: Attributes,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedPair {
    pub source_identity: String,
    pub target_identity: String,
    pub distance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExcludedEntity {
    pub identity: String,
    pub name: Option<String>,
    pub reason: ExclusionReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cross_reference: Option<String>,
}

/// Result of reconciling one source collection against one target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectionReport {
    pub source: String,
    pub target: String,
    pub missing_in_target: Vec<MissingEntity>,
    pub coordinate_mismatches: Vec<CoordinateMismatch>,
    pub target_missing_coordinates: Vec<MissingCoordinates>,
    pub matched: Vec<MatchedPair>,
    pub excluded: Vec<ExcludedEntity>,
    pub verdicts: Vec<EntityVerdict>,
}

impl DirectionReport {
    /// Verdict recorded for a source identity.
    pub fn verdict_for(&self, identity: &str) -> Option<Verdict> {
        self.verdicts
            .iter()
            .find(|v| v.identity == identity)
            .map(|v| v.verdict)
    }

    /// True when the direction found nothing to report.
    pub fn is_clean(&self) -> bool {
        self.missing_in_target.is_empty()
            && self.coordinate_mismatches.is_empty()
            && self.target_missing_coordinates.is_empty()
    }
}

/// Both directions of one reconciliation run. Contains no timestamps, so
/// identical inputs serialize identically.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciliationReport {
    pub thresholds: Thresholds,
    pub forward: DirectionReport,
    pub reverse: DirectionReport,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DirectionSummary {
    pub source_entities: usize,
    pub excluded: usize,
    pub candidates: usize,
    pub matched: usize,
    pub mismatched: usize,
    pub missing_in_target: usize,
    pub missing_coordinates: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconSummary {
    pub forward: DirectionSummary,
    pub reverse: DirectionSummary,
    pub verdict_counts: BTreeMap<String, usize>,
}

impl ReconSummary {
    /// True when neither direction reported a missing or mismatched entity.
    pub fn is_reconciled(&self) -> bool {
        [&self.forward, &self.reverse]
            .iter()
            .all(|d| d.mismatched == 0 && d.missing_in_target == 0 && d.missing_coordinates == 0)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub config_name: String,
    pub left: String,
    pub right: String,
    pub engine_version: String,
    pub run_at: String,
    pub report_sha256: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconResult {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    pub report: ReconciliationReport,
}
