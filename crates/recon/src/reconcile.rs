//! Bidirectional reconciliation driver.
//!
//! Each direction runs independently: exclusion filter on both sides, a
//! spatial index over the target's coordinate-bearing candidates, then one
//! nearest-neighbor query and classification per source candidate. The two
//! directions are not forced to agree, and one target entity may be the
//! nearest neighbor of several source entities.

use std::collections::{BTreeMap, BTreeSet};

use crate::classify::{classify, Thresholds};
use crate::error::ReconError;
use crate::exclusion::partition;
use crate::model::{
    Collection, Coordinate, CoordinateMismatch, DirectionReport, Entity, EntityVerdict,
    ExcludedEntity, MatchedPair, MissingCoordinates, MissingEntity, ReconciliationReport, Verdict,
};
use crate::spatial::SpatialIndex;

/// Reconcile `a` against `b` and `b` against `a`.
///
/// Fails only on invalid thresholds or duplicate identities; everything else
/// degrades to a verdict.
pub fn reconcile(
    a: &Collection,
    b: &Collection,
    max_distance_km: f64,
    mismatch_threshold_km: f64,
) -> Result<ReconciliationReport, ReconError> {
    let thresholds = Thresholds::new(max_distance_km, mismatch_threshold_km)?;
    reconcile_with(a, b, &thresholds)
}

pub fn reconcile_with(
    a: &Collection,
    b: &Collection,
    thresholds: &Thresholds,
) -> Result<ReconciliationReport, ReconError> {
    thresholds.validate()?;
    a.check_identities()?;
    b.check_identities()?;
    for collection in [a, b] {
        for (identity, err) in collection.malformed_coordinates() {
            log::warn!(
                "{} entity '{identity}': {err}; treating as coordinate-absent",
                collection.label
            );
        }
    }

    Ok(ReconciliationReport {
        thresholds: *thresholds,
        forward: reconcile_direction(a, b, thresholds),
        reverse: reconcile_direction(b, a, thresholds),
    })
}

/// One-sided pass: every entity of `source` gets a verdict against `target`.
pub fn reconcile_direction(
    source: &Collection,
    target: &Collection,
    thresholds: &Thresholds,
) -> DirectionReport {
    let source_split = partition(&source.entities, &target.entities);
    let target_split = partition(&target.entities, &source.entities);

    let pool: Vec<(&Entity, Coordinate)> = target_split
        .candidates
        .iter()
        .filter_map(|e| e.valid_coordinate().map(|c| (*e, c)))
        .collect();
    let points: Vec<Coordinate> = pool.iter().map(|(_, c)| *c).collect();
    let index = match SpatialIndex::build(&points) {
        Ok(index) => Some(index),
        Err(e) => {
            log::warn!(
                "{} -> {}: {e}; every located candidate is missing in target",
                source.label,
                target.label
            );
            None
        }
    };

    let mut by_identity: BTreeMap<&str, Verdict> = BTreeMap::new();
    let mut excluded = Vec::new();
    let mut matched = Vec::new();
    let mut mismatches = Vec::new();
    let mut missing = Vec::new();
    let mut missing_coordinates = Vec::new();

    for (entity, reason) in &source_split.excluded {
        by_identity.insert(&entity.identity, Verdict::ExcludedAlreadyLinked);
        excluded.push(ExcludedEntity {
            identity: entity.identity.clone(),
            name: entity.raw_name.clone(),
            reason: *reason,
            cross_reference: entity.cross_reference.clone(),
        });
    }

    for entity in &source_split.candidates {
        let Some(coordinate) = entity.valid_coordinate() else {
            by_identity.insert(&entity.identity, Verdict::MissingCoordinates);
            missing_coordinates.push(MissingCoordinates {
                identity: entity.identity.clone(),
                name: entity.raw_name.clone(),
                attributes: entity.attributes.clone(),
            });
            continue;
        };

        let nearest = index.as_ref().map(|i| i.query_nearest(&coordinate));
        let verdict = classify(nearest.map(|n| n.distance), thresholds);
        by_identity.insert(&entity.identity, verdict);

        match (verdict, nearest) {
            (Verdict::Matched, Some(n)) => {
                matched.push(MatchedPair {
                    source_identity: entity.identity.clone(),
                    target_identity: pool[n.index].0.identity.clone(),
                    distance: n.distance,
                });
            }
            (Verdict::Mismatched { distance }, Some(n)) => {
                let (neighbor, neighbor_coordinate) = pool[n.index];
                mismatches.push(CoordinateMismatch {
                    source_identity: entity.identity.clone(),
                    source_name: entity.raw_name.clone(),
                    target_identity: neighbor.identity.clone(),
                    target_name: neighbor.raw_name.clone(),
                    source_coordinate: coordinate,
                    target_coordinate: neighbor_coordinate,
                    distance,
                });
            }
            _ => {
                missing.push(MissingEntity {
                    identity: entity.identity.clone(),
                    name: entity.raw_name.clone(),
                    coordinate,
                    attributes: entity.attributes.clone(),
                });
            }
        }
    }

    let missing_in_target = dedup_by_name(missing, |m| name_key(&m.identity, &m.name));
    let coordinate_mismatches =
        dedup_by_name(mismatches, |m| name_key(&m.source_identity, &m.source_name));

    let verdicts: Vec<EntityVerdict> = source
        .entities
        .iter()
        .filter_map(|e| {
            by_identity.get(e.identity.as_str()).map(|v| EntityVerdict {
                identity: e.identity.clone(),
                verdict: *v,
            })
        })
        .collect();

    log::debug!(
        "{} -> {}: {} excluded, {} candidates, {} indexed, {} matched, {} mismatched, {} missing, {} without coordinates",
        source.label,
        target.label,
        excluded.len(),
        source_split.candidates.len(),
        pool.len(),
        matched.len(),
        coordinate_mismatches.len(),
        missing_in_target.len(),
        missing_coordinates.len(),
    );

    DirectionReport {
        source: source.label.clone(),
        target: target.label.clone(),
        missing_in_target,
        coordinate_mismatches,
        target_missing_coordinates: missing_coordinates,
        matched,
        excluded,
        verdicts,
    }
}

/// Unnamed and blank-named records are keyed by identity so they never
/// collapse into each other.
fn name_key(identity: &str, name: &Option<String>) -> (bool, String) {
    match name {
        Some(name) if !name.trim().is_empty() => (true, name.clone()),
        _ => (false, identity.to_string()),
    }
}

/// Keep the first record per key.
fn dedup_by_name<T>(records: Vec<T>, key: impl Fn(&T) -> (bool, String)) -> Vec<T> {
    let mut seen = BTreeSet::new();
    records.into_iter().filter(|r| seen.insert(key(r))).collect()
}
