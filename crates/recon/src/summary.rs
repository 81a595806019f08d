use std::collections::BTreeMap;

use crate::model::{DirectionReport, DirectionSummary, ReconSummary, ReconciliationReport, Verdict};

/// Compute summary counts for one direction. Counts are taken after
/// deduplication so they agree with the exported lists.
pub fn summarize_direction(report: &DirectionReport) -> DirectionSummary {
    let excluded = report.excluded.len();
    DirectionSummary {
        source_entities: report.verdicts.len(),
        excluded,
        candidates: report.verdicts.len() - excluded,
        matched: report.matched.len(),
        mismatched: report.coordinate_mismatches.len(),
        missing_in_target: report.missing_in_target.len(),
        missing_coordinates: report.target_missing_coordinates.len(),
    }
}

/// Compute summary statistics for both directions.
pub fn compute_summary(report: &ReconciliationReport) -> ReconSummary {
    let mut verdict_counts: BTreeMap<String, usize> = BTreeMap::new();
    for v in report.forward.verdicts.iter().chain(&report.reverse.verdicts) {
        let key = match v.verdict {
            Verdict::Mismatched { .. } => "mismatched".to_string(),
            other => other.to_string(),
        };
        *verdict_counts.entry(key).or_insert(0) += 1;
    }

    ReconSummary {
        forward: summarize_direction(&report.forward),
        reverse: summarize_direction(&report.reverse),
        verdict_counts,
    }
}
