use std::collections::BTreeSet;

use crate::model::{Entity, ExclusionReason};

/// Source entities split against a target collection.
#[derive(Debug)]
pub struct Partition<'a> {
    /// Already linked to the target; removed before spatial comparison.
    pub excluded: Vec<(&'a Entity, ExclusionReason)>,
    /// Eligible for spatial comparison, in source order.
    pub candidates: Vec<&'a Entity>,
}

/// Partition `source` into excluded entities and spatial candidates.
///
/// Excluded when the entity carries a cross-reference, or when its normalized
/// name is non-empty and exactly equal to some normalized name in `target`.
/// Cross-reference takes precedence as the recorded reason.
pub fn partition<'a>(source: &'a [Entity], target: &[Entity]) -> Partition<'a> {
    let target_names: BTreeSet<&str> = target
        .iter()
        .map(|e| e.normalized_name.as_str())
        .filter(|n| !n.is_empty())
        .collect();

    let mut excluded = Vec::new();
    let mut candidates = Vec::new();

    for entity in source {
        if entity.is_linked() {
            excluded.push((entity, ExclusionReason::CrossReference));
        } else if !entity.normalized_name.is_empty()
            && target_names.contains(entity.normalized_name.as_str())
        {
            excluded.push((entity, ExclusionReason::NameMatch));
        } else {
            candidates.push(entity);
        }
    }

    Partition {
        excluded,
        candidates,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(entities: &[&Entity]) -> Vec<String> {
        entities.iter().map(|e| e.identity.clone()).collect()
    }

    #[test]
    fn cross_reference_excludes() {
        let source = vec![
            Entity::new("n1", Some("Alpha")).with_cross_reference("Q42"),
            Entity::new("n2", Some("Beta")),
        ];
        let p = partition(&source, &[]);
        assert_eq!(p.excluded.len(), 1);
        assert_eq!(p.excluded[0].0.identity, "n1");
        assert_eq!(p.excluded[0].1, ExclusionReason::CrossReference);
        assert_eq!(ids(&p.candidates), vec!["n2"]);
    }

    #[test]
    fn blank_cross_reference_is_ignored() {
        let source = vec![Entity::new("n1", Some("Alpha")).with_cross_reference("  ")];
        let p = partition(&source, &[]);
        assert!(p.excluded.is_empty());
        assert_eq!(p.candidates.len(), 1);
    }

    #[test]
    fn normalized_name_match_excludes() {
        let source = vec![Entity::new("s1", Some("Riverside Substation"))];
        let target = vec![Entity::new("t1", Some("riverside  substation!"))];
        let p = partition(&source, &target);
        assert_eq!(p.excluded.len(), 1);
        assert_eq!(p.excluded[0].1, ExclusionReason::NameMatch);
        assert!(p.candidates.is_empty());
    }

    #[test]
    fn substring_is_not_a_match() {
        let source = vec![Entity::new("s1", Some("Riverside"))];
        let target = vec![Entity::new("t1", Some("Riverside Substation"))];
        let p = partition(&source, &target);
        assert!(p.excluded.is_empty());
    }

    #[test]
    fn empty_names_never_match() {
        let source = vec![Entity::new("s1", None), Entity::new("s2", Some("???"))];
        let target = vec![Entity::new("t1", None), Entity::new("t2", Some("!!"))];
        let p = partition(&source, &target);
        assert!(p.excluded.is_empty());
        assert_eq!(ids(&p.candidates), vec!["s1", "s2"]);
    }

    #[test]
    fn cross_reference_wins_over_name() {
        let source = vec![Entity::new("s1", Some("Gamma")).with_cross_reference("Q1")];
        let target = vec![Entity::new("t1", Some("gamma"))];
        let p = partition(&source, &target);
        assert_eq!(p.excluded[0].1, ExclusionReason::CrossReference);
    }

    #[test]
    fn preserves_source_order() {
        let source: Vec<Entity> = ["c", "a", "b"]
            .iter()
            .map(|id| Entity::new(*id, Some(*id)))
            .collect();
        let p = partition(&source, &[]);
        assert_eq!(ids(&p.candidates), vec!["c", "a", "b"]);
    }
}
