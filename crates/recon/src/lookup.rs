//! Free-text name resolution against a collection.
//!
//! Used when one side is just a list of labels (e.g. substation names taken
//! from a grid model) with no coordinates of its own. A query resolves to the
//! first target entity, in collection order, whose normalized name contains
//! the normalized query. Looser than the exact-match exclusion rule.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::model::{Coordinate, Entity};
use crate::normalize::normalize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NameMatch {
    pub query: String,
    pub identity: String,
    pub matched_name: Option<String>,
    pub coordinate: Option<Coordinate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NameLookup {
    pub matched: Vec<NameMatch>,
    pub unmatched: Vec<String>,
}

impl NameLookup {
    pub fn total(&self) -> usize {
        self.matched.len() + self.unmatched.len()
    }

    /// Identities of resolved entities, first occurrence order, no repeats.
    pub fn matched_identities(&self) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        self.matched
            .iter()
            .map(|m| m.identity.as_str())
            .filter(|id| seen.insert(*id))
            .collect()
    }
}

/// Resolve each distinct query against `target`. Repeated queries are looked
/// up once; queries that normalize to nothing never match.
pub fn lookup_names<S: AsRef<str>>(queries: &[S], target: &[Entity]) -> NameLookup {
    let mut seen = BTreeSet::new();
    let mut out = NameLookup::default();

    for query in queries.iter().map(AsRef::as_ref) {
        if !seen.insert(query) {
            continue;
        }
        let key = normalize(query);
        let hit = if key.is_empty() {
            None
        } else {
            target.iter().find(|e| e.normalized_name.contains(&key))
        };

        match hit {
            Some(entity) => out.matched.push(NameMatch {
                query: query.to_string(),
                identity: entity.identity.clone(),
                matched_name: entity.raw_name.clone(),
                coordinate: entity.valid_coordinate(),
            }),
            None => out.unmatched.push(query.to_string()),
        }
    }

    log::info!(
        "name lookup: {} matched, {} unmatched",
        out.matched.len(),
        out.unmatched.len()
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn osm() -> Vec<Entity> {
        vec![
            Entity::new("101", Some("Umspannwerk Großkrotzenburg")).with_coordinate(50.08, 8.98),
            Entity::new("102", Some("Poste de Vénissieux")).with_coordinate(45.70, 4.88),
            Entity::new("103", Some("Venissieux Nord")).with_coordinate(45.72, 4.87),
            Entity::new("104", None),
        ]
    }

    #[test]
    fn substring_match_first_in_order() {
        let out = lookup_names(&["Venissieux"], &osm());
        assert_eq!(out.matched.len(), 1);
        assert_eq!(out.matched[0].identity, "102");
        assert_eq!(out.matched[0].coordinate, Some(Coordinate::new(45.70, 4.88)));
    }

    #[test]
    fn unmatched_collected() {
        let out = lookup_names(&["Krümmel", "Venissieux"], &osm());
        assert_eq!(out.unmatched, vec!["Krümmel"]);
        assert_eq!(out.total(), 2);
    }

    #[test]
    fn empty_query_never_matches() {
        let out = lookup_names(&["", "--"], &osm());
        assert!(out.matched.is_empty());
        assert_eq!(out.unmatched.len(), 2);
    }

    #[test]
    fn duplicate_queries_resolved_once() {
        let out = lookup_names(&["Nord", "Nord", "Venissieux Nord"], &osm());
        assert_eq!(out.total(), 2);
        assert_eq!(out.matched_identities(), vec!["103"]);
    }
}
