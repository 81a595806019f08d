use std::collections::BTreeMap;

use serde::Deserialize;

use crate::classify::Thresholds;
use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ReconConfig {
    pub name: String,
    #[serde(default)]
    pub thresholds: Thresholds,
    pub sources: BTreeMap<String, SourceConfig>,
    pub pair: PairConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub file: String,
    pub columns: ColumnMapping,
    /// Derive a cross-reference from tags when no explicit column is mapped.
    #[serde(default)]
    pub cross_reference_tag: Option<CrossReferenceTag>,
    /// Label for rows without a name: `"<prefix>-<identity>"`.
    #[serde(default)]
    pub unnamed_prefix: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ColumnMapping {
    pub identity: String,
    pub name: String,
    #[serde(default)]
    pub latitude: Option<String>,
    #[serde(default)]
    pub longitude: Option<String>,
    /// WKT `Point(lon lat)` column, as exported by SPARQL endpoints.
    #[serde(default)]
    pub coordinates: Option<String>,
    #[serde(default)]
    pub cross_reference: Option<String>,
    /// Column holding a JSON object of string tags.
    #[serde(default)]
    pub tags: Option<String>,
}

/// Tag rule: the first tag, in the order given, whose key contains
/// `key_contains` and whose value starts with `value_prefix` becomes the
/// cross-reference.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CrossReferenceTag {
    pub key_contains: String,
    #[serde(default)]
    pub value_prefix: String,
}

impl CrossReferenceTag {
    pub fn extract<'a>(&self, tags: impl IntoIterator<Item = (&'a str, &'a str)>) -> Option<String> {
        tags.into_iter()
            .find(|(k, v)| k.contains(&self.key_contains) && v.starts_with(&self.value_prefix))
            .map(|(_, v)| v.to_string())
    }
}

// ---------------------------------------------------------------------------
// Pair + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct PairConfig {
    pub left: String,
    pub right: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub dir: Option<String>,
    #[serde(default = "enabled")]
    pub csv: bool,
    #[serde(default = "enabled")]
    pub geojson: bool,
    #[serde(default = "enabled")]
    pub quickstatements: bool,
}

fn enabled() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: None,
            csv: true,
            geojson: true,
            quickstatements: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        self.thresholds.validate()?;

        if self.sources.len() != 2 {
            return Err(ReconError::ConfigValidation(format!(
                "exactly 2 sources are required, found {}",
                self.sources.len()
            )));
        }

        for side in [&self.pair.left, &self.pair.right] {
            if !self.sources.contains_key(side) {
                return Err(ReconError::UnknownSource(format!(
                    "pair references '{side}', which is not a configured source"
                )));
            }
        }
        if self.pair.left == self.pair.right {
            return Err(ReconError::ConfigValidation(format!(
                "pair must name two different sources, got '{}' twice",
                self.pair.left
            )));
        }

        for (name, source) in &self.sources {
            let cols = &source.columns;
            match (&cols.latitude, &cols.longitude, &cols.coordinates) {
                (Some(_), Some(_), _) | (None, None, Some(_)) => {}
                (Some(_), None, _) | (None, Some(_), _) => {
                    return Err(ReconError::ConfigValidation(format!(
                        "source '{name}': latitude and longitude columns must be mapped together"
                    )));
                }
                (None, None, None) => {
                    return Err(ReconError::ConfigValidation(format!(
                        "source '{name}': map latitude/longitude or a coordinates column"
                    )));
                }
            }
            if let Some(rule) = &source.cross_reference_tag {
                if rule.key_contains.is_empty() {
                    return Err(ReconError::ConfigValidation(format!(
                        "source '{name}': cross_reference_tag.key_contains must not be empty"
                    )));
                }
            }
        }

        Ok(())
    }

    /// Sources in pair order.
    pub fn left(&self) -> Result<(&str, &SourceConfig), ReconError> {
        self.side(&self.pair.left)
    }

    pub fn right(&self) -> Result<(&str, &SourceConfig), ReconError> {
        self.side(&self.pair.right)
    }

    fn side<'a>(&'a self, name: &'a str) -> Result<(&'a str, &'a SourceConfig), ReconError> {
        self.sources
            .get(name)
            .map(|source| (name, source))
            .ok_or_else(|| {
                ReconError::UnknownSource(format!(
                    "pair references '{name}', which is not a configured source"
                ))
            })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
name = "India power plants"

[thresholds]
max_distance_km = 0.7
mismatch_threshold_km = 0.5

[sources.osm]
file = "osm.csv"
unnamed_prefix = "Unnamed"

[sources.osm.columns]
identity  = "id"
name      = "name"
latitude  = "latitude"
longitude = "longitude"
tags      = "tags"

[sources.osm.cross_reference_tag]
key_contains = "wikidata"
value_prefix = "Q"

[sources.wikidata]
file = "wikidata.csv"

[sources.wikidata.columns]
identity    = "wikidata_id"
name        = "plantLabel"
coordinates = "coordinates"

[pair]
left = "osm"
right = "wikidata"
"#;

    #[test]
    fn parse_valid() {
        let config = ReconConfig::from_toml(VALID).unwrap();
        assert_eq!(config.name, "India power plants");
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.thresholds.max_distance_km, 0.7);
        let (left, osm) = config.left().unwrap();
        assert_eq!(left, "osm");
        assert_eq!(osm.unnamed_prefix.as_deref(), Some("Unnamed"));
        assert_eq!(
            osm.cross_reference_tag,
            Some(CrossReferenceTag {
                key_contains: "wikidata".into(),
                value_prefix: "Q".into(),
            })
        );
        let (right, wd) = config.right().unwrap();
        assert_eq!(right, "wikidata");
        assert_eq!(wd.columns.coordinates.as_deref(), Some("coordinates"));
        assert!(config.output.csv && config.output.geojson && config.output.quickstatements);
    }

    #[test]
    fn thresholds_default_when_omitted() {
        let input = VALID.replace(
            "[thresholds]\nmax_distance_km = 0.7\nmismatch_threshold_km = 0.5\n",
            "",
        );
        let config = ReconConfig::from_toml(&input).unwrap();
        assert_eq!(config.thresholds, Thresholds::default());
    }

    #[test]
    fn reject_inverted_thresholds() {
        let input = VALID.replace("mismatch_threshold_km = 0.5", "mismatch_threshold_km = 0.9");
        let err = ReconConfig::from_toml(&input).unwrap_err();
        assert!(matches!(err, ReconError::InvalidThresholds { .. }));
    }

    #[test]
    fn reject_unknown_source_in_pair() {
        let input = VALID.replace("right = \"wikidata\"", "right = \"nominatim\"");
        let err = ReconConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("'nominatim'"));
    }

    #[test]
    fn reject_self_pair() {
        let input = VALID.replace("right = \"wikidata\"", "right = \"osm\"");
        let err = ReconConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("two different sources"));
    }

    #[test]
    fn reject_half_mapped_coordinates() {
        let input = VALID.replace("longitude = \"longitude\"\n", "");
        let err = ReconConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("together"));
    }

    #[test]
    fn reject_missing_coordinate_columns() {
        let input = VALID.replace("coordinates = \"coordinates\"\n", "");
        let err = ReconConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("source 'wikidata'"));
    }

    #[test]
    fn side_lookup_on_unvalidated_config() {
        let mut config = ReconConfig::from_toml(VALID).unwrap();
        config.pair.right = "nominatim".into();
        assert!(config.left().is_ok());
        let err = config.right().unwrap_err();
        assert!(matches!(err, ReconError::UnknownSource(_)));
    }

    #[test]
    fn reject_parse_error() {
        let err = ReconConfig::from_toml("name = ").unwrap_err();
        assert!(matches!(err, ReconError::ConfigParse(_)));
    }

    #[test]
    fn tag_rule_extracts_first_matching_tag() {
        let rule = CrossReferenceTag {
            key_contains: "wikidata".into(),
            value_prefix: "Q".into(),
        };
        let tags = [
            ("operator:wikidata", "Q222"),
            ("brand:wikidata", "Q111"),
            ("power", "plant"),
        ];
        assert_eq!(rule.extract(tags).as_deref(), Some("Q222"));

        let no_q = [("wikidata", "none")];
        assert_eq!(rule.extract(no_q), None);
    }
}
