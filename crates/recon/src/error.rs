use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (wrong source count, bad pair reference, etc.).
    ConfigValidation(String),
    /// A referenced source does not exist.
    UnknownSource(String),
    /// Threshold ordering or sign is wrong. Fatal: the engine refuses to run.
    InvalidThresholds {
        max_distance_km: f64,
        mismatch_threshold_km: f64,
    },
    /// Spatial index requested over zero points.
    EmptyIndex,
    /// Coordinate is non-finite or outside the lat/lon range.
    MalformedCoordinate { latitude: f64, longitude: f64 },
    /// Same identity appears twice in one collection.
    DuplicateIdentity { source: String, identity: String },
    /// Missing required column in input data.
    MissingColumn { source: String, column: String },
    /// IO error (file read, CSV decode, etc.).
    Io(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::UnknownSource(source) => write!(f, "unknown source: {source}"),
            Self::InvalidThresholds {
                max_distance_km,
                mismatch_threshold_km,
            } => write!(
                f,
                "invalid thresholds: need 0 < mismatch_threshold_km ({mismatch_threshold_km}) < max_distance_km ({max_distance_km})"
            ),
            Self::EmptyIndex => write!(f, "spatial index has no points"),
            Self::MalformedCoordinate { latitude, longitude } => {
                write!(f, "malformed coordinate ({latitude}, {longitude})")
            }
            Self::DuplicateIdentity { source, identity } => {
                write!(f, "source '{source}': duplicate identity '{identity}'")
            }
            Self::MissingColumn { source, column } => {
                write!(f, "source '{source}': missing column '{column}'")
            }
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}
