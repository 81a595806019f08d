//! `gridmatch-recon`: Cross-source reconciliation of geolocated grid assets.
//!
//! Takes two collections describing the same physical assets (plants,
//! substations) and reports, in each direction, which entities are missing
//! from the other source, which sit too far from their nearest counterpart
//! and which lack coordinates. The core is pure; `engine` and `export` add
//! CSV loading and file outputs on top.

pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod exclusion;
pub mod export;
pub mod lookup;
pub mod model;
pub mod normalize;
pub mod reconcile;
pub mod spatial;
pub mod summary;

pub use classify::Thresholds;
pub use config::ReconConfig;
pub use engine::{run, ReconInput};
pub use error::ReconError;
pub use model::{Collection, Coordinate, Entity, ReconResult, ReconciliationReport, Verdict};
pub use reconcile::reconcile;
