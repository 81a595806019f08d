//! CLI Exit Code Registry
//!
//! Single source of truth for `gridmatch` exit codes. Scripts and CI jobs
//! branch on these, so treat them as part of the shell contract.
//!
//! | Code | Meaning                                        |
//! |------|------------------------------------------------|
//! | 0    | Success (and, for `recon run`, reconciled)     |
//! | 1    | General error (unspecified)                    |
//! | 2    | Usage error (bad args, unreadable input list)  |
//! | 3    | Discrepancies found                            |
//! | 4    | Invalid recon config                           |
//! | 5    | Runtime error (source IO, CSV, output writes)  |

use gridmatch_recon::ReconError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// At least one direction reported missing, mismatched or coordinate-less
/// entities.
pub const EXIT_RECON_DISCREPANCIES: u8 = 3;

/// Config failed to parse or validate.
pub const EXIT_RECON_INVALID_CONFIG: u8 = 4;

/// Source files unreadable, malformed CSV, or outputs not writable.
pub const EXIT_RECON_RUNTIME: u8 = 5;

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_)
        | ReconError::ConfigValidation(_)
        | ReconError::UnknownSource(_)
        | ReconError::InvalidThresholds { .. } => EXIT_RECON_INVALID_CONFIG,
        ReconError::MissingColumn { .. }
        | ReconError::DuplicateIdentity { .. }
        | ReconError::MalformedCoordinate { .. }
        | ReconError::EmptyIndex
        | ReconError::Io(_) => EXIT_RECON_RUNTIME,
    }
}
