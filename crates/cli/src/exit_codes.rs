//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | Universal        | General error (unspecified)              |
//! | 2       | Universal        | CLI usage error (bad args)               |
//! | 3-9     | recon            | Reconciliation-specific codes            |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into `recon_exit_code` or the relevant command

use tally_recon::ReconError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
/// clap exits with this code on its own parse failures.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Recon (3-9)
// =============================================================================

/// `--strict` and the report has unmatched records or mismatched pairs.
pub const EXIT_RECON_MISMATCH: u8 = 3;

/// Input file is not an accepted delimited-text type.
pub const EXIT_RECON_FILE_TYPE: u8 = 4;

/// Input file lacks a required column.
pub const EXIT_RECON_SCHEMA: u8 = 5;

/// Input file or output path could not be read or written.
pub const EXIT_RECON_IO: u8 = 6;

/// Config file is malformed or fails validation.
pub const EXIT_RECON_INVALID_CONFIG: u8 = 7;

/// Map a library error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::InvalidFileType { .. } => EXIT_RECON_FILE_TYPE,
        ReconError::Schema { .. } => EXIT_RECON_SCHEMA,
        ReconError::Io { .. } => EXIT_RECON_IO,
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_RECON_INVALID_CONFIG,
    }
}
