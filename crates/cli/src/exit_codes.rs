//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract — scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Code | Description                                        |
//! |------|----------------------------------------------------|
//! | 0    | Success (fully compatible reconciliation)          |
//! | 1    | General error (unspecified)                        |
//! | 2    | CLI usage error (bad args; emitted by clap)        |
//! | 3    | Invalid config (parse or validation failure)       |
//! | 4    | Runtime error (unreadable input, write failure)    |
//! | 6    | Divergences found (mismatched or orphan records)   |

/// Success - reconciliation ran and every outcome is compatible.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Config file failed to parse or validate.
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// Runtime failure: unreadable input file, JSON write failure, etc.
pub const EXIT_RUNTIME: u8 = 4;

/// Reconciliation ran but found divergent or orphan records.
/// Like `diff(1)`, a nonzero exit here means "the sources differ."
pub const EXIT_DIVERGENCE: u8 = 6;
