//! `tripmatch-recon` — Two-source bus trip reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded AVL and roster trip records,
//! returns classified match outcomes plus a run summary.
//! No CLI or IO dependencies beyond input loading helpers.

pub mod aggregate;
pub mod assignment;
pub mod claim;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod model;
pub mod normalize;

pub use classify::{classify, Agreement};
pub use config::ReconConfig;
pub use engine::run;
pub use error::ReconError;
pub use model::{AvlTrip, MatchOutcome, ReconInput, ReconResult, RosterTrip};
