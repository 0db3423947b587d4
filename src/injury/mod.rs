//! Injury adjustment
//!
//! Builds per-game injury impact tables and merges them into features.

pub mod impact;
pub mod merge;

pub use impact::{build_injury_impacts_from_files, PlayerImpactTable};
pub use merge::{merge_injury_impacts, InjuryImpactRecord, InjuryImpactTable, MergeSummary};
