//! Data ingestion and storage
//!
//! Raw game log loading, per-game normalization, table files and SQLite
//! storage.

pub mod database;
pub mod normalize;
pub mod raw;
pub mod table;

pub use database::Database;
pub use normalize::GameRecordNormalizer;
pub use raw::RawTeamGame;
pub use table::FeatureTable;
