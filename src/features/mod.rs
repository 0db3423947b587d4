//! Feature extraction
//!
//! Converts normalized games into the pre-game feature table.

pub mod engine;
pub mod ratings;
pub mod row;
pub mod team_state;

pub use engine::ChronologicalFeatureEngine;
pub use ratings::{RatingFeatureComputer, SideFeatures};
pub use row::{FeatureRow, MODEL_FEATURES};
pub use team_state::{TeamState, TeamStateStore};
