//! NBA game-total feature pipeline
//!
//! Turns per-team game logs into a leakage-free feature table: every rating,
//! rest and injury feature attached to a game is computed from games played
//! strictly before it.

pub mod data;
pub mod features;
pub mod injury;
pub mod pipeline;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Team identifier (the league abbreviation, e.g. "BOS")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamId(pub String);

impl TeamId {
    pub fn new(abbreviation: &str) -> Self {
        TeamId(abbreviation.trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Length of a league game identifier ("0022300061")
pub const GAME_ID_LEN: usize = 10;

/// Canonical form of a game identifier.
///
/// All-digit identifiers that lost their leading zeros in a numeric CSV
/// round-trip are padded back to [`GAME_ID_LEN`].
pub fn normalize_game_id(raw: &str) -> String {
    let id = raw.trim();
    if !id.is_empty() && id.len() < GAME_ID_LEN && id.bytes().all(|b| b.is_ascii_digit()) {
        format!("{:0>width$}", id, width = GAME_ID_LEN)
    } else {
        id.to_string()
    }
}

/// Competition phase, encoded in the first three characters of a game id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeasonType {
    #[serde(rename = "Preseason")]
    Preseason,
    #[serde(rename = "Regular Season")]
    RegularSeason,
    #[serde(rename = "Play-In")]
    PlayIn,
    #[serde(rename = "Playoffs")]
    Playoffs,
    #[serde(rename = "Unknown")]
    Unknown,
}

impl SeasonType {
    /// Classify a game id by its prefix. Unrecognized prefixes are `Unknown`.
    pub fn from_game_id(game_id: &str) -> Self {
        match game_id.get(..3) {
            Some("001") => SeasonType::Preseason,
            Some("002") => SeasonType::RegularSeason,
            Some("003") => SeasonType::PlayIn,
            Some("004") => SeasonType::Playoffs,
            _ => SeasonType::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SeasonType::Preseason => "Preseason",
            SeasonType::RegularSeason => "Regular Season",
            SeasonType::PlayIn => "Play-In",
            SeasonType::Playoffs => "Playoffs",
            SeasonType::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for SeasonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One game, both sides joined into a single row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    #[serde(rename = "GAME_ID")]
    pub game_id: String,
    #[serde(rename = "GAME_DATE")]
    pub date: NaiveDate,
    #[serde(rename = "SEASON_ID")]
    pub season_id: String,
    pub season_type: SeasonType,
    pub home_team: TeamId,
    pub away_team: TeamId,
    pub home_points: u32,
    pub away_points: u32,
    pub total_points: u32,
}

impl GameRecord {
    pub fn new(
        game_id: &str,
        date: NaiveDate,
        season_id: &str,
        home_team: TeamId,
        away_team: TeamId,
        home_points: u32,
        away_points: u32,
    ) -> Self {
        let game_id = normalize_game_id(game_id);
        GameRecord {
            season_type: SeasonType::from_game_id(&game_id),
            game_id,
            date,
            season_id: season_id.to_string(),
            home_team,
            away_team,
            home_points,
            away_points,
            total_points: home_points + away_points,
        }
    }
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum TotalsError {
    #[error("Data shape error: {0}")]
    DataShape(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Missing input: {0}")]
    MissingInput(String),

    #[error("No game found for {0}")]
    GameNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TotalsError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub data: DataConfig,
    pub features: FeatureConfig,
    pub split: SplitConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    /// Directory of per-season raw team game logs
    pub raw_dir: String,
    pub processed_dir: String,
    pub database_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Rating assigned before a team has any history
    pub neutral_rating: f64,
    /// Rest days assumed before a team's first game
    pub default_rest_days: i64,
    /// Matchup substring that marks the home side ("BOS vs. DAL")
    pub home_indicator: String,
    pub short_window: usize,
    pub long_window: usize,
    pub env_window: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitConfig {
    pub train_fraction: f64,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        FeatureConfig {
            neutral_rating: 110.0,
            default_rest_days: 5,
            home_indicator: "vs.".to_string(),
            short_window: 3,
            long_window: 5,
            env_window: 5,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data: DataConfig {
                raw_dir: "data/raw".to_string(),
                processed_dir: "data/processed".to_string(),
                database_path: "data/totals.db".to_string(),
            },
            features: FeatureConfig::default(),
            split: SplitConfig {
                train_fraction: 0.8,
            },
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TotalsError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| TotalsError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| TotalsError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let f = &self.features;
        if f.short_window == 0 || f.long_window == 0 || f.env_window == 0 {
            return Err(TotalsError::Config(
                "rolling windows must be at least one game".to_string(),
            ));
        }
        if f.home_indicator.trim().is_empty() {
            return Err(TotalsError::Config("home_indicator must not be empty".to_string()));
        }
        if !(0.0..=1.0).contains(&self.split.train_fraction) {
            return Err(TotalsError::Config(format!(
                "train_fraction must be within 0..=1, got {}",
                self.split.train_fraction
            )));
        }
        Ok(())
    }
}
