//! Output row of the feature table
//!
//! Field names are serialized under the exact column names downstream
//! training and inference select features by.

use crate::features::ratings::SideFeatures;
use crate::{GameRecord, SeasonType, TeamId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Columns a total-points model is fit on, in order
pub const MODEL_FEATURES: [&str; 10] = [
    "home_off_rating_simple",
    "away_off_rating_simple",
    "home_home_off_rating",
    "away_away_off_rating",
    "home_rest_days",
    "away_rest_days",
    "home_is_b2b",
    "away_is_b2b",
    "home_injury_impact",
    "away_injury_impact",
];

/// A game plus every pre-game feature for both sides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
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

    // Overall ratings
    pub home_off_rating_simple: f64,
    pub home_def_rating_simple: f64,
    pub away_off_rating_simple: f64,
    pub away_def_rating_simple: f64,

    // Venue-specific ratings
    pub home_home_off_rating: f64,
    pub home_home_def_rating: f64,
    pub away_away_off_rating: f64,
    pub away_away_def_rating: f64,

    // Rest
    pub home_rest_days: i64,
    pub away_rest_days: i64,
    pub home_is_b2b: u8,
    pub away_is_b2b: u8,

    // Recent form, empty until a full window has been played
    pub home_pts_roll3: Option<f64>,
    pub away_pts_roll3: Option<f64>,
    pub home_pts_roll5: Option<f64>,
    pub away_pts_roll5: Option<f64>,
    pub home_env_last5: Option<f64>,
    pub away_env_last5: Option<f64>,

    // Injuries, filled in by the merge step
    pub home_injury_impact: f64,
    pub away_injury_impact: f64,
}

impl FeatureRow {
    /// Combine a game with its pre-game features. Injury impacts start at 0.0.
    pub fn new(game: &GameRecord, home: &SideFeatures, away: &SideFeatures) -> Self {
        FeatureRow {
            game_id: game.game_id.clone(),
            date: game.date,
            season_id: game.season_id.clone(),
            season_type: game.season_type,
            home_team: game.home_team.clone(),
            away_team: game.away_team.clone(),
            home_points: game.home_points,
            away_points: game.away_points,
            total_points: game.total_points,
            home_off_rating_simple: home.overall.offense,
            home_def_rating_simple: home.overall.defense,
            away_off_rating_simple: away.overall.offense,
            away_def_rating_simple: away.overall.defense,
            home_home_off_rating: home.venue.offense,
            home_home_def_rating: home.venue.defense,
            away_away_off_rating: away.venue.offense,
            away_away_def_rating: away.venue.defense,
            home_rest_days: home.rest.days,
            away_rest_days: away.rest.days,
            home_is_b2b: home.rest.back_to_back as u8,
            away_is_b2b: away.rest.back_to_back as u8,
            home_pts_roll3: home.points_short,
            away_pts_roll3: away.points_short,
            home_pts_roll5: home.points_long,
            away_pts_roll5: away.points_long,
            home_env_last5: home.environment,
            away_env_last5: away.environment,
            home_injury_impact: 0.0,
            away_injury_impact: 0.0,
        }
    }

    /// Numeric feature by column name. None for unknown names and for
    /// rolling columns that are still empty.
    pub fn feature(&self, name: &str) -> Option<f64> {
        let value = match name {
            "home_points" => self.home_points as f64,
            "away_points" => self.away_points as f64,
            "total_points" => self.total_points as f64,
            "home_off_rating_simple" => self.home_off_rating_simple,
            "home_def_rating_simple" => self.home_def_rating_simple,
            "away_off_rating_simple" => self.away_off_rating_simple,
            "away_def_rating_simple" => self.away_def_rating_simple,
            "home_home_off_rating" => self.home_home_off_rating,
            "home_home_def_rating" => self.home_home_def_rating,
            "away_away_off_rating" => self.away_away_off_rating,
            "away_away_def_rating" => self.away_away_def_rating,
            "home_rest_days" => self.home_rest_days as f64,
            "away_rest_days" => self.away_rest_days as f64,
            "home_is_b2b" => self.home_is_b2b as f64,
            "away_is_b2b" => self.away_is_b2b as f64,
            "home_pts_roll3" => self.home_pts_roll3?,
            "away_pts_roll3" => self.away_pts_roll3?,
            "home_pts_roll5" => self.home_pts_roll5?,
            "away_pts_roll5" => self.away_pts_roll5?,
            "home_env_last5" => self.home_env_last5?,
            "away_env_last5" => self.away_env_last5?,
            "home_injury_impact" => self.home_injury_impact,
            "away_injury_impact" => self.away_injury_impact,
            _ => return None,
        };
        Some(value)
    }

    /// Values for the given columns, in order. Err lists the columns that are
    /// unknown or empty for this row.
    pub fn feature_vector(&self, names: &[&str]) -> std::result::Result<Vec<f64>, Vec<String>> {
        let mut values = Vec::with_capacity(names.len());
        let mut missing = Vec::new();
        for name in names {
            match self.feature(name) {
                Some(v) => values.push(v),
                None => missing.push(name.to_string()),
            }
        }
        if missing.is_empty() {
            Ok(values)
        } else {
            Err(missing)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::ratings::RatingFeatureComputer;
    use crate::features::ratings::Venue;
    use crate::features::team_state::TeamState;

    fn sample_row() -> FeatureRow {
        let game = GameRecord::new(
            "0022300061",
            NaiveDate::from_ymd_opt(2023, 10, 24).unwrap(),
            "22023",
            TeamId::new("DEN"),
            TeamId::new("LAL"),
            119,
            107,
        );
        let computer = RatingFeatureComputer::default();
        let state = TeamState::new();
        let home = computer.compute(&state, Venue::Home, game.date);
        let away = computer.compute(&state, Venue::Away, game.date);
        FeatureRow::new(&game, &home, &away)
    }

    #[test]
    fn test_new_row_defaults() {
        let row = sample_row();
        assert_eq!(row.home_off_rating_simple, 110.0);
        assert_eq!(row.away_away_def_rating, 110.0);
        assert_eq!(row.home_rest_days, 5);
        assert_eq!(row.away_is_b2b, 0);
        assert_eq!(row.home_injury_impact, 0.0);
        assert_eq!(row.total_points, 226);
    }

    #[test]
    fn test_model_feature_vector() {
        let row = sample_row();
        let values = row.feature_vector(&MODEL_FEATURES).unwrap();
        assert_eq!(values.len(), MODEL_FEATURES.len());
        assert_eq!(values[4], 5.0);
    }

    #[test]
    fn test_feature_vector_reports_missing() {
        let row = sample_row();
        let missing = row
            .feature_vector(&["home_rest_days", "home_pts_roll3", "not_a_column"])
            .unwrap_err();
        assert_eq!(missing, vec!["home_pts_roll3", "not_a_column"]);
    }

    #[test]
    fn test_csv_header_names() {
        let mut writer = csv::Writer::from_writer(vec![]);
        writer.serialize(sample_row()).unwrap();
        let text = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        let header = text.lines().next().unwrap();

        assert!(header.starts_with("GAME_ID,GAME_DATE,SEASON_ID,season_type,home_team"));
        assert!(header.contains("home_home_off_rating"));
        assert!(header.ends_with("home_injury_impact,away_injury_impact"));
        assert!(text.contains("Regular Season"));
    }
}
