//! Pre-game team features
//!
//! Pure functions over a [`TeamState`] snapshot taken before the game.
//! Ratings fall back venue -> overall -> neutral prior, so no ratio is ever
//! taken over zero games.

use crate::features::team_state::TeamState;
use crate::FeatureConfig;
use chrono::NaiveDate;

/// Average points scored (offense) and conceded (defense) per game
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rating {
    pub offense: f64,
    pub defense: f64,
}

impl Rating {
    pub fn neutral(prior: f64) -> Self {
        Rating {
            offense: prior,
            defense: prior,
        }
    }

    fn from_totals(points_for: u64, points_against: u64, games: u32) -> Option<Self> {
        if games == 0 {
            return None;
        }
        Some(Rating {
            offense: points_for as f64 / games as f64,
            defense: points_against as f64 / games as f64,
        })
    }
}

/// Where a team is playing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Venue {
    Home,
    Away,
}

/// Rest before a game
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rest {
    pub days: i64,
    pub back_to_back: bool,
}

/// Overall rating, or the prior if the team has not played yet
pub fn overall_rating(state: &TeamState, prior: f64) -> Rating {
    Rating::from_totals(state.points_for, state.points_against, state.games_played)
        .unwrap_or_else(|| Rating::neutral(prior))
}

/// Rating restricted to games at `venue`, falling back to the overall rating
pub fn venue_rating(state: &TeamState, venue: Venue, prior: f64) -> Rating {
    let split = match venue {
        Venue::Home => Rating::from_totals(
            state.home_points_for,
            state.home_points_against,
            state.home_games,
        ),
        Venue::Away => Rating::from_totals(
            state.away_points_for,
            state.away_points_against,
            state.away_games,
        ),
    };
    split.unwrap_or_else(|| overall_rating(state, prior))
}

/// Days since the previous game; `default_days` before the first game
pub fn rest(state: &TeamState, date: NaiveDate, default_days: i64) -> Rest {
    match state.last_game_date {
        Some(last) => {
            let days = (date - last).num_days();
            Rest {
                days,
                back_to_back: days == 1,
            }
        }
        None => Rest {
            days: default_days,
            back_to_back: false,
        },
    }
}

/// Mean points scored over the last `n` games
pub fn rolling_points_for(state: &TeamState, n: usize) -> Option<f64> {
    let games = state.last_n(n)?;
    Some(games.map(|g| g.points_for as f64).sum::<f64>() / n as f64)
}

/// Mean combined score of the team's last `n` games
pub fn rolling_environment(state: &TeamState, n: usize) -> Option<f64> {
    let games = state.last_n(n)?;
    Some(games.map(|g| g.total() as f64).sum::<f64>() / n as f64)
}

/// All pre-game features for one side of a game
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SideFeatures {
    pub overall: Rating,
    /// Home rating for the home side, away rating for the away side
    pub venue: Rating,
    pub rest: Rest,
    pub points_short: Option<f64>,
    pub points_long: Option<f64>,
    pub environment: Option<f64>,
}

/// Derives [`SideFeatures`] from a snapshot using the configured constants
#[derive(Debug, Clone)]
pub struct RatingFeatureComputer {
    neutral_rating: f64,
    default_rest_days: i64,
    short_window: usize,
    long_window: usize,
    env_window: usize,
}

impl RatingFeatureComputer {
    pub fn new(config: &FeatureConfig) -> Self {
        RatingFeatureComputer {
            neutral_rating: config.neutral_rating,
            default_rest_days: config.default_rest_days,
            short_window: config.short_window,
            long_window: config.long_window,
            env_window: config.env_window,
        }
    }

    /// Largest trailing window any feature needs
    pub fn history_window(&self) -> usize {
        self.short_window.max(self.long_window).max(self.env_window)
    }

    /// Compute features for a team playing at `venue` on `date`
    pub fn compute(&self, state: &TeamState, venue: Venue, date: NaiveDate) -> SideFeatures {
        SideFeatures {
            overall: overall_rating(state, self.neutral_rating),
            venue: venue_rating(state, venue, self.neutral_rating),
            rest: rest(state, date, self.default_rest_days),
            points_short: rolling_points_for(state, self.short_window),
            points_long: rolling_points_for(state, self.long_window),
            environment: rolling_environment(state, self.env_window),
        }
    }
}

impl Default for RatingFeatureComputer {
    fn default() -> Self {
        Self::new(&FeatureConfig::default())
    }
}
