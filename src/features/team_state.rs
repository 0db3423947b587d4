//! Running per-team aggregates
//!
//! The store is the only mutable state of a feature pass. Reads hand out
//! owned snapshots, so features computed from a snapshot cannot observe the
//! result that is applied afterwards.

use crate::TeamId;
use chrono::NaiveDate;
use std::collections::{HashMap, VecDeque};

/// Points scored and conceded by a team in one game
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameLine {
    pub points_for: u32,
    pub points_against: u32,
}

impl GameLine {
    /// Combined score of the game
    pub fn total(&self) -> u32 {
        self.points_for + self.points_against
    }
}

/// Cumulative state for a team over all games seen so far
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeamState {
    /// Total games played
    pub games_played: u32,
    /// Games played at home
    pub home_games: u32,
    /// Games played away
    pub away_games: u32,
    /// Total points scored
    pub points_for: u64,
    /// Total points conceded
    pub points_against: u64,
    /// Points scored in home games
    pub home_points_for: u64,
    /// Points conceded in home games
    pub home_points_against: u64,
    /// Points scored in away games
    pub away_points_for: u64,
    /// Points conceded in away games
    pub away_points_against: u64,
    /// Date of the most recent game, unset before the first one
    pub last_game_date: Option<NaiveDate>,
    /// Most recent games, oldest first
    pub recent: VecDeque<GameLine>,
}

impl TeamState {
    /// Create new empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one game into the state
    fn record(&mut self, line: GameLine, is_home: bool, date: NaiveDate, window: usize) {
        let pf = line.points_for as u64;
        let pa = line.points_against as u64;

        self.games_played += 1;
        self.points_for += pf;
        self.points_against += pa;

        if is_home {
            self.home_games += 1;
            self.home_points_for += pf;
            self.home_points_against += pa;
        } else {
            self.away_games += 1;
            self.away_points_for += pf;
            self.away_points_against += pa;
        }

        self.last_game_date = Some(date);

        if window > 0 {
            self.recent.push_back(line);
            while self.recent.len() > window {
                self.recent.pop_front();
            }
        }
    }

    /// The last `n` games, oldest first, or None if fewer were played
    pub fn last_n(&self, n: usize) -> Option<impl Iterator<Item = &GameLine>> {
        if n == 0 || self.recent.len() < n {
            return None;
        }
        Some(self.recent.iter().skip(self.recent.len() - n))
    }
}

/// Team id -> running state
pub struct TeamStateStore {
    states: HashMap<TeamId, TeamState>,
    /// Number of recent games kept per team
    window: usize,
}

impl TeamStateStore {
    /// Create an empty store keeping `window` recent games per team
    pub fn new(window: usize) -> Self {
        TeamStateStore {
            states: HashMap::new(),
            window,
        }
    }

    /// State of a team before its next game. Unseen teams get a zero state;
    /// the store is not modified.
    pub fn get(&self, team: &TeamId) -> TeamState {
        self.states.get(team).cloned().unwrap_or_default()
    }

    /// Record a finished game for both teams
    pub fn apply_result(
        &mut self,
        home_team: &TeamId,
        away_team: &TeamId,
        home_points: u32,
        away_points: u32,
        date: NaiveDate,
    ) {
        let window = self.window;

        self.states.entry(home_team.clone()).or_default().record(
            GameLine {
                points_for: home_points,
                points_against: away_points,
            },
            true,
            date,
            window,
        );

        self.states.entry(away_team.clone()).or_default().record(
            GameLine {
                points_for: away_points,
                points_against: home_points,
            },
            false,
            date,
            window,
        );
    }

    /// Number of teams seen so far
    pub fn team_count(&self) -> usize {
        self.states.len()
    }
}
