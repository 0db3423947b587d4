//! Chronological feature pass
//!
//! Walks games in date order. Each game is handled in two separate steps:
//! features are computed from snapshots of both teams' state, then the game's
//! own result is applied. A game's features therefore never include its own
//! score or any later game's.

use crate::features::ratings::{RatingFeatureComputer, Venue};
use crate::features::row::FeatureRow;
use crate::features::team_state::{TeamState, TeamStateStore};
use crate::{FeatureConfig, GameRecord};

/// Both teams' state as it stood before a game
#[derive(Debug, Clone)]
pub struct PreGameSnapshot {
    pub home: TeamState,
    pub away: TeamState,
}

/// Single-pass, single-writer feature engine
pub struct ChronologicalFeatureEngine {
    store: TeamStateStore,
    computer: RatingFeatureComputer,
    games_processed: usize,
}

impl ChronologicalFeatureEngine {
    pub fn new(config: &FeatureConfig) -> Self {
        let computer = RatingFeatureComputer::new(config);
        ChronologicalFeatureEngine {
            store: TeamStateStore::new(computer.history_window()),
            computer,
            games_processed: 0,
        }
    }

    /// Read both teams' state. Does not modify the store.
    pub fn snapshot(&self, game: &GameRecord) -> PreGameSnapshot {
        PreGameSnapshot {
            home: self.store.get(&game.home_team),
            away: self.store.get(&game.away_team),
        }
    }

    /// Build the feature row from a snapshot alone
    pub fn features(&self, game: &GameRecord, snapshot: &PreGameSnapshot) -> FeatureRow {
        let home = self.computer.compute(&snapshot.home, Venue::Home, game.date);
        let away = self.computer.compute(&snapshot.away, Venue::Away, game.date);
        FeatureRow::new(game, &home, &away)
    }

    /// Process one game: snapshot, emit, then apply its result.
    ///
    /// Games must be fed in date order; see [`Self::build`]. A game dated
    /// before either team's previous game would yield negative rest days, so
    /// debug builds panic on it.
    pub fn process(&mut self, game: &GameRecord) -> FeatureRow {
        let snapshot = self.snapshot(game);
        debug_assert!(
            [&snapshot.home, &snapshot.away]
                .iter()
                .all(|s| s.last_game_date.map_or(true, |last| last <= game.date)),
            "game {} on {} is out of date order",
            game.game_id,
            game.date
        );
        let row = self.features(game, &snapshot);

        self.store.apply_result(
            &game.home_team,
            &game.away_team,
            game.home_points,
            game.away_points,
            game.date,
        );
        self.games_processed += 1;

        log::debug!(
            "{} {} {} vs {}: rest {}/{}, b2b {}/{}",
            game.game_id,
            game.date,
            game.home_team,
            game.away_team,
            row.home_rest_days,
            row.away_rest_days,
            row.home_is_b2b,
            row.away_is_b2b
        );
        row
    }

    /// Sort games by date (ties keep input order) and run one full pass
    pub fn build(games: &[GameRecord], config: &FeatureConfig) -> Vec<FeatureRow> {
        let mut ordered: Vec<&GameRecord> = games.iter().collect();
        ordered.sort_by_key(|g| g.date);

        let mut engine = Self::new(config);
        let rows: Vec<FeatureRow> = ordered.into_iter().map(|g| engine.process(g)).collect();

        log::info!(
            "Built features for {} games across {} teams",
            engine.games_processed(),
            engine.store().team_count()
        );
        rows
    }

    pub fn games_processed(&self) -> usize {
        self.games_processed
    }

    /// Read-only view of the running state
    pub fn store(&self) -> &TeamStateStore {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TeamId;
    use chrono::{Duration, NaiveDate};

    fn game(id: &str, date: NaiveDate, home: &str, away: &str, hp: u32, ap: u32) -> GameRecord {
        GameRecord::new(id, date, "22023", TeamId::new(home), TeamId::new(away), hp, ap)
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 11, day).unwrap()
    }

    fn season() -> Vec<GameRecord> {
        vec![
            game("0022300001", d(1), "BOS", "NYK", 108, 104),
            game("0022300002", d(1), "DEN", "LAL", 119, 107),
            game("0022300003", d(2), "NYK", "DEN", 112, 118),
            game("0022300004", d(3), "LAL", "BOS", 99, 101),
            game("0022300005", d(4), "BOS", "DEN", 121, 117),
            game("0022300006", d(5), "NYK", "LAL", 97, 103),
            game("0022300007", d(7), "DEN", "NYK", 125, 110),
            game("0022300008", d(8), "LAL", "DEN", 111, 115),
        ]
    }

    #[test]
    fn test_first_game_defaults() {
        let rows = ChronologicalFeatureEngine::build(&season(), &FeatureConfig::default());
        let first = &rows[0];

        assert_eq!(first.home_off_rating_simple, 110.0);
        assert_eq!(first.home_def_rating_simple, 110.0);
        assert_eq!(first.away_away_off_rating, 110.0);
        assert_eq!(first.home_rest_days, 5);
        assert_eq!(first.away_rest_days, 5);
        assert_eq!(first.home_is_b2b, 0);
        assert_eq!(first.away_is_b2b, 0);
    }

    #[test]
    fn test_one_row_per_game_with_distinct_sides() {
        let games = season();
        let rows = ChronologicalFeatureEngine::build(&games, &FeatureConfig::default());
        assert_eq!(rows.len(), games.len());

        let mut ids: Vec<&str> = rows.iter().map(|r| r.game_id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), games.len());
        assert!(rows.iter().all(|r| r.home_team != r.away_team));
    }

    #[test]
    fn test_own_result_never_leaks() {
        let games = season();
        let config = FeatureConfig::default();
        let full = ChronologicalFeatureEngine::build(&games, &config);

        // Replaying on every truncated history must reproduce the next row
        for cut in 0..games.len() {
            let mut engine = ChronologicalFeatureEngine::new(&config);
            for g in &games[..cut] {
                engine.process(g);
            }
            let target = &games[cut];
            let replay = engine.features(target, &engine.snapshot(target));
            assert_eq!(replay, full[cut], "mismatch at game {}", target.game_id);
        }
    }

    #[test]
    fn test_changing_a_score_only_affects_later_games() {
        let games = season();
        let config = FeatureConfig::default();
        let base = ChronologicalFeatureEngine::build(&games, &config);

        let mut altered = games.clone();
        altered[4].home_points = 150;
        altered[4].total_points = 150 + altered[4].away_points;
        let changed = ChronologicalFeatureEngine::build(&altered, &config);

        assert_eq!(base[4].home_off_rating_simple, changed[4].home_off_rating_simple);
        assert_eq!(base[4].away_def_rating_simple, changed[4].away_def_rating_simple);
        // DEN's next game sees the conceded points
        assert_ne!(base[6].home_def_rating_simple, changed[6].home_def_rating_simple);
    }

    #[test]
    fn test_sorts_by_date_and_keeps_tie_order() {
        let mut games = season();
        games.reverse();
        let rows = ChronologicalFeatureEngine::build(&games, &FeatureConfig::default());

        assert!(rows.windows(2).all(|w| w[0].date <= w[1].date));
        // Both day-1 games were reversed; the stable sort keeps that order
        assert_eq!(rows[0].game_id, "0022300002");
        assert_eq!(rows[1].game_id, "0022300001");
    }

    #[test]
    fn test_back_to_back_detection() {
        let rows = ChronologicalFeatureEngine::build(&season(), &FeatureConfig::default());

        // DEN: Nov 1, Nov 2 (away at NYK)
        let g3 = &rows[2];
        assert_eq!(g3.away_rest_days, 1);
        assert_eq!(g3.away_is_b2b, 1);
        // NYK: Nov 1, Nov 2 (home)
        assert_eq!(g3.home_is_b2b, 1);

        // BOS: Nov 3, Nov 4 at home -> back-to-back; DEN: Nov 2 -> Nov 4
        let g5 = &rows[4];
        assert_eq!(g5.home_is_b2b, 1);
        assert_eq!(g5.away_rest_days, 2);
        assert_eq!(g5.away_is_b2b, 0);
    }

    #[test]
    fn test_three_game_scenario() {
        let d1 = d(10);
        let d2 = d(12);
        let d3 = d2 + Duration::days(1);
        let games = vec![
            game("0022300101", d1, "A", "B", 110, 100),
            game("0022300102", d2, "A", "C", 120, 104),
            game("0022300103", d3, "D", "A", 95, 101),
        ];
        let rows = ChronologicalFeatureEngine::build(&games, &FeatureConfig::default());
        let third = &rows[2];

        assert_eq!(third.away_team, TeamId::new("A"));
        assert_eq!(third.away_off_rating_simple, 115.0);
        assert_eq!(third.away_def_rating_simple, 102.0);
        // A has never played away: away split falls back to the overall rating
        assert_eq!(third.away_away_off_rating, 115.0);
        assert_eq!(third.away_rest_days, 1);
        assert_eq!(third.away_is_b2b, 1);
        // D has no history: the home-venue columns stay at the prior
        assert_eq!(third.home_home_off_rating, 110.0);
        assert_eq!(third.home_home_def_rating, 110.0);

        // A's home split is unaffected by the away game
        let mut engine = ChronologicalFeatureEngine::new(&FeatureConfig::default());
        for g in &games {
            engine.process(g);
        }
        let a = engine.store().get(&TeamId::new("A"));
        assert_eq!(a.home_games, 2);
        assert_eq!(a.home_points_for, 230);
        assert_eq!(a.away_games, 1);
    }

    #[test]
    fn test_snapshot_does_not_mutate() {
        let engine = ChronologicalFeatureEngine::new(&FeatureConfig::default());
        let g = game("0022300001", d(1), "BOS", "NYK", 108, 104);
        let _ = engine.snapshot(&g);
        let _ = engine.features(&g, &engine.snapshot(&g));
        assert_eq!(engine.store().team_count(), 0);
        assert_eq!(engine.games_processed(), 0);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "out of date order")]
    fn test_process_rejects_earlier_game() {
        let mut engine = ChronologicalFeatureEngine::new(&FeatureConfig::default());
        engine.process(&game("0022300002", d(5), "BOS", "NYK", 108, 104));
        engine.process(&game("0022300001", d(3), "NYK", "LAL", 99, 101));
    }
}
