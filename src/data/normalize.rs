//! Pairing of per-team rows into one record per game

use crate::data::raw::RawTeamGame;
use crate::{GameRecord, Result, TotalsError};
use std::collections::{HashMap, HashSet};

/// Joins the home and away rows of each game
pub struct GameRecordNormalizer {
    home_indicator: String,
}

#[derive(Default)]
struct Sides<'a> {
    home: Vec<&'a RawTeamGame>,
    away: Vec<&'a RawTeamGame>,
}

impl GameRecordNormalizer {
    pub fn new(home_indicator: &str) -> Self {
        GameRecordNormalizer {
            home_indicator: home_indicator.to_string(),
        }
    }

    /// Produce one record per game, in order of each game's first row.
    ///
    /// Any game that does not resolve to exactly one home and one away row
    /// aborts the whole pass.
    pub fn normalize(&self, rows: &[RawTeamGame]) -> Result<Vec<GameRecord>> {
        let mut index: HashMap<(&str, &str), usize> = HashMap::new();
        let mut games: Vec<Sides> = Vec::new();

        for row in rows {
            let key = (row.game_id.as_str(), row.season_id.as_str());
            let slot = *index.entry(key).or_insert_with(|| {
                games.push(Sides::default());
                games.len() - 1
            });
            if row.is_home(&self.home_indicator) {
                games[slot].home.push(row);
            } else {
                games[slot].away.push(row);
            }
        }

        let mut records = Vec::with_capacity(games.len());
        let mut seen_ids = HashSet::new();

        for sides in &games {
            let (home, away) = match (sides.home.as_slice(), sides.away.as_slice()) {
                ([home], [away]) => (*home, *away),
                (h, a) => {
                    let game_id = h.first().or_else(|| a.first()).map(|r| r.game_id.as_str());
                    return Err(TotalsError::DataShape(format!(
                        "game {} has {} home and {} away rows, expected one of each",
                        game_id.unwrap_or("?"),
                        h.len(),
                        a.len()
                    )));
                }
            };

            if home.team == away.team {
                return Err(TotalsError::DataShape(format!(
                    "game {} lists {} as both home and away team",
                    home.game_id, home.team
                )));
            }
            if !seen_ids.insert(home.game_id.as_str()) {
                return Err(TotalsError::DataShape(format!(
                    "game {} appears under more than one season",
                    home.game_id
                )));
            }
            if home.date != away.date {
                log::warn!(
                    "Game {}: home row dated {}, away row dated {}; using home date",
                    home.game_id,
                    home.date,
                    away.date
                );
            }

            records.push(GameRecord::new(
                &home.game_id,
                home.date,
                &home.season_id,
                home.team.clone(),
                away.team.clone(),
                home.points,
                away.points,
            ));
        }

        log::info!(
            "Normalized {} team rows into {} games",
            rows.len(),
            records.len()
        );
        Ok(records)
    }
}
