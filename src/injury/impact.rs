//! Injury impact table construction
//!
//! Sums the impact scores of the players ruled out on each side of a game.
//! Player impact scores themselves come from an upstream model.

use crate::injury::merge::{InjuryImpactRecord, InjuryImpactTable};
use crate::{normalize_game_id, Result, TotalsError};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct PlayerImpactRow {
    #[serde(rename = "PLAYER_NAME")]
    player_name: String,
    impact_score: f64,
}

#[derive(Debug, Deserialize)]
struct InjuryEventRow {
    #[serde(rename = "GAME_ID")]
    game_id: String,
    #[serde(default)]
    home_out_players: Option<String>,
    #[serde(default)]
    away_out_players: Option<String>,
}

/// Case- and whitespace-insensitive player key
fn player_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Split a `;`-separated player list, dropping blanks
pub fn parse_player_list(s: Option<&str>) -> Vec<&str> {
    match s {
        Some(list) => list
            .split(';')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect(),
        None => Vec::new(),
    }
}

/// Impact score per player. A player listed more than once (one row per
/// season) keeps the highest score.
#[derive(Debug, Clone, Default)]
pub struct PlayerImpactTable {
    scores: HashMap<String, f64>,
}

impl PlayerImpactTable {
    pub fn read<R: std::io::Read>(reader: R, origin: &str) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(reader);
        let mut table = PlayerImpactTable::default();

        for (idx, result) in reader.deserialize::<PlayerImpactRow>().enumerate() {
            let row = result
                .map_err(|e| TotalsError::Parse(format!("{} line {}: {}", origin, idx + 2, e)))?;
            table.insert(&row.player_name, row.impact_score);
        }

        Ok(table)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = open_input(path, "player impact scores")?;
        Self::read(file, &path.display().to_string())
    }

    pub fn insert(&mut self, name: &str, score: f64) {
        let entry = self.scores.entry(player_key(name)).or_insert(score);
        if score > *entry {
            *entry = score;
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.scores.get(&player_key(name)).copied()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Total impact of the given players. Unknown players are logged and
    /// count as zero.
    pub fn sum_impact(&self, players: &[&str]) -> f64 {
        players
            .iter()
            .map(|name| match self.get(name) {
                Some(score) => score,
                None => {
                    log::warn!("No impact score for {}", name);
                    0.0
                }
            })
            .sum()
    }
}

fn open_input(path: &Path, what: &str) -> Result<File> {
    if !path.exists() {
        return Err(TotalsError::MissingInput(format!(
            "{} not found at {}",
            what,
            path.display()
        )));
    }
    Ok(File::open(path)?)
}

/// One injury impact row per event row, in event order
pub fn build_injury_impacts<R: std::io::Read>(
    events: R,
    origin: &str,
    players: &PlayerImpactTable,
) -> Result<InjuryImpactTable> {
    let mut reader = csv::Reader::from_reader(events);
    let mut records = Vec::new();

    for (idx, result) in reader.deserialize::<InjuryEventRow>().enumerate() {
        let event = result
            .map_err(|e| TotalsError::Parse(format!("{} line {}: {}", origin, idx + 2, e)))?;

        let home_out = parse_player_list(event.home_out_players.as_deref());
        let away_out = parse_player_list(event.away_out_players.as_deref());

        records.push(InjuryImpactRecord {
            game_id: normalize_game_id(&event.game_id),
            home: Some(players.sum_impact(&home_out)),
            away: Some(players.sum_impact(&away_out)),
        });
    }

    log::info!("Built injury impact for {} games", records.len());
    Ok(InjuryImpactTable::from_records(records))
}

/// Build the injury impact table from an events file and a player score file
pub fn build_injury_impacts_from_files<P: AsRef<Path>, Q: AsRef<Path>>(
    events_path: P,
    players_path: Q,
) -> Result<InjuryImpactTable> {
    let players = PlayerImpactTable::load(players_path)?;
    let events_path = events_path.as_ref();
    let events = open_input(events_path, "injury events")?;
    build_injury_impacts(events, &events_path.display().to_string(), &players)
}
