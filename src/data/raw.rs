//! Raw per-team game logs
//!
//! One row per team per game, as produced by the league game finder export.

use crate::{normalize_game_id, Result, TeamId, TotalsError};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::fs::File;
use std::path::{Path, PathBuf};

/// A single team's line for one game
#[derive(Debug, Clone, PartialEq)]
pub struct RawTeamGame {
    pub game_id: String,
    pub date: NaiveDate,
    pub season_id: String,
    pub team: TeamId,
    /// "BOS vs. DAL" for home games, "BOS @ DAL" for away games
    pub matchup: String,
    pub points: u32,
}

impl RawTeamGame {
    pub fn is_home(&self, home_indicator: &str) -> bool {
        self.matchup.contains(home_indicator)
    }
}

/// Columns as they appear in the export. Everything else is ignored.
#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(rename = "GAME_ID")]
    game_id: String,
    #[serde(rename = "GAME_DATE")]
    game_date: String,
    #[serde(rename = "SEASON_ID")]
    season_id: String,
    #[serde(rename = "TEAM_ABBREVIATION")]
    team: String,
    #[serde(rename = "MATCHUP")]
    matchup: String,
    #[serde(rename = "PTS")]
    points: String,
}

impl RawRow {
    fn into_game(self, origin: &str, line: usize) -> Result<RawTeamGame> {
        let date = parse_game_date(&self.game_date).ok_or_else(|| {
            TotalsError::Parse(format!(
                "{} line {}: invalid GAME_DATE '{}'",
                origin, line, self.game_date
            ))
        })?;
        let points = parse_points(&self.points).ok_or_else(|| {
            TotalsError::Parse(format!(
                "{} line {}: invalid PTS '{}'",
                origin, line, self.points
            ))
        })?;

        Ok(RawTeamGame {
            game_id: normalize_game_id(&self.game_id),
            date,
            season_id: self.season_id.trim().to_string(),
            team: TeamId::new(&self.team),
            matchup: self.matchup,
            points,
        })
    }
}

/// Parse a game date in any of the formats the export has used
pub fn parse_game_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").map(|dt| dt.date()))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|dt| dt.date()))
        .or_else(|_| NaiveDate::parse_from_str(s, "%b %d, %Y"))
        .ok()
}

/// Points may arrive as "112" or "112.0"
fn parse_points(s: &str) -> Option<u32> {
    let s = s.trim();
    if let Ok(p) = s.parse::<u32>() {
        return Some(p);
    }
    let value: f64 = s.parse().ok()?;
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= u32::MAX as f64 {
        Some(value as u32)
    } else {
        None
    }
}

/// Load raw team games from a CSV reader, in file order
pub fn read_raw_games<R: std::io::Read>(reader: R, origin: &str) -> Result<Vec<RawTeamGame>> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut games = Vec::new();

    for (idx, result) in reader.deserialize::<RawRow>().enumerate() {
        // Header is line 1
        let line = idx + 2;
        let row = result.map_err(|e| {
            TotalsError::Parse(format!("{} line {}: {}", origin, line, e))
        })?;
        games.push(row.into_game(origin, line)?);
    }

    Ok(games)
}

/// Load raw team games from a single CSV file
pub fn load_raw_games<P: AsRef<Path>>(path: P) -> Result<Vec<RawTeamGame>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    read_raw_games(file, &path.display().to_string())
}

/// All `*.csv` files in a directory, sorted by file name
pub fn season_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().map_or(false, |ext| ext == "csv"))
        .collect();
    files.sort();
    Ok(files)
}

/// Load every season file in a directory, concatenated in file-name order
pub fn load_raw_dir<P: AsRef<Path>>(dir: P) -> Result<Vec<RawTeamGame>> {
    let mut games = Vec::new();
    for path in season_files(dir)? {
        let season = load_raw_games(&path)?;
        log::debug!("Loaded {} team rows from {}", season.len(), path.display());
        games.extend(season);
    }
    Ok(games)
}

/// Concatenate per-season files into one CSV, keeping every column.
///
/// Columns are the union of all headers in first-seen order; a file that lacks
/// a column gets an empty cell. Returns the number of data rows written.
pub fn combine_seasons<P: AsRef<Path>, Q: AsRef<Path>>(dir: P, out: Q) -> Result<usize> {
    let files = season_files(&dir)?;
    if files.is_empty() {
        return Err(TotalsError::DataShape(format!(
            "no season CSV files in {}",
            dir.as_ref().display()
        )));
    }

    let mut tables = Vec::new();
    let mut columns: Vec<String> = Vec::new();
    for path in &files {
        let mut reader = csv::Reader::from_path(path)?;
        let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
        for h in &headers {
            if !columns.contains(h) {
                columns.push(h.clone());
            }
        }
        let records = reader.records().collect::<std::result::Result<Vec<_>, _>>()?;
        tables.push((headers, records));
    }

    if let Some(parent) = out.as_ref().parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(&out)?;
    writer.write_record(&columns)?;

    let mut rows = 0;
    for (headers, records) in &tables {
        let positions: Vec<Option<usize>> = columns
            .iter()
            .map(|c| headers.iter().position(|h| h == c))
            .collect();
        for record in records {
            let cells: Vec<&str> = positions
                .iter()
                .map(|pos| pos.and_then(|i| record.get(i)).unwrap_or(""))
                .collect();
            writer.write_record(&cells)?;
            rows += 1;
        }
    }
    writer.flush()?;

    log::info!(
        "Combined {} season files ({} rows) into {}",
        files.len(),
        rows,
        out.as_ref().display()
    );
    Ok(rows)
}
