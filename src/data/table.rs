//! Feature table and game table files

use crate::features::FeatureRow;
use crate::{normalize_game_id, GameRecord, Result, SeasonType, TeamId, TotalsError};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::path::Path;

fn write_csv<T: Serialize, P: AsRef<Path>>(items: &[T], path: P) -> Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    for item in items {
        writer.serialize(item)?;
    }
    writer.flush()?;
    Ok(())
}

fn read_csv<T: DeserializeOwned, R: std::io::Read>(reader: R, origin: &str) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut items = Vec::new();
    for (idx, result) in reader.deserialize().enumerate() {
        let item: T =
            result.map_err(|e| TotalsError::Parse(format!("{} line {}: {}", origin, idx + 2, e)))?;
        items.push(item);
    }
    Ok(items)
}

/// Save normalized games (`games_basic.csv`)
pub fn save_games<P: AsRef<Path>>(games: &[GameRecord], path: P) -> Result<()> {
    write_csv(games, path)
}

/// The feature table, one row per game in processing order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureTable {
    rows: Vec<FeatureRow>,
}

impl FeatureTable {
    pub fn new(rows: Vec<FeatureRow>) -> Self {
        FeatureTable { rows }
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn read<R: std::io::Read>(reader: R, origin: &str) -> Result<Self> {
        let mut rows: Vec<FeatureRow> = read_csv(reader, origin)?;
        for row in &mut rows {
            row.game_id = normalize_game_id(&row.game_id);
        }
        Ok(FeatureTable { rows })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(TotalsError::MissingInput(format!(
                "feature table not found at {}",
                path.display()
            )));
        }
        Self::read(File::open(path)?, &path.display().to_string())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_csv(&self.rows, path)
    }

    /// Most recent game between `home` and `away`, optionally narrowed to a
    /// date or a game id
    pub fn find_game(
        &self,
        home: &TeamId,
        away: &TeamId,
        date: Option<NaiveDate>,
        game_id: Option<&str>,
    ) -> Option<&FeatureRow> {
        let game_id = game_id.map(normalize_game_id);
        self.rows
            .iter()
            .filter(|r| &r.home_team == home && &r.away_team == away)
            .filter(|r| game_id.as_deref().map_or(true, |id| r.game_id == id))
            .filter(|r| date.map_or(true, |d| r.date == d))
            .max_by_key(|r| r.date)
    }

    /// Regular-season rows only
    pub fn regular_season(&self) -> Vec<&FeatureRow> {
        self.rows
            .iter()
            .filter(|r| r.season_type == SeasonType::RegularSeason)
            .collect()
    }

    /// Date-ordered regular-season rows split into (train, test). Every
    /// training game is on or before the first test game's date.
    pub fn chronological_split(&self, train_fraction: f64) -> (Vec<&FeatureRow>, Vec<&FeatureRow>) {
        let mut rows = self.regular_season();
        rows.sort_by_key(|r| r.date);

        let fraction = train_fraction.clamp(0.0, 1.0);
        let split_idx = (fraction * rows.len() as f64) as usize;
        let test = rows.split_off(split_idx);
        (rows, test)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::ChronologicalFeatureEngine;
    use crate::FeatureConfig;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn games() -> Vec<GameRecord> {
        let g = |id: &str, day, home: &str, away: &str| {
            GameRecord::new(id, d(day), "22023", TeamId::new(home), TeamId::new(away), 110, 105)
        };
        vec![
            g("0012300010", 1, "BOS", "MIA"),
            g("0022300900", 2, "BOS", "MIA"),
            g("0022300901", 4, "MIA", "BOS"),
            g("0022300902", 6, "BOS", "MIA"),
            g("0022300903", 8, "PHI", "BOS"),
            g("0042300101", 20, "BOS", "MIA"),
        ]
    }

    fn table() -> FeatureTable {
        FeatureTable::new(ChronologicalFeatureEngine::build(&games(), &FeatureConfig::default()))
    }

    #[test]
    fn test_find_most_recent_matchup() {
        let table = table();
        let bos = TeamId::new("BOS");
        let mia = TeamId::new("MIA");

        let latest = table.find_game(&bos, &mia, None, None).unwrap();
        assert_eq!(latest.game_id, "0042300101");

        let on_date = table.find_game(&bos, &mia, Some(d(6)), None).unwrap();
        assert_eq!(on_date.game_id, "0022300902");

        let by_id = table.find_game(&bos, &mia, None, Some("22300900")).unwrap();
        assert_eq!(by_id.date, d(2));

        assert!(table.find_game(&mia, &bos, Some(d(6)), None).is_none());
    }

    #[test]
    fn test_chronological_split_is_regular_season_only() {
        let table = table();
        let (train, test) = table.chronological_split(0.8);

        assert_eq!(train.len() + test.len(), 4);
        assert_eq!(train.len(), 3);
        assert!(train.iter().chain(test.iter()).all(|r| r.season_type == SeasonType::RegularSeason));
        let last_train = train.iter().map(|r| r.date).max().unwrap();
        assert!(test.iter().all(|r| r.date >= last_train));
    }

    #[test]
    fn test_feature_table_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed").join("games_with_features.csv");
        let table = table();
        table.save(&path).unwrap();

        let loaded = FeatureTable::load(&path).unwrap();
        assert_eq!(loaded.len(), table.len());
        assert_eq!(loaded.rows()[0].game_id, "0012300010");
        assert!(table.rows()[4].away_pts_roll3.is_some());
        assert_eq!(loaded.rows()[4].away_pts_roll3, table.rows()[4].away_pts_roll3);
        assert_eq!(loaded.rows()[0].home_pts_roll3, None);
        assert_eq!(loaded.rows()[5].season_type, SeasonType::Playoffs);
    }

    #[test]
    fn test_games_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("games_basic.csv");
        save_games(&games(), &path).unwrap();

        let loaded: Vec<GameRecord> = read_csv(File::open(&path).unwrap(), "games").unwrap();
        assert_eq!(loaded, games());
        assert_eq!(loaded[0].game_id, "0012300010");
    }

    #[test]
    fn test_load_missing_table() {
        let dir = tempfile::tempdir().unwrap();
        let err = FeatureTable::load(dir.path().join("missing.csv")).unwrap_err();
        assert!(matches!(err, TotalsError::MissingInput(_)));
    }
}
