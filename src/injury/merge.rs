//! Injury impact join
//!
//! Left-joins a per-game injury table onto the feature table. The table is
//! optional input: when it is missing, empty, or has no `GAME_ID` column the
//! features keep their existing impacts and the condition is only logged.

use crate::features::FeatureRow;
use crate::{normalize_game_id, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

/// Injury impact for both sides of one game. None = no value in the table.
#[derive(Debug, Clone, PartialEq)]
pub struct InjuryImpactRecord {
    pub game_id: String,
    pub home: Option<f64>,
    pub away: Option<f64>,
}

#[derive(Serialize)]
struct ImpactRow<'a> {
    #[serde(rename = "GAME_ID")]
    game_id: &'a str,
    home_injury_impact: Option<f64>,
    away_injury_impact: Option<f64>,
}

/// Per-game injury impacts keyed by game id
#[derive(Debug, Clone, Default)]
pub struct InjuryImpactTable {
    records: Vec<InjuryImpactRecord>,
}

impl InjuryImpactTable {
    pub fn from_records(records: Vec<InjuryImpactRecord>) -> Self {
        InjuryImpactTable { records }
    }

    pub fn records(&self) -> &[InjuryImpactRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Parse an injury table. Returns None, with a warning, when the input
    /// is unreadable or has no `GAME_ID` column. Cells that are empty or not
    /// numeric become missing values.
    pub fn read<R: std::io::Read>(reader: R, origin: &str) -> Option<Self> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

        let headers = match reader.headers() {
            Ok(h) => h.clone(),
            Err(e) => {
                log::warn!("Injury table {} unreadable ({}); using zero impact", origin, e);
                return None;
            }
        };
        let column = |name: &str| headers.iter().position(|h| h.trim() == name);
        let id_col = match column("GAME_ID") {
            Some(i) => i,
            None => {
                log::warn!("Injury table {} has no GAME_ID column; using zero impact", origin);
                return None;
            }
        };
        let home_col = column("home_injury_impact");
        let away_col = column("away_injury_impact");

        let value = |record: &csv::StringRecord, col: Option<usize>| {
            col.and_then(|i| record.get(i))
                .and_then(|cell| cell.trim().parse::<f64>().ok())
        };

        let mut records = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let record = match result {
                Ok(r) => r,
                Err(e) => {
                    log::warn!("Injury table {} line {}: {}; row skipped", origin, idx + 2, e);
                    continue;
                }
            };
            let game_id = match record.get(id_col).map(normalize_game_id) {
                Some(id) if !id.is_empty() => id,
                _ => continue,
            };
            records.push(InjuryImpactRecord {
                game_id,
                home: value(&record, home_col),
                away: value(&record, away_col),
            });
        }

        Some(InjuryImpactTable { records })
    }

    /// Load an injury table from disk; None if the file does not exist
    pub fn load<P: AsRef<Path>>(path: P) -> Option<Self> {
        let path = path.as_ref();
        match File::open(path) {
            Ok(file) => Self::read(file, &path.display().to_string()),
            Err(e) => {
                log::warn!(
                    "Injury table {} not available ({}); using zero impact",
                    path.display(),
                    e
                );
                None
            }
        }
    }

    /// Write as `GAME_ID,home_injury_impact,away_injury_impact`
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = csv::Writer::from_path(path)?;
        for r in &self.records {
            writer.serialize(ImpactRow {
                game_id: &r.game_id,
                home_injury_impact: r.home,
                away_injury_impact: r.away,
            })?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// What a merge did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub rows: usize,
    pub matched: usize,
    /// No usable table: features were left untouched
    pub degraded: bool,
}

/// External value if present, else the existing one, else 0.0
fn resolve(external: Option<f64>, existing: f64) -> f64 {
    let value = external.filter(|v| !v.is_nan()).unwrap_or(existing);
    if value.is_nan() {
        0.0
    } else {
        value
    }
}

/// Join injury impacts onto the feature rows in place.
///
/// Only the two impact columns change; row order and count are preserved.
pub fn merge_injury_impacts(
    rows: &mut [FeatureRow],
    table: Option<&InjuryImpactTable>,
) -> MergeSummary {
    let table = match table {
        Some(t) if !t.is_empty() => t,
        _ => {
            log::warn!("No injury impact data; keeping existing impacts");
            return MergeSummary {
                rows: rows.len(),
                matched: 0,
                degraded: true,
            };
        }
    };

    let mut by_game: HashMap<&str, &InjuryImpactRecord> = HashMap::new();
    for record in table.records() {
        if by_game.contains_key(record.game_id.as_str()) {
            log::warn!(
                "Duplicate injury row for game {}; keeping the first",
                record.game_id
            );
            continue;
        }
        by_game.insert(record.game_id.as_str(), record);
    }

    let mut matched = 0;
    for row in rows.iter_mut() {
        let record = by_game.get(row.game_id.as_str());
        if record.is_some() {
            matched += 1;
        }
        row.home_injury_impact = resolve(record.and_then(|r| r.home), row.home_injury_impact);
        row.away_injury_impact = resolve(record.and_then(|r| r.away), row.away_injury_impact);
    }

    log::info!(
        "Merged injury impacts: {} of {} games matched",
        matched,
        rows.len()
    );
    MergeSummary {
        rows: rows.len(),
        matched,
        degraded: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::ChronologicalFeatureEngine;
    use crate::{FeatureConfig, GameRecord, TeamId};
    use chrono::NaiveDate;

    fn feature_rows() -> Vec<FeatureRow> {
        let date = |d| NaiveDate::from_ymd_opt(2024, 2, d).unwrap();
        let games = vec![
            GameRecord::new("0022300700", date(1), "22023", TeamId::new("MIL"), TeamId::new("CHI"), 120, 111),
            GameRecord::new("0022300701", date(2), "22023", TeamId::new("CHI"), TeamId::new("ATL"), 99, 104),
            GameRecord::new("0022300702", date(3), "22023", TeamId::new("ATL"), TeamId::new("MIL"), 130, 128),
        ];
        ChronologicalFeatureEngine::build(&games, &FeatureConfig::default())
    }

    #[test]
    fn test_merge_single_game() {
        let mut rows = feature_rows();
        let table = InjuryImpactTable::from_records(vec![InjuryImpactRecord {
            game_id: "0022300701".to_string(),
            home: Some(31.5),
            away: Some(4.0),
        }]);

        let summary = merge_injury_impacts(&mut rows, Some(&table));

        assert_eq!(summary.matched, 1);
        assert!(!summary.degraded);
        assert_eq!(rows[1].home_injury_impact, 31.5);
        assert_eq!(rows[1].away_injury_impact, 4.0);
        for i in [0, 2] {
            assert_eq!(rows[i].home_injury_impact, 0.0);
            assert_eq!(rows[i].away_injury_impact, 0.0);
        }
    }

    #[test]
    fn test_absent_table_is_noop() {
        let mut rows = feature_rows();
        let before = rows.clone();

        let summary = merge_injury_impacts(&mut rows, None);
        assert!(summary.degraded);
        assert_eq!(rows, before);

        let empty = InjuryImpactTable::default();
        merge_injury_impacts(&mut rows, Some(&empty));
        assert_eq!(rows, before);
    }

    #[test]
    fn test_missing_value_falls_back_to_existing() {
        let mut rows = feature_rows();
        rows[0].home_injury_impact = 2.5;
        rows[0].away_injury_impact = f64::NAN;
        let table = InjuryImpactTable::from_records(vec![InjuryImpactRecord {
            game_id: "0022300700".to_string(),
            home: None,
            away: None,
        }]);

        merge_injury_impacts(&mut rows, Some(&table));
        assert_eq!(rows[0].home_injury_impact, 2.5);
        assert_eq!(rows[0].away_injury_impact, 0.0);
    }

    #[test]
    fn test_read_without_game_id_column() {
        let text = "id,home_injury_impact,away_injury_impact\n0022300700,1.0,2.0\n";
        assert!(InjuryImpactTable::read(text.as_bytes(), "test").is_none());
    }

    #[test]
    fn test_read_tolerates_bad_cells() {
        let text = "\
GAME_ID,home_injury_impact,away_injury_impact
22300700,12.5,
0022300701,n/a,3.0
0022300700,99.0,99.0
";
        let table = InjuryImpactTable::read(text.as_bytes(), "test").unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.records()[0].game_id, "0022300700");
        assert_eq!(table.records()[0].away, None);
        assert_eq!(table.records()[1].home, None);

        // First occurrence of a duplicated game wins
        let mut rows = feature_rows();
        merge_injury_impacts(&mut rows, Some(&table));
        assert_eq!(rows[0].home_injury_impact, 12.5);
        assert_eq!(rows[0].away_injury_impact, 0.0);
        assert_eq!(rows[1].away_injury_impact, 3.0);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(InjuryImpactTable::load(dir.path().join("nope.csv")).is_none());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("injury_impact_by_game.csv");
        let table = InjuryImpactTable::from_records(vec![InjuryImpactRecord {
            game_id: "0022300702".to_string(),
            home: Some(10.0),
            away: None,
        }]);
        table.save(&path).unwrap();

        let loaded = InjuryImpactTable::load(&path).unwrap();
        assert_eq!(loaded.records(), table.records());
    }
}
