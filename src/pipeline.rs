//! End-to-end feature build
//!
//! raw team rows -> games -> chronological features -> injury merge

use crate::data::{FeatureTable, GameRecordNormalizer, RawTeamGame};
use crate::features::ChronologicalFeatureEngine;
use crate::injury::{merge_injury_impacts, InjuryImpactTable, MergeSummary};
use crate::{FeatureConfig, GameRecord, Result};

/// Everything a build produces
#[derive(Debug, Clone)]
pub struct BuildOutput {
    /// Normalized games in first-seen order
    pub games: Vec<GameRecord>,
    /// Feature rows in date order
    pub table: FeatureTable,
    pub merge: MergeSummary,
}

/// Run the full transform. Normalization errors abort before any features
/// are produced; a missing injury table only degrades the injury columns.
pub fn build_features(
    raw: &[RawTeamGame],
    config: &FeatureConfig,
    injuries: Option<&InjuryImpactTable>,
) -> Result<BuildOutput> {
    let games = GameRecordNormalizer::new(&config.home_indicator).normalize(raw)?;

    let mut rows = ChronologicalFeatureEngine::build(&games, config);
    let merge = merge_injury_impacts(&mut rows, injuries);

    Ok(BuildOutput {
        games,
        table: FeatureTable::new(rows),
        merge,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::raw::read_raw_games;
    use crate::injury::InjuryImpactRecord;
    use crate::TotalsError;

    const RAW: &str = "\
SEASON_ID,TEAM_ID,TEAM_ABBREVIATION,GAME_ID,GAME_DATE,MATCHUP,WL,PTS
22023,1,AAA,0022300003,2023-11-03,AAA @ DDD,W,101
22023,4,DDD,0022300003,2023-11-03,DDD vs. AAA,L,95
22023,1,AAA,0022300002,2023-11-02,AAA vs. CCC,W,120
22023,3,CCC,0022300002,2023-11-02,CCC @ AAA,L,104
22023,1,AAA,0022300001,2023-10-30,AAA vs. BBB,W,110
22023,2,BBB,0022300001,2023-10-30,BBB @ AAA,L,100
";

    #[test]
    fn test_build_from_raw_rows() {
        let raw = read_raw_games(RAW.as_bytes(), "raw").unwrap();
        let injuries = InjuryImpactTable::from_records(vec![InjuryImpactRecord {
            game_id: "0022300003".to_string(),
            home: Some(12.0),
            away: None,
        }]);

        let out = build_features(&raw, &FeatureConfig::default(), Some(&injuries)).unwrap();

        assert_eq!(out.games.len(), 3);
        // Normalized in file order, features in date order
        assert_eq!(out.games[0].game_id, "0022300003");
        let rows = out.table.rows();
        assert_eq!(rows[0].game_id, "0022300001");
        assert_eq!(rows[2].game_id, "0022300003");

        let last = &rows[2];
        assert_eq!(last.away_off_rating_simple, 115.0);
        assert_eq!(last.away_rest_days, 1);
        assert_eq!(last.away_is_b2b, 1);
        assert_eq!(last.home_home_off_rating, 110.0);
        assert_eq!(last.home_injury_impact, 12.0);
        assert_eq!(last.away_injury_impact, 0.0);
        assert_eq!(out.merge.matched, 1);
    }

    #[test]
    fn test_broken_game_aborts_build() {
        let mut raw = read_raw_games(RAW.as_bytes(), "raw").unwrap();
        raw.pop();
        let err = build_features(&raw, &FeatureConfig::default(), None).unwrap_err();
        assert!(matches!(err, TotalsError::DataShape(_)));
    }
}
