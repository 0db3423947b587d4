//! SQLite storage for games and feature rows

use crate::features::FeatureRow;
use crate::{GameRecord, Result, TeamId};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// Database connection and operations
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS games (
                game_id TEXT PRIMARY KEY,
                date TEXT NOT NULL,
                season_id TEXT NOT NULL,
                season_type TEXT NOT NULL,
                home_team TEXT NOT NULL,
                away_team TEXT NOT NULL,
                home_points INTEGER NOT NULL,
                away_points INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS features (
                game_id TEXT PRIMARY KEY,
                seq INTEGER NOT NULL,
                date TEXT NOT NULL,
                home_team TEXT NOT NULL,
                away_team TEXT NOT NULL,
                payload TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_games_date ON games(date);
            CREATE INDEX IF NOT EXISTS idx_features_teams ON features(home_team, away_team);
            "#,
        )?;
        Ok(())
    }

    // ==================== Games ====================

    /// Replace the stored games with `games`
    pub fn replace_games(&self, games: &[GameRecord]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM games", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO games (game_id, date, season_id, season_type, home_team,
                                    away_team, home_points, away_points)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for game in games {
                stmt.execute(params![
                    game.game_id,
                    game.date.format("%Y-%m-%d").to_string(),
                    game.season_id,
                    game.season_type.label(),
                    game.home_team.as_str(),
                    game.away_team.as_str(),
                    game.home_points,
                    game.away_points,
                ])?;
            }
        }
        tx.commit()?;
        Ok(games.len())
    }

    // ==================== Features ====================

    /// Replace the stored feature table, keeping row order
    pub fn replace_features(&self, rows: &[FeatureRow]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM features", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO features (game_id, seq, date, home_team, away_team, payload)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for (seq, row) in rows.iter().enumerate() {
                let payload = serde_json::to_string(row)?;
                stmt.execute(params![
                    row.game_id,
                    seq as i64,
                    row.date.format("%Y-%m-%d").to_string(),
                    row.home_team.as_str(),
                    row.away_team.as_str(),
                    payload,
                ])?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    /// The stored feature table in its original order
    pub fn get_features(&self) -> Result<Vec<FeatureRow>> {
        let mut stmt = self
            .conn
            .prepare("SELECT payload FROM features ORDER BY seq")?;
        let payloads = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut rows = Vec::with_capacity(payloads.len());
        for payload in payloads {
            rows.push(serde_json::from_str(&payload)?);
        }
        Ok(rows)
    }

    /// Feature rows for a matchup, oldest first
    pub fn get_matchup_features(&self, home: &TeamId, away: &TeamId) -> Result<Vec<FeatureRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT payload FROM features
             WHERE home_team = ?1 AND away_team = ?2
             ORDER BY seq",
        )?;
        let payloads = stmt
            .query_map(params![home.as_str(), away.as_str()], |row| {
                row.get::<_, String>(0)
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut rows = Vec::with_capacity(payloads.len());
        for payload in payloads {
            rows.push(serde_json::from_str(&payload)?);
        }
        Ok(rows)
    }

    // ==================== Statistics ====================

    /// Get database statistics
    pub fn get_stats(&self) -> Result<DatabaseStats> {
        let game_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM games", [], |row| row.get(0))?;

        let feature_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM features", [], |row| row.get(0))?;

        let team_count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM (SELECT home_team FROM games UNION SELECT away_team FROM games)",
            [],
            |row| row.get(0),
        )?;

        let min_date: Option<String> = self
            .conn
            .query_row("SELECT MIN(date) FROM games", [], |row| row.get(0))
            .optional()?
            .flatten();

        let max_date: Option<String> = self
            .conn
            .query_row("SELECT MAX(date) FROM games", [], |row| row.get(0))
            .optional()?
            .flatten();

        Ok(DatabaseStats {
            team_count: team_count as usize,
            game_count: game_count as usize,
            feature_count: feature_count as usize,
            earliest_game: min_date.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
            latest_game: max_date.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
        })
    }
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub team_count: usize,
    pub game_count: usize,
    pub feature_count: usize,
    pub earliest_game: Option<NaiveDate>,
    pub latest_game: Option<NaiveDate>,
}
