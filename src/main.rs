//! NBA game-total feature CLI
//!
//! Builds the leakage-free feature table from raw team game logs.

use clap::{Parser, Subcommand};
use totals::{Config, Result};

#[derive(Parser)]
#[command(name = "totals")]
#[command(about = "Leakage-free features for NBA game total prediction", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Data management commands
    Data {
        #[command(subcommand)]
        action: DataCommands,
    },
    /// Build the feature table from raw season files
    Build {
        /// Injury impact table (defaults to the processed directory's copy)
        #[arg(long)]
        injuries: Option<String>,
    },
    /// Build the per-game injury impact table
    Injuries {
        /// Injury events CSV (GAME_ID, home_out_players, away_out_players)
        #[arg(long)]
        events: Option<String>,
        /// Player impact scores CSV (PLAYER_NAME, impact_score)
        #[arg(long)]
        impacts: Option<String>,
    },
    /// Show the features of a game
    Show {
        /// Home team abbreviation (e.g. BOS)
        home: String,
        /// Away team abbreviation (e.g. DAL)
        away: String,
        /// Game date (YYYY-MM-DD); most recent matchup if omitted
        #[arg(long)]
        date: Option<String>,
        /// Specific game id
        #[arg(long)]
        game_id: Option<String>,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Show the chronological train/test split of the feature table
    Split,
    /// Initialize a new project with default config
    Init,
}

#[derive(Subcommand)]
enum DataCommands {
    /// Combine per-season raw files into one table
    Combine,
    /// Show database status
    Status,
}

#[derive(Clone, Debug)]
enum OutputFormat {
    Table,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}. Use table or json.", s)),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    let result = match cli.command {
        Commands::Data { action } => match action {
            DataCommands::Combine => commands::data_combine(&config),
            DataCommands::Status => commands::data_status(&config),
        },
        Commands::Build { injuries } => commands::build(&config, injuries),
        Commands::Injuries { events, impacts } => commands::injuries(&config, events, impacts),
        Commands::Show {
            home,
            away,
            date,
            game_id,
            format,
        } => commands::show(&config, &home, &away, date, game_id, format),
        Commands::Split => commands::split(&config),
        Commands::Init => commands::init(&cli.config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use std::path::{Path, PathBuf};
    use totals::data::raw::{combine_seasons, load_raw_dir};
    use totals::data::table::save_games;
    use totals::data::{Database, FeatureTable};
    use totals::features::MODEL_FEATURES;
    use totals::injury::{build_injury_impacts_from_files, InjuryImpactTable};
    use totals::pipeline::build_features;
    use totals::{TeamId, TotalsError};

    const COMBINED_FILE: &str = "all_seasons_raw_team_games.csv";
    const GAMES_FILE: &str = "games_basic.csv";
    const FEATURES_FILE: &str = "games_with_features.csv";
    const INJURY_FILE: &str = "injury_impact_by_game.csv";
    const EVENTS_FILE: &str = "injury_events.csv";
    const PLAYER_IMPACT_FILE: &str = "player_impact_scores.csv";

    fn processed(config: &Config, file: &str) -> PathBuf {
        Path::new(&config.data.processed_dir).join(file)
    }

    /// Feature table file written by `build`, for databases without features
    fn stored_csv(config: &Config) -> Result<FeatureTable> {
        let path = processed(config, FEATURES_FILE);
        log::warn!(
            "No features in {}; reading {}",
            config.data.database_path,
            path.display()
        );
        FeatureTable::load(path)
    }

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        std::fs::create_dir_all(&config.data.raw_dir)?;
        std::fs::create_dir_all(&config.data.processed_dir)?;
        println!(
            "Created {} and {} directories",
            config.data.raw_dir, config.data.processed_dir
        );

        println!("\nNext steps:");
        println!("  1. Place per-season team game logs in {}", config.data.raw_dir);
        println!("  2. Run 'totals build' to compute the feature table");
        println!("  3. Run 'totals show BOS DAL' to inspect a game");

        Ok(())
    }

    pub fn data_combine(config: &Config) -> Result<()> {
        let out = processed(config, COMBINED_FILE);
        let rows = combine_seasons(&config.data.raw_dir, &out)?;
        println!("Saved combined raw dataset ({} rows) → {}", rows, out.display());
        Ok(())
    }

    pub fn data_status(config: &Config) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let stats = db.get_stats()?;

        println!("Database Status");
        println!("───────────────────────────────");
        println!("  Path:     {}", config.data.database_path);
        println!("  Teams:    {}", stats.team_count);
        println!("  Games:    {}", stats.game_count);
        println!("  Features: {}", stats.feature_count);
        if let (Some(earliest), Some(latest)) = (stats.earliest_game, stats.latest_game) {
            println!("  Range:    {} to {}", earliest, latest);
        }

        Ok(())
    }

    pub fn build(config: &Config, injuries: Option<String>) -> Result<()> {
        let raw = load_raw_dir(&config.data.raw_dir)?;
        if raw.is_empty() {
            println!("No raw games found in {}.", config.data.raw_dir);
            return Ok(());
        }
        println!("Loaded {} team rows", raw.len());

        let injury_path = injuries
            .map(PathBuf::from)
            .unwrap_or_else(|| processed(config, INJURY_FILE));
        let injury_table = InjuryImpactTable::load(&injury_path);

        let output = build_features(&raw, &config.features, injury_table.as_ref())?;

        let games_path = processed(config, GAMES_FILE);
        save_games(&output.games, &games_path)?;
        println!("Saved basic game dataset → {}", games_path.display());

        let features_path = processed(config, FEATURES_FILE);
        output.table.save(&features_path)?;
        println!("Saved dataset with features → {}", features_path.display());

        if output.merge.degraded {
            println!("No injury data merged; injury impacts are 0.0");
        } else {
            println!(
                "Injury impacts matched for {} of {} games",
                output.merge.matched, output.merge.rows
            );
        }

        let db = Database::open(&config.data.database_path)?;
        db.replace_games(&output.games)?;
        let count = db.replace_features(output.table.rows())?;
        println!("Stored {} feature rows in database", count);

        Ok(())
    }

    pub fn injuries(
        config: &Config,
        events: Option<String>,
        impacts: Option<String>,
    ) -> Result<()> {
        let events = events
            .map(PathBuf::from)
            .unwrap_or_else(|| processed(config, EVENTS_FILE));
        let impacts = impacts
            .map(PathBuf::from)
            .unwrap_or_else(|| processed(config, PLAYER_IMPACT_FILE));

        let table = build_injury_impacts_from_files(&events, &impacts)?;
        let out = processed(config, INJURY_FILE);
        table.save(&out)?;
        println!("Saved injury impact for {} games → {}", table.len(), out.display());
        Ok(())
    }

    pub fn show(
        config: &Config,
        home: &str,
        away: &str,
        date: Option<String>,
        game_id: Option<String>,
        format: OutputFormat,
    ) -> Result<()> {
        let date = match date {
            Some(s) => Some(
                chrono::NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                    .map_err(|e| TotalsError::Parse(format!("invalid date '{}': {}", s, e)))?,
            ),
            None => None,
        };

        let home = TeamId::new(&home.to_uppercase());
        let away = TeamId::new(&away.to_uppercase());

        let db = Database::open(&config.data.database_path)?;
        let table = if db.get_stats()?.feature_count > 0 {
            FeatureTable::new(db.get_matchup_features(&home, &away)?)
        } else {
            stored_csv(config)?
        };

        let row = table
            .find_game(&home, &away, date, game_id.as_deref())
            .ok_or_else(|| TotalsError::GameNotFound(format!("{} vs {}", home, away)))?;

        match format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(row)?);
            }
            OutputFormat::Table => {
                println!("\nGame {} ({})", row.game_id, row.season_type);
                println!("───────────────────────────────");
                println!("  Date:         {}", row.date);
                println!("  Home team:    {}", row.home_team);
                println!("  Away team:    {}", row.away_team);
                println!(
                    "  Final:        {}-{} (total {})",
                    row.home_points, row.away_points, row.total_points
                );
                println!("\n  {:<24} {:>10}", "Feature", "Value");
                match row.feature_vector(&MODEL_FEATURES) {
                    Ok(values) => {
                        for (name, value) in MODEL_FEATURES.iter().zip(values) {
                            println!("  {:<24} {:>10.2}", name, value);
                        }
                    }
                    Err(missing) => {
                        println!("  Missing feature columns:");
                        for m in missing {
                            println!("   - {}", m);
                        }
                    }
                }
                println!();
            }
        }

        Ok(())
    }

    pub fn split(config: &Config) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let rows = db.get_features()?;
        let table = if rows.is_empty() {
            stored_csv(config)?
        } else {
            FeatureTable::new(rows)
        };
        let (train, test) = table.chronological_split(config.split.train_fraction);

        println!("Chronological split (regular season only)");
        println!("───────────────────────────────");
        for (label, part) in [("Train", &train), ("Test", &test)] {
            match (part.first(), part.last()) {
                (Some(first), Some(last)) => println!(
                    "  {:<6} {:>6} games  {} to {}",
                    label,
                    part.len(),
                    first.date,
                    last.date
                ),
                _ => println!("  {:<6} {:>6} games", label, 0),
            }
        }

        Ok(())
    }
}
