//! Chess Stats - Dashboard views over chess game CSV exports
//!
//! Loads a game CSV (Lichess-style columns), derives winner, average rating,
//! move count and month for every game, and prints or exports the aggregate
//! views.

use anyhow::Result;
use chess_dashboard::config::DashboardConfig;
use chess_dashboard::filter::GameFilter;
use chess_dashboard::pipeline::{self, ExportConfig};
use chess_dashboard::record::{parse_date, AvgEloPolicy};
use chess_dashboard::report::{self, SectionSet};
use chess_dashboard::views::{CategoryField, GameView};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "chess-stats")]
#[command(about = "Normalize chess game CSVs and print dashboard statistics")]
struct Cli {
    /// Config file (defaults to ~/.chess-dashboard.conf when present)
    #[arg(long, global = true, env = "CHESS_DASHBOARD_CONFIG")]
    config: Option<PathBuf>,

    /// Average rating policy: exact or truncate (overrides the config file)
    #[arg(long, global = true)]
    avg_policy: Option<AvgEloPolicy>,

    #[command(subcommand)]
    command: Commands,
}

/// Range filters shared by every view command.
#[derive(Args, Debug, Default)]
struct FilterArgs {
    /// First game date to include (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date_arg)]
    from: Option<NaiveDate>,

    /// Last game date to include (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date_arg)]
    to: Option<NaiveDate>,

    /// Minimum average rating
    #[arg(long)]
    min_rating: Option<f64>,

    /// Maximum average rating
    #[arg(long)]
    max_rating: Option<f64>,
}

impl FilterArgs {
    fn to_filter(&self) -> GameFilter {
        GameFilter::from_endpoints(self.from, self.to, self.min_rating, self.max_rating)
    }
}

fn parse_date_arg(s: &str) -> std::result::Result<NaiveDate, String> {
    parse_date(s).ok_or_else(|| format!("'{}' is not a date (expected YYYY-MM-DD)", s))
}

#[derive(Subcommand)]
enum Commands {
    /// Print the text dashboard
    Report {
        /// Input CSV file
        #[arg(short, long)]
        input: PathBuf,

        /// Comma-separated sections to print (default: from config)
        #[arg(long, value_delimiter = ',')]
        sections: Option<Vec<String>>,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Write the input CSV with winner, avg_elo, num_moves and month columns
    Export {
        /// Input CSV file
        #[arg(short, long)]
        input: PathBuf,

        /// Output CSV file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Frequency table for one categorical field
    Counts {
        /// Input CSV file
        #[arg(short, long)]
        input: PathBuf,

        /// Field: winner, termination, eco, time_control, event, white, black
        #[arg(short, long)]
        field: CategoryField,

        /// Keep only the N most frequent values
        #[arg(long)]
        top_n: Option<usize>,

        /// Show percentages of the filtered game count
        #[arg(long)]
        percent: bool,

        /// Also write the table as CSV
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Per-opening game count and White win rate
    Openings {
        /// Input CSV file
        #[arg(short, long)]
        input: PathBuf,

        /// Minimum games for an opening to be listed (default: from config)
        #[arg(long)]
        min_games: Option<usize>,

        /// Maximum openings to list (default: from config)
        #[arg(long)]
        limit: Option<usize>,

        /// Also write the table as CSV
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Games per month
    Timeline {
        /// Input CSV file
        #[arg(short, long)]
        input: PathBuf,

        /// Also write the series as CSV
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Correlation matrix of ratings and game length
    Correlation {
        /// Input CSV file
        #[arg(short, long)]
        input: PathBuf,

        #[command(flatten)]
        filter: FilterArgs,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = DashboardConfig::load_or_default(cli.config.as_deref())?;
    if let Some(policy) = cli.avg_policy {
        config.ingest.policy = policy;
    }

    match cli.command {
        Commands::Report {
            input,
            sections,
            filter,
        } => {
            if let Some(list) = sections {
                config.sections = SectionSet::parse_list(&list)?;
            }
            let table = pipeline::load_games(&input, &config)?;
            print!(
                "{}",
                pipeline::dashboard_report(&table, &filter.to_filter(), &config)?
            );
        }
        Commands::Export { input, output } => {
            let summary = pipeline::export_csv(&ExportConfig { input, output }, &config)?;
            println!("{}", summary);
        }
        Commands::Counts {
            input,
            field,
            top_n,
            percent,
            output,
            filter,
        } => {
            let table = pipeline::load_games(&input, &config)?;
            let all = GameView::all(&table);
            let view = all.filter(&filter.to_filter());
            let title = format!("{} ({} games)", field, view.len());
            if percent {
                let rows = view.category_shares(field, top_n);
                print!("{}", report::format_shares(&title, &rows)?);
                write_optional(&rows, output.as_deref())?;
            } else {
                let rows = view.category_counts(field, top_n);
                print!("{}", report::format_counts(&title, &rows)?);
                write_optional(&rows, output.as_deref())?;
            }
        }
        Commands::Openings {
            input,
            min_games,
            limit,
            output,
            filter,
        } => {
            let min_games = min_games.unwrap_or(config.min_opening_games);
            let limit = limit.unwrap_or(config.opening_limit);
            let table = pipeline::load_games(&input, &config)?;
            let all = GameView::all(&table);
            let view = all.filter(&filter.to_filter());
            let rows = view.opening_performance(min_games, Some(limit));
            print!("{}", report::format_openings(&rows, min_games)?);
            write_optional(&rows, output.as_deref())?;
        }
        Commands::Timeline {
            input,
            output,
            filter,
        } => {
            let table = pipeline::load_games(&input, &config)?;
            let all = GameView::all(&table);
            let rows = all.filter(&filter.to_filter()).monthly_counts();
            print!("{}", report::format_timeline(&rows)?);
            write_optional(&rows, output.as_deref())?;
        }
        Commands::Correlation { input, filter } => {
            let table = pipeline::load_games(&input, &config)?;
            let all = GameView::all(&table);
            let view = all.filter(&filter.to_filter());
            println!("Correlation over {} games", view.len());
            print!("{}", report::format_correlation(&view.correlation_matrix())?);
        }
    }

    Ok(())
}

fn write_optional<T: serde::Serialize>(rows: &[T], output: Option<&Path>) -> Result<()> {
    if let Some(path) = output {
        let n = pipeline::write_rows(rows, path)?;
        eprintln!("Wrote {} rows to {}", n, path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_filters() {
        let cli = Cli::try_parse_from([
            "chess-stats",
            "counts",
            "-i",
            "games.csv",
            "--field",
            "time control",
            "--top-n",
            "5",
            "--from",
            "2024-01-01",
            "--min-rating",
            "1500",
        ])
        .unwrap();
        match cli.command {
            Commands::Counts {
                field,
                top_n,
                filter,
                ..
            } => {
                assert_eq!(field, CategoryField::TimeControl);
                assert_eq!(top_n, Some(5));
                let f = filter.to_filter();
                assert!(f.dates.is_some());
                assert_eq!(f.rating.map(|r| r.0), Some(1500.0));
            }
            _ => panic!("expected counts"),
        }
    }

    #[test]
    fn test_cli_rejects_bad_date() {
        let args = ["chess-stats", "timeline", "-i", "g.csv", "--to", "soon"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_cli_report_sections_and_policy() {
        let cli = Cli::try_parse_from([
            "chess-stats",
            "--avg-policy",
            "truncate",
            "report",
            "-i",
            "g.csv",
            "--sections",
            "outcomes,openings",
        ])
        .unwrap();
        assert_eq!(cli.avg_policy, Some(AvgEloPolicy::Truncate));
        match cli.command {
            Commands::Report { sections, .. } => {
                let set = SectionSet::parse_list(&sections.unwrap()).unwrap();
                assert_eq!(set.to_string(), "outcomes,openings");
            }
            _ => panic!("expected report"),
        }
    }
}
