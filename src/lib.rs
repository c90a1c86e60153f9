//! Chess Game Dashboard
//!
//! Normalizes chess game exports (CSV) into typed records and computes the
//! aggregate views behind a game-statistics dashboard.
//!
//! This library provides:
//! - `record`: per-game record, result and rating derivations
//! - `ingest`: header normalization, CSV loading, augmented CSV export
//! - `filter`: date and rating range filters
//! - `stats`: mean, standard deviation, correlation, histograms
//! - `views`: category counts, rates, time series, opening performance, correlation
//! - `session`: per-session cache of the loaded table
//! - `config`: dashboard settings file
//! - `report`: plain-text dashboard sections
//! - `pipeline`: entry points shared by the binaries
//!
//! Binaries:
//! - `chess-stats`: command-line reports and CSV exports
//! - `chess-dashboard-ui`: desktop dashboard

pub mod config;
pub mod filter;
pub mod ingest;
pub mod pipeline;
pub mod record;
pub mod report;
pub mod session;
pub mod stats;
pub mod views;

pub use config::DashboardConfig;
pub use filter::{FilterBounds, GameFilter};
pub use ingest::{GameTable, IngestOptions};
pub use record::{AvgEloPolicy, GameRecord, Winner, YearMonth};
pub use report::{Section, SectionSet};
pub use session::Session;
pub use views::GameView;
