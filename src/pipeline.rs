//! Pipeline functions for programmatic use by both CLI and GUI.
//!
//! Each entry point takes paths and settings, does the whole job, and
//! returns either structured data or a short summary string for display.

use crate::config::DashboardConfig;
use crate::filter::GameFilter;
use crate::ingest::{export_augmented, read_games_from_path, Field, GameTable};
use crate::report::render_report;
use crate::session::Session;
use crate::views::GameView;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// ============================================================================
// Load
// ============================================================================

/// Read and normalize a game CSV using the configured policy and aliases.
pub fn load_games(input: &Path, config: &DashboardConfig) -> Result<GameTable> {
    read_games_from_path(input, &config.ingest)
        .with_context(|| format!("Failed to load games from {}", input.display()))
}

/// Read a file into the session, reusing the cached table when the bytes
/// and ingest options are unchanged.
pub fn load_into_session(
    session: &mut Session,
    input: &Path,
    config: &DashboardConfig,
) -> Result<Arc<GameTable>> {
    let bytes = std::fs::read(input)
        .with_context(|| format!("Failed to read input CSV {}", input.display()));
    let bytes = match bytes {
        Ok(b) => b,
        Err(e) => {
            session.invalidate();
            return Err(e);
        }
    };
    session
        .load(&bytes, &config.ingest)
        .with_context(|| format!("Failed to load games from {}", input.display()))
}

/// Summarize which header columns feed the records, e.g. `9 of 11 columns
/// used; ignored: site, round`.
pub fn describe_columns(table: &GameTable) -> String {
    let used: Vec<usize> = Field::ALL.iter().filter_map(|f| table.column(*f)).collect();
    let ignored: Vec<&str> = table
        .headers()
        .iter()
        .enumerate()
        .filter(|(i, h)| !used.contains(i) && !h.is_empty())
        .map(|(_, h)| h.as_str())
        .collect();
    let mut out = format!("{} of {} columns used", used.len(), table.headers().len());
    if !ignored.is_empty() {
        out.push_str("; ignored: ");
        out.push_str(&ignored.join(", "));
    }
    out
}

// ============================================================================
// Report
// ============================================================================

/// Describe the active filter ranges, e.g. for a report header.
pub fn describe_filter(filter: &GameFilter) -> String {
    if filter.is_unbounded() {
        return "no filters".to_string();
    }
    let mut parts = Vec::new();
    if let Some((from, to)) = filter.dates {
        parts.push(format!("dates {} to {}", from, to));
    }
    if let Some((min, max)) = filter.rating {
        let side = |v: f64| {
            if v.is_finite() {
                format!("{:.0}", v)
            } else {
                "any".to_string()
            }
        };
        parts.push(format!("rating {} to {}", side(min), side(max)));
    }
    parts.join(", ")
}

/// Filter the table and render every enabled dashboard section.
pub fn dashboard_report(
    table: &GameTable,
    filter: &GameFilter,
    config: &DashboardConfig,
) -> Result<String> {
    let all = GameView::all(table);
    let view = all.filter(filter);
    log::debug!("Filter kept {} of {} games", view.len(), all.len());

    let mut out = String::new();
    writeln!(
        out,
        "{} of {} games ({}; average rating {})",
        view.len(),
        all.len(),
        describe_filter(filter),
        table.policy().as_str()
    )?;
    out.push_str(&render_report(&view, config)?);
    Ok(out)
}

// ============================================================================
// Export
// ============================================================================

/// Configuration for the export operation.
pub struct ExportConfig {
    /// Input CSV path
    pub input: PathBuf,
    /// Output CSV path
    pub output: PathBuf,
}

/// Write an already loaded table with its derived columns.
/// Returns a summary string on success.
pub fn export_table(table: &GameTable, output: &Path) -> Result<String> {
    export_augmented(table, output)?;
    Ok(format!(
        "Exported {} games with derived columns to {}",
        table.len(),
        output.display()
    ))
}

/// Load a game CSV and write it back out with the derived columns.
/// Returns a summary string on success.
pub fn export_csv(export: &ExportConfig, config: &DashboardConfig) -> Result<String> {
    let table = load_games(&export.input, config)?;
    export_table(&table, &export.output)
}

/// Write view rows as CSV, one serialized struct per line. Returns the row count.
pub fn write_rows<T: Serialize>(rows: &[T], path: &Path) -> Result<usize> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create output CSV {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    log::info!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(rows.len())
}
