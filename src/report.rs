//! Plain-text rendering of the dashboard sections.
//!
//! Both binaries print these tables as-is; the GUI shows them in a
//! monospaced panel.

use crate::config::DashboardConfig;
use crate::stats::{HistogramBin, NumericSummary};
use crate::views::{
    CategoryCount, CategoryField, CategoryShare, CorrelationMatrix, GameView, MonthlyCount,
    NumericField, OpeningStats,
};
use anyhow::{anyhow, Result};
use std::collections::BTreeSet;
use std::fmt::{self, Write};
use std::str::FromStr;

const RULE_WIDTH: usize = 72;
const BAR_WIDTH: usize = 40;

// ============================================================================
// Sections
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Section {
    Overview,
    Outcomes,
    Ratings,
    Termination,
    Openings,
    Players,
    TimeControls,
    Trends,
    Advanced,
}

impl Section {
    pub const ALL: [Section; 9] = [
        Section::Overview,
        Section::Outcomes,
        Section::Ratings,
        Section::Termination,
        Section::Openings,
        Section::Players,
        Section::TimeControls,
        Section::Trends,
        Section::Advanced,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Section::Overview => "overview",
            Section::Outcomes => "outcomes",
            Section::Ratings => "ratings",
            Section::Termination => "termination",
            Section::Openings => "openings",
            Section::Players => "players",
            Section::TimeControls => "time_controls",
            Section::Trends => "trends",
            Section::Advanced => "advanced",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Section::Overview => "Performance Overview",
            Section::Outcomes => "Game Outcomes",
            Section::Ratings => "Rating Analytics",
            Section::Termination => "Game Termination",
            Section::Openings => "Openings",
            Section::Players => "Player Activity",
            Section::TimeControls => "Time Controls",
            Section::Trends => "Trends",
            Section::Advanced => "Advanced Statistics",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Section {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase().replace([' ', '-'], "_");
        Section::ALL
            .iter()
            .copied()
            .find(|sec| sec.key() == wanted)
            .ok_or_else(|| anyhow!("Unknown section '{}'", s.trim()))
    }
}

/// The set of enabled sections. Defaults to every section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionSet(BTreeSet<Section>);

impl Default for SectionSet {
    fn default() -> Self {
        SectionSet(Section::ALL.into_iter().collect())
    }
}

impl SectionSet {
    pub fn none() -> Self {
        SectionSet(BTreeSet::new())
    }

    pub fn contains(&self, section: Section) -> bool {
        self.0.contains(&section)
    }

    pub fn set(&mut self, section: Section, enabled: bool) {
        if enabled {
            self.0.insert(section);
        } else {
            self.0.remove(&section);
        }
    }

    /// Enabled sections in dashboard order.
    pub fn iter(&self) -> impl Iterator<Item = Section> + '_ {
        self.0.iter().copied()
    }

    /// Parse a comma-separated list of section keys. An empty list enables none.
    pub fn parse_list<S: AsRef<str>>(items: &[S]) -> Result<Self> {
        let mut set = SectionSet::none();
        for item in items {
            for part in item.as_ref().split(',') {
                if part.trim().is_empty() {
                    continue;
                }
                set.set(part.parse()?, true);
            }
        }
        Ok(set)
    }
}

impl fmt::Display for SectionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<&str> = self.iter().map(|s| s.key()).collect();
        f.write_str(&keys.join(","))
    }
}

// ============================================================================
// Formatting helpers
// ============================================================================

fn fmt_opt(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", decimals, v),
        None => "N/A".to_string(),
    }
}

fn truncate_label(label: &str, max_len: usize) -> String {
    if label.chars().count() <= max_len {
        label.to_string()
    } else {
        let cut: String = label.chars().take(max_len.saturating_sub(1)).collect();
        format!("{}~", cut)
    }
}

fn bar(count: usize, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    let len = (count as f64 / max as f64 * BAR_WIDTH as f64).round() as usize;
    "#".repeat(len.max(usize::from(count > 0)))
}

fn heading(out: &mut String, title: &str) -> fmt::Result {
    writeln!(out, "\n{:=^width$}", format!(" {} ", title), width = RULE_WIDTH)
}

// ============================================================================
// Reusable tables
// ============================================================================

pub fn format_counts(title: &str, rows: &[CategoryCount]) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "{}", title)?;
    if rows.is_empty() {
        writeln!(out, "  (no data)")?;
        return Ok(out);
    }
    let max = rows.iter().map(|r| r.count).max().unwrap_or(0);
    for row in rows {
        writeln!(
            out,
            "  {:<24} {:>7}  {}",
            truncate_label(&row.label, 24),
            row.count,
            bar(row.count, max)
        )?;
    }
    Ok(out)
}

pub fn format_shares(title: &str, rows: &[CategoryShare]) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "{}", title)?;
    if rows.is_empty() {
        writeln!(out, "  (no data)")?;
        return Ok(out);
    }
    for row in rows {
        writeln!(
            out,
            "  {:<24} {:>7} {:>7.1}%",
            truncate_label(&row.label, 24),
            row.count,
            row.percent
        )?;
    }
    Ok(out)
}

pub fn format_openings(rows: &[OpeningStats], min_games: usize) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "Opening performance (min {} games)", min_games)?;
    if rows.is_empty() {
        writeln!(out, "  (no opening reaches the minimum)")?;
        return Ok(out);
    }
    writeln!(out, "  {:<8} {:>7} {:>10} {:>10}", "ECO", "Games", "White won", "White %")?;
    for row in rows {
        writeln!(
            out,
            "  {:<8} {:>7} {:>10} {:>9.1}%",
            row.eco, row.games, row.white_wins, row.white_win_rate
        )?;
    }
    Ok(out)
}

pub fn format_timeline(rows: &[MonthlyCount]) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "Monthly game activity")?;
    if rows.is_empty() {
        writeln!(out, "  (no dated games)")?;
        return Ok(out);
    }
    let max = rows.iter().map(|r| r.games).max().unwrap_or(0);
    for row in rows {
        writeln!(out, "  {} {:>7}  {}", row.month, row.games, bar(row.games, max))?;
    }
    Ok(out)
}

pub fn format_histogram(title: &str, bins: &[HistogramBin]) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "{}", title)?;
    if bins.is_empty() {
        writeln!(out, "  (no data)")?;
        return Ok(out);
    }
    let max = bins.iter().map(|b| b.count).max().unwrap_or(0);
    for b in bins {
        writeln!(
            out,
            "  {:>8.1} - {:<8.1} {:>6}  {}",
            b.lower,
            b.upper,
            b.count,
            bar(b.count, max)
        )?;
    }
    Ok(out)
}

pub fn format_correlation(matrix: &CorrelationMatrix) -> Result<String> {
    let mut out = String::new();
    write!(out, "  {:<10}", "")?;
    for f in &matrix.fields {
        write!(out, " {:>10}", f.as_str())?;
    }
    writeln!(out)?;
    for (i, f) in matrix.fields.iter().enumerate() {
        write!(out, "  {:<10}", f.as_str())?;
        for value in &matrix.values[i] {
            write!(out, " {:>10}", fmt_opt(*value, 3))?;
        }
        writeln!(out)?;
    }
    Ok(out)
}

fn format_summary(label: &str, s: &NumericSummary, decimals: usize) -> String {
    format!(
        "  {:<12} count {:>7}  mean {:>8}  std {:>8}  min {:>8}  max {:>8}",
        label,
        s.count,
        fmt_opt(s.mean, decimals),
        fmt_opt(s.std_dev, decimals),
        fmt_opt(s.min, 0),
        fmt_opt(s.max, 0),
    )
}

// ============================================================================
// Sections
// ============================================================================

fn render_overview(out: &mut String, view: &GameView<'_>, config: &DashboardConfig) -> Result<()> {
    let o = view.overview();
    writeln!(out, "  Total games       {:>10}", o.total_games)?;
    writeln!(out, "  Unique players    {:>10}", o.unique_players)?;
    writeln!(out, "  Average rating    {:>10}", fmt_opt(o.avg_elo.mean, 0))?;
    writeln!(out, "  Avg game length   {:>10}", fmt_opt(o.num_moves.mean, 0))?;
    writeln!(out, "  White win rate    {:>9.1}%", o.white_win_rate)?;
    writeln!(out, "  Unique openings   {:>10}", o.distinct_openings)?;

    let preview = view.preview(config.preview_rows);
    if !preview.is_empty() {
        writeln!(out, "\n  Data preview (first {} games)", preview.len())?;
        writeln!(
            out,
            "  {:<16} {:<16} {:<8} {:>6} {:>6} {:>8} {:>6}",
            "White", "Black", "Result", "W Elo", "B Elo", "Avg", "Moves"
        )?;
        for rec in preview {
            let opt_int = |v: Option<i32>| v.map(|v| v.to_string()).unwrap_or_default();
            writeln!(
                out,
                "  {:<16} {:<16} {:<8} {:>6} {:>6} {:>8} {:>6}",
                truncate_label(rec.white.as_deref().unwrap_or(""), 16),
                truncate_label(rec.black.as_deref().unwrap_or(""), 16),
                truncate_label(&rec.result, 8),
                opt_int(rec.white_elo),
                opt_int(rec.black_elo),
                rec.avg_elo.map(|v| format!("{:.0}", v)).unwrap_or_default(),
                rec.num_moves
            )?;
        }
    }
    Ok(())
}

fn render_ratings(out: &mut String, view: &GameView<'_>, config: &DashboardConfig) -> Result<()> {
    writeln!(out, "{}", format_summary("avg_elo", &view.numeric_summary(NumericField::AvgElo), 1))?;
    writeln!(out)?;
    out.push_str(&format_histogram(
        "Average rating distribution",
        &view.histogram(NumericField::AvgElo, config.histogram_bins),
    )?);

    let trend = view.rating_trend();
    match (trend.first(), trend.last()) {
        (Some(first), Some(last)) => writeln!(
            out,
            "\n  Rating trend: {} dated games, {} ({:.0}) to {} ({:.0})",
            trend.len(),
            first.date,
            first.avg_elo,
            last.date,
            last.avg_elo
        )?,
        _ => writeln!(out, "\n  Rating trend: no games with both a date and a rating")?,
    }
    Ok(())
}

fn render_trends(out: &mut String, view: &GameView<'_>, config: &DashboardConfig) -> Result<()> {
    out.push_str(&format_timeline(&view.monthly_counts())?);
    let points = view.scatter_points(config.scatter_points);
    let r = view
        .correlation_matrix()
        .get(NumericField::AvgElo, NumericField::NumMoves);
    writeln!(
        out,
        "\n  Rating vs game length: {} points, correlation {}",
        points.len(),
        fmt_opt(r, 3)
    )?;
    Ok(())
}

fn render_advanced(out: &mut String, view: &GameView<'_>, config: &DashboardConfig) -> Result<()> {
    writeln!(out, "Correlation matrix")?;
    out.push_str(&format_correlation(&view.correlation_matrix())?);
    writeln!(out)?;
    out.push_str(&format_counts(
        "Event types",
        &view.category_counts(CategoryField::Event, Some(config.top_events)),
    )?);

    let o = view.overview();
    writeln!(out, "\nComprehensive statistics")?;
    let rows: Vec<(&str, String)> = vec![
        ("Total games played", o.total_games.to_string()),
        ("Unique players", o.unique_players.to_string()),
        ("Average game rating", fmt_opt(o.avg_elo.mean, 1)),
        ("Rating standard deviation", fmt_opt(o.avg_elo.std_dev, 1)),
        ("White wins", o.white_wins.to_string()),
        ("Black wins", o.black_wins.to_string()),
        ("Draws", o.draws.to_string()),
        ("Decisive games", format!("{:.1}%", o.decisive_rate)),
        ("Shortest game (moves)", fmt_opt(o.num_moves.min, 0)),
        ("Longest game (moves)", fmt_opt(o.num_moves.max, 0)),
        ("Average game length", fmt_opt(o.num_moves.mean, 1)),
        ("Most common opening", o.top_opening.clone()),
        ("Most common time control", o.top_time_control.clone()),
        ("Peak average rating", fmt_opt(o.avg_elo.max, 0)),
    ];
    for (label, value) in rows {
        writeln!(out, "  {:<28} {:>12}", label, value)?;
    }
    writeln!(out)?;
    writeln!(out, "{}", format_summary("num_moves", &o.num_moves, 1))?;
    Ok(())
}

/// Render one section.
pub fn render_section(
    section: Section,
    view: &GameView<'_>,
    config: &DashboardConfig,
) -> Result<String> {
    let mut out = String::new();
    heading(&mut out, section.title())?;
    match section {
        Section::Overview => render_overview(&mut out, view, config)?,
        Section::Outcomes => {
            out.push_str(&format_counts(
                "Outcome distribution",
                &view.category_counts(CategoryField::Winner, None),
            )?);
            writeln!(out)?;
            out.push_str(&format_shares("Win rate by color", &view.outcome_rates())?);
        }
        Section::Ratings => render_ratings(&mut out, view, config)?,
        Section::Termination => out.push_str(&format_shares(
            "How games end",
            &view.category_shares(CategoryField::Termination, Some(config.top_termination)),
        )?),
        Section::Openings => {
            out.push_str(&format_counts(
                "Most popular openings (ECO)",
                &view.category_counts(CategoryField::Eco, Some(config.top_eco)),
            )?);
            writeln!(out)?;
            out.push_str(&format_openings(
                &view.opening_performance(config.min_opening_games, Some(config.opening_limit)),
                config.min_opening_games,
            )?);
            writeln!(out)?;
            out.push_str(&format_histogram(
                "Game length distribution (moves)",
                &view.histogram(NumericField::NumMoves, config.histogram_bins),
            )?);
        }
        Section::Players => {
            out.push_str(&format_counts(
                "Most active White players",
                &view.category_counts(CategoryField::White, Some(config.top_players)),
            )?);
            writeln!(out)?;
            out.push_str(&format_counts(
                "Most active Black players",
                &view.category_counts(CategoryField::Black, Some(config.top_players)),
            )?);
        }
        Section::TimeControls => out.push_str(&format_counts(
            "Most used time controls",
            &view.category_counts(CategoryField::TimeControl, Some(config.top_time_control)),
        )?),
        Section::Trends => render_trends(&mut out, view, config)?,
        Section::Advanced => render_advanced(&mut out, view, config)?,
    }
    Ok(out)
}

/// Render every section enabled in `config.sections`, in dashboard order.
pub fn render_report(view: &GameView<'_>, config: &DashboardConfig) -> Result<String> {
    let mut out = String::new();
    if view.is_empty() {
        writeln!(out, "No games match the current filters.")?;
    }
    for section in config.sections.iter() {
        out.push_str(&render_section(section, view, config)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{AvgEloPolicy, GameRecord, RawGame};

    fn games() -> Vec<GameRecord> {
        let rows = [
            ("alice", "bob", "1-0", "1500", "1600", "2024-01-05", "C20", "Normal", "600+0"),
            ("bob", "alice", "0-1", "1610", "1490", "2024-02-11", "C20", "Time forfeit", "600+0"),
            ("carol", "alice", "1/2-1/2", "1700", "1500", "bad", "B06", "Normal", "300+3"),
        ];
        rows.into_iter()
            .map(|(w, b, r, we, be, d, eco, term, tc)| {
                let raw = RawGame {
                    white: Some(w),
                    black: Some(b),
                    result: Some(r),
                    white_elo: Some(we),
                    black_elo: Some(be),
                    utc_date: Some(d),
                    eco: Some(eco),
                    termination: Some(term),
                    time_control: Some(tc),
                    moves: Some("e4 e5 Nf3"),
                    ..Default::default()
                };
                GameRecord::from_raw(&raw, AvgEloPolicy::Exact)
            })
            .collect()
    }

    #[test]
    fn test_section_parse() {
        assert_eq!("time controls".parse::<Section>().unwrap(), Section::TimeControls);
        assert_eq!("Openings".parse::<Section>().unwrap(), Section::Openings);
        assert!("charts".parse::<Section>().is_err());

        let set = SectionSet::parse_list(&["outcomes,advanced", "ratings"]).unwrap();
        assert_eq!(set.to_string(), "outcomes,ratings,advanced");
        assert!(!set.contains(Section::Overview));
        assert!(SectionSet::parse_list(&["outcomes,nope"]).is_err());
    }

    #[test]
    fn test_section_set_toggle() {
        let mut set = SectionSet::default();
        assert_eq!(set.iter().count(), Section::ALL.len());
        set.set(Section::Players, false);
        assert!(!set.contains(Section::Players));
        set.set(Section::Players, true);
        assert!(set.contains(Section::Players));
    }

    #[test]
    fn test_render_report_contains_sections() {
        let games = games();
        let view = GameView::from_records(&games);
        let report = render_report(&view, &DashboardConfig::default()).unwrap();
        for section in Section::ALL {
            assert!(report.contains(section.title()), "missing {}", section.title());
        }
        assert!(report.contains("Most common opening"));
        assert!(report.contains("2024-01"));
    }

    #[test]
    fn test_render_report_respects_toggles() {
        let games = games();
        let view = GameView::from_records(&games);
        let mut config = DashboardConfig::default();
        config.sections = SectionSet::parse_list(&["outcomes"]).unwrap();
        let report = render_report(&view, &config).unwrap();
        assert!(report.contains("Win rate by color"));
        assert!(!report.contains("Correlation matrix"));
    }

    #[test]
    fn test_render_empty_view() {
        let empty: Vec<GameRecord> = Vec::new();
        let view = GameView::from_records(&empty);
        let report = render_report(&view, &DashboardConfig::default()).unwrap();
        assert!(report.starts_with("No games match"));
        assert!(report.contains("N/A"));
        assert!(report.contains("0.0%"));
    }

    #[test]
    fn test_format_openings_and_correlation() {
        let games = games();
        let view = GameView::from_records(&games);
        let table = format_openings(&view.opening_performance(2, None), 2).unwrap();
        assert!(table.contains("C20"));
        assert!(!table.contains("B06"));

        let matrix = format_correlation(&view.correlation_matrix()).unwrap();
        assert_eq!(matrix.lines().count(), 5);
        assert!(matrix.contains("1.000"));
    }

    #[test]
    fn test_bar_scaling() {
        assert_eq!(bar(0, 10), "");
        assert_eq!(bar(10, 10).len(), BAR_WIDTH);
        assert_eq!(bar(1, 1000).len(), 1);
        assert_eq!(truncate_label("abcdef", 4), "abc~");
    }
}
