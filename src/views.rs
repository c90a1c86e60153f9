//! Read-only aggregate views over a set of games.
//!
//! A [`GameView`] borrows records from a loaded table. Every method is a pure
//! function of the view and its arguments, so the same view can back any
//! number of charts or tables.

use crate::filter::{FilterBounds, GameFilter};
use crate::ingest::GameTable;
use crate::record::{GameRecord, Winner, YearMonth};
use crate::stats::{histogram, pearson, HistogramBin, NumericSummary};
use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// Label reported by [`GameView::mode`] when a field has no values.
pub const MODE_FALLBACK: &str = "N/A";

// ============================================================================
// Field selectors
// ============================================================================

/// Categorical fields that can be counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoryField {
    Winner,
    Termination,
    Eco,
    TimeControl,
    Event,
    White,
    Black,
}

impl CategoryField {
    pub const ALL: [CategoryField; 7] = [
        CategoryField::Winner,
        CategoryField::Termination,
        CategoryField::Eco,
        CategoryField::TimeControl,
        CategoryField::Event,
        CategoryField::White,
        CategoryField::Black,
    ];

    pub fn value<'a>(&self, rec: &'a GameRecord) -> Option<&'a str> {
        match self {
            CategoryField::Winner => Some(rec.winner.as_str()),
            CategoryField::Termination => rec.termination.as_deref(),
            CategoryField::Eco => rec.eco.as_deref(),
            CategoryField::TimeControl => rec.time_control.as_deref(),
            CategoryField::Event => rec.event.as_deref(),
            CategoryField::White => rec.white.as_deref(),
            CategoryField::Black => rec.black.as_deref(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryField::Winner => "winner",
            CategoryField::Termination => "termination",
            CategoryField::Eco => "eco",
            CategoryField::TimeControl => "time_control",
            CategoryField::Event => "event",
            CategoryField::White => "white",
            CategoryField::Black => "black",
        }
    }
}

impl fmt::Display for CategoryField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CategoryField {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase().replace([' ', '-'], "_");
        let wanted = match wanted.as_str() {
            "timecontrol" => "time_control",
            "opening" => "eco",
            "result" | "outcome" => "winner",
            other => other,
        };
        CategoryField::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == wanted)
            .ok_or_else(|| anyhow!("Unknown category field '{}'", s.trim()))
    }
}

/// Numeric fields that take part in summaries and the correlation matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericField {
    WhiteElo,
    BlackElo,
    AvgElo,
    NumMoves,
}

impl NumericField {
    pub const ALL: [NumericField; 4] = [
        NumericField::WhiteElo,
        NumericField::BlackElo,
        NumericField::AvgElo,
        NumericField::NumMoves,
    ];

    pub fn value(&self, rec: &GameRecord) -> Option<f64> {
        match self {
            NumericField::WhiteElo => rec.white_elo.map(f64::from),
            NumericField::BlackElo => rec.black_elo.map(f64::from),
            NumericField::AvgElo => rec.avg_elo,
            NumericField::NumMoves => Some(f64::from(rec.num_moves)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NumericField::WhiteElo => "white_elo",
            NumericField::BlackElo => "black_elo",
            NumericField::AvgElo => "avg_elo",
            NumericField::NumMoves => "num_moves",
        }
    }
}

impl fmt::Display for NumericField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// View rows
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCount {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryShare {
    pub label: String,
    pub count: usize,
    /// Share of all games in the view, 0-100.
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyCount {
    pub month: YearMonth,
    pub games: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpeningStats {
    pub eco: String,
    pub games: usize,
    pub white_wins: usize,
    /// Percentage of the opening's games won by White.
    pub white_win_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub avg_elo: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub avg_elo: f64,
    pub num_moves: u32,
}

/// Pairwise-complete Pearson correlations between the numeric fields.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub fields: [NumericField; 4],
    /// `None` where fewer than two complete pairs exist or a side is constant.
    pub values: [[Option<f64>; 4]; 4],
}

impl CorrelationMatrix {
    pub fn get(&self, a: NumericField, b: NumericField) -> Option<f64> {
        let i = self.fields.iter().position(|f| *f == a)?;
        let j = self.fields.iter().position(|f| *f == b)?;
        self.values[i][j]
    }
}

/// Headline numbers shown at the top of the dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct Overview {
    pub total_games: usize,
    pub unique_players: usize,
    pub white_wins: usize,
    pub black_wins: usize,
    pub draws: usize,
    pub decisive_rate: f64,
    pub white_win_rate: f64,
    pub distinct_openings: usize,
    pub avg_elo: NumericSummary,
    pub num_moves: NumericSummary,
    pub top_opening: String,
    pub top_time_control: String,
}

// ============================================================================
// GameView
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct GameView<'a> {
    records: Vec<&'a GameRecord>,
}

fn percent(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

impl<'a> GameView<'a> {
    pub fn new(records: Vec<&'a GameRecord>) -> Self {
        GameView { records }
    }

    /// Every game of a loaded table.
    pub fn all(table: &'a GameTable) -> Self {
        GameView::from_records(table.records())
    }

    pub fn from_records(records: &'a [GameRecord]) -> Self {
        GameView {
            records: records.iter().collect(),
        }
    }

    /// The subset passing `filter`. The source view is untouched.
    pub fn filter(&self, filter: &GameFilter) -> GameView<'a> {
        GameView {
            records: self
                .records
                .iter()
                .copied()
                .filter(|r| filter.matches(r))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[&'a GameRecord] {
        &self.records
    }

    pub fn bounds(&self) -> FilterBounds {
        FilterBounds::observe(self.records.iter().copied())
    }

    /// First `n` games in file order.
    pub fn preview(&self, n: usize) -> &[&'a GameRecord] {
        &self.records[..n.min(self.records.len())]
    }

    // -- Category views --

    /// Frequency table, most common first; ties are ordered by label.
    /// Missing values are not counted.
    pub fn category_counts(
        &self,
        field: CategoryField,
        top_n: Option<usize>,
    ) -> Vec<CategoryCount> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for rec in &self.records {
            if let Some(v) = field.value(rec) {
                *counts.entry(v).or_insert(0) += 1;
            }
        }
        let mut out: Vec<CategoryCount> = counts
            .into_iter()
            .map(|(label, count)| CategoryCount {
                label: label.to_string(),
                count,
            })
            .collect();
        out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
        if let Some(n) = top_n {
            out.truncate(n);
        }
        out
    }

    /// Category counts as a share of every game in the view.
    pub fn category_shares(
        &self,
        field: CategoryField,
        top_n: Option<usize>,
    ) -> Vec<CategoryShare> {
        let total = self.len();
        self.category_counts(field, top_n)
            .into_iter()
            .map(|c| CategoryShare {
                percent: percent(c.count, total),
                label: c.label,
                count: c.count,
            })
            .collect()
    }

    /// White/Black/Draw shares, always all three in that order.
    pub fn outcome_rates(&self) -> Vec<CategoryShare> {
        let total = self.len();
        Winner::ALL
            .iter()
            .map(|w| {
                let count = self.count_winner(*w);
                CategoryShare {
                    label: w.to_string(),
                    count,
                    percent: percent(count, total),
                }
            })
            .collect()
    }

    pub fn count_winner(&self, winner: Winner) -> usize {
        self.records.iter().filter(|r| r.winner == winner).count()
    }

    /// Most frequent value, or [`MODE_FALLBACK`] when the field is empty.
    /// Ties resolve to the lexicographically smallest value.
    pub fn mode(&self, field: CategoryField) -> String {
        self.category_counts(field, Some(1))
            .into_iter()
            .next()
            .map(|c| c.label)
            .unwrap_or_else(|| MODE_FALLBACK.to_string())
    }

    pub fn distinct_count(&self, field: CategoryField) -> usize {
        self.records
            .iter()
            .filter_map(|r| field.value(r))
            .collect::<HashSet<_>>()
            .len()
    }

    /// Distinct names across both colors.
    pub fn unique_players(&self) -> usize {
        self.records
            .iter()
            .flat_map(|r| [r.white.as_deref(), r.black.as_deref()])
            .flatten()
            .collect::<HashSet<_>>()
            .len()
    }

    /// Percentage of games that were not drawn.
    pub fn decisive_rate(&self) -> f64 {
        percent(self.len() - self.count_winner(Winner::Draw), self.len())
    }

    // -- Time views --

    /// Games per month, chronological. Games without a date are left out.
    pub fn monthly_counts(&self) -> Vec<MonthlyCount> {
        let mut months: BTreeMap<YearMonth, usize> = BTreeMap::new();
        for month in self.records.iter().filter_map(|r| r.month) {
            *months.entry(month).or_insert(0) += 1;
        }
        months
            .into_iter()
            .map(|(month, games)| MonthlyCount { month, games })
            .collect()
    }

    /// Average rating per game ordered by date; games lacking either are skipped.
    pub fn rating_trend(&self) -> Vec<TrendPoint> {
        let mut points: Vec<TrendPoint> = self
            .records
            .iter()
            .filter_map(|r| {
                Some(TrendPoint {
                    date: r.utc_date?,
                    avg_elo: r.avg_elo?,
                })
            })
            .collect();
        points.sort_by_key(|p| p.date);
        points
    }

    // -- Openings --

    /// Per-opening game count and White win rate, keeping openings with at
    /// least `min_games` games. Ordered by game count, then code.
    pub fn opening_performance(&self, min_games: usize, limit: Option<usize>) -> Vec<OpeningStats> {
        let mut groups: HashMap<&str, (usize, usize)> = HashMap::new();
        for rec in &self.records {
            let Some(eco) = rec.eco.as_deref() else {
                continue;
            };
            let entry = groups.entry(eco).or_insert((0, 0));
            entry.0 += 1;
            if rec.winner == Winner::White {
                entry.1 += 1;
            }
        }

        let mut out: Vec<OpeningStats> = groups
            .into_iter()
            .filter(|(_, (games, _))| *games >= min_games)
            .map(|(eco, (games, white_wins))| OpeningStats {
                eco: eco.to_string(),
                games,
                white_wins,
                white_win_rate: percent(white_wins, games),
            })
            .collect();
        out.sort_by(|a, b| b.games.cmp(&a.games).then_with(|| a.eco.cmp(&b.eco)));
        if let Some(n) = limit {
            out.truncate(n);
        }
        out
    }

    // -- Numeric views --

    pub fn values(&self, field: NumericField) -> Vec<f64> {
        self.records.iter().filter_map(|r| field.value(r)).collect()
    }

    pub fn numeric_summary(&self, field: NumericField) -> NumericSummary {
        NumericSummary::from_values(&self.values(field))
    }

    pub fn histogram(&self, field: NumericField, bins: usize) -> Vec<HistogramBin> {
        histogram(&self.values(field), bins)
    }

    /// Symmetric correlation matrix over [`NumericField::ALL`].
    pub fn correlation_matrix(&self) -> CorrelationMatrix {
        let fields = NumericField::ALL;
        let mut values = [[None; 4]; 4];
        for i in 0..fields.len() {
            for j in i..fields.len() {
                let pairs: Vec<(f64, f64)> = self
                    .records
                    .iter()
                    .filter_map(|r| Some((fields[i].value(r)?, fields[j].value(r)?)))
                    .collect();
                let r = pearson(&pairs).map(|r| if i == j { 1.0 } else { r });
                values[i][j] = r;
                values[j][i] = r;
            }
        }
        CorrelationMatrix { fields, values }
    }

    /// Rating against game length, thinned by even stride to at most `max_points`.
    pub fn scatter_points(&self, max_points: usize) -> Vec<ScatterPoint> {
        let all: Vec<ScatterPoint> = self
            .records
            .iter()
            .filter_map(|r| {
                Some(ScatterPoint {
                    avg_elo: r.avg_elo?,
                    num_moves: r.num_moves,
                })
            })
            .collect();
        if all.len() <= max_points {
            return all;
        }
        let step = all.len() as f64 / max_points as f64;
        (0..max_points)
            .map(|i| all[(i as f64 * step) as usize])
            .collect()
    }

    pub fn overview(&self) -> Overview {
        Overview {
            total_games: self.len(),
            unique_players: self.unique_players(),
            white_wins: self.count_winner(Winner::White),
            black_wins: self.count_winner(Winner::Black),
            draws: self.count_winner(Winner::Draw),
            decisive_rate: self.decisive_rate(),
            white_win_rate: percent(self.count_winner(Winner::White), self.len()),
            distinct_openings: self.distinct_count(CategoryField::Eco),
            avg_elo: self.numeric_summary(NumericField::AvgElo),
            num_moves: self.numeric_summary(NumericField::NumMoves),
            top_opening: self.mode(CategoryField::Eco),
            top_time_control: self.mode(CategoryField::TimeControl),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{AvgEloPolicy, RawGame};

    struct G<'a> {
        result: &'a str,
        white_elo: &'a str,
        black_elo: &'a str,
        date: &'a str,
        eco: &'a str,
        moves: &'a str,
    }

    fn game(g: G<'_>) -> GameRecord {
        let raw = RawGame {
            white: Some("w"),
            black: Some("b"),
            result: Some(g.result),
            white_elo: Some(g.white_elo),
            black_elo: Some(g.black_elo),
            utc_date: Some(g.date),
            eco: Some(g.eco),
            moves: Some(g.moves),
            ..Default::default()
        };
        GameRecord::from_raw(&raw, AvgEloPolicy::Exact)
    }

    fn simple(result: &str, eco: &str) -> GameRecord {
        game(G {
            result,
            white_elo: "1500",
            black_elo: "1500",
            date: "2024-01-01",
            eco,
            moves: "e4 e5",
        })
    }

    #[test]
    fn test_category_counts_order_and_top_n() {
        let games = vec![
            simple("1-0", "C20"),
            simple("1-0", "B06"),
            simple("0-1", "C20"),
            simple("1-0", "A40"),
            simple("1/2-1/2", ""),
        ];
        let view = GameView::from_records(&games);
        let counts = view.category_counts(CategoryField::Eco, None);
        let labels: Vec<&str> = counts.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["C20", "A40", "B06"]);
        assert_eq!(counts[0].count, 2);

        assert_eq!(view.category_counts(CategoryField::Eco, Some(1)).len(), 1);
        assert_eq!(view.mode(CategoryField::Eco), "C20");
        assert_eq!(view.distinct_count(CategoryField::Eco), 3);
    }

    #[test]
    fn test_mode_fallback_and_tie() {
        let empty: Vec<GameRecord> = Vec::new();
        let view = GameView::from_records(&empty);
        assert_eq!(view.mode(CategoryField::TimeControl), MODE_FALLBACK);

        let games = vec![simple("1-0", "E00"), simple("1-0", "D00")];
        assert_eq!(GameView::from_records(&games).mode(CategoryField::Eco), "D00");
    }

    #[test]
    fn test_shares_use_view_total() {
        let games = vec![simple("1-0", "C20"), simple("0-1", "C20"), simple("1-0", "")];
        let view = GameView::from_records(&games);
        let shares = view.category_shares(CategoryField::Eco, None);
        assert_eq!(shares.len(), 1);
        assert!((shares[0].percent - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_outcome_rates_zero_rows() {
        let games = vec![simple("1-0", "C20")];
        let view = GameView::from_records(&games);
        let none = view.filter(&GameFilter::new().with_rating(3000.0, 4000.0));
        assert!(none.is_empty());

        let rates = none.outcome_rates();
        assert_eq!(rates.len(), 3);
        assert!(rates.iter().all(|r| r.percent == 0.0 && r.count == 0));
        assert_eq!(rates[0].label, "White");
        assert_eq!(none.decisive_rate(), 0.0);
    }

    #[test]
    fn test_outcome_rates_sum_to_hundred() {
        let games = vec![
            simple("1-0", "C20"),
            simple("0-1", "C20"),
            simple("1/2-1/2", "C20"),
            simple("*", "C20"),
        ];
        let rates = GameView::from_records(&games).outcome_rates();
        assert_eq!(rates[0].percent, 25.0);
        assert_eq!(rates[1].percent, 25.0);
        assert_eq!(rates[2].percent, 50.0);
    }

    #[test]
    fn test_opening_min_support() {
        let mut games = Vec::new();
        for i in 0..9 {
            games.push(simple(if i < 3 { "1-0" } else { "0-1" }, "B06"));
        }
        for i in 0..12 {
            games.push(simple(if i < 6 { "1-0" } else { "1/2-1/2" }, "C20"));
        }
        let view = GameView::from_records(&games);
        let openings = view.opening_performance(10, None);
        assert_eq!(openings.len(), 1);
        assert_eq!(openings[0].eco, "C20");
        assert_eq!(openings[0].games, 12);
        assert_eq!(openings[0].white_win_rate, 50.0);

        assert_eq!(view.opening_performance(1, None)[0].eco, "C20");
        assert_eq!(view.opening_performance(1, Some(1)).len(), 1);
    }

    #[test]
    fn test_monthly_counts_skip_missing_dates() {
        let mk = |date: &'static str| {
            game(G {
                result: "1-0",
                white_elo: "1500",
                black_elo: "1500",
                date,
                eco: "C20",
                moves: "",
            })
        };
        let games = vec![mk("2024-02-10"), mk("2023-12-31"), mk("2024-02-01"), mk("junk")];
        let months = GameView::from_records(&games).monthly_counts();
        let rendered: Vec<(String, usize)> =
            months.iter().map(|m| (m.month.to_string(), m.games)).collect();
        assert_eq!(
            rendered,
            vec![("2023-12".to_string(), 1), ("2024-02".to_string(), 2)]
        );
    }

    #[test]
    fn test_correlation_matrix_symmetric() {
        let games = vec![
            game(G {
                result: "1-0",
                white_elo: "1200",
                black_elo: "1300",
                date: "",
                eco: "",
                moves: "a b c",
            }),
            game(G {
                result: "1-0",
                white_elo: "1500",
                black_elo: "1400",
                date: "",
                eco: "",
                moves: "a b c d e",
            }),
            game(G {
                result: "1-0",
                white_elo: "1800",
                black_elo: "1900",
                date: "",
                eco: "",
                moves: "a",
            }),
            game(G {
                result: "1-0",
                white_elo: "2100",
                black_elo: "?",
                date: "",
                eco: "",
                moves: "a b",
            }),
        ];
        let m = GameView::from_records(&games).correlation_matrix();
        for i in 0..4 {
            for j in 0..4 {
                assert_eq!(m.values[i][j], m.values[j][i]);
            }
            assert_eq!(m.values[i][i], Some(1.0));
        }
        let r = m.get(NumericField::WhiteElo, NumericField::BlackElo).unwrap();
        assert!(r > 0.9 && r <= 1.0);
    }

    #[test]
    fn test_correlation_constant_field_is_undefined() {
        let games = vec![simple("1-0", "A00"), simple("0-1", "A00"), simple("1-0", "A00")];
        let m = GameView::from_records(&games).correlation_matrix();
        assert_eq!(m.get(NumericField::AvgElo, NumericField::AvgElo), None);
        assert_eq!(m.get(NumericField::AvgElo, NumericField::NumMoves), None);
    }

    #[test]
    fn test_rating_trend_sorted_and_complete() {
        let games = vec![
            game(G {
                result: "1-0",
                white_elo: "1600",
                black_elo: "1600",
                date: "2024-03-01",
                eco: "",
                moves: "",
            }),
            game(G {
                result: "1-0",
                white_elo: "1400",
                black_elo: "1400",
                date: "2024-01-01",
                eco: "",
                moves: "",
            }),
            game(G {
                result: "1-0",
                white_elo: "1400",
                black_elo: "",
                date: "2024-02-01",
                eco: "",
                moves: "",
            }),
        ];
        let trend = GameView::from_records(&games).rating_trend();
        assert_eq!(trend.len(), 2);
        assert_eq!(trend[0].avg_elo, 1400.0);
        assert_eq!(trend[1].avg_elo, 1600.0);
    }

    #[test]
    fn test_players_and_scatter() {
        let mut games = vec![simple("1-0", "C20"), simple("0-1", "C20")];
        games[1].white = Some("carol".to_string());
        let view = GameView::from_records(&games);
        assert_eq!(view.unique_players(), 3);

        assert_eq!(view.scatter_points(10).len(), 2);
        assert_eq!(view.scatter_points(1).len(), 1);
        assert!(view.scatter_points(0).is_empty());
    }

    #[test]
    fn test_overview_counts() {
        let games = vec![simple("1-0", "C20"), simple("0-1", "C20"), simple("1/2-1/2", "B06")];
        let o = GameView::from_records(&games).overview();
        assert_eq!(o.total_games, 3);
        assert_eq!((o.white_wins, o.black_wins, o.draws), (1, 1, 1));
        assert_eq!(o.top_opening, "C20");
        assert_eq!(o.top_time_control, MODE_FALLBACK);
        assert_eq!(o.avg_elo.mean, Some(1500.0));
        assert_eq!(o.num_moves.max, Some(2.0));
    }

    #[test]
    fn test_category_field_from_str() {
        assert_eq!("TimeControl".parse::<CategoryField>().unwrap(), CategoryField::TimeControl);
        assert_eq!("time-control".parse::<CategoryField>().unwrap(), CategoryField::TimeControl);
        assert_eq!("result".parse::<CategoryField>().unwrap(), CategoryField::Winner);
        assert!("moves".parse::<CategoryField>().is_err());
    }
}
