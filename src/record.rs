//! Typed game records and the per-cell coercion rules used to build them.
//!
//! Every function here is total: a cell that cannot be parsed degrades to a
//! missing value (or to `Winner::Draw` for result codes) instead of an error.

use anyhow::bail;
use chrono::{Datelike, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Winner
// ============================================================================

/// Game outcome derived from the `result` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Winner {
    White,
    Black,
    Draw,
}

impl Winner {
    /// All outcomes in display order.
    pub const ALL: [Winner; 3] = [Winner::White, Winner::Black, Winner::Draw];

    /// Classify a raw result code. Only `1-0` and `0-1` are decisive; anything
    /// else, including malformed codes, counts as a draw.
    pub fn from_result(result: &str) -> Self {
        match result.trim() {
            "1-0" => Winner::White,
            "0-1" => Winner::Black,
            _ => Winner::Draw,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Winner::White => "White",
            Winner::Black => "Black",
            Winner::Draw => "Draw",
        }
    }
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// YearMonth
// ============================================================================

/// Calendar month bucket. Ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn from_date(date: NaiveDate) -> Self {
        YearMonth {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ============================================================================
// Average rating policy
// ============================================================================

/// How the average of the two player ratings is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AvgEloPolicy {
    /// `(white + black) / 2` without rounding.
    #[default]
    Exact,
    /// Floor of the integer division, kept for compatibility with older exports.
    Truncate,
}

impl AvgEloPolicy {
    pub fn average(self, white: i32, black: i32) -> f64 {
        let sum = i64::from(white) + i64::from(black);
        match self {
            AvgEloPolicy::Exact => sum as f64 / 2.0,
            AvgEloPolicy::Truncate => sum.div_euclid(2) as f64,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AvgEloPolicy::Exact => "exact",
            AvgEloPolicy::Truncate => "truncate",
        }
    }
}

impl FromStr for AvgEloPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "exact" => Ok(AvgEloPolicy::Exact),
            "truncate" | "floor" => Ok(AvgEloPolicy::Truncate),
            other => bail!(
                "Unknown average rating policy '{}' (expected exact or truncate)",
                other
            ),
        }
    }
}

// ============================================================================
// GameRecord
// ============================================================================

/// Raw cells of one input row, already resolved to their canonical fields.
/// A `None` means the column is absent from the file.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawGame<'a> {
    pub white: Option<&'a str>,
    pub black: Option<&'a str>,
    pub result: Option<&'a str>,
    pub white_elo: Option<&'a str>,
    pub black_elo: Option<&'a str>,
    pub utc_date: Option<&'a str>,
    pub eco: Option<&'a str>,
    pub termination: Option<&'a str>,
    pub time_control: Option<&'a str>,
    pub moves: Option<&'a str>,
    pub event: Option<&'a str>,
}

/// One normalized game with its derived fields.
#[derive(Debug, Clone, PartialEq)]
pub struct GameRecord {
    pub white: Option<String>,
    pub black: Option<String>,
    pub result: String,
    pub white_elo: Option<i32>,
    pub black_elo: Option<i32>,
    pub utc_date: Option<NaiveDate>,
    pub eco: Option<String>,
    pub termination: Option<String>,
    pub time_control: Option<String>,
    pub event: Option<String>,
    /// Number of whitespace-separated tokens in the move list.
    pub num_moves: u32,
    pub winner: Winner,
    pub avg_elo: Option<f64>,
    pub month: Option<YearMonth>,
}

impl GameRecord {
    /// Build a record from raw cells, computing every derived field.
    ///
    /// The move text itself is not retained; only its token count is.
    pub fn from_raw(raw: &RawGame<'_>, policy: AvgEloPolicy) -> Self {
        let result = raw.result.map(str::trim).unwrap_or("").to_string();
        let white_elo = raw.white_elo.and_then(parse_elo);
        let black_elo = raw.black_elo.and_then(parse_elo);
        let utc_date = raw.utc_date.and_then(parse_date);

        GameRecord {
            white: text_cell(raw.white),
            black: text_cell(raw.black),
            winner: Winner::from_result(&result),
            result,
            white_elo,
            black_elo,
            utc_date,
            eco: text_cell(raw.eco),
            termination: text_cell(raw.termination),
            time_control: text_cell(raw.time_control),
            event: text_cell(raw.event),
            num_moves: count_moves(raw.moves),
            avg_elo: average_elo(white_elo, black_elo, policy),
            month: utc_date.map(YearMonth::from_date),
        }
    }
}

// ============================================================================
// Cell coercion
// ============================================================================

/// Trimmed text, or `None` for an absent or blank cell.
pub fn text_cell(cell: Option<&str>) -> Option<String> {
    cell.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Parse a rating. Integral decimals such as `1500.0` are accepted.
pub fn parse_elo(cell: &str) -> Option<i32> {
    let cell = cell.trim();
    if let Ok(v) = cell.parse::<i32>() {
        return Some(v);
    }
    let v: f64 = cell.parse().ok()?;
    if v.is_finite() && v.fract() == 0.0 && v.abs() <= f64::from(i32::MAX) {
        Some(v as i32)
    } else {
        None
    }
}

/// Parse a game date.
///
/// Year-first dates use `-`, `.` or `/` as separator and may carry a trailing
/// time part. Slash-separated dates with the year last are read month-first.
pub fn parse_date(cell: &str) -> Option<NaiveDate> {
    lazy_static! {
        static ref YEAR_FIRST: Regex =
            Regex::new(r"^(\d{4})[-./](\d{1,2})[-./](\d{1,2})(?:$|[ T])").unwrap();
        static ref MONTH_FIRST: Regex =
            Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})(?:$|[ T])").unwrap();
    }

    let cell = cell.trim();
    let (year, month, day) = if let Some(caps) = YEAR_FIRST.captures(cell) {
        (caps[1].parse().ok()?, caps[2].parse().ok()?, caps[3].parse().ok()?)
    } else if let Some(caps) = MONTH_FIRST.captures(cell) {
        (caps[3].parse().ok()?, caps[1].parse().ok()?, caps[2].parse().ok()?)
    } else {
        return None;
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Count whitespace-delimited move tokens. A missing cell has zero moves.
pub fn count_moves(moves: Option<&str>) -> u32 {
    moves
        .map(|m| m.split_whitespace().count() as u32)
        .unwrap_or(0)
}

/// Average of both ratings, missing if either side is missing.
pub fn average_elo(white: Option<i32>, black: Option<i32>, policy: AvgEloPolicy) -> Option<f64> {
    Some(policy.average(white?, black?))
}
