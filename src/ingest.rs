//! CSV ingestion: header normalization, column resolution and the augmented
//! export that writes the derived columns back out.

use crate::record::{AvgEloPolicy, GameRecord, RawGame};
use crate::session::fnv1a;
use anyhow::{anyhow, bail, Context, Result};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use lazy_static::lazy_static;
use rayon::prelude::*;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::io::{Read, Write};
use std::path::Path;
use std::str::FromStr;

/// Columns appended by [`write_augmented`], in output order.
pub const DERIVED_COLUMNS: [&str; 4] = ["winner", "avg_elo", "num_moves", "month"];

// ============================================================================
// Canonical fields and header aliases
// ============================================================================

/// Input fields the normalizer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    White,
    Black,
    Result,
    WhiteElo,
    BlackElo,
    UtcDate,
    Eco,
    Termination,
    TimeControl,
    Moves,
    Event,
}

impl Field {
    pub const ALL: [Field; 11] = [
        Field::White,
        Field::Black,
        Field::Result,
        Field::WhiteElo,
        Field::BlackElo,
        Field::UtcDate,
        Field::Eco,
        Field::Termination,
        Field::TimeControl,
        Field::Moves,
        Field::Event,
    ];

    /// Canonical (already normalized) column name.
    pub fn canonical_name(&self) -> &'static str {
        match self {
            Field::White => "white",
            Field::Black => "black",
            Field::Result => "result",
            Field::WhiteElo => "white_elo",
            Field::BlackElo => "black_elo",
            Field::UtcDate => "utc_date",
            Field::Eco => "eco",
            Field::Termination => "termination",
            Field::TimeControl => "time_control",
            Field::Moves => "moves",
            Field::Event => "event",
        }
    }

    /// True when a normalized header is the field's own name, with or
    /// without underscores (`white_elo`, `whiteelo`).
    pub fn is_exact_spelling(&self, normalized: &str) -> bool {
        let name = self.canonical_name();
        normalized == name || normalized == name.replace('_', "")
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_name())
    }
}

impl FromStr for Field {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = normalize_header(s);
        Field::ALL
            .iter()
            .copied()
            .find(|f| f.canonical_name() == normalized)
            .ok_or_else(|| anyhow!("Unknown field '{}'", s.trim()))
    }
}

/// Normalize a header cell: trim, lowercase, and collapse each interior
/// whitespace run into a single underscore.
pub fn normalize_header(header: &str) -> String {
    lazy_static! {
        static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    }
    let trimmed = header.trim_start_matches('\u{feff}').trim().to_lowercase();
    WHITESPACE.replace_all(&trimmed, "_").into_owned()
}

/// Lookup table from normalized header spellings to canonical fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderAliases {
    map: HashMap<String, Field>,
}

impl Default for HeaderAliases {
    fn default() -> Self {
        let mut aliases = HeaderAliases {
            map: HashMap::new(),
        };
        for field in Field::ALL {
            aliases.insert(field.canonical_name(), field);
        }
        let extra = [
            ("whiteelo", Field::WhiteElo),
            ("white_rating", Field::WhiteElo),
            ("blackelo", Field::BlackElo),
            ("black_rating", Field::BlackElo),
            ("utcdate", Field::UtcDate),
            ("date", Field::UtcDate),
            ("timecontrol", Field::TimeControl),
            ("opening_eco", Field::Eco),
            ("move_list", Field::Moves),
            ("pgn_moves", Field::Moves),
        ];
        for (header, field) in extra {
            aliases.insert(header, field);
        }
        aliases
    }
}

impl HeaderAliases {
    /// Add or replace a mapping. The header is normalized first.
    pub fn insert(&mut self, header: &str, field: Field) {
        self.map.insert(normalize_header(header), field);
    }

    pub fn resolve(&self, header: &str) -> Option<Field> {
        self.map.get(&normalize_header(header)).copied()
    }

    /// Stable hash of the table contents, used as part of the session cache key.
    pub fn fingerprint(&self) -> u64 {
        let mut entries: Vec<_> = self.map.iter().collect();
        entries.sort();
        let joined: String = entries
            .iter()
            .map(|(h, f)| format!("{}={};", h, f.canonical_name()))
            .collect();
        fnv1a(joined.as_bytes())
    }
}

/// Options controlling how a file is turned into records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestOptions {
    pub policy: AvgEloPolicy,
    pub aliases: HeaderAliases,
}

// ============================================================================
// GameTable
// ============================================================================

/// A loaded file: normalized headers, original rows, and one record per row.
///
/// The table is never mutated after construction.
#[derive(Debug, Clone)]
pub struct GameTable {
    headers: Vec<String>,
    rows: Vec<StringRecord>,
    records: Vec<GameRecord>,
    columns: HashMap<Field, usize>,
    policy: AvgEloPolicy,
}

impl GameTable {
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn records(&self) -> &[GameRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Index of the source column resolved to `field`, if any.
    pub fn column(&self, field: Field) -> Option<usize> {
        self.columns.get(&field).copied()
    }

    pub fn policy(&self) -> AvgEloPolicy {
        self.policy
    }
}

/// Resolve header cells to canonical fields.
///
/// A header spelled as the field itself (`utc_date` or `utcdate`) beats any
/// looser alias such as `date`. Among equally ranked columns the first wins.
fn resolve_columns(headers: &[String], aliases: &HeaderAliases) -> HashMap<Field, usize> {
    let mut columns: HashMap<Field, (bool, usize)> = HashMap::new();
    for (idx, header) in headers.iter().enumerate() {
        let Some(field) = aliases.resolve(header) else {
            continue;
        };
        let exact = field.is_exact_spelling(header);
        match columns.get(&field).copied() {
            Some((held_exact, held)) if held_exact || !exact => {
                log::warn!(
                    "Column '{}' also maps to '{}'; using column '{}'",
                    header,
                    field,
                    headers[held]
                );
            }
            Some((_, held)) => {
                log::warn!(
                    "Column '{}' maps to '{}'; preferring it over alias column '{}'",
                    header,
                    field,
                    headers[held]
                );
                columns.insert(field, (exact, idx));
            }
            None => {
                columns.insert(field, (exact, idx));
            }
        }
    }
    columns
        .into_iter()
        .map(|(field, (_, idx))| (field, idx))
        .collect()
}

fn raw_game<'a>(row: &'a StringRecord, columns: &HashMap<Field, usize>) -> RawGame<'a> {
    let cell = |field: Field| columns.get(&field).and_then(|&i| row.get(i));
    RawGame {
        white: cell(Field::White),
        black: cell(Field::Black),
        result: cell(Field::Result),
        white_elo: cell(Field::WhiteElo),
        black_elo: cell(Field::BlackElo),
        utc_date: cell(Field::UtcDate),
        eco: cell(Field::Eco),
        termination: cell(Field::Termination),
        time_control: cell(Field::TimeControl),
        moves: cell(Field::Moves),
        event: cell(Field::Event),
    }
}

/// Read a game CSV and derive every record.
///
/// Fails only on structural problems: unreadable input, no header row, no
/// recognized column, malformed CSV framing, or zero data rows.
pub fn read_games<R: Read>(input: R, options: &IngestOptions) -> Result<GameTable> {
    let mut reader = ReaderBuilder::new().flexible(true).from_reader(input);

    let headers: Vec<String> = reader
        .headers()
        .context("Failed to read CSV header row")?
        .iter()
        .map(normalize_header)
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        bail!("Input has no header row");
    }

    let columns = resolve_columns(&headers, &options.aliases);
    if columns.is_empty() {
        bail!(
            "No recognized game columns in header ({})",
            headers.join(", ")
        );
    }
    for field in [Field::Result, Field::WhiteElo, Field::BlackElo, Field::UtcDate, Field::Moves] {
        if !columns.contains_key(&field) {
            log::warn!("Column '{}' not found; its values are treated as missing", field);
        }
    }

    let mut rows = Vec::new();
    for (row_num, result) in reader.records().enumerate() {
        let row = result.with_context(|| format!("Failed to read CSV row {}", row_num + 1))?;
        rows.push(row);
    }
    if rows.is_empty() {
        bail!("Input has a header but no game rows");
    }

    let records: Vec<GameRecord> = rows
        .par_iter()
        .map(|row| GameRecord::from_raw(&raw_game(row, &columns), options.policy))
        .collect();

    log_coercion_tally(&rows, &records, &columns);
    log::info!(
        "Loaded {} games ({} of {} columns recognized)",
        records.len(),
        columns.len(),
        headers.len()
    );

    Ok(GameTable {
        headers,
        rows,
        records,
        columns,
        policy: options.policy,
    })
}

/// Count non-blank cells that failed to coerce, for diagnostics only.
fn log_coercion_tally(
    rows: &[StringRecord],
    records: &[GameRecord],
    columns: &HashMap<Field, usize>,
) {
    let filled = |row: &StringRecord, field: Field| {
        columns
            .get(&field)
            .and_then(|&i| row.get(i))
            .is_some_and(|c| !c.trim().is_empty())
    };

    let mut bad_elo = 0usize;
    let mut bad_date = 0usize;
    for (row, rec) in rows.iter().zip(records) {
        if (filled(row, Field::WhiteElo) && rec.white_elo.is_none())
            || (filled(row, Field::BlackElo) && rec.black_elo.is_none())
        {
            bad_elo += 1;
        }
        if filled(row, Field::UtcDate) && rec.utc_date.is_none() {
            bad_date += 1;
        }
    }
    if bad_elo > 0 || bad_date > 0 {
        log::debug!(
            "{} rows with unparseable ratings, {} rows with unparseable dates",
            bad_elo,
            bad_date
        );
    }
}

pub fn read_games_from_bytes(bytes: &[u8], options: &IngestOptions) -> Result<GameTable> {
    read_games(bytes, options)
}

pub fn read_games_from_path(path: &Path, options: &IngestOptions) -> Result<GameTable> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open input CSV {}", path.display()))?;
    read_games(file, options)
}

// ============================================================================
// Augmented export
// ============================================================================

fn derived_cells(rec: &GameRecord) -> [String; 4] {
    [
        rec.winner.to_string(),
        rec.avg_elo.map(|v| v.to_string()).unwrap_or_default(),
        rec.num_moves.to_string(),
        rec.month.map(|m| m.to_string()).unwrap_or_default(),
    ]
}

/// Write the table with its derived columns. Existing derived columns in the
/// source are overwritten in place; missing ones are appended after the
/// widest row, so cells past the header are kept under blank headers.
pub fn write_augmented<W: Write>(table: &GameTable, output: W) -> Result<()> {
    let width = table
        .rows
        .iter()
        .map(|r| r.len())
        .max()
        .unwrap_or(0)
        .max(table.headers.len());
    let mut out_headers = table.headers.clone();
    out_headers.resize(width, String::new());
    let derived_idx: Vec<usize> = DERIVED_COLUMNS
        .iter()
        .map(|name| match out_headers.iter().position(|h| h == name) {
            Some(i) => i,
            None => {
                out_headers.push(name.to_string());
                out_headers.len() - 1
            }
        })
        .collect();

    let mut writer = WriterBuilder::new().flexible(true).from_writer(output);
    writer.write_record(&out_headers)?;

    for (row, rec) in table.rows.iter().zip(&table.records) {
        let mut cells: Vec<String> = row.iter().map(|s| s.to_string()).collect();
        if cells.len() < out_headers.len() {
            cells.resize(out_headers.len(), String::new());
        }
        for (idx, value) in derived_idx.iter().zip(derived_cells(rec)) {
            cells[*idx] = value;
        }
        writer.write_record(&cells)?;
    }

    writer.flush()?;
    Ok(())
}

/// Write the augmented CSV to `path`.
pub fn export_augmented(table: &GameTable, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create output CSV {}", path.display()))?;
    write_augmented(table, file)?;
    log::info!("Wrote {} augmented rows to {}", table.len(), path.display());
    Ok(())
}
