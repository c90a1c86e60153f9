//! Dashboard settings and their `key = value` file format.
//!
//! ```text
//! # ~/.chess-dashboard.conf
//! avg_elo_policy = exact
//! top_eco = 15
//! sections = overview,outcomes,openings
//! alias.white_player = white
//! ```

use crate::ingest::{Field, IngestOptions};
use crate::record::AvgEloPolicy;
use crate::report::SectionSet;
use anyhow::{anyhow, bail, Context, Result};
use std::fmt::Write;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = ".chess-dashboard.conf";

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    /// Averaging policy plus the header alias table (defaults merged with overrides).
    pub ingest: IngestOptions,
    /// Aliases read from the file, kept so `save` can write them back.
    pub alias_overrides: Vec<(String, Field)>,
    pub top_termination: usize,
    pub top_eco: usize,
    pub top_time_control: usize,
    pub top_players: usize,
    pub top_events: usize,
    pub min_opening_games: usize,
    pub opening_limit: usize,
    pub histogram_bins: usize,
    pub scatter_points: usize,
    pub preview_rows: usize,
    pub sections: SectionSet,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DashboardConfig {
            ingest: IngestOptions::default(),
            alias_overrides: Vec::new(),
            top_termination: 8,
            top_eco: 15,
            top_time_control: 12,
            top_players: 10,
            top_events: 8,
            min_opening_games: 10,
            opening_limit: 10,
            histogram_bins: 30,
            scatter_points: 1000,
            preview_rows: 10,
            sections: SectionSet::default(),
        }
    }
}

fn parse_count(value: &str) -> Result<usize> {
    value
        .parse::<usize>()
        .map_err(|_| anyhow!("expected a non-negative integer, got '{}'", value))
}

impl DashboardConfig {
    /// Parse config text. Blank lines and `#` comments are skipped.
    pub fn parse(text: &str) -> Result<Self> {
        let mut config = DashboardConfig::default();
        for (idx, line) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                bail!("Config line {}: expected 'key = value', got '{}'", line_no, line);
            };
            config
                .apply(key.trim(), value.trim())
                .with_context(|| {
                    format!("Config line {}: bad value for '{}'", line_no, key.trim())
                })?;
        }
        Ok(config)
    }

    /// Set one key. Unknown keys are logged and ignored.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        if let Some(header) = key.strip_prefix("alias.") {
            if header.trim().is_empty() {
                bail!("alias needs a header name");
            }
            let field: Field = value.parse()?;
            self.set_alias(header.trim(), field);
            return Ok(());
        }
        match key {
            "avg_elo_policy" => self.ingest.policy = value.parse::<AvgEloPolicy>()?,
            "top_termination" => self.top_termination = parse_count(value)?,
            "top_eco" => self.top_eco = parse_count(value)?,
            "top_time_control" => self.top_time_control = parse_count(value)?,
            "top_players" => self.top_players = parse_count(value)?,
            "top_events" => self.top_events = parse_count(value)?,
            "min_opening_games" => self.min_opening_games = parse_count(value)?,
            "opening_limit" => self.opening_limit = parse_count(value)?,
            "histogram_bins" => self.histogram_bins = parse_count(value)?,
            "scatter_points" => self.scatter_points = parse_count(value)?,
            "preview_rows" => self.preview_rows = parse_count(value)?,
            "sections" => self.sections = SectionSet::parse_list(&[value])?,
            _ => log::warn!("Ignoring unknown config key '{}'", key),
        }
        Ok(())
    }

    /// Map an extra header spelling to a field, replacing any earlier override.
    pub fn set_alias(&mut self, header: &str, field: Field) {
        self.ingest.aliases.insert(header, field);
        self.alias_overrides.retain(|(h, _)| h != header);
        self.alias_overrides.push((header.to_string(), field));
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid config: {}", path.display()))
    }

    /// Load `path` if given, else the default file if it exists, else defaults.
    ///
    /// An explicitly named file must exist; a missing default file is not an error.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(p) = path {
            return Self::load(p);
        }
        match default_path() {
            Some(p) if p.exists() => Self::load(&p),
            _ => Ok(DashboardConfig::default()),
        }
    }

    pub fn to_config_string(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "avg_elo_policy={}", self.ingest.policy.as_str());
        let counts = [
            ("top_termination", self.top_termination),
            ("top_eco", self.top_eco),
            ("top_time_control", self.top_time_control),
            ("top_players", self.top_players),
            ("top_events", self.top_events),
            ("min_opening_games", self.min_opening_games),
            ("opening_limit", self.opening_limit),
            ("histogram_bins", self.histogram_bins),
            ("scatter_points", self.scatter_points),
            ("preview_rows", self.preview_rows),
        ];
        for (key, value) in counts {
            let _ = writeln!(out, "{}={}", key, value);
        }
        let _ = writeln!(out, "sections={}", self.sections);
        for (header, field) in &self.alias_overrides {
            let _ = writeln!(out, "alias.{}={}", header, field.canonical_name());
        }
        out
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_config_string())
            .with_context(|| format!("Failed to write config: {}", path.display()))
    }
}

/// `~/.chess-dashboard.conf`, or `None` when `HOME` is unset.
pub fn default_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Section;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let c = DashboardConfig::default();
        assert_eq!(c.ingest.policy, AvgEloPolicy::Exact);
        assert_eq!(c.top_termination, 8);
        assert_eq!(c.top_eco, 15);
        assert_eq!(c.top_time_control, 12);
        assert_eq!(c.min_opening_games, 10);
        assert_eq!(c.histogram_bins, 30);
        assert!(c.sections.contains(Section::Advanced));
    }

    #[test]
    fn test_parse_keys_and_comments() {
        let text = "\
# comment
avg_elo_policy = truncate
top_eco = 5

min_opening_games=3
sections = outcomes, openings
alias.White Player = white
";
        let c = DashboardConfig::parse(text).unwrap();
        assert_eq!(c.ingest.policy, AvgEloPolicy::Truncate);
        assert_eq!(c.top_eco, 5);
        assert_eq!(c.min_opening_games, 3);
        assert!(c.sections.contains(Section::Openings));
        assert!(!c.sections.contains(Section::Overview));
        assert_eq!(c.ingest.aliases.resolve("white_player"), Some(Field::White));
        assert_eq!(c.ingest.aliases.resolve("WhiteElo"), Some(Field::WhiteElo));
    }

    #[test]
    fn test_unknown_key_is_ignored() {
        let c = DashboardConfig::parse("colour_scheme = dark\ntop_players = 4\n").unwrap();
        assert_eq!(c.top_players, 4);
    }

    #[test]
    fn test_bad_value_reports_line() {
        let err = DashboardConfig::parse("top_eco = 3\ntop_eco = many\n").unwrap_err();
        assert!(format!("{:#}", err).contains("line 2"));

        let err = DashboardConfig::parse("avg_elo_policy = median").unwrap_err();
        assert!(format!("{:#}", err).contains("line 1"));

        assert!(DashboardConfig::parse("just some words").is_err());
        assert!(DashboardConfig::parse("alias.x = rating").is_err());
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dash.conf");

        let mut c = DashboardConfig::default();
        c.top_players = 3;
        c.ingest.policy = AvgEloPolicy::Truncate;
        c.sections.set(Section::Trends, false);
        c.set_alias("Opening Code", Field::Eco);
        c.save(&path).unwrap();

        let loaded = DashboardConfig::load(&path).unwrap();
        assert_eq!(loaded, c);
        assert_eq!(loaded.ingest.aliases.resolve("opening code"), Some(Field::Eco));
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.conf");
        assert!(DashboardConfig::load_or_default(Some(&missing)).is_err());
    }
}
