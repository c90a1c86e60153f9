//! Chess Dashboard - Graphical User Interface
//!
//! Loads a game CSV, lets the user narrow it by date and average rating,
//! toggle dashboard sections, and export the augmented CSV.

use chess_dashboard::config::{self, DashboardConfig};
use chess_dashboard::filter::{FilterBounds, GameFilter};
use chess_dashboard::pipeline;
use chess_dashboard::record::parse_date;
use chess_dashboard::report::Section;
use chess_dashboard::session::Session;
use chess_dashboard::views::GameView;
use iced::widget::{
    button, checkbox, column, container, row, rule, scrollable, slider, text, text_input,
};
use iced::{Center, Element, Fill, Task, Theme};
use std::path::PathBuf;

fn main() -> iced::Result {
    env_logger::init();
    iced::application(App::new, App::update, App::view)
        .theme(App::theme)
        .centered()
        .run()
}

// ============================================================================
// App State
// ============================================================================

struct App {
    config: DashboardConfig,
    /// Where section toggles are saved; `None` disables saving.
    config_path: Option<PathBuf>,
    session: Session,
    input_path: Option<PathBuf>,

    // Filters, seeded from the observed bounds of the loaded file
    bounds: FilterBounds,
    from_date: String,
    to_date: String,
    min_rating: f64,
    max_rating: f64,
    filter_error: Option<String>,

    report: String,
    status_text: String,
}

impl App {
    fn theme(&self) -> Theme {
        Theme::Dark
    }

    fn new() -> (Self, Task<Message>) {
        let app = App::with_config(
            DashboardConfig::load_or_default(None),
            config::default_path(),
        );
        (app, Task::none())
    }

    /// Build the initial state from the startup config load. When the file
    /// could not be parsed, settings are not saved back so the user's file
    /// survives until they fix it.
    fn with_config(loaded: anyhow::Result<DashboardConfig>, config_path: Option<PathBuf>) -> Self {
        let (config, config_path, status_text) = match loaded {
            Ok(c) => (c, config_path, "Select a game CSV to begin.".to_string()),
            Err(e) => (
                DashboardConfig::default(),
                None,
                format!("Config not loaded, using defaults (settings will not be saved): {:#}", e),
            ),
        };
        App {
            config,
            config_path,
            session: Session::new(),
            input_path: None,
            bounds: FilterBounds::default(),
            from_date: String::new(),
            to_date: String::new(),
            min_rating: 0.0,
            max_rating: 0.0,
            filter_error: None,
            report: String::new(),
            status_text,
        }
    }

    /// Reset the filter controls to the full observed range of the loaded table.
    fn reset_filters(&mut self) {
        let full = self.bounds.to_filter();
        let (from, to) = match full.dates {
            Some((lo, hi)) => (lo.to_string(), hi.to_string()),
            None => (String::new(), String::new()),
        };
        self.from_date = from;
        self.to_date = to;
        let (lo, hi) = full
            .rating
            .map(|(lo, hi)| (lo.floor(), hi.ceil()))
            .unwrap_or((0.0, 0.0));
        self.min_rating = lo;
        self.max_rating = hi;
        self.filter_error = None;
    }

    /// Slider range: observed average ratings widened to whole points.
    fn rating_range(&self) -> (f64, f64) {
        match self.bounds.rating {
            Some((lo, hi)) => (lo.floor(), hi.ceil()),
            None => (0.0, 0.0),
        }
    }

    fn load_input(&mut self, path: PathBuf) {
        match pipeline::load_into_session(&mut self.session, &path, &self.config) {
            Ok(table) => {
                self.bounds = GameView::all(&table).bounds();
                self.status_text = format!(
                    "Loaded {} games from {} ({})",
                    table.len(),
                    path.display(),
                    pipeline::describe_columns(&table)
                );
                self.input_path = Some(path);
                self.reset_filters();
                self.refresh_report();
            }
            Err(e) => {
                log::warn!("Load failed: {:#}", e);
                self.status_text = format!("Error: {:#}", e);
                self.input_path = None;
                self.bounds = FilterBounds::default();
                self.report.clear();
            }
        }
    }

    fn refresh_report(&mut self) {
        let Some(table) = self.session.current() else {
            self.report.clear();
            return;
        };
        let rating = self
            .bounds
            .rating
            .map(|_| (self.min_rating, self.max_rating));
        let filter = match build_filter(&self.from_date, &self.to_date, rating) {
            Ok(f) => {
                self.filter_error = None;
                f
            }
            Err(e) => {
                // Keep showing the last valid report while the user is typing.
                self.filter_error = Some(e);
                return;
            }
        };
        match pipeline::dashboard_report(&table, &filter, &self.config) {
            Ok(r) => self.report = r,
            Err(e) => self.status_text = format!("Error: {:#}", e),
        }
    }

    fn persist_config(&mut self) {
        let Some(path) = self.config_path.clone() else {
            return;
        };
        if let Err(e) = self.config.save(&path) {
            log::warn!("{:#}", e);
            self.status_text = format!("Could not save settings: {:#}", e);
        }
    }
}

/// Build the active filter from the date inputs and the rating sliders.
///
/// Both dates blank means no date filter; one blank side is open.
fn build_filter(from: &str, to: &str, rating: Option<(f64, f64)>) -> Result<GameFilter, String> {
    let parse_side = |label: &str, s: &str| {
        let s = s.trim();
        if s.is_empty() {
            Ok(None)
        } else {
            parse_date(s)
                .map(Some)
                .ok_or_else(|| format!("{} date '{}' is not YYYY-MM-DD", label, s))
        }
    };
    let from = parse_side("Start", from)?;
    let to = parse_side("End", to)?;
    let (min, max) = match rating {
        Some((lo, hi)) => (Some(lo), Some(hi)),
        None => (None, None),
    };
    Ok(GameFilter::from_endpoints(from, to, min, max))
}

// ============================================================================
// Messages
// ============================================================================

#[derive(Debug, Clone)]
enum Message {
    // Input file
    BrowseInput,
    InputSelected(Option<PathBuf>),

    // Filters
    FromDateChanged(String),
    ToDateChanged(String),
    MinRatingChanged(f64),
    MaxRatingChanged(f64),
    ResetFilters,

    // Sections
    SectionToggled(Section, bool),

    // Export
    BrowseExport,
    ExportSelected(Option<PathBuf>),
    ExportCompleted(Result<String, String>),
}

// ============================================================================
// Update
// ============================================================================

impl App {
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            // -- Input file --
            Message::BrowseInput => Task::perform(
                async {
                    let file = rfd::AsyncFileDialog::new()
                        .set_title("Select chess games CSV")
                        .add_filter("CSV files", &["csv"])
                        .pick_file()
                        .await;
                    file.map(|f| f.path().to_path_buf())
                },
                Message::InputSelected,
            ),
            Message::InputSelected(path) => {
                if let Some(p) = path {
                    self.load_input(p);
                }
                Task::none()
            }

            // -- Filters --
            Message::FromDateChanged(v) => {
                self.from_date = v;
                self.refresh_report();
                Task::none()
            }
            Message::ToDateChanged(v) => {
                self.to_date = v;
                self.refresh_report();
                Task::none()
            }
            Message::MinRatingChanged(v) => {
                self.min_rating = v.min(self.max_rating);
                self.refresh_report();
                Task::none()
            }
            Message::MaxRatingChanged(v) => {
                self.max_rating = v.max(self.min_rating);
                self.refresh_report();
                Task::none()
            }
            Message::ResetFilters => {
                self.reset_filters();
                self.refresh_report();
                Task::none()
            }

            // -- Sections --
            Message::SectionToggled(section, enabled) => {
                self.config.sections.set(section, enabled);
                self.persist_config();
                self.refresh_report();
                Task::none()
            }

            // -- Export --
            Message::BrowseExport => {
                let file_name = self
                    .input_path
                    .as_ref()
                    .and_then(|p| p.file_stem())
                    .map(|s| format!("{} augmented.csv", s.to_string_lossy()))
                    .unwrap_or_else(|| "games augmented.csv".to_string());
                Task::perform(
                    async move {
                        let file = rfd::AsyncFileDialog::new()
                            .add_filter("CSV files", &["csv"])
                            .set_file_name(file_name)
                            .save_file()
                            .await;
                        file.map(|f| f.path().to_path_buf())
                    },
                    Message::ExportSelected,
                )
            }
            Message::ExportSelected(path) => {
                let (Some(path), Some(table)) = (path, self.session.current()) else {
                    return Task::none();
                };
                self.status_text = "Exporting...".to_string();
                Task::perform(
                    async move {
                        pipeline::export_table(&table, &path).map_err(|e| format!("{:#}", e))
                    },
                    Message::ExportCompleted,
                )
            }
            Message::ExportCompleted(result) => {
                self.status_text = match result {
                    Ok(s) => s,
                    Err(e) => format!("Error: {}", e),
                };
                Task::none()
            }
        }
    }
}

// ============================================================================
// View
// ============================================================================

impl App {
    fn view(&self) -> Element<'_, Message> {
        let body = row![
            container(self.view_controls()).width(300).height(Fill),
            container(self.view_report()).width(Fill).height(Fill),
        ]
        .spacing(20);

        column![
            container(text("Chess Game Dashboard").size(24)).padding([10, 20]),
            rule::horizontal(1),
            container(body).padding(20).width(Fill).height(Fill),
            rule::horizontal(1),
            container(text(&self.status_text).size(13)).padding([6, 20]),
        ]
        .into()
    }

    fn view_controls(&self) -> Element<'_, Message> {
        let loaded = self.session.current().is_some();
        let file_label = self
            .input_path
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "No file loaded".to_string());

        let file_section = column![
            text("Games").size(16),
            row![
                text(file_label).size(13).width(Fill),
                button(text("Browse").size(13)).on_press(Message::BrowseInput),
            ]
            .spacing(10)
            .align_y(Center),
        ]
        .spacing(8);

        let mut filter_section = column![
            rule::horizontal(1),
            text("Filters").size(16),
            row![
                text("From:").width(50),
                text_input("YYYY-MM-DD", &self.from_date)
                    .on_input_maybe(loaded.then_some(Message::FromDateChanged)),
            ]
            .spacing(10)
            .align_y(Center),
            row![
                text("To:").width(50),
                text_input("YYYY-MM-DD", &self.to_date)
                    .on_input_maybe(loaded.then_some(Message::ToDateChanged)),
            ]
            .spacing(10)
            .align_y(Center),
        ]
        .spacing(8);

        if let Some(err) = &self.filter_error {
            filter_section = filter_section.push(text(err).size(12));
        }

        if self.bounds.rating.is_some() {
            let (lo, hi) = self.rating_range();
            filter_section = filter_section
                .push(text(format!("Min avg rating: {:.0}", self.min_rating)).size(13))
                .push(slider(lo..=hi, self.min_rating, Message::MinRatingChanged).step(1.0))
                .push(text(format!("Max avg rating: {:.0}", self.max_rating)).size(13))
                .push(slider(lo..=hi, self.max_rating, Message::MaxRatingChanged).step(1.0));
        } else if loaded {
            filter_section = filter_section.push(text("No ratings in this file").size(13));
        }

        let mut reset_btn = button(text("Reset filters").size(13)).style(button::secondary);
        if loaded {
            reset_btn = reset_btn.on_press(Message::ResetFilters);
        }
        filter_section = filter_section.push(reset_btn);

        let mut sections = column![rule::horizontal(1), text("Sections").size(16)].spacing(6);
        for section in Section::ALL {
            sections = sections.push(
                checkbox(self.config.sections.contains(section))
                    .label(section.title())
                    .on_toggle(move |on| Message::SectionToggled(section, on)),
            );
        }

        let mut export_btn = button(text("Export CSV"));
        if loaded {
            export_btn = export_btn.on_press(Message::BrowseExport);
        }

        scrollable(
            column![
                file_section,
                filter_section,
                sections,
                rule::horizontal(1),
                export_btn,
            ]
            .spacing(16)
            .padding(4),
        )
        .into()
    }

    fn view_report(&self) -> Element<'_, Message> {
        if self.report.is_empty() {
            return container(text("Load a CSV of games to see the dashboard.").size(14))
                .padding(8)
                .into();
        }
        scrollable(
            container(text(&self.report).size(12).font(iced::Font::MONOSPACE)).padding(8),
        )
        .height(Fill)
        .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    #[test]
    fn test_build_filter_blank_dates() {
        let f = build_filter(" ", "", None).unwrap();
        assert!(f.is_unbounded());
    }

    #[test]
    fn test_build_filter_open_end() {
        let f = build_filter("2024-03-01", "", Some((1200.0, 1800.0))).unwrap();
        let (from, _) = f.dates.unwrap();
        assert_eq!(from, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(f.rating, Some((1200.0, 1800.0)));
    }

    #[test]
    fn test_section_toggle_saves_loaded_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dash.conf");
        std::fs::write(&path, "top_eco = 5\n").unwrap();

        let mut app = App::with_config(DashboardConfig::load(&path), Some(path.clone()));
        let _ = app.update(Message::SectionToggled(Section::Trends, false));

        let saved = DashboardConfig::load(&path).unwrap();
        assert_eq!(saved.top_eco, 5);
        assert!(!saved.sections.contains(Section::Trends));
    }

    #[test]
    fn test_section_toggle_leaves_unparseable_config_alone() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dash.conf");
        let broken = "top_eco = lots\nsections = outcomes\n";
        std::fs::write(&path, broken).unwrap();

        let mut app = App::with_config(DashboardConfig::load(&path), Some(path.clone()));
        assert!(app.status_text.contains("will not be saved"));
        let _ = app.update(Message::SectionToggled(Section::Trends, false));

        assert!(!app.config.sections.contains(Section::Trends));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), broken);
    }

    #[test]
    fn test_reset_filters_spans_observed_bounds() {
        let mut app = App::with_config(Ok(DashboardConfig::default()), None);
        app.bounds = FilterBounds {
            dates: Some((
                NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            )),
            rating: Some((1450.5, 1890.5)),
        };
        app.reset_filters();
        assert_eq!(app.from_date, "2024-01-02");
        assert_eq!(app.to_date, "2024-03-04");
        assert_eq!((app.min_rating, app.max_rating), (1450.0, 1891.0));
    }

    #[test]
    fn test_build_filter_rejects_bad_date() {
        let err = build_filter("2024-01-01", "next week", None).unwrap_err();
        assert!(err.starts_with("End date"));
    }
}
