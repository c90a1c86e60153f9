//! Date and rating range filters, plus the observed bounds used to seed them.

use crate::record::GameRecord;
use chrono::NaiveDate;

/// Inclusive range filters. An unset range accepts every record; a set range
/// rejects records whose value is missing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GameFilter {
    pub dates: Option<(NaiveDate, NaiveDate)>,
    pub rating: Option<(f64, f64)>,
}

impl GameFilter {
    pub fn new() -> Self {
        GameFilter::default()
    }

    pub fn with_dates(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.dates = Some((from, to));
        self
    }

    pub fn with_rating(mut self, min: f64, max: f64) -> Self {
        self.rating = Some((min, max));
        self
    }

    /// Build a filter from optional endpoints. A range is active when either
    /// of its endpoints is given; the other side is left open.
    pub fn from_endpoints(
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        min_rating: Option<f64>,
        max_rating: Option<f64>,
    ) -> Self {
        let dates = (from.is_some() || to.is_some())
            .then(|| (from.unwrap_or(NaiveDate::MIN), to.unwrap_or(NaiveDate::MAX)));
        let rating = (min_rating.is_some() || max_rating.is_some()).then(|| {
            (
                min_rating.unwrap_or(f64::NEG_INFINITY),
                max_rating.unwrap_or(f64::INFINITY),
            )
        });
        GameFilter { dates, rating }
    }

    pub fn is_unbounded(&self) -> bool {
        self.dates.is_none() && self.rating.is_none()
    }

    /// An inverted range (`from > to`) matches nothing.
    pub fn matches(&self, record: &GameRecord) -> bool {
        if let Some((from, to)) = self.dates {
            match record.utc_date {
                Some(d) if from <= d && d <= to => {}
                _ => return false,
            }
        }
        if let Some((min, max)) = self.rating {
            match record.avg_elo {
                Some(r) if min <= r && r <= max => {}
                _ => return false,
            }
        }
        true
    }
}

/// Observed min/max of the filterable fields.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FilterBounds {
    pub dates: Option<(NaiveDate, NaiveDate)>,
    pub rating: Option<(f64, f64)>,
}

impl FilterBounds {
    pub fn observe<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a GameRecord>,
    {
        let mut bounds = FilterBounds::default();
        for rec in records {
            if let Some(d) = rec.utc_date {
                bounds.dates = Some(match bounds.dates {
                    Some((lo, hi)) => (lo.min(d), hi.max(d)),
                    None => (d, d),
                });
            }
            if let Some(r) = rec.avg_elo {
                bounds.rating = Some(match bounds.rating {
                    Some((lo, hi)) => (lo.min(r), hi.max(r)),
                    None => (r, r),
                });
            }
        }
        bounds
    }

    /// A filter spanning the full observed range of both fields.
    pub fn to_filter(&self) -> GameFilter {
        GameFilter {
            dates: self.dates,
            rating: self.rating,
        }
    }
}
