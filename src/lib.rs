pub mod convert;
pub mod error;
pub mod export;
pub mod fetch;
pub mod gpxxml;
pub mod relay;
pub mod report;
pub mod trip_url;

use std::collections::BTreeMap;

use clap::ValueEnum;
use time::format_description::well_known::Iso8601;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

pub use error::{ConvertError, FetchFailure};

pub const DEFAULT_API_BASE: &str = "https://api.polarsteps.com";
pub const DEFAULT_API_VERSION: &str = "62";
pub const API_VERSION_HEADER: &str = "polarsteps-api-version";
pub const DEFAULT_OUTPUT: &str = "report.gpx";
pub const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// A single time-stamped position, either from a trip step or from the
/// background location tracker.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationRecord {
    pub lat: f64,
    pub lon: f64,
    pub label: Option<String>,
    pub description: Option<String>,
}

impl LocationRecord {
    pub fn point(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            label: None,
            description: None,
        }
    }
}

/// Records keyed by their raw timestamp text.
///
/// Iteration follows plain string order of the keys, never parsed time order.
/// Source timestamps are zero-padded ISO-8601, so the two agree in practice.
pub type RecordSet = BTreeMap<String, LocationRecord>;

/// Inclusive `[from, to]` filter; a missing bound is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DateRange {
    pub from: Option<OffsetDateTime>,
    pub to: Option<OffsetDateTime>,
}

impl DateRange {
    pub fn new(from: Option<OffsetDateTime>, to: Option<OffsetDateTime>) -> Self {
        Self { from, to }
    }

    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    /// A timestamp that could not be parsed only passes an unbounded range.
    pub fn contains(&self, timestamp: Option<OffsetDateTime>) -> bool {
        let Some(t) = timestamp else {
            return self.is_unbounded();
        };
        let after_from = self.from.is_none_or(|from| t >= from);
        let before_to = self.to.is_none_or(|to| t <= to);
        after_from && before_to
    }
}

/// Which record set ends up in the GPX document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum RecordSource {
    /// Trip steps only, with names and descriptions.
    Steps,
    /// Tracker pings only.
    #[value(alias = "localization")]
    Localisation,
    /// Both; on a timestamp collision the step record wins.
    #[default]
    Combined,
}

impl RecordSource {
    pub fn select(self, steps: RecordSet, localisation: RecordSet) -> RecordSet {
        match self {
            RecordSource::Steps => steps,
            RecordSource::Localisation => localisation,
            RecordSource::Combined => {
                let mut merged = localisation;
                merged.extend(steps);
                merged
            }
        }
    }
}

/// Parses a `YYYY-MM-DD` bound as midnight UTC.
pub fn parse_date(s: &str) -> Result<OffsetDateTime, time::error::Parse> {
    let date = Date::parse(s.trim(), format_description!("[year]-[month]-[day]"))?;
    Ok(date.midnight().assume_utc())
}

/// Parses an ISO-8601 timestamp. Timestamps without an offset are taken as UTC.
pub fn parse_timestamp(s: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(s, &Iso8601::DEFAULT)
        .or_else(|_| PrimitiveDateTime::parse(s, &Iso8601::DEFAULT).map(|t| t.assume_utc()))
        .ok()
}
