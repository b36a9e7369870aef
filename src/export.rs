//! Trip export JSON and extraction of location records from it.
//!
//! A trip carries two independent position sources: `steps`, the places the
//! traveller published, and `zelda_steps`, the background tracker pings.

use serde::Deserialize;
use serde_json::Number;
use time::OffsetDateTime;

use crate::report::MessageSink;
use crate::{DateRange, LocationRecord, RecordSet, parse_timestamp};

#[derive(Debug, Default, Deserialize)]
pub struct TripExport {
    #[serde(default)]
    pub steps: Option<Vec<Step>>,
    #[serde(default)]
    pub zelda_steps: Option<Vec<TrackerPing>>,
}

impl TripExport {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

#[derive(Debug, Deserialize)]
pub struct Step {
    pub location: StepLocation,
    pub start_time: RawTimestamp,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StepLocation {
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub locality: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TrackerPing {
    pub location: PingLocation,
    pub time: RawTimestamp,
}

#[derive(Debug, Deserialize)]
pub struct PingLocation {
    pub lat: f64,
    pub lon: f64,
}

/// A timestamp as it appears in the export: ISO-8601 text, or Unix seconds as
/// the live API sends them.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Text(String),
    UnixSeconds(Number),
}

impl RawTimestamp {
    /// The text used as record key, kept verbatim.
    pub fn key(&self) -> String {
        match self {
            RawTimestamp::Text(s) => s.clone(),
            RawTimestamp::UnixSeconds(n) => n.to_string(),
        }
    }

    pub fn parse(&self) -> Option<OffsetDateTime> {
        match self {
            RawTimestamp::Text(s) => parse_timestamp(s),
            RawTimestamp::UnixSeconds(n) => {
                let seconds = n.as_f64()?;
                let nanos = (seconds * 1e9).round() as i128;
                OffsetDateTime::from_unix_timestamp_nanos(nanos).ok()
            }
        }
    }
}

/// The two record sets pulled out of one export. They are never merged here.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ExtractedRecords {
    pub steps: RecordSet,
    pub localisation: RecordSet,
}

/// Builds step and localisation records that fall inside `range`.
///
/// With `include_step_data` the waypoint label is the step name and the
/// description is kept; otherwise the label is the step's locality.
pub fn extract_records(
    export: &TripExport,
    include_step_data: bool,
    range: &DateRange,
    sink: &impl MessageSink,
) -> ExtractedRecords {
    let mut records = ExtractedRecords::default();

    sink.info("Compute Steps Data");
    for step in export.steps.iter().flatten() {
        if !keep(&step.start_time, range, sink) {
            continue;
        }
        let (label, description) = if include_step_data {
            (step.display_name.clone(), step.description.clone())
        } else {
            (step.location.locality.clone(), None)
        };
        records.steps.insert(
            step.start_time.key(),
            LocationRecord {
                lat: step.location.lat,
                lon: step.location.lon,
                label,
                description,
            },
        );
    }

    sink.info("Compute Localisation Data");
    for ping in export.zelda_steps.iter().flatten() {
        if !keep(&ping.time, range, sink) {
            continue;
        }
        records.localisation.insert(
            ping.time.key(),
            LocationRecord::point(ping.location.lat, ping.location.lon),
        );
    }

    log::debug!(
        "extracted {} step records and {} localisation records",
        records.steps.len(),
        records.localisation.len()
    );
    records
}

fn keep(timestamp: &RawTimestamp, range: &DateRange, sink: &impl MessageSink) -> bool {
    let parsed = timestamp.parse();
    if parsed.is_none() && !range.is_unbounded() {
        sink.warn(&format!(
            "Skipping record with unreadable time {:?} while a date filter is set",
            timestamp.key()
        ));
    }
    range.contains(parsed)
}
