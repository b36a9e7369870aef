//! Trip URL to GPX text, stage by stage.

use crate::export::{TripExport, extract_records};
use crate::fetch::TripFetcher;
use crate::gpxxml::write_gpx;
use crate::report::MessageSink;
use crate::trip_url::TripReference;
use crate::{ConvertError, DateRange, RecordSource};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvertOptions {
    pub source: RecordSource,
    pub range: DateRange,
    pub include_step_data: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            source: RecordSource::default(),
            range: DateRange::default(),
            include_step_data: true,
        }
    }
}

/// Parses the sharing URL, downloads the trip and converts it.
///
/// Nothing is fetched when the URL carries no trip id.
pub async fn convert_trip(
    input_url: &str,
    fetcher: &impl TripFetcher,
    options: &ConvertOptions,
    sink: &impl MessageSink,
) -> Result<String, ConvertError> {
    let trip = TripReference::from_sharing_url(input_url)
        .ok_or_else(|| ConvertError::InvalidTripUrl(input_url.to_string()))?;

    let body = fetcher.fetch_trip(&trip).await?;
    sink.info("Polarsteps trip data downloaded");

    convert_export(&body, options, sink)
}

/// Converts an already downloaded trip export.
pub fn convert_export(
    body: &[u8],
    options: &ConvertOptions,
    sink: &impl MessageSink,
) -> Result<String, ConvertError> {
    let export = TripExport::from_slice(body)?;
    let records = extract_records(&export, options.include_step_data, &options.range, sink);

    let selected = options.source.select(records.steps, records.localisation);
    sink.info(&format!("Build GPX with {} points", selected.len()));

    write_gpx(&selected).map_err(ConvertError::Xml)
}
