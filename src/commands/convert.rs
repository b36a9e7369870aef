use clap::{ArgAction, ArgGroup, Args};
use polarsteps_gpx::convert::{ConvertOptions, convert_export, convert_trip};
use polarsteps_gpx::fetch::{FetchConfig, HttpTripFetcher};
use polarsteps_gpx::report::{LogSink, MessageSink};
use polarsteps_gpx::{
    DEFAULT_API_BASE, DEFAULT_API_VERSION, DEFAULT_OUTPUT, DateRange, RecordSource, parse_date,
};
use reqwest::Url;
use std::error::Error;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use time::OffsetDateTime;

#[derive(Args)]
#[command(group(ArgGroup::new("trip").required(true).args(["input", "from_file"])))]
pub struct ConvertArgs {
    /// Trip sharing url, e.g. https://www.polarsteps.com/{account}/{tripId}-{trip-name}?s={secret}
    #[arg(long, value_name = "URL")]
    input: Option<String>,

    /// Read a saved trip JSON instead of downloading it
    #[arg(long, value_name = "PATH")]
    from_file: Option<PathBuf>,

    /// GPX file to write, `-` for stdout
    #[arg(long, default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Records to export
    #[arg(long, value_enum, default_value_t = RecordSource::Combined)]
    data_source: RecordSource,

    /// Drop records before this date
    #[arg(long, value_name = "YYYY-MM-DD", value_parser = parse_date)]
    from_date: Option<OffsetDateTime>,

    /// Drop records after this date
    #[arg(long, value_name = "YYYY-MM-DD", value_parser = parse_date)]
    to_date: Option<OffsetDateTime>,

    /// Name waypoints after the steps and keep their descriptions; if false,
    /// waypoints are named after the step locality
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    include_step_data: bool,

    /// Fetch through a CORS relay
    #[arg(long, value_name = "URL")]
    relay: Option<Url>,

    /// Origin header presented to the relay
    #[arg(long, value_name = "ORIGIN", requires = "relay")]
    relay_origin: Option<String>,

    #[arg(long, value_name = "URL", default_value = DEFAULT_API_BASE)]
    api_base: Url,

    #[arg(long, default_value = DEFAULT_API_VERSION)]
    api_version: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,
}

pub async fn convert_command(args: ConvertArgs) -> Result<(), Box<dyn Error>> {
    let options = ConvertOptions {
        source: args.data_source,
        range: DateRange::new(args.from_date, args.to_date),
        include_step_data: args.include_step_data,
    };
    let sink = LogSink;

    let gpx = if let Some(path) = &args.from_file {
        let body = std::fs::read(path)?;
        sink.info(&format!("Read trip data from {}", path.display()));
        convert_export(&body, &options, &sink)?
    } else if let Some(url) = &args.input {
        let fetcher = HttpTripFetcher::new(FetchConfig {
            api_base: args.api_base,
            api_version: args.api_version,
            relay: args.relay,
            origin: args.relay_origin,
            timeout: Duration::from_secs(args.timeout),
        })?;
        convert_trip(url, &fetcher, &options, &sink).await?
    } else {
        return Err("either --input or --from-file is required".into());
    };

    write_output(&args.output, &gpx)?;
    sink.info("Done");
    Ok(())
}

fn write_output(path: &Path, gpx: &str) -> io::Result<()> {
    if path == Path::new("-") {
        let mut stdout = io::stdout().lock();
        stdout.write_all(gpx.as_bytes())?;
        return stdout.flush();
    }

    std::fs::write(path, gpx)?;
    log::info!("GPX written to {}", path.display());
    Ok(())
}
