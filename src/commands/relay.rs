use axum::http::HeaderName;
use clap::Args;
use polarsteps_gpx::API_VERSION_HEADER;
use polarsteps_gpx::relay::{Relay, RelayConfig};
use std::error::Error;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;

#[derive(Args)]
pub struct RelayArgs {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:8787")]
    listen: SocketAddr,

    /// Browser origin allowed to use the relay (repeatable)
    #[arg(long = "allow-origin", value_name = "ORIGIN", required = true)]
    allowed_origins: Vec<String>,

    /// Request header forwarded to the target
    #[arg(long, default_value = API_VERSION_HEADER)]
    api_version_header: HeaderName,

    /// Upstream timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,
}

pub async fn relay_command(args: RelayArgs) -> Result<(), Box<dyn Error>> {
    let relay = Relay::new(RelayConfig {
        allowed_origins: args.allowed_origins,
        api_version_header: args.api_version_header,
        timeout: Duration::from_secs(args.timeout),
    })?;

    let listener = TcpListener::bind(args.listen).await?;
    relay.serve(listener).await?;
    Ok(())
}
