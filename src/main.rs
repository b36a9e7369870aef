mod commands;

use clap::{Parser, Subcommand};
use commands::convert::{ConvertArgs, convert_command};
use commands::relay::{RelayArgs, relay_command};
use std::error::Error;

#[derive(Parser)]
#[command(
    name = "polarsteps-gpx",
    version,
    about = "Export Polarsteps trips as GPX files"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Download a trip (or read a saved trip JSON) and write it as GPX")]
    Convert(ConvertArgs),
    #[command(about = "Run the CORS relay that lets a browser page reach the Polarsteps API")]
    Relay(RelayArgs),
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        log::error!("{e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    match cli.command {
        Commands::Convert(args) => convert_command(args).await,
        Commands::Relay(args) => relay_command(args).await,
    }
}
