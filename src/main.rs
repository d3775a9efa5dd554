//! Transport Map CLI
//!
//! - `watch`: run a live session and print the map on every change. Lines
//!   typed on stdin replace the line filter.
//! - `fetch`: fetch vehicles or stops once and print them as JSON
//! - `config`: print or write the default config file

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use transport_map::config::{generate_default_config, Config};
use transport_map::geo::{FixedLocator, GeoLocator, UnsupportedLocator};
use transport_map::model::UserLocation;
use transport_map::session::LiveSession;
use transport_map::source::{DataSource, HttpDataSource};
use transport_map::view::{MapView, TextRenderer};

#[derive(Parser)]
#[command(name = "transport-map")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Live transit map in the terminal")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: search the standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend URL, overrides the config file
    #[arg(long, global = true)]
    pub api_url: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show live vehicles and stops
    Watch {
        /// Only show vehicles of this line
        #[arg(short, long)]
        filter: Option<String>,
        /// Your position as LAT,LON
        #[arg(long, value_parser = parse_lat_lon)]
        at: Option<UserLocation>,
        /// Print the first complete map and exit
        #[arg(long)]
        once: bool,
    },

    /// Fetch once and print JSON
    Fetch {
        #[command(subcommand)]
        target: FetchTarget,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum FetchTarget {
    /// Vehicle positions
    Vehicles {
        /// Line number
        #[arg(short, long)]
        filter: Option<String>,
    },
    /// Stops
    Stops,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Config { output } = &cli.command {
        return write_default_config(output.as_ref());
    }

    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    if let Some(url) = cli.api_url {
        config.source.base_url = url;
    }

    transport_map::logging::init(&config.logging).context("Failed to initialize logging")?;

    match cli.command {
        Commands::Watch { filter, at, once } => watch(config, filter, at, once).await,
        Commands::Fetch { target } => fetch(config, target).await,
        Commands::Config { .. } => Ok(()),
    }
}

async fn watch(
    config: Config,
    filter: Option<String>,
    at: Option<UserLocation>,
    once: bool,
) -> anyhow::Result<()> {
    let source = Arc::new(HttpDataSource::new(config.source.clone())?);
    let locator: Arc<dyn GeoLocator> = match at.or_else(|| config.location.fixed()) {
        Some(location) => Arc::new(FixedLocator::new(location)),
        None => Arc::new(UnsupportedLocator),
    };

    let session = LiveSession::new(source, locator, config.session.clone())
        .with_filter(filter.as_deref().unwrap_or_default());

    if once {
        session.mount().settled().await?;
        let mut view = MapView::new(TextRenderer::stdout(), &config.map);
        view.render(&session.snapshot());
        session.shutdown();
        return Ok(());
    }

    let view = MapView::new(TextRenderer::stdout(), &config.map);
    let view_task = tokio::spawn(view.follow(session.subscribe()));

    session.mount();
    session.start_polling();
    tracing::info!("Type a line number and press Enter to filter, Ctrl+C to quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line(), if stdin_open => match line? {
                Some(text) => {
                    if session.input(&text).is_none() {
                        session.submit();
                    }
                }
                None => stdin_open = false,
            },
        }
    }

    session.shutdown();
    view_task.abort();
    Ok(())
}

async fn fetch(config: Config, target: FetchTarget) -> anyhow::Result<()> {
    let source = HttpDataSource::new(config.source)?;

    let json = match target {
        FetchTarget::Vehicles { filter } => {
            let fetched = source.fetch_vehicles(filter.as_deref()).await?;
            tracing::info!(count = fetched.len(), dropped = fetched.dropped, "Fetched vehicles");
            serde_json::to_string_pretty(&fetched.records)?
        }
        FetchTarget::Stops => {
            let fetched = source.fetch_stops().await?;
            tracing::info!(count = fetched.len(), dropped = fetched.dropped, "Fetched stops");
            serde_json::to_string_pretty(&fetched.records)?
        }
    };

    println!("{}", json);
    Ok(())
}

fn write_default_config(output: Option<&PathBuf>) -> anyhow::Result<()> {
    let config = generate_default_config();
    match output {
        Some(path) => {
            std::fs::write(path, &config)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Config written to {}", path.display());
        }
        None => print!("{}", config),
    }
    Ok(())
}

fn parse_lat_lon(value: &str) -> Result<UserLocation, String> {
    let (lat, lon) = value
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LON, got '{}'", value))?;
    let lat: f64 = lat.trim().parse().map_err(|e| format!("bad latitude: {}", e))?;
    let lon: f64 = lon.trim().parse().map_err(|e| format!("bad longitude: {}", e))?;
    Ok(UserLocation::new(lat, lon))
}
