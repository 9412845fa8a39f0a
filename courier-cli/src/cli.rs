use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use courier_core::repository::memory::{MemoryRegionalFees, MemoryWeatherData, MemoryWeatherFees};
use courier_core::{feed, seed, City, Config, Error, FeeEngine, FeedClient, Vehicle};

use crate::server;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "courier", version, about = "Weather-conditioned delivery fee service")]
pub struct Cli {
    /// Path to a TOML config file; defaults to the platform config directory.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP server together with the periodic weather collection job.
    Serve {
        /// Override the configured bind address, e.g. 0.0.0.0:8080.
        #[arg(long)]
        bind: Option<String>,
    },

    /// Compute a one-shot delivery fee quote for a city and vehicle.
    Quote {
        /// City name, e.g. "tallinn".
        city: String,

        /// Vehicle type, e.g. "bike".
        vehicle: String,
    },

    /// Fetch the weather observations feed once and print the parsed stations.
    Fetch,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config = match &self.config {
            Some(path) => Config::load_from(path)?,
            None => Config::load()?,
        };

        match self.command {
            Command::Serve { bind } => server::serve(config, bind).await,
            Command::Quote { city, vehicle } => quote(&config, &city, &vehicle).await,
            Command::Fetch => fetch(&config).await,
        }
    }
}

/// One-shot quote: seed the default fee data, pull the feed once and price
/// the delivery against the fresh observations.
async fn quote(config: &Config, city: &str, vehicle: &str) -> anyhow::Result<()> {
    let city = City::try_from(city)?;
    let vehicle = Vehicle::try_from(vehicle)?;

    let regional = Arc::new(MemoryRegionalFees::default());
    let rules = Arc::new(MemoryWeatherFees::default());
    let weather = Arc::new(MemoryWeatherData::default());
    seed::seed_defaults(regional.as_ref(), rules.as_ref()).await?;

    let client = FeedClient::new(config.feed.url.clone());
    feed::collect(&client, weather.as_ref()).await?;

    let engine = FeeEngine::new(regional, rules, weather);
    match engine.quote(city, vehicle).await {
        Ok(q) => {
            println!(
                "{} / {}: base {:.2} + weather {:.2} = {:.2}",
                q.city, q.vehicle, q.regional_fee, q.weather_fee, q.total
            );
        }
        Err(err @ (Error::Forbidden { .. } | Error::Unavailable { .. })) => {
            println!("{err}");
            std::process::exit(1);
        }
        Err(err) => return Err(err.into()),
    }

    Ok(())
}

async fn fetch(config: &Config) -> anyhow::Result<()> {
    let client = FeedClient::new(config.feed.url.clone());
    let snapshots = client.fetch().await?;

    if snapshots.is_empty() {
        println!("No observations for known cities in the feed.");
        return Ok(());
    }

    for snapshot in snapshots {
        let observed = snapshot
            .observed_at()
            .map_or_else(|| snapshot.timestamp.to_string(), |at| at.to_string());
        println!(
            "{:<8} temp: {:>6}  wind: {:>5}  phenomenon: {:<20} observed: {}",
            snapshot.city.to_string(),
            snapshot.air_temperature.map_or_else(|| "-".to_string(), |v| format!("{v:.1}")),
            snapshot.wind_speed.map_or_else(|| "-".to_string(), |v| format!("{v:.1}")),
            snapshot.phenomenon.as_deref().unwrap_or("-"),
            observed,
        );
    }

    Ok(())
}
