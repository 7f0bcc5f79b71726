use anyhow::{Context, Result};
use flapgen::{driver::Driver, server};
use shared::SimConfig;
use std::env;
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flapgen=info,sim=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Config file is optional; defaults reproduce the reference setup
    let config = match env::var("SIM_CONFIG") {
        Ok(path) => {
            tracing::info!("Loading config from {}", path);
            SimConfig::from_json_file(&path).with_context(|| format!("Invalid config {}", path))?
        }
        Err(_) => SimConfig::default(),
    };

    let seed = env::var("SIM_SEED")
        .ok()
        .map(|s| s.parse::<u64>())
        .transpose()
        .context("SIM_SEED must be an unsigned integer")?;

    let addr: SocketAddr = env::var("BIND_ADDR")
        .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string())
        .parse()
        .context("BIND_ADDR must be host:port")?;

    tracing::info!(
        "Starting flapgen: population {}, {} sensors, tick rate {}",
        config.evolution.population_size,
        config.controller.sensors.len(),
        config.tick_rate
    );

    let driver = Driver::new(config, seed)?;
    driver.start().await;

    server::run(driver, addr).await
}
