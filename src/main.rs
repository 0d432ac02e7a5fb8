use std::path::PathBuf;

use clap::Parser;
use listener_group::config::{load_config, AppConfig};
use listener_group::observability::logging;
use listener_group::App;

#[derive(Parser, Debug)]
#[command(name = "listener-group", version)]
#[command(about = "API and health listeners with coordinated graceful shutdown", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "LISTENER_GROUP_CONFIG")]
    config: Option<PathBuf>,

    /// API listener address
    #[arg(long, env = "LISTENER_GROUP_API_ADDR")]
    api_addr: Option<String>,

    /// Health listener address
    #[arg(long, env = "LISTENER_GROUP_HEALTH_ADDR")]
    health_addr: Option<String>,

    /// Run without the health listener
    #[arg(long, env = "LISTENER_GROUP_NO_HEALTH")]
    no_health: bool,

    /// Seconds each listener gets to drain on shutdown
    #[arg(long, env = "LISTENER_GROUP_GRACE_PERIOD_SECS")]
    grace_period_secs: Option<u64>,
}

impl Cli {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(addr) = &self.api_addr {
            config.api.bind_address = addr.clone();
        }
        if let Some(addr) = &self.health_addr {
            config.health.bind_address = addr.clone();
        }
        if self.no_health {
            config.health.enabled = false;
        }
        if let Some(secs) = self.grace_period_secs {
            config.shutdown.grace_period_secs = secs;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    cli.apply(&mut config);

    logging::init(&config.observability.log_filter);

    tracing::info!("listener-group v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        api_address = %config.api.bind_address,
        health_enabled = config.health.enabled,
        health_address = %config.health.bind_address,
        grace_period_secs = config.shutdown.grace_period_secs,
        "Configuration loaded"
    );

    let app = App::new(&config)?;

    // Exit status stays 0 whatever the outcome; the log line carries it.
    match app.run().await {
        Ok(()) => tracing::info!("Listener group done"),
        Err(e) if e.is_interrupted() => tracing::info!(error = %e, "Listener group done"),
        Err(e) => tracing::error!(error = %e, "Listener group done with error"),
    }

    tracing::info!("program exit");
    Ok(())
}
