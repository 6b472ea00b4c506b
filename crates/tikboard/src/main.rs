//! Main entry point for tikboard.

use anyhow::{Context, Result};
use clap::Parser;
use tikboard::{App, Cli};
use tikboard_common::init_logging;
use tikboard_config::ConfigLoader;
use tracing::{debug, error};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
    .context("Failed to load configuration")?;

    let mut logging = config.logging.to_logging_config();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    init_logging(&logging).context("Failed to initialize logging")?;
    debug!(command = ?cli.command, "Starting tikboard");

    let app = App::new(config)?;
    let rendered = match app.execute(&cli.command, cli.from_snapshot).await {
        Ok(rendered) => rendered,
        Err(e) => {
            error!(error = %e, "Command failed");
            return Err(e.into());
        }
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&rendered.json)?);
    } else {
        println!("{}", rendered.text);
    }
    Ok(())
}
