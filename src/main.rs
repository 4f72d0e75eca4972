//! pisugar-gauge - Battery fuel gauge daemon for PiSugar modules
//!
//! Samples the battery module over I2C (or accepts software-set values),
//! estimates capacity and charge state, and publishes power-supply reports
//! over TCP.

use clap::Parser;
use pisugar_gauge::app::GaugeApp;
use pisugar_gauge::config::Config;
use pisugar_gauge::error::Result;
use std::path::PathBuf;

const DEFAULT_CONFIG_PATH: &str = "/etc/pisugar-gauge.toml";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (defaults are used if it does not exist)
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Config first: it carries the default log level
    let config_missing = !args.config.exists();
    let config = if config_missing {
        Config::default()
    } else {
        Config::load(&args.config)?
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    log::info!("pisugar-gauge v{} starting...", env!("CARGO_PKG_VERSION"));
    if config_missing {
        log::warn!(
            "Config {} not found, using defaults",
            args.config.display()
        );
    } else {
        log::info!("Using config: {}", args.config.display());
    }
    log::info!("Model: {}", config.device.model);

    let mut app = GaugeApp::new(config)?;
    app.run()?;

    log::info!("pisugar-gauge stopped");
    Ok(())
}
