//! RF power measurement service.
//!
//! Hosts the measurement over HTTP, or runs a single measurement from the
//! command line.
//!
//! ```text
//! rf_power_meter -v serve --bind 0.0.0.0:8080
//! rf_power_meter measure --resource TCPIP0::192.168.1.50::5025::SOCKET --frequency 2.4e9
//! rf_power_meter schema
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use power_meter::server::{self, AppState};
use power_meter::{measurement_schema, MeasurementOrchestrator, MeasurementRequest, ServiceConfig};
use tracing::{info, Level};

#[derive(Parser, Debug)]
#[command(author, version, about = "Single-shot RF power measurement with R&S NRP sensors")]
struct Args {
    /// Enable verbose logging. Repeat to increase verbosity.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Service configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Host the measurement service until Ctrl-C
    Serve {
        /// Listen address, overrides the configuration file
        #[arg(long)]
        bind: Option<SocketAddr>,
    },

    /// Run one measurement and print the power in dBm
    Measure(MeasureArgs),

    /// Print the parameter schema as JSON
    Schema,

    /// Write the effective configuration to a file
    InitConfig {
        /// Destination path
        path: PathBuf,
    },
}

#[derive(clap::Args, Debug)]
struct MeasureArgs {
    /// VISA resource name of the sensor
    #[arg(long)]
    resource: String,

    /// Carrier frequency in Hz
    #[arg(long, default_value_t = 1e9)]
    frequency: f64,

    /// Aperture time in seconds
    #[arg(long, default_value_t = 0.01)]
    aperture: f64,

    /// Let the sensor choose the averaging count
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    auto_averaging: bool,

    /// Averaging count
    #[arg(long, default_value_t = 1)]
    averaging_count: i32,

    /// Level offset in dB (ignored with --deembed-file)
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    power_offset: f64,

    /// Touchstone file describing the fixture
    #[arg(long)]
    deembed_file: Option<PathBuf>,
}

impl From<MeasureArgs> for MeasurementRequest {
    fn from(args: MeasureArgs) -> Self {
        Self {
            resource_name: args.resource,
            frequency_hz: args.frequency,
            aperture_time_sec: args.aperture,
            auto_averaging: args.auto_averaging,
            averaging_count: args.averaging_count,
            power_offset_db: args.power_offset,
            deembed_file_path: args
                .deembed_file
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        }
    }
}

fn log_level(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(log_level(args.verbose))
        .with_target(false)
        .init();

    let config = match &args.config {
        Some(path) => ServiceConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ServiceConfig::default(),
    };

    match args.command {
        Command::Serve { bind } => cmd_serve(config, bind).await,
        Command::Measure(measure) => cmd_measure(measure.into()).await,
        Command::Schema => {
            let schema = measurement_schema(&config);
            println!("{}", serde_json::to_string_pretty(&schema)?);
            Ok(())
        }
        Command::InitConfig { path } => {
            config
                .save_to_file(&path)
                .with_context(|| format!("Failed to write config to {}", path.display()))?;
            println!("Wrote {}", path.display());
            Ok(())
        }
    }
}

async fn cmd_serve(mut config: ServiceConfig, bind: Option<SocketAddr>) -> Result<()> {
    if let Some(bind) = bind {
        config.bind_address = bind;
    }

    let listener = tokio::net::TcpListener::bind(config.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address))?;

    info!("{} v{}", config.display_name, config.version);
    let state = AppState::new(MeasurementOrchestrator::new(), measurement_schema(&config));

    server::serve(listener, state, async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutting down");
    })
    .await
    .context("HTTP server failed")
}

async fn cmd_measure(request: MeasurementRequest) -> Result<()> {
    let result = tokio::task::spawn_blocking(move || {
        MeasurementOrchestrator::new().measure(&request)
    })
    .await
    .context("Measurement task panicked")?;

    match result {
        Ok(result) => {
            println!("{:.3} dBm", result.power_dbm);
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!("Measurement aborted ({}): {}", e.abort_code(), e)),
    }
}
