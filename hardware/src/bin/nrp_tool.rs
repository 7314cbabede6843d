//! CLI tool for R&S NRP power sensors on the LAN.
//!
//! Subcommands:
//! - `info`: Identification, status registers and pending errors
//! - `repl`: Interactive SCPI console
//! - `errors`: Drain and print the error queue

use std::io::{self, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hardware::rs::{NrpSensor, OperationStatus, SensorFunction};
use hardware::scpi::{OpenOptions, ScpiDevice};
use strum::IntoEnumIterator;
use tracing::info;

/// Default sensor resource
const DEFAULT_RESOURCE: &str = "TCPIP0::192.168.1.50::5025::SOCKET";

/// R&S NRP Power Sensor Tool
#[derive(Parser, Debug)]
#[command(name = "nrp_tool")]
#[command(about = "Query and control R&S NRP power sensors over SCPI")]
#[command(version)]
struct Args {
    /// VISA resource name or host[:port] of the sensor
    #[arg(long, global = true, default_value = DEFAULT_RESOURCE)]
    resource: String,

    /// Per-command timeout in milliseconds
    #[arg(long, global = true, default_value = "3000")]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Query identification and status registers
    Info,

    /// Drain the instrument error queue
    Errors,

    /// Interactive SCPI REPL
    Repl {
        /// Check the status byte after every command
        #[arg(long)]
        check: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let timeout = Duration::from_millis(args.timeout_ms);

    match args.command {
        Command::Info => cmd_info(&args.resource, timeout),
        Command::Errors => cmd_errors(&args.resource, timeout),
        Command::Repl { check } => cmd_repl(&args.resource, timeout, check),
    }
}

fn open_device(resource: &str, timeout: Duration) -> Result<ScpiDevice> {
    info!("Connecting to {}...", resource);
    let mut device = ScpiDevice::open(resource, OpenOptions::id_query_only())
        .with_context(|| format!("Failed to open {resource}"))?;
    device.set_timeout(timeout);
    Ok(device)
}

// ==================== Info Command ====================

fn cmd_info(resource: &str, timeout: Duration) -> Result<()> {
    let mut device = open_device(resource, timeout)?;
    device.set_status_checking(false);

    info!("Endpoint: {}", device.endpoint());
    info!("Identification: {}", device.idn().unwrap_or("<not queried>"));

    let stb = device.read_status_byte()?;
    info!("Status byte: {:#04x} ({:?})", stb.bits(), stb);

    let mut sensor = NrpSensor::new(&mut device);
    let oper = sensor.operation_condition()?;
    let active: Vec<String> = OperationStatus::all()
        .iter_names()
        .filter(|(_, flag)| oper.contains(*flag))
        .map(|(name, _)| name.to_string())
        .collect();
    info!("Operation condition: {} {:?}", oper.bits(), active);

    let functions: Vec<String> = SensorFunction::iter().map(|f| f.to_string()).collect();
    info!("Supported functions: {}", functions.join(", "));

    let errors = device.read_error_queue()?;
    if errors.is_empty() {
        info!("Error queue: empty");
    } else {
        for entry in &errors {
            info!("Error queue: {}", entry);
        }
    }

    device.close()?;
    Ok(())
}

// ==================== Errors Command ====================

fn cmd_errors(resource: &str, timeout: Duration) -> Result<()> {
    let mut device = open_device(resource, timeout)?;
    let errors = device.read_error_queue()?;

    if errors.is_empty() {
        println!("0,\"No error\"");
    }
    for entry in &errors {
        println!("{entry}");
    }

    device.close()?;
    Ok(())
}

// ==================== REPL Command ====================

fn cmd_repl(resource: &str, timeout: Duration, check: bool) -> Result<()> {
    let mut device = open_device(resource, timeout)?;
    device.set_status_checking(check);

    println!("Connected: {}", device.idn().unwrap_or("<unknown>"));
    println!();
    println!("SCPI REPL - Enter commands (queries end with '?'), 'quit' to exit");
    println!("Examples: *IDN?, SENS:FREQ 1e9, INIT:IMM, STAT:OPER:COND?, FETCH?");
    println!();

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if stdin.read_line(&mut input)? == 0 {
            break; // EOF
        }

        let cmd = input.trim();
        if cmd.is_empty() {
            continue;
        }

        if cmd.eq_ignore_ascii_case("quit") || cmd.eq_ignore_ascii_case("exit") {
            println!("Bye!");
            break;
        }

        if cmd.ends_with('?') {
            match device.query(cmd) {
                Ok(response) => println!("{response}"),
                Err(e) => println!("Error: {e}"),
            }
        } else {
            match device.write(cmd) {
                Ok(()) => println!("OK"),
                Err(e) => println!("Error: {e}"),
            }
        }
    }

    device.close()?;
    Ok(())
}
