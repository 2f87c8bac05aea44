//! Sage2 Boiler CLI
//!
//! A command-line interface (CLI) application for reading Sage2 boiler
//! controllers using Modbus RTU (serial) or Modbus TCP.
//!
//! This tool allows users to:
//! - Print a table of the summary (or all) readings.
//! - Print a single reading by key or title.
//! - Run in a continuous daemon mode, printing readings as text lines or JSON.
//!
//! The CLI leverages the `sage2_lib` crate for register decoding and caching.

use anyhow::{Context, Result};
use clap::Parser;
use flexi_logger::{Logger, LoggerHandle};
use log::*;
use sage2_lib::{
    boiler::Boiler,
    config::{BoilerConfig, Connection},
    tokio_sync,
};
use std::panic;
use std::time::Duration;
use tokio_modbus::client::sync::Context as ModbusContext;

mod commandline;

fn logging_init(loglevel: LevelFilter) -> LoggerHandle {
    let log_handle = Logger::try_with_env_or_str(loglevel.as_str())
        .expect("Cannot init logging")
        .start()
        .expect("Cannot start logging");

    panic::set_hook(Box::new(|panic_info| {
        let (filename, line, column) = panic_info
            .location()
            .map(|loc| (loc.file(), loc.line(), loc.column()))
            .unwrap_or(("<unknown_file>", 0, 0));

        let cause_str = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            *s
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.as_str()
        } else {
            "<unknown_panic_cause>"
        };

        error!(
            target: "panic",
            "Thread '{}' panicked at '{}': {}:{} - Cause: {}",
            std::thread::current().name().unwrap_or("<unnamed>"),
            filename,
            line,
            column,
            cause_str
        );
    }));
    log_handle
}

/// Creates the boiler based on the provided command-line arguments.
fn create_boiler(args: &commandline::CliArgs) -> Result<Boiler<ModbusContext>> {
    let (ctx, cache_ttl) = match &args.connection {
        commandline::CliConnection::Tcp { address, slave, .. } => (
            tokio_sync::connect_tcp(address, *slave, args.timeout)
                .with_context(|| format!("Failed to connect to Modbus TCP device at {address}"))?,
            args.cache_ttl,
        ),
        commandline::CliConnection::Rtu { device, slave, .. } => (
            tokio_sync::connect_rtu(device, *slave, args.timeout)
                .with_context(|| format!("Cannot open serial port {device}"))?,
            args.cache_ttl,
        ),
        commandline::CliConnection::Config { file, .. } => {
            let config = BoilerConfig::load(file)
                .with_context(|| format!("Cannot load configuration {}", file.display()))?;
            let ctx = match config.connection()? {
                Connection::Tcp { host, port } => {
                    let address = format!("{host}:{port}");
                    tokio_sync::connect_tcp(&address, config.slave, config.timeout).with_context(
                        || format!("Failed to connect to Modbus TCP device at {address}"),
                    )?
                }
                Connection::Serial { device } => {
                    tokio_sync::connect_rtu(device, config.slave, config.timeout)
                        .with_context(|| format!("Cannot open serial port {device}"))?
                }
            };
            (ctx, config.cache_ttl)
        }
    };
    debug!("Register dumps are reused for {cache_ttl:?}");
    Ok(Boiler::with_cache_ttl(ctx, cache_ttl))
}

fn print_poll(
    boiler: &Boiler<ModbusContext>,
    all: bool,
    output: commandline::DaemonOutput,
) -> Result<()> {
    let samples = boiler.snapshot(!all).context("Cannot read boiler")?;
    match output {
        commandline::DaemonOutput::Console => {
            for sample in &samples {
                println!("{sample}");
            }
            println!();
        }
        commandline::DaemonOutput::Json => {
            println!("{}", serde_json::to_string(&samples)?);
        }
    }
    Ok(())
}

fn run_daemon(
    boiler: &Boiler<ModbusContext>,
    poll_interval: Duration,
    all: bool,
    output: commandline::DaemonOutput,
) -> ! {
    info!("Starting daemon mode: output={output:?}, interval={poll_interval:?}");
    loop {
        debug!("Daemon: Reading boiler...");
        if let Err(error) = print_poll(boiler, all, output) {
            error!("Poll failed: {error:#}");
        }
        std::thread::sleep(poll_interval);
    }
}

fn main() -> Result<()> {
    let args = commandline::CliArgs::parse();

    let _log_handle = logging_init(args.verbose.log_level_filter());
    info!(
        "Sage2 CLI started. Log level: {}",
        args.verbose.log_level_filter()
    );

    let boiler = create_boiler(&args)?;

    match args.connection.command() {
        commandline::CliCommands::Show { all } => {
            info!("Executing: Show readings (all={all})");
            let table = boiler
                .tabulate(!all)
                .with_context(|| "Cannot read readings")?;
            println!("{table}");
        }
        commandline::CliCommands::Get { name } => {
            info!("Executing: Get {name}");
            let line = boiler
                .by_name(name)?
                .format()
                .with_context(|| format!("Cannot read {name}"))?;
            println!("{line}");
        }
        commandline::CliCommands::Daemon {
            poll_interval,
            all,
            output,
        } => run_daemon(&boiler, *poll_interval, *all, *output),
    }

    Ok(())
}
