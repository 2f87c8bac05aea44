use clap::{Parser, Subcommand};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use sage2_lib::protocol as proto;
use std::path::PathBuf;
use std::time::Duration;

fn default_device_name() -> String {
    if cfg!(target_os = "windows") {
        String::from("COM1")
    } else {
        String::from("/dev/ttyUSB0")
    }
}

fn parse_slave(s: &str) -> Result<u8, String> {
    clap_num::maybe_hex::<u8>(s).map_err(|e| format!("Invalid slave id format: {e}"))
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum CliConnection {
    /// Connect to the boiler via Modbus TCP.
    Tcp {
        /// Host name or IP address of the controller or gateway, optionally with port.
        /// Example: "192.168.1.100" or "modbus-gateway.local:502".
        #[arg(verbatim_doc_comment)]
        address: String,

        /// The Modbus unit identifier, decimal or hexadecimal.
        #[arg(short, long, default_value_t = proto::DEFAULT_SLAVE, value_parser = parse_slave)]
        slave: u8,

        #[command(subcommand)]
        command: CliCommands,
    },
    /// Connect to the boiler via Modbus RTU (Serial, 38400 baud).
    Rtu {
        /// Serial port device name.
        /// Examples: "/dev/ttyUSB0" (Linux), "COM3" (Windows).
        #[arg(short, long, default_value_t = default_device_name(), verbatim_doc_comment)]
        device: String,

        /// The Modbus unit identifier, decimal or hexadecimal.
        #[arg(short, long, default_value_t = proto::DEFAULT_SLAVE, value_parser = parse_slave)]
        slave: u8,

        #[command(subcommand)]
        command: CliCommands,
    },
    /// Connect using the settings of a YAML configuration file.
    Config {
        /// Path of the configuration file.
        #[arg(short, long, default_value = "sage2.yml")]
        file: PathBuf,

        #[command(subcommand)]
        command: CliCommands,
    },
}

impl CliConnection {
    pub fn command(&self) -> &CliCommands {
        match self {
            CliConnection::Tcp { command, .. }
            | CliConnection::Rtu { command, .. }
            | CliConnection::Config { command, .. } => command,
        }
    }
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq)]
pub enum DaemonOutput {
    /// Print one "<title>: <value> <unit>" line per reading.
    Console,
    /// Print one JSON array of samples per poll.
    Json,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum CliCommands {
    /// Print a table of the readings.
    Show {
        /// Include every reading, not only the summary.
        #[arg(short, long)]
        all: bool,
    },

    /// Print a single reading, selected by key ("supply_sensor") or title ("Supply Sensor").
    Get { name: String },

    /// Run in daemon mode: continuously poll the readings at a specified interval.
    Daemon {
        /// Interval for polling the boiler (e.g., "10s", "1m")
        #[arg(value_parser = humantime::parse_duration, short, long, default_value = "10s")]
        poll_interval: Duration,

        /// Include every reading, not only the summary.
        #[arg(short, long)]
        all: bool,

        /// Specifies the output.
        #[command(subcommand)]
        output: DaemonOutput,
    },
}

const fn about_text() -> &'static str {
    "Sage2 boiler CLI - Read and decode Sage2 boiler controller registers via Modbus RTU/TCP."
}

#[derive(Parser, Debug)]
#[command(name="sage2", author, version, about=about_text(), long_about = None, propagate_version = true)]
pub struct CliArgs {
    /// Configure verbosity of logging output.
    /// -v for info, -vv for debug, -vvv for trace. Default is warnings only.
    #[command(flatten)]
    pub verbose: Verbosity<WarnLevel>,

    /// Specifies the connection method and the command to run.
    #[command(subcommand)]
    pub connection: CliConnection,

    /// Modbus I/O timeout for read operations.
    /// Examples: "1s", "500ms".
    #[arg(global = true, long, default_value = "1s", value_parser = humantime::parse_duration, verbatim_doc_comment)]
    pub timeout: Duration,

    /// How long one bulk register dump is reused before the device is read again.
    #[arg(global = true, long, default_value = "10s", value_parser = humantime::parse_duration)]
    pub cache_ttl: Duration,
}
