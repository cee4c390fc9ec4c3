use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use tabwire_endpoint::DEFAULT_BIND_ADDR;
use tabwire_frame::DEFAULT_MAX_PAYLOAD;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod demo;
pub mod send;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Accept one client and echo every frame it sends.
    Serve(ServeArgs),
    /// Send a single frame.
    Send(SendArgs),
    /// Run the hello + matrix echo exchange in-process.
    Demo(DemoArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Demo(args) => demo::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to bind.
    #[arg(env = "TABWIRE_ADDR", default_value = DEFAULT_BIND_ADDR)]
    pub addr: String,
    /// Exit after handling N frames.
    #[arg(long)]
    pub count: Option<usize>,
    /// Largest accepted frame payload in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_PAYLOAD)]
    pub max_payload: usize,
    /// Print received frames without echoing them.
    #[arg(long)]
    pub no_echo: bool,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Server address. A missing port means the default port.
    #[arg(env = "TABWIRE_ADDR", default_value = DEFAULT_BIND_ADDR)]
    pub addr: String,
    /// Raw string payload.
    #[arg(long, conflicts_with_all = ["file", "matrix"])]
    pub data: Option<String>,
    /// Read raw payload from file.
    #[arg(long, conflicts_with_all = ["data", "matrix"])]
    pub file: Option<PathBuf>,
    /// Matrix payload as JSON rows, e.g. '[[1,2,3],[4,5,6]]'.
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub matrix: Option<String>,
    /// Wait for one response frame and print it.
    #[arg(long)]
    pub wait: bool,
    /// Maximum time to wait for the response when --wait is set (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub wait_timeout: String,
    /// Connect timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub connect_timeout: String,
}

#[derive(Args, Debug)]
pub struct DemoArgs {
    /// Address the in-process server binds. Port 0 picks a free port.
    #[arg(long, default_value = "127.0.0.1:0")]
    pub addr: String,
    /// Run over an in-process endpoint pair instead of loopback TCP.
    #[arg(long, conflicts_with = "addr")]
    pub memory: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}
