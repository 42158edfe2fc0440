use clap::{Args, Subcommand};
use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use std::time::Duration;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod listen;
pub mod scan;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Broadcast discovery probes and list the boards that answer.
    Scan(ScanArgs),
    /// Run the session loop and print board events.
    Listen(ListenArgs),
    /// Send one text command to a board over UDP.
    Send(SendArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Scan(args) => scan::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// How long to collect responses (e.g. 2s, 500ms).
    #[arg(long, default_value = "2s")]
    pub duration: String,
    /// Local UDP port to listen on (0 = ephemeral).
    #[arg(long, default_value_t = 0)]
    pub listen_port: u16,
    /// UDP port boards receive on.
    #[arg(long, default_value_t = boardlink_transport::DISCOVERY_PORT)]
    pub port: u16,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Local UDP port to listen on.
    #[arg(long, default_value_t = boardlink_transport::DISCOVERY_PORT)]
    pub listen_port: u16,
    /// UDP port boards receive on.
    #[arg(long, default_value_t = boardlink_transport::DISCOVERY_PORT)]
    pub port: u16,
    /// Interval between discovery scans (e.g. 1s).
    #[arg(long, default_value = "1s")]
    pub scan_interval: String,
    /// Drop boards silent for this long (e.g. 10s).
    #[arg(long, default_value = "10s")]
    pub liveness: String,
    /// Exit after printing N message events.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Board address: HOST or HOST:PORT.
    pub board: String,
    /// Text command, e.g. "/led/0/state 1".
    pub command: String,
    /// Wait for one response message and print it.
    #[arg(long)]
    pub wait: bool,
    /// Maximum time to wait when --wait is set (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub wait_timeout: String,
}

#[derive(Args, Debug, Default)]
pub struct VersionArgs {}

/// Best-effort local address, used to drop the host's own broadcast echo.
///
/// Connecting a UDP socket only performs a route lookup; no packet is
/// sent. A machine with no route simply gets no filter.
pub fn local_ip() -> Option<IpAddr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).ok()?;
    socket.connect(("10.255.255.255", 1)).ok()?;
    socket.local_addr().ok().map(|addr| addr.ip())
}

/// Parse `2s` / `500ms` style durations.
pub fn parse_duration(text: &str) -> CliResult<Duration> {
    let parse = |digits: &str, unit: fn(u64) -> Duration| {
        digits
            .parse::<u64>()
            .map(unit)
            .map_err(|_| CliError::new(USAGE, format!("invalid duration: {text:?}")))
    };
    if let Some(digits) = text.strip_suffix("ms") {
        parse(digits, Duration::from_millis)
    } else if let Some(digits) = text.strip_suffix('s') {
        parse(digits, Duration::from_secs)
    } else {
        parse(text, Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("7").unwrap(), Duration::from_secs(7));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_duration("fast").is_err());
        assert!(parse_duration("1.5s").is_err());
    }
}
