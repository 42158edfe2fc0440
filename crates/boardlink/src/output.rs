use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

use boardlink_session::{BoardEvent, BoardSession, NetworkConfig};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct BoardOutput<'a> {
    key: &'a str,
    name: Option<&'a str>,
    serial_number: Option<i32>,
    ip_address: Option<&'a str>,
    firmware_version: Option<&'a str>,
    free_memory: Option<i32>,
    network: &'a NetworkConfig,
}

impl<'a> BoardOutput<'a> {
    fn from_session(session: &'a BoardSession) -> Self {
        let identity = session.identity();
        Self {
            key: session.key(),
            name: identity.name.as_deref(),
            serial_number: identity.serial_number,
            ip_address: identity.ip_address.as_deref(),
            firmware_version: identity.firmware_version.as_deref(),
            free_memory: identity.free_memory,
            network: &identity.network,
        }
    }
}

pub fn print_boards<'a>(
    sessions: impl Iterator<Item = &'a BoardSession>,
    format: OutputFormat,
) {
    let boards: Vec<BoardOutput<'_>> = sessions.map(BoardOutput::from_session).collect();
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&boards).unwrap_or_else(|_| "[]".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["BOARD", "NAME", "SERIAL", "FIRMWARE", "IP", "FREE"]);
            for board in &boards {
                table.add_row(vec![
                    board.key.to_string(),
                    board.name.unwrap_or("-").to_string(),
                    board
                        .serial_number
                        .map_or_else(|| "-".to_string(), |v| v.to_string()),
                    board.firmware_version.unwrap_or("-").to_string(),
                    board.ip_address.unwrap_or("-").to_string(),
                    board
                        .free_memory
                        .map_or_else(|| "-".to_string(), |v| v.to_string()),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for board in &boards {
                println!(
                    "{} name={} serial={} firmware={} ip={}",
                    board.key,
                    board.name.unwrap_or("-"),
                    board
                        .serial_number
                        .map_or_else(|| "-".to_string(), |v| v.to_string()),
                    board.firmware_version.unwrap_or("-"),
                    board.ip_address.unwrap_or("-"),
                );
            }
        }
    }
}

#[derive(Serialize)]
struct EventOutput<'a> {
    event: &'a str,
    board: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    timestamp: u64,
}

pub fn print_event(event: &BoardEvent, format: OutputFormat) {
    let (kind, message) = match event {
        BoardEvent::Added { .. } => ("added", None),
        BoardEvent::Removed { .. } => ("removed", None),
        BoardEvent::InfoChanged { .. } => ("info-changed", None),
        BoardEvent::Message { message, .. } => ("message", Some(message.to_string())),
    };

    match format {
        OutputFormat::Json => {
            let out = EventOutput {
                event: kind,
                board: event.key(),
                message,
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => match message {
            Some(message) => println!("{} {}: {}", event.key(), kind, message),
            None => println!("{} {}", event.key(), kind),
        },
    }
}

fn now_unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
