use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use std::time::{Duration, Instant};

use boardlink_session::{
    BoardEvent, Outgoing, SessionConfig, SessionRegistry, SessionTransport,
};
use boardlink_transport::{DatagramConfig, DatagramTransport, DISCOVERY_PORT};

use crate::cmd::{parse_duration, SendArgs};
use crate::exit::{session_error, transport_error, CliError, CliResult, SUCCESS, TIMEOUT, USAGE};
use crate::output::{print_event, OutputFormat};

const POLL_INTERVAL: Duration = Duration::from_millis(5);

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let wait_timeout = parse_duration(&args.wait_timeout)?;
    let peer = resolve_board(&args.board)?;

    let transport = Arc::new(
        DatagramTransport::bind(DatagramConfig {
            listen_port: 0,
            send_port: peer.port(),
            ignore_source: None,
        })
        .map_err(|err| transport_error("bind failed", err))?,
    );

    let (mut registry, events) = SessionRegistry::new(SessionConfig::default());
    registry.add_datagram_transport(Arc::clone(&transport));

    let key = peer.ip().to_string();
    registry.upsert(
        key.clone(),
        SessionTransport::Datagram {
            socket: transport,
            peer,
        },
        Instant::now(),
    );
    // Drain the Added event; only board responses get printed below.
    let _ = events.try_recv();

    registry
        .send_message(&key, Outgoing::Raw(args.command.clone()))
        .map_err(|err| session_error("send failed", err))?;

    if !args.wait {
        return Ok(SUCCESS);
    }

    let deadline = Instant::now() + wait_timeout;
    while Instant::now() < deadline {
        registry.poll_transports(Instant::now());
        while let Ok(event) = events.try_recv() {
            if matches!(event, BoardEvent::Message { .. }) {
                print_event(&event, format);
                return Ok(SUCCESS);
            }
        }
        std::thread::sleep(POLL_INTERVAL);
    }

    Err(CliError::new(
        TIMEOUT,
        format!("no response from {} within {}", args.board, args.wait_timeout),
    ))
}

fn resolve_board(board: &str) -> CliResult<SocketAddr> {
    let candidate = if board.contains(':') {
        board.to_string()
    } else {
        format!("{board}:{DISCOVERY_PORT}")
    };
    candidate
        .to_socket_addrs()
        .map_err(|err| CliError::new(USAGE, format!("cannot resolve {board:?}: {err}")))?
        .next()
        .ok_or_else(|| CliError::new(USAGE, format!("cannot resolve {board:?}")))
}
