use std::sync::Arc;
use std::time::{Duration, Instant};

use boardlink_session::{SessionConfig, SessionRegistry};
use boardlink_transport::{DatagramConfig, DatagramTransport};

use crate::cmd::{local_ip, parse_duration, ScanArgs};
use crate::exit::{transport_error, CliResult, SUCCESS};
use crate::output::{print_boards, OutputFormat};

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const RESCAN_INTERVAL: Duration = Duration::from_millis(500);

pub fn run(args: ScanArgs, format: OutputFormat) -> CliResult<i32> {
    let duration = parse_duration(&args.duration)?;

    let transport = Arc::new(
        DatagramTransport::bind(DatagramConfig {
            listen_port: args.listen_port,
            send_port: args.port,
            ignore_source: local_ip(),
        })
        .map_err(|err| transport_error("bind failed", err))?,
    );

    let (mut registry, _events) = SessionRegistry::new(SessionConfig::default());
    registry.add_datagram_transport(transport);

    let deadline = Instant::now() + duration;
    let mut next_scan = Instant::now();
    while Instant::now() < deadline {
        if Instant::now() >= next_scan {
            registry.scan();
            next_scan = Instant::now() + RESCAN_INTERVAL;
        }
        registry.poll_transports(Instant::now());
        std::thread::sleep(POLL_INTERVAL);
    }

    print_boards(registry.iter(), format);
    Ok(SUCCESS)
}
