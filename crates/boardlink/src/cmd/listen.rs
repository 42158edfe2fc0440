use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use boardlink_session::{BoardEvent, SessionConfig, SessionRegistry};
use boardlink_transport::{DatagramConfig, DatagramTransport};

use crate::cmd::{local_ip, parse_duration, ListenArgs};
use crate::exit::{transport_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_event, OutputFormat};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let scan_interval = parse_duration(&args.scan_interval)?;
    let liveness_window = parse_duration(&args.liveness)?;

    let transport = Arc::new(
        DatagramTransport::bind(DatagramConfig {
            listen_port: args.listen_port,
            send_port: args.port,
            ignore_source: local_ip(),
        })
        .map_err(|err| transport_error("bind failed", err))?,
    );

    let (mut registry, events) = SessionRegistry::new(SessionConfig { liveness_window });
    registry.add_datagram_transport(transport);

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut printed = 0usize;
    let mut next_scan = Instant::now();

    while running.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now >= next_scan {
            registry.scan();
            next_scan = now + scan_interval;
        }
        registry.poll_transports(now);
        registry.expire(now);

        while let Ok(event) = events.try_recv() {
            print_event(&event, format);
            if matches!(event, BoardEvent::Message { .. }) {
                printed = printed.saturating_add(1);
                if let Some(count) = args.count {
                    if printed >= count {
                        registry.shutdown();
                        return Ok(SUCCESS);
                    }
                }
            }
        }

        std::thread::sleep(POLL_INTERVAL);
    }

    registry.shutdown();
    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
