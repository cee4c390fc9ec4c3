use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tabwire_endpoint::{EndpointConfig, EndpointError, ServerListener};

use crate::cmd::ServeArgs;
use crate::exit::{endpoint_error, CliError, CliResult, INTERRUPTED, SUCCESS};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: ServeArgs, format: OutputFormat) -> CliResult<i32> {
    let config = EndpointConfig::default().with_max_payload_size(args.max_payload);
    let listener = ServerListener::bind(&args.addr)
        .map_err(|err| endpoint_error("bind failed", err))?
        .with_config(config);
    tracing::info!(addr = %listener.local_addr(), "waiting for one client");

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut endpoint = listener
        .accept()
        .map_err(|err| endpoint_error("accept failed", err))?;
    let peer = endpoint.peer_addr();
    tracing::info!(%peer, "client connected");

    let mut handled = 0usize;
    while running.load(Ordering::SeqCst) {
        let frame = match endpoint.recv_frame() {
            Ok(frame) => frame,
            Err(EndpointError::Disconnected) => {
                tracing::info!(%peer, "client disconnected");
                break;
            }
            Err(err) => return Err(endpoint_error("receive failed", err)),
        };

        print_frame(&frame, peer, format);

        if !args.no_echo {
            tracing::debug!(kind = %frame.kind(), size = frame.payload_len(), "echoing frame");
            endpoint
                .send_frame(&frame)
                .map_err(|err| endpoint_error("echo send failed", err))?;
        }

        handled = handled.saturating_add(1);
        if args.count.is_some_and(|count| handled >= count) {
            break;
        }
    }

    endpoint
        .close()
        .map_err(|err| endpoint_error("close failed", err))?;
    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        // A blocked accept or receive never re-checks the flag; a second
        // signal exits immediately.
        if !running.swap(false, Ordering::SeqCst) {
            std::process::exit(INTERRUPTED);
        }
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
