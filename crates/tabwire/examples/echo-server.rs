//! Minimal echo server: accepts one client and echoes its frames back.
//!
//! Run with:
//!   cargo run --example echo-server
//!
//! In another terminal:
//!   cargo run --features cli -- send 127.0.0.1 --matrix '[[1,2,3],[4,5,6]]' --wait

use tabwire::endpoint::{create_server, EndpointError, DEFAULT_BIND_ADDR};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("Listening on {DEFAULT_BIND_ADDR}");
    let mut endpoint = create_server(DEFAULT_BIND_ADDR)?;
    eprintln!("Client connected: {}", endpoint.peer_addr());

    loop {
        match endpoint.recv_frame() {
            Ok(frame) => {
                eprintln!("Received {} frame, {} bytes", frame.kind(), frame.payload_len());
                endpoint.send_frame(&frame)?;
            }
            Err(EndpointError::Disconnected) => {
                eprintln!("Client disconnected");
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }

    endpoint.close()?;
    Ok(())
}
