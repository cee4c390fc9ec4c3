//! Async echo server using the same framing over tokio.
//!
//! Run with:
//!   cargo run --example async-echo --features async
//!
//! Any tabwire client can talk to it, e.g.:
//!   cargo run --features cli -- send 127.0.0.1 --data hello --wait

use futures_util::{SinkExt, StreamExt};
use tabwire::frame::TabwireCodec;
use tabwire::transport::DEFAULT_BIND_ADDR;
use tokio::net::TcpListener;
use tokio_util::codec::Framed;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind(DEFAULT_BIND_ADDR).await?;
    eprintln!("Listening on {}", listener.local_addr()?);

    loop {
        let (stream, peer) = listener.accept().await?;
        eprintln!("Client connected: {peer}");

        tokio::spawn(async move {
            let mut framed = Framed::new(stream, TabwireCodec::new());
            while let Some(next) = framed.next().await {
                match next {
                    Ok(frame) => {
                        if let Err(e) = framed.send(frame).await {
                            eprintln!("{peer}: echo failed: {e}");
                            break;
                        }
                    }
                    Err(e) => {
                        eprintln!("{peer}: {e}");
                        break;
                    }
                }
            }
            eprintln!("Client disconnected: {peer}");
        });
    }
}
