//! Point-to-point endpoints for tabwire.
//!
//! This is the "just works" layer. A server binds, accepts exactly one
//! peer and hands back an [`Endpoint`]; a client connects and gets the same
//! type. Both sides then send and receive whole byte buffers or matrices
//! with blocking calls until one of them closes.
//!
//! [`create_memory_pair`] returns the same pair of endpoints connected
//! in-process, without sockets.
//!
//! ```no_run
//! use tabwire_endpoint::{create_client, create_server};
//!
//! # fn main() -> tabwire_endpoint::Result<()> {
//! let server = std::thread::spawn(|| -> tabwire_endpoint::Result<()> {
//!     let mut endpoint = create_server("127.0.0.1:10000")?;
//!     let mut buf = [0u8; 64];
//!     let n = endpoint.receive_bytes(&mut buf)?;
//!     endpoint.send_bytes(&buf[..n])?;
//!     endpoint.close()
//! });
//!
//! let mut client = create_client("127.0.0.1")?;
//! client.send_bytes(b"Hello")?;
//! let echoed = client.recv_bytes()?;
//! assert_eq!(echoed.as_ref(), b"Hello");
//! client.close()?;
//! # let _ = server.join();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connector;
pub mod endpoint;
pub mod error;
pub mod listener;
pub mod memory;

pub use config::EndpointConfig;
pub use connector::{create_client, create_client_with_config};
pub use endpoint::{Endpoint, EndpointAddr, EndpointRole, EndpointState};
pub use error::{EndpointError, Result};
pub use listener::{create_server, create_server_with_config, ServerListener};
pub use memory::{create_memory_pair, create_memory_pair_with_config};
pub use tabwire_transport::{DEFAULT_BIND_ADDR, DEFAULT_PORT};
