//! Blocking TCP transport for tabwire.
//!
//! This is the lowest layer of tabwire. It binds, accepts and connects
//! stream sockets and hands out [`NetStream`], an owned socket handle that
//! implements `Read + Write`. Everything else builds on top of it.
//!
//! [`memory_pair`] provides the same byte-stream contract inside one
//! process, without sockets.

pub mod error;
pub mod memory;
pub mod stream;
pub mod tcp;

pub use error::{Result, TransportError};
pub use memory::{memory_pair, MemoryReader, MemoryStream, MemoryWriter};
pub use stream::NetStream;
pub use tcp::{resolve_server_address, TcpTransport, DEFAULT_BIND_ADDR, DEFAULT_PORT};
