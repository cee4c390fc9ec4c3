use std::net::{IpAddr, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::stream::NetStream;

/// Well-known port used when an address does not name one.
pub const DEFAULT_PORT: u16 = 10000;

/// Well-known address a server binds when the caller does not choose one.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:10000";

/// TCP listening socket.
///
/// Provides bind/accept/connect over IPv4 and IPv6 stream sockets.
pub struct TcpTransport {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl TcpTransport {
    /// Bind and listen on `addr`.
    ///
    /// Binding port 0 picks an ephemeral port; see [`TcpTransport::local_addr`].
    pub fn bind(addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(addr).map_err(|e| TransportError::Bind {
            addr: addr.to_string(),
            source: e,
        })?;
        let local_addr = listener.local_addr().map_err(|e| TransportError::Bind {
            addr: addr.to_string(),
            source: e,
        })?;

        info!(%local_addr, "listening on tcp socket");

        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Accept an incoming connection (blocking).
    pub fn accept(&self) -> Result<NetStream> {
        let (stream, peer) = self.listener.accept().map_err(TransportError::Accept)?;
        debug!(%peer, "accepted connection");
        Ok(NetStream::from_tcp(stream))
    }

    /// Connect to a listening socket (blocking).
    ///
    /// `addr` goes through [`resolve_server_address`] first, so a bare host
    /// connects to [`DEFAULT_PORT`]. Every resolved address is tried in order;
    /// the last failure is reported.
    pub fn connect(addr: &str, timeout: Option<Duration>) -> Result<NetStream> {
        let target = resolve_server_address(addr);
        let candidates: Vec<SocketAddr> = target
            .to_socket_addrs()
            .map_err(|e| TransportError::Resolve {
                addr: target.clone(),
                source: e,
            })?
            .collect();

        let mut last_err = std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "address resolved to no socket addresses",
        );
        for candidate in candidates {
            let attempt = match timeout {
                Some(timeout) => TcpStream::connect_timeout(&candidate, timeout),
                None => TcpStream::connect(candidate),
            };
            match attempt {
                Ok(stream) => {
                    debug!(%candidate, "connected to tcp socket");
                    return Ok(NetStream::from_tcp(stream));
                }
                Err(err) => {
                    debug!(%candidate, error = %err, "connect attempt failed");
                    last_err = err;
                }
            }
        }

        Err(TransportError::Connect {
            addr: target,
            source: last_err,
        })
    }

    /// The address this socket is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        "tcp"
    }
}

/// Append [`DEFAULT_PORT`] to an address that does not carry a port.
///
/// Accepts `ip:port`, `[v6]:port`, bare IPv4/IPv6 addresses, `host:port`
/// and bare host names.
pub fn resolve_server_address(addr: &str) -> String {
    let addr = addr.trim();
    if addr.parse::<SocketAddr>().is_ok() {
        return addr.to_string();
    }
    if let Ok(ip) = addr.parse::<IpAddr>() {
        return SocketAddr::new(ip, DEFAULT_PORT).to_string();
    }
    if let Some((host, port)) = addr.rsplit_once(':') {
        if !host.is_empty() && port.parse::<u16>().is_ok() {
            return addr.to_string();
        }
    }
    format!("{addr}:{DEFAULT_PORT}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    #[test]
    fn test_bind_accept_connect() {
        let listener = TcpTransport::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().to_string();

        let handle = std::thread::spawn(move || {
            let mut client = TcpTransport::connect(&addr, None).unwrap();
            client.write_all(b"hello").unwrap();
        });

        let mut server = listener.accept().unwrap();
        let mut buf = [0u8; 5];
        server.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hello");

        handle.join().unwrap();
    }

    #[test]
    fn test_bind_reports_address_in_use() {
        let first = TcpTransport::bind("127.0.0.1:0").unwrap();
        let taken = first.local_addr().to_string();

        let result = TcpTransport::bind(&taken);
        assert!(matches!(result, Err(TransportError::Bind { .. })));
    }

    #[test]
    fn test_connect_refused() {
        let addr = {
            let listener = TcpTransport::bind("127.0.0.1:0").unwrap();
            listener.local_addr().to_string()
        };

        let result = TcpTransport::connect(&addr, Some(Duration::from_secs(2)));
        assert!(matches!(result, Err(TransportError::Connect { .. })));
    }

    #[test]
    fn test_connect_unresolvable_host() {
        let result = TcpTransport::connect("no-such-host.invalid:1", None);
        let err = result.unwrap_err();
        assert!(err.is_establish());
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let listener = TcpTransport::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().to_string();

        let client = std::thread::spawn(move || TcpTransport::connect(&addr, None).unwrap());
        let server = listener.accept().unwrap();
        let _client = client.join().unwrap();

        server.shutdown().unwrap();
        server.shutdown().unwrap();
    }

    #[test]
    fn test_resolve_server_address() {
        assert_eq!(resolve_server_address("127.0.0.1:4000"), "127.0.0.1:4000");
        assert_eq!(resolve_server_address("127.0.0.1"), "127.0.0.1:10000");
        assert_eq!(resolve_server_address("::1"), "[::1]:10000");
        assert_eq!(resolve_server_address("[::1]:4000"), "[::1]:4000");
        assert_eq!(resolve_server_address("localhost"), "localhost:10000");
        assert_eq!(resolve_server_address("localhost:4000"), "localhost:4000");
    }
}
