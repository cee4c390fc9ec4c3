use std::net::SocketAddr;

use tabwire_transport::TcpTransport;
use tracing::debug;

use crate::config::EndpointConfig;
use crate::endpoint::{Endpoint, EndpointRole};
use crate::error::{EndpointError, Result};

/// A bound, listening server socket that accepts exactly one peer.
pub struct ServerListener {
    transport: TcpTransport,
    config: EndpointConfig,
}

impl ServerListener {
    /// Bind and listen on `addr`. Port 0 picks an ephemeral port.
    pub fn bind(addr: &str) -> Result<Self> {
        let transport = TcpTransport::bind(addr).map_err(EndpointError::ConnectionFailed)?;
        Ok(Self {
            transport,
            config: EndpointConfig::default(),
        })
    }

    /// Override the configuration handed to the accepted endpoint.
    pub fn with_config(mut self, config: EndpointConfig) -> Self {
        self.config = config;
        self
    }

    /// Bound address.
    pub fn local_addr(&self) -> SocketAddr {
        self.transport.local_addr()
    }

    /// Block until one peer connects and return its endpoint.
    ///
    /// The listening socket is closed once the peer is accepted.
    pub fn accept(self) -> Result<Endpoint> {
        let stream = self
            .transport
            .accept()
            .map_err(EndpointError::ConnectionFailed)?;
        debug!(addr = %self.transport.local_addr(), "listener done after single accept");
        Endpoint::from_stream(stream, EndpointRole::Accepted, self.config)
    }
}

impl std::fmt::Debug for ServerListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerListener")
            .field("local_addr", &self.transport.local_addr())
            .finish()
    }
}

/// Bind `addr`, wait for one peer, and return the accepted endpoint.
pub fn create_server(addr: &str) -> Result<Endpoint> {
    create_server_with_config(addr, EndpointConfig::default())
}

/// [`create_server`] with explicit configuration.
pub fn create_server_with_config(addr: &str, config: EndpointConfig) -> Result<Endpoint> {
    ServerListener::bind(addr)?.with_config(config).accept()
}
