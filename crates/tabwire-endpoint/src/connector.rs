use tabwire_transport::TcpTransport;

use crate::config::EndpointConfig;
use crate::endpoint::{Endpoint, EndpointRole};
use crate::error::{EndpointError, Result};

/// Connect to a server with default configuration.
///
/// `addr` may be `host:port`, a bare IP address or a bare host name; a
/// missing port means [`crate::DEFAULT_PORT`].
pub fn create_client(addr: &str) -> Result<Endpoint> {
    create_client_with_config(addr, EndpointConfig::default())
}

/// Connect with explicit configuration.
pub fn create_client_with_config(addr: &str, config: EndpointConfig) -> Result<Endpoint> {
    let stream = TcpTransport::connect(addr, config.connect_timeout)
        .map_err(EndpointError::ConnectionFailed)?;
    Endpoint::from_stream(stream, EndpointRole::Client, config)
}
