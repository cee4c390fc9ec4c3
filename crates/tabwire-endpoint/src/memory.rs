use tabwire_transport::memory_pair;
use tracing::debug;

use crate::config::EndpointConfig;
use crate::endpoint::{Endpoint, EndpointRole};

/// Create a connected `(server, client)` endpoint pair inside this process.
///
/// No socket is involved. Frames, capacity checks, errors and the close
/// lifecycle behave exactly as over TCP, so the pair can stand in for a
/// real connection in tests and single-process pipelines. Each side may be
/// moved to its own thread.
pub fn create_memory_pair() -> (Endpoint, Endpoint) {
    create_memory_pair_with_config(EndpointConfig::default())
}

/// Create an in-process endpoint pair with explicit configuration.
///
/// The read timeout and maximum payload size apply. Writes never block, so
/// the write timeout has no effect.
pub fn create_memory_pair_with_config(config: EndpointConfig) -> (Endpoint, Endpoint) {
    let (server_side, client_side) = memory_pair();
    debug!("memory endpoint pair created");
    (
        Endpoint::from_memory(server_side, EndpointRole::Accepted, config.clone()),
        Endpoint::from_memory(client_side, EndpointRole::Client, config),
    )
}
