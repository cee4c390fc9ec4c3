use std::time::Duration;

use tabwire_frame::{FrameConfig, DEFAULT_MAX_PAYLOAD};

/// Endpoint behavior configuration.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    /// Ceiling for frames received through the owned `recv_*` calls.
    /// Default: 16 MiB.
    pub max_payload_size: usize,
    /// Read timeout applied to the socket. `None` blocks indefinitely.
    pub read_timeout: Option<Duration>,
    /// Write timeout applied to the socket.
    pub write_timeout: Option<Duration>,
    /// Connect timeout for client endpoints.
    pub connect_timeout: Option<Duration>,
    /// Disable Nagle's algorithm. Default: true.
    pub nodelay: bool,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            read_timeout: None,
            write_timeout: None,
            connect_timeout: None,
            nodelay: true,
        }
    }
}

impl EndpointConfig {
    pub fn with_max_payload_size(mut self, max_payload_size: usize) -> Self {
        self.max_payload_size = max_payload_size;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_write_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.write_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }

    pub(crate) fn frame_config(&self) -> FrameConfig {
        FrameConfig {
            max_payload_size: self.max_payload_size,
            read_timeout: self.read_timeout,
            write_timeout: self.write_timeout,
        }
    }
}
