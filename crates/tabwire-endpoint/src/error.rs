use tabwire_frame::{FrameError, FrameKind};
use tabwire_transport::TransportError;

/// Errors reported by endpoint operations.
#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    /// Bind, accept or connect could not establish the endpoint.
    #[error("connection failed: {0}")]
    ConnectionFailed(#[source] TransportError),

    /// The peer closed the stream between frames, or reset it.
    #[error("peer disconnected")]
    Disconnected,

    /// The stream ended inside a frame.
    #[error("stream ended after {received} bytes of an incomplete frame")]
    Truncated {
        expected: Option<usize>,
        received: usize,
    },

    /// A declared payload exceeds the receive capacity, or a payload does
    /// not fit the wire length field.
    #[error("frame payload of {declared} bytes exceeds limit of {max} bytes")]
    LengthExceeded { declared: usize, max: usize },

    /// Matrix values do not fill `rows * cols` exactly.
    #[error("table shape {rows}x{cols} does not match payload of {payload_len} bytes")]
    InvalidShape {
        rows: u32,
        cols: u32,
        payload_len: usize,
    },

    /// Unknown frame kind tag on the wire.
    #[error("unknown frame kind tag {0:#04x}")]
    BadKind(u8),

    /// A well-formed frame of the other kind arrived.
    #[error("expected {expected} frame, received {found} frame")]
    UnexpectedKind { expected: FrameKind, found: FrameKind },

    /// The endpoint was closed, by the caller or after an earlier failure.
    #[error("endpoint is closed")]
    EndpointClosed,

    /// Socket error after the endpoint was established.
    #[error("endpoint I/O error: {0}")]
    Io(#[source] std::io::Error),
}

impl From<FrameError> for EndpointError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::BadKind(tag) => EndpointError::BadKind(tag),
            FrameError::LengthExceeded { declared, max } => {
                EndpointError::LengthExceeded { declared, max }
            }
            FrameError::InvalidShape {
                rows,
                cols,
                payload_len,
            } => EndpointError::InvalidShape {
                rows,
                cols,
                payload_len,
            },
            FrameError::Truncated { expected, received } => {
                EndpointError::Truncated { expected, received }
            }
            FrameError::UnexpectedKind { expected, found } => {
                EndpointError::UnexpectedKind { expected, found }
            }
            FrameError::ConnectionClosed => EndpointError::Disconnected,
            FrameError::Io(err) => EndpointError::Io(err),
        }
    }
}

impl From<TransportError> for EndpointError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Io(io) => EndpointError::Io(io),
            other => EndpointError::ConnectionFailed(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, EndpointError>;
