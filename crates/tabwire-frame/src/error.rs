use std::io::ErrorKind;

use crate::codec::FrameKind;

/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The kind tag is neither Raw nor Table.
    #[error("unknown frame kind tag {0:#04x}")]
    BadKind(u8),

    /// A declared payload size exceeds the receiver's ceiling, or a payload
    /// does not fit the fixed-width length field.
    #[error("frame payload of {declared} bytes exceeds limit of {max} bytes")]
    LengthExceeded { declared: usize, max: usize },

    /// Table payload does not hold exactly `rows * cols` doubles.
    #[error("table shape {rows}x{cols} does not match payload of {payload_len} bytes")]
    InvalidShape {
        rows: u32,
        cols: u32,
        payload_len: usize,
    },

    /// The stream ended inside a frame.
    #[error("stream ended after {received} bytes of an incomplete frame{}", expected_suffix(.expected))]
    Truncated {
        expected: Option<usize>,
        received: usize,
    },

    /// A well-formed frame of the wrong kind arrived.
    #[error("expected {expected} frame, received {found} frame")]
    UnexpectedKind { expected: FrameKind, found: FrameKind },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer went away: EOF on a frame boundary while reading, or a
    /// reset or broken pipe at any point.
    #[error("connection closed")]
    ConnectionClosed,
}

/// Socket error kinds raised when the peer has torn the connection down.
pub(crate) fn is_peer_gone(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::BrokenPipe | ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted
    )
}

fn expected_suffix(expected: &Option<usize>) -> String {
    match expected {
        Some(total) => format!(" (expected {total})"),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
