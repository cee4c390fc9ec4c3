use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use tabwire_transport::NetStream;
use tracing::trace;

use crate::codec::{decode_frame, peek_header, Frame, FrameConfig};
use crate::error::{is_peer_gone, FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads complete frames from any `Read` stream.
///
/// Handles partial reads internally; callers always get complete frames.
/// Bytes read past the end of one frame stay buffered for the next call.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Read the next complete frame (blocking), bounded by the configured
    /// maximum payload size.
    pub fn read_frame(&mut self) -> Result<Frame> {
        self.read_frame_within(self.config.max_payload_size)
    }

    /// Read the next complete frame (blocking), bounded by `max_payload`.
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF (or a reset) is
    /// reached on a frame boundary and `Err(FrameError::Truncated)` when it
    /// cuts a frame. Read timeouts surface as `FrameError::Io`.
    pub fn read_frame_within(&mut self, max_payload: usize) -> Result<Frame> {
        loop {
            if let Some(frame) = decode_frame(&mut self.buf, max_payload)? {
                trace!(kind = %frame.kind(), size = frame.payload_len(), "decoded frame");
                return Ok(frame);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                // A reset reads like EOF: clean between frames, truncated inside one.
                Err(err) if is_peer_gone(err.kind()) => return Err(self.eof_error()),
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(self.eof_error());
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    fn eof_error(&self) -> FrameError {
        if self.buf.is_empty() {
            return FrameError::ConnectionClosed;
        }
        let expected = peek_header(&self.buf)
            .ok()
            .flatten()
            .map(|header| header.frame_len());
        FrameError::Truncated {
            expected,
            received: self.buf.len(),
        }
    }

    /// Number of bytes read from the stream but not yet decoded.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Update maximum payload size for subsequent frame decoding.
    pub fn set_max_payload_size(&mut self, max_payload_size: usize) {
        self.config.max_payload_size = max_payload_size;
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameReader<NetStream> {
    /// Create a frame reader for `NetStream` and apply read timeout from config.
    pub fn with_config_net(inner: NetStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

pub(crate) fn transport_to_frame_error(err: tabwire_transport::TransportError) -> FrameError {
    match err {
        tabwire_transport::TransportError::Io(io)
        | tabwire_transport::TransportError::Accept(io) => FrameError::Io(io),
        tabwire_transport::TransportError::Bind { source, .. }
        | tabwire_transport::TransportError::Connect { source, .. }
        | tabwire_transport::TransportError::Resolve { source, .. } => FrameError::Io(source),
    }
}
