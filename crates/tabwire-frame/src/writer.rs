use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use tabwire_transport::NetStream;
use tracing::trace;

use crate::codec::{encode_frame, encode_raw, encode_table, Frame, FrameConfig};
use crate::error::{is_peer_gone, FrameError, Result};
use crate::reader::transport_to_frame_error;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
/// Encode buffers grown past this are released after the frame is written.
const RETAINED_BUFFER_CAPACITY: usize = 1024 * 1024;

/// Writes complete frames to any `Write` stream.
///
/// A frame is fully encoded before the first byte is written, so encode
/// failures never leave a partial frame on the stream. An expired write
/// timeout is returned as `FrameError::Io`; it is never retried.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Write a complete frame (blocking).
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.buf.clear();
        encode_frame(frame, &mut self.buf)?;
        self.write_buffered()
    }

    /// Encode and send opaque bytes.
    pub fn send_raw(&mut self, payload: &[u8]) -> Result<()> {
        self.buf.clear();
        encode_raw(payload, &mut self.buf)?;
        self.write_buffered()
    }

    /// Encode and send a row-major matrix.
    pub fn send_table(&mut self, values: &[f64], rows: u32, cols: u32) -> Result<()> {
        self.buf.clear();
        encode_table(values, rows, cols, &mut self.buf)?;
        self.write_buffered()
    }

    fn write_buffered(&mut self) -> Result<()> {
        let result = self.write_all_buffered();
        if self.buf.capacity() > RETAINED_BUFFER_CAPACITY {
            self.buf = BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY);
        }
        result?;
        self.flush()
    }

    fn write_all_buffered(&mut self) -> Result<()> {
        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if is_peer_gone(err.kind()) => return Err(FrameError::ConnectionClosed),
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
        trace!(size = self.buf.len(), "wrote frame");
        Ok(())
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if is_peer_gone(err.kind()) => return Err(FrameError::ConnectionClosed),
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameWriter<NetStream> {
    /// Create a frame writer for `NetStream` and apply write timeout from config.
    pub fn with_config_net(inner: NetStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_write_timeout(config.write_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}
