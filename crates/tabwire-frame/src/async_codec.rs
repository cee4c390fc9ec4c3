use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{decode_frame, encode_frame, peek_header, Frame, DEFAULT_MAX_PAYLOAD};
use crate::error::FrameError;

/// `tokio_util` codec speaking the same framing as [`crate::FrameReader`]
/// and [`crate::FrameWriter`].
#[derive(Debug, Clone)]
pub struct TabwireCodec {
    max_payload: usize,
}

impl TabwireCodec {
    pub fn new() -> Self {
        Self::with_max_payload(DEFAULT_MAX_PAYLOAD)
    }

    /// Codec that rejects declared payloads larger than `max_payload` bytes.
    pub fn with_max_payload(max_payload: usize) -> Self {
        Self { max_payload }
    }

    pub fn max_payload(&self) -> usize {
        self.max_payload
    }
}

impl Default for TabwireCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for TabwireCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
        decode_frame(src, self.max_payload)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        if src.is_empty() {
            return Ok(None);
        }
        let expected = peek_header(src).ok().flatten().map(|h| h.frame_len());
        Err(FrameError::Truncated {
            expected,
            received: src.len(),
        })
    }
}

impl Encoder<Frame> for TabwireCodec {
    type Error = FrameError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<(), FrameError> {
        encode_frame(&frame, dst)
    }
}

impl<'a> Encoder<&'a Frame> for TabwireCodec {
    type Error = FrameError;

    fn encode(&mut self, frame: &'a Frame, dst: &mut BytesMut) -> Result<(), FrameError> {
        encode_frame(frame, dst)
    }
}
