use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};
use crate::table::{self, check_shape, Table};

/// Raw frame header: kind (1) + length (4) = 5 bytes.
pub const RAW_HEADER_SIZE: usize = 5;

/// Table frame header: kind (1) + rows (4) + cols (4) = 9 bytes.
pub const TABLE_HEADER_SIZE: usize = 9;

/// Default maximum payload size: 16 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// Payload kind carried in the first byte of every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameKind {
    /// Opaque bytes.
    Raw = 0,
    /// Row-major matrix of doubles.
    Table = 1,
}

impl FrameKind {
    /// Wire tag of this kind.
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Header size of frames of this kind.
    pub fn header_size(self) -> usize {
        match self {
            FrameKind::Raw => RAW_HEADER_SIZE,
            FrameKind::Table => TABLE_HEADER_SIZE,
        }
    }
}

impl TryFrom<u8> for FrameKind {
    type Error = FrameError;

    fn try_from(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(FrameKind::Raw),
            1 => Ok(FrameKind::Table),
            other => Err(FrameError::BadKind(other)),
        }
    }
}

impl std::fmt::Display for FrameKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameKind::Raw => f.write_str("raw"),
            FrameKind::Table => f.write_str("table"),
        }
    }
}

/// One decoded unit of wire data.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Raw(Bytes),
    Table(Table),
}

impl Frame {
    /// Create a raw frame.
    pub fn raw(payload: impl Into<Bytes>) -> Self {
        Frame::Raw(payload.into())
    }

    pub fn kind(&self) -> FrameKind {
        match self {
            Frame::Raw(_) => FrameKind::Raw,
            Frame::Table(_) => FrameKind::Table,
        }
    }

    /// Payload size in bytes.
    pub fn payload_len(&self) -> usize {
        match self {
            Frame::Raw(payload) => payload.len(),
            Frame::Table(table) => table.payload_len(),
        }
    }

    /// The total wire size of this frame (header + payload).
    pub fn wire_size(&self) -> usize {
        self.kind().header_size() + self.payload_len()
    }

    /// Unwrap a raw payload, or report the kind that arrived instead.
    pub fn into_raw(self) -> Result<Bytes> {
        match self {
            Frame::Raw(payload) => Ok(payload),
            other => Err(FrameError::UnexpectedKind {
                expected: FrameKind::Raw,
                found: other.kind(),
            }),
        }
    }

    /// Unwrap a table payload, or report the kind that arrived instead.
    pub fn into_table(self) -> Result<Table> {
        match self {
            Frame::Table(table) => Ok(table),
            other => Err(FrameError::UnexpectedKind {
                expected: FrameKind::Table,
                found: other.kind(),
            }),
        }
    }
}

impl From<Table> for Frame {
    fn from(table: Table) -> Self {
        Frame::Table(table)
    }
}

/// Encode opaque bytes into a raw frame.
///
/// Wire format (all integers little-endian):
/// ```text
/// ┌──────────┬────────────┬──────────────────┐
/// │ Kind (1B)│ Length     │ Payload          │
/// │ 0x00     │ (4B LE)    │ (Length bytes)   │
/// └──────────┴────────────┴──────────────────┘
/// ```
pub fn encode_raw(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    let len = u32::try_from(payload.len()).map_err(|_| FrameError::LengthExceeded {
        declared: payload.len(),
        max: u32::MAX as usize,
    })?;
    dst.reserve(RAW_HEADER_SIZE + payload.len());
    dst.put_u8(FrameKind::Raw.tag());
    dst.put_u32_le(len);
    dst.put_slice(payload);
    Ok(())
}

/// Encode flattened row-major values into a table frame.
///
/// Wire format (all integers and doubles little-endian):
/// ```text
/// ┌──────────┬──────────┬──────────┬──────────────────────────┐
/// │ Kind (1B)│ Rows     │ Cols     │ Values                   │
/// │ 0x01     │ (4B LE)  │ (4B LE)  │ (rows * cols * 8B f64 LE)│
/// └──────────┴──────────┴──────────┴──────────────────────────┘
/// ```
pub fn encode_table(values: &[f64], rows: u32, cols: u32, dst: &mut BytesMut) -> Result<()> {
    check_shape(rows, cols, values.len())?;
    dst.reserve(TABLE_HEADER_SIZE + values.len() * table::ELEMENT_SIZE);
    dst.put_u8(FrameKind::Table.tag());
    dst.put_u32_le(rows);
    dst.put_u32_le(cols);
    table::put_values(values, dst);
    Ok(())
}

/// Encode any frame.
pub fn encode_frame(frame: &Frame, dst: &mut BytesMut) -> Result<()> {
    match frame {
        Frame::Raw(payload) => encode_raw(payload, dst),
        Frame::Table(table) => encode_table(table.values(), table.rows(), table.cols(), dst),
    }
}

/// Parsed frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub kind: FrameKind,
    /// Rows and cols for tables; `None` for raw frames.
    pub shape: Option<(u32, u32)>,
    /// Declared payload size in bytes.
    pub payload_len: usize,
}

impl FrameHeader {
    /// Header plus payload size.
    pub fn frame_len(&self) -> usize {
        self.kind.header_size().saturating_add(self.payload_len)
    }
}

/// Parse the header at the front of `src` without consuming anything.
///
/// Returns `Ok(None)` until the complete header is buffered. An unknown kind
/// tag is rejected as soon as the first byte is present. A table shape whose
/// payload size overflows is reported as `LengthExceeded`.
pub fn peek_header(src: &[u8]) -> Result<Option<FrameHeader>> {
    let Some(&tag) = src.first() else {
        return Ok(None);
    };
    let kind = FrameKind::try_from(tag)?;
    if src.len() < kind.header_size() {
        return Ok(None);
    }

    let header = match kind {
        FrameKind::Raw => FrameHeader {
            kind,
            shape: None,
            payload_len: read_u32_le(&src[1..5]) as usize,
        },
        FrameKind::Table => {
            let rows = read_u32_le(&src[1..5]);
            let cols = read_u32_le(&src[5..9]);
            let payload_len =
                table::payload_len(rows, cols).ok_or(FrameError::LengthExceeded {
                    declared: usize::MAX,
                    max: isize::MAX as usize,
                })?;
            FrameHeader {
                kind,
                shape: Some((rows, cols)),
                payload_len,
            }
        }
    };
    Ok(Some(header))
}

/// Decode a frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// The declared payload size is checked against `max_payload` as soon as
/// the header is complete, before any payload is awaited.
/// On success, consumes the frame bytes from the buffer.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<Frame>> {
    let Some(header) = peek_header(src)? else {
        return Ok(None); // Need more data
    };

    if header.payload_len > max_payload {
        return Err(FrameError::LengthExceeded {
            declared: header.payload_len,
            max: max_payload,
        });
    }

    let total = header.frame_len();
    if src.len() < total {
        src.reserve(total - src.len());
        return Ok(None); // Need more data
    }

    src.advance(header.kind.header_size());
    let payload = src.split_to(header.payload_len).freeze();

    match header.shape {
        None => Ok(Some(Frame::Raw(payload))),
        Some((rows, cols)) => Ok(Some(Frame::Table(Table::from_le_bytes(
            rows, cols, &payload,
        )?))),
    }
}

fn read_u32_le(bytes: &[u8]) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(raw)
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Default: 16 MiB.
    pub max_payload_size: usize,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            read_timeout: None,
            write_timeout: None,
        }
    }
}
