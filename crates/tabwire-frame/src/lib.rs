//! Self-describing frames for opaque bytes and double-precision matrices.
//!
//! Every frame starts with a 1-byte kind tag followed by a fixed-width
//! little-endian descriptor:
//! - Raw: a 4-byte payload length, then the payload bytes
//! - Table: 4-byte row and column counts, then `rows * cols` f64 values
//!
//! Declared sizes are checked against the receiver's ceiling before any
//! payload is read. No partial reads, no buffer management in user code.

#[cfg(feature = "async")]
pub mod async_codec;
pub mod codec;
pub mod error;
pub mod reader;
pub mod table;
pub mod writer;

#[cfg(feature = "async")]
pub use async_codec::TabwireCodec;
pub use codec::{
    decode_frame, encode_frame, encode_raw, encode_table, peek_header, Frame, FrameConfig,
    FrameHeader, FrameKind, DEFAULT_MAX_PAYLOAD, RAW_HEADER_SIZE, TABLE_HEADER_SIZE,
};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use table::{Table, ELEMENT_SIZE};
pub use writer::FrameWriter;
