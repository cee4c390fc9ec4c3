use bytes::{BufMut, BytesMut};

use crate::error::{FrameError, Result};

/// Size of one encoded element.
pub const ELEMENT_SIZE: usize = std::mem::size_of::<f64>();

/// A dense row-major matrix of doubles.
///
/// `values.len() == rows * cols` always holds; every constructor checks it.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    rows: u32,
    cols: u32,
    values: Vec<f64>,
}

impl Table {
    /// Build a table from flattened row-major values.
    pub fn new(rows: u32, cols: u32, values: Vec<f64>) -> Result<Self> {
        check_shape(rows, cols, values.len())?;
        Ok(Self { rows, cols, values })
    }

    /// Build a table from nested rows. Every row must have the same length.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self> {
        let cols = rows.first().map(|row| row.as_ref().len()).unwrap_or(0);
        let row_count = to_dim(rows.len(), 0, cols)?;
        let col_count = to_dim(cols, row_count, 0)?;

        let mut values = Vec::with_capacity(rows.len().saturating_mul(cols));
        for row in rows {
            let row = row.as_ref();
            if row.len() != cols {
                return Err(FrameError::InvalidShape {
                    rows: row_count,
                    cols: col_count,
                    payload_len: (values.len() + row.len()).saturating_mul(ELEMENT_SIZE),
                });
            }
            values.extend_from_slice(row);
        }

        Ok(Self {
            rows: row_count,
            cols: col_count,
            values,
        })
    }

    /// Rebuild a table from its little-endian wire payload.
    pub fn from_le_bytes(rows: u32, cols: u32, payload: &[u8]) -> Result<Self> {
        let invalid = || FrameError::InvalidShape {
            rows,
            cols,
            payload_len: payload.len(),
        };
        if payload.len() % ELEMENT_SIZE != 0 {
            return Err(invalid());
        }
        let expected = payload_len(rows, cols).ok_or_else(invalid)?;
        if expected != payload.len() {
            return Err(invalid());
        }

        let values = payload
            .chunks_exact(ELEMENT_SIZE)
            .map(|chunk| {
                let mut raw = [0u8; ELEMENT_SIZE];
                raw.copy_from_slice(chunk);
                f64::from_le_bytes(raw)
            })
            .collect();

        Ok(Self { rows, cols, values })
    }

    /// Append the little-endian payload to `dst`.
    pub fn put_le_bytes(&self, dst: &mut BytesMut) {
        put_values(&self.values, dst);
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    /// `(rows, cols)`.
    pub fn shape(&self) -> (u32, u32) {
        (self.rows, self.cols)
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Flattened row-major values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    /// Element at `(row, col)`, if in range.
    pub fn get(&self, row: u32, col: u32) -> Option<f64> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.values.get(row as usize * self.cols as usize + col as usize).copied()
    }

    /// Iterate over rows as slices.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> {
        // chunks_exact(0) panics; a table with zero columns has no visible rows.
        let width = (self.cols as usize).max(1);
        self.values.chunks_exact(width)
    }

    /// Convert back to nested rows.
    ///
    /// A table with zero columns yields `rows` empty rows.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        if self.cols == 0 {
            return vec![Vec::new(); self.rows as usize];
        }
        self.iter_rows().map(<[f64]>::to_vec).collect()
    }

    /// Payload size on the wire in bytes.
    pub fn payload_len(&self) -> usize {
        self.values.len() * ELEMENT_SIZE
    }
}

/// Wire payload size of a `rows x cols` table, or `None` on overflow.
pub fn payload_len(rows: u32, cols: u32) -> Option<usize> {
    (rows as usize)
        .checked_mul(cols as usize)?
        .checked_mul(ELEMENT_SIZE)
}

/// Check that `count` values fill a `rows x cols` table exactly.
pub fn check_shape(rows: u32, cols: u32, count: usize) -> Result<()> {
    let fits = (rows as usize)
        .checked_mul(cols as usize)
        .is_some_and(|expected| expected == count);
    if fits {
        Ok(())
    } else {
        Err(FrameError::InvalidShape {
            rows,
            cols,
            payload_len: count.saturating_mul(ELEMENT_SIZE),
        })
    }
}

pub(crate) fn put_values(values: &[f64], dst: &mut BytesMut) {
    for value in values {
        dst.put_f64_le(*value);
    }
}

fn to_dim(value: usize, rows: u32, cols: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| FrameError::InvalidShape {
        rows,
        cols: u32::try_from(cols).unwrap_or(u32::MAX),
        payload_len: value.saturating_mul(ELEMENT_SIZE),
    })
}
