use std::io::{ErrorKind, Read, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

/// One side of an in-process byte pipe pair.
///
/// Created by [`memory_pair`]. Bytes written on one side are read, in
/// order, on the other. Dropping a side (or its write half) ends the
/// other side's stream: reads return EOF once buffered bytes are drained,
/// and writes toward a dropped reader fail with `BrokenPipe`.
#[derive(Debug)]
pub struct MemoryStream {
    reader: MemoryReader,
    writer: MemoryWriter,
}

/// Receiving half of a [`MemoryStream`].
#[derive(Debug)]
pub struct MemoryReader {
    rx: Receiver<Vec<u8>>,
    pending: Vec<u8>,
    pos: usize,
    read_timeout: Option<Duration>,
}

/// Sending half of a [`MemoryStream`].
#[derive(Debug)]
pub struct MemoryWriter {
    tx: Option<Sender<Vec<u8>>>,
}

/// Create two connected in-process streams.
pub fn memory_pair() -> (MemoryStream, MemoryStream) {
    let (left_tx, right_rx) = mpsc::channel();
    let (right_tx, left_rx) = mpsc::channel();
    (
        MemoryStream::new(left_rx, left_tx),
        MemoryStream::new(right_rx, right_tx),
    )
}

impl MemoryStream {
    fn new(rx: Receiver<Vec<u8>>, tx: Sender<Vec<u8>>) -> Self {
        Self {
            reader: MemoryReader {
                rx,
                pending: Vec::new(),
                pos: 0,
                read_timeout: None,
            },
            writer: MemoryWriter { tx: Some(tx) },
        }
    }

    /// Separate the stream into independently owned halves.
    pub fn into_split(self) -> (MemoryReader, MemoryWriter) {
        (self.reader, self.writer)
    }

    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) {
        self.reader.set_read_timeout(timeout);
    }
}

impl MemoryReader {
    /// Bound how long a read waits for the peer. `None` waits forever.
    ///
    /// An expired wait reports `WouldBlock`, matching a socket read timeout.
    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) {
        self.read_timeout = timeout;
    }

    fn next_chunk(&mut self) -> std::io::Result<Option<Vec<u8>>> {
        let received = match self.read_timeout {
            None => self.rx.recv().ok(),
            Some(timeout) => match self.rx.recv_timeout(timeout) {
                Ok(chunk) => Some(chunk),
                Err(RecvTimeoutError::Disconnected) => None,
                Err(RecvTimeoutError::Timeout) => {
                    return Err(std::io::Error::new(
                        ErrorKind::WouldBlock,
                        "memory stream read timed out",
                    ))
                }
            },
        };
        Ok(received)
    }
}

impl MemoryWriter {
    /// Stop sending. The peer reads EOF after draining what was sent.
    pub fn shutdown(&mut self) {
        self.tx = None;
    }
}

impl Read for MemoryReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.pos >= self.pending.len() {
            match self.next_chunk()? {
                Some(chunk) => {
                    self.pending = chunk;
                    self.pos = 0;
                }
                None => return Ok(0),
            }
        }
        let n = buf.len().min(self.pending.len() - self.pos);
        buf[..n].copy_from_slice(&self.pending[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| std::io::Error::new(ErrorKind::NotConnected, "memory stream shut down"))?;
        if buf.is_empty() {
            return Ok(0);
        }
        tx.send(buf.to_vec())
            .map_err(|_| std::io::Error::new(ErrorKind::BrokenPipe, "memory stream peer dropped"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Read for MemoryStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.reader.read(buf)
    }
}

impl Write for MemoryStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}
