use std::io::{Read, Write};
use std::net::SocketAddr;

use bytes::Bytes;
use tabwire_frame::{Frame, FrameError, FrameReader, FrameWriter, Table, ELEMENT_SIZE};
use tabwire_transport::{MemoryStream, NetStream};
use tracing::{debug, warn};

use crate::config::EndpointConfig;
use crate::error::{EndpointError, Result};

/// How an endpoint came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointRole {
    /// Produced by a server listener accepting its one peer, or the server
    /// side of a memory pair.
    Accepted,
    /// Produced by connecting to a server, or the client side of a memory
    /// pair.
    Client,
}

impl std::fmt::Display for EndpointRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EndpointRole::Accepted => f.write_str("accepted"),
            EndpointRole::Client => f.write_str("client"),
        }
    }
}

/// Lifecycle state. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointState {
    Open,
    Closed,
}

/// Where one side of an endpoint lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointAddr {
    Socket(SocketAddr),
    /// In-process endpoint without a socket.
    Memory,
}

impl EndpointAddr {
    pub fn as_socket(&self) -> Option<SocketAddr> {
        match self {
            EndpointAddr::Socket(addr) => Some(*addr),
            EndpointAddr::Memory => None,
        }
    }
}

impl std::fmt::Display for EndpointAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EndpointAddr::Socket(addr) => addr.fmt(f),
            EndpointAddr::Memory => f.write_str("memory"),
        }
    }
}

type ReadHalf = Box<dyn Read + Send>;
type WriteHalf = Box<dyn Write + Send>;

struct Channel {
    reader: FrameReader<ReadHalf>,
    writer: FrameWriter<WriteHalf>,
    // Kept for an explicit shutdown; memory halves end on drop.
    socket: Option<NetStream>,
}

/// One side of an established connection.
///
/// The endpoint owns its stream exclusively. The stream is released
/// exactly once: by [`Endpoint::close`], by drop, or by the first failure
/// after I/O has started on a frame. Failures detected before any byte is
/// written (a matrix whose values do not fill its shape, a payload too
/// large for the length field) leave the endpoint open.
///
/// Calls on a released endpoint fail with [`EndpointError::EndpointClosed`].
pub struct Endpoint {
    role: EndpointRole,
    peer_addr: EndpointAddr,
    local_addr: EndpointAddr,
    config: EndpointConfig,
    channel: Option<Channel>,
    close_called: bool,
}

impl Endpoint {
    pub(crate) fn from_stream(
        stream: NetStream,
        role: EndpointRole,
        config: EndpointConfig,
    ) -> Result<Self> {
        stream.set_nodelay(config.nodelay)?;
        stream.set_read_timeout(config.read_timeout)?;
        stream.set_write_timeout(config.write_timeout)?;
        let peer_addr = EndpointAddr::Socket(stream.peer_addr()?);
        let local_addr = EndpointAddr::Socket(stream.local_addr()?);
        let reader_stream = stream.try_clone()?;
        let writer_stream = stream.try_clone()?;

        Ok(Self::open(
            Box::new(reader_stream),
            Box::new(writer_stream),
            Some(stream),
            (local_addr, peer_addr),
            role,
            config,
        ))
    }

    pub(crate) fn from_memory(
        stream: MemoryStream,
        role: EndpointRole,
        config: EndpointConfig,
    ) -> Self {
        let (mut reader, writer) = stream.into_split();
        reader.set_read_timeout(config.read_timeout);

        Self::open(
            Box::new(reader),
            Box::new(writer),
            None,
            (EndpointAddr::Memory, EndpointAddr::Memory),
            role,
            config,
        )
    }

    fn open(
        reader: ReadHalf,
        writer: WriteHalf,
        socket: Option<NetStream>,
        (local_addr, peer_addr): (EndpointAddr, EndpointAddr),
        role: EndpointRole,
        config: EndpointConfig,
    ) -> Self {
        let frame_config = config.frame_config();
        let channel = Channel {
            reader: FrameReader::with_config(reader, frame_config.clone()),
            writer: FrameWriter::with_config(writer, frame_config),
            socket,
        };

        debug!(%role, %peer_addr, %local_addr, "endpoint open");
        Self {
            role,
            peer_addr,
            local_addr,
            config,
            channel: Some(channel),
            close_called: false,
        }
    }

    /// Send an opaque byte buffer as one raw frame.
    pub fn send_bytes(&mut self, data: &[u8]) -> Result<()> {
        let result = self.channel()?.writer.send_raw(data);
        self.settle_send(result)
    }

    /// Send a row-major matrix of `rows * cols` values as one table frame.
    pub fn send_matrix(&mut self, values: &[f64], rows: u32, cols: u32) -> Result<()> {
        let result = self.channel()?.writer.send_table(values, rows, cols);
        self.settle_send(result)
    }

    pub fn send_table(&mut self, table: &Table) -> Result<()> {
        self.send_matrix(table.values(), table.rows(), table.cols())
    }

    /// Send an already built frame of either kind.
    pub fn send_frame(&mut self, frame: &Frame) -> Result<()> {
        let result = self.channel()?.writer.write_frame(frame);
        self.settle_send(result)
    }

    /// Receive one raw frame into `buf` and return the payload length.
    ///
    /// A frame declaring more than `buf.len()` bytes fails with
    /// `LengthExceeded` before any payload is read; `buf` is untouched.
    pub fn receive_bytes(&mut self, buf: &mut [u8]) -> Result<usize> {
        let payload = self.read_frame_within(buf.len())?.into_raw()?;
        buf[..payload.len()].copy_from_slice(&payload);
        Ok(payload.len())
    }

    /// Receive one table frame into `buf` and return its `(rows, cols)`.
    ///
    /// `buf.len()` is the capacity in elements. A table with more than
    /// `buf.len()` elements fails with `LengthExceeded` before any payload
    /// is read; `buf` is untouched.
    pub fn receive_matrix(&mut self, buf: &mut [f64]) -> Result<(u32, u32)> {
        let ceiling = buf.len().saturating_mul(ELEMENT_SIZE);
        let table = self.read_frame_within(ceiling)?.into_table()?;
        buf[..table.len()].copy_from_slice(table.values());
        Ok(table.shape())
    }

    /// Receive the next frame of either kind, bounded by the configured
    /// maximum payload size.
    pub fn recv_frame(&mut self) -> Result<Frame> {
        let max = self.config.max_payload_size;
        self.read_frame_within(max)
    }

    /// Receive the next raw frame as an owned buffer.
    pub fn recv_bytes(&mut self) -> Result<Bytes> {
        Ok(self.recv_frame()?.into_raw()?)
    }

    /// Receive the next table frame as an owned [`Table`].
    pub fn recv_table(&mut self) -> Result<Table> {
        Ok(self.recv_frame()?.into_table()?)
    }

    /// Release the socket.
    ///
    /// The first call succeeds even when an earlier failure already
    /// released the socket. Every later call fails with `EndpointClosed`.
    pub fn close(&mut self) -> Result<()> {
        if self.close_called {
            return Err(EndpointError::EndpointClosed);
        }
        self.close_called = true;
        self.release();
        Ok(())
    }

    pub fn state(&self) -> EndpointState {
        if self.channel.is_some() {
            EndpointState::Open
        } else {
            EndpointState::Closed
        }
    }

    pub fn is_open(&self) -> bool {
        self.state() == EndpointState::Open
    }

    pub fn role(&self) -> EndpointRole {
        self.role
    }

    /// Address of the remote side, as seen when the endpoint was opened.
    pub fn peer_addr(&self) -> EndpointAddr {
        self.peer_addr
    }

    pub fn local_addr(&self) -> EndpointAddr {
        self.local_addr
    }

    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }

    fn channel(&mut self) -> Result<&mut Channel> {
        self.channel.as_mut().ok_or(EndpointError::EndpointClosed)
    }

    fn read_frame_within(&mut self, max_payload: usize) -> Result<Frame> {
        let result = self.channel()?.reader.read_frame_within(max_payload);
        match result {
            Ok(frame) => {
                debug!(role = %self.role, kind = %frame.kind(), size = frame.payload_len(), "received frame");
                Ok(frame)
            }
            // The stream position is no longer on a frame boundary.
            Err(err) => Err(self.release_after(err)),
        }
    }

    fn settle_send(&mut self, result: tabwire_frame::Result<()>) -> Result<()> {
        match result {
            Ok(()) => Ok(()),
            // Encode failures happen before the first byte is written.
            Err(err @ (FrameError::InvalidShape { .. } | FrameError::LengthExceeded { .. })) => {
                Err(err.into())
            }
            Err(err) => Err(self.release_after(err)),
        }
    }

    fn release_after(&mut self, err: FrameError) -> EndpointError {
        match &err {
            FrameError::ConnectionClosed => {
                debug!(role = %self.role, peer = %self.peer_addr, "peer disconnected");
            }
            other => {
                warn!(role = %self.role, peer = %self.peer_addr, error = %other, "releasing endpoint after failure");
            }
        }
        self.release();
        err.into()
    }

    fn release(&mut self) {
        if let Some(channel) = self.channel.take() {
            if let Some(socket) = &channel.socket {
                if let Err(err) = socket.shutdown() {
                    debug!(role = %self.role, error = %err, "socket shutdown failed");
                }
            }
            drop(channel);
            debug!(role = %self.role, peer = %self.peer_addr, "endpoint closed");
        }
    }
}

impl Drop for Endpoint {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("role", &self.role)
            .field("state", &self.state())
            .field("peer_addr", &self.peer_addr)
            .field("local_addr", &self.local_addr)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io::{ErrorKind, Write};
    use std::net::TcpStream;
    use std::thread;
    use std::time::Duration;

    use tabwire_frame::FrameKind;

    use super::*;
    use crate::connector::create_client;
    use crate::listener::ServerListener;

    fn pair() -> (Endpoint, Endpoint) {
        let listener = ServerListener::bind("127.0.0.1:0").expect("listener should bind");
        let addr = listener.local_addr().to_string();
        let server = thread::spawn(move || listener.accept().expect("listener should accept"));
        let client = create_client(&addr).expect("client should connect");
        let server = server.join().expect("server thread should finish");
        (server, client)
    }

    /// Accepted endpoint plus a plain socket that can write arbitrary bytes.
    fn accepted_with_raw_peer() -> (Endpoint, TcpStream) {
        let listener = ServerListener::bind("127.0.0.1:0").expect("listener should bind");
        let addr = listener.local_addr();
        let server = thread::spawn(move || listener.accept().expect("listener should accept"));
        let raw = TcpStream::connect(addr).expect("raw peer should connect");
        let server = server.join().expect("server thread should finish");
        (server, raw)
    }

    #[test]
    fn bytes_round_trip() {
        let (mut server, mut client) = pair();

        client.send_bytes(b"Hello").expect("send should succeed");
        let mut buf = [0u8; 16];
        let n = server.receive_bytes(&mut buf).expect("receive should succeed");

        assert_eq!(n, 5);
        assert_eq!(&buf[..n], b"Hello");
    }

    #[test]
    fn exact_capacity_is_accepted() {
        let (mut server, mut client) = pair();
        let payload = vec![0x5A; 4096];

        client.send_bytes(&payload).expect("send should succeed");
        let mut buf = vec![0u8; payload.len()];
        let n = server.receive_bytes(&mut buf).expect("receive should succeed");

        assert_eq!(n, payload.len());
        assert_eq!(buf, payload);
    }

    #[test]
    fn empty_payloads_round_trip() {
        let (mut server, mut client) = pair();

        client.send_bytes(b"").expect("empty send should succeed");
        client.send_matrix(&[], 0, 3).expect("empty matrix send should succeed");

        let mut bytes: [u8; 0] = [];
        assert_eq!(server.receive_bytes(&mut bytes).expect("receive"), 0);
        let mut values: [f64; 0] = [];
        assert_eq!(server.receive_matrix(&mut values).expect("receive"), (0, 3));
    }

    #[test]
    fn matrix_round_trip_is_bit_exact() {
        let (mut server, mut client) = pair();
        let values = [
            0.1,
            -0.0,
            f64::NAN,
            f64::INFINITY,
            f64::MIN_POSITIVE,
            1e300,
        ];

        client.send_matrix(&values, 3, 2).expect("send should succeed");
        let mut buf = [0.0f64; 8];
        let shape = server.receive_matrix(&mut buf).expect("receive should succeed");

        assert_eq!(shape, (3, 2));
        for (got, sent) in buf.iter().zip(values.iter()) {
            assert_eq!(got.to_bits(), sent.to_bits());
        }
        assert_eq!(buf[6], 0.0);
    }

    #[test]
    fn owned_receives() {
        let (mut server, mut client) = pair();
        let table = Table::from_rows(&[[1.0, 2.0], [3.0, 4.0]]).expect("table");

        client.send_bytes(b"abc").expect("send bytes");
        client.send_table(&table).expect("send table");
        client
            .send_frame(&Frame::raw(&b"xyz"[..]))
            .expect("send frame");

        assert_eq!(server.recv_bytes().expect("recv bytes").as_ref(), b"abc");
        assert_eq!(server.recv_table().expect("recv table"), table);
        assert_eq!(
            server.recv_frame().expect("recv frame"),
            Frame::raw(&b"xyz"[..])
        );
    }

    #[test]
    fn frames_arrive_in_send_order() {
        let (mut server, mut client) = pair();

        for i in 0..20u32 {
            if i % 2 == 0 {
                client.send_bytes(&i.to_le_bytes()).expect("send bytes");
            } else {
                client
                    .send_matrix(&[f64::from(i)], 1, 1)
                    .expect("send matrix");
            }
        }

        for i in 0..20u32 {
            match server.recv_frame().expect("recv frame") {
                Frame::Raw(payload) => assert_eq!(payload.as_ref(), &i.to_le_bytes()),
                Frame::Table(table) => assert_eq!(table.values(), &[f64::from(i)]),
            }
        }
    }

    #[test]
    fn receive_bytes_over_capacity_leaves_buffer_untouched() {
        let (mut server, mut client) = pair();

        client.send_bytes(b"0123456789").expect("send should succeed");
        let mut buf = [0xEEu8; 8];
        let err = server.receive_bytes(&mut buf[..4]).unwrap_err();

        assert!(matches!(
            err,
            EndpointError::LengthExceeded {
                declared: 10,
                max: 4
            }
        ));
        assert_eq!(buf, [0xEE; 8]);
        assert_eq!(server.state(), EndpointState::Closed);
    }

    #[test]
    fn receive_matrix_over_capacity_leaves_buffer_untouched() {
        let (mut server, mut client) = pair();

        client
            .send_matrix(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 2, 3)
            .expect("send should succeed");
        let mut buf = [-1.0f64; 8];
        let err = server.receive_matrix(&mut buf[..5]).unwrap_err();

        assert!(matches!(
            err,
            EndpointError::LengthExceeded {
                declared: 48,
                max: 40
            }
        ));
        assert_eq!(buf, [-1.0; 8]);
    }

    #[test]
    fn invalid_shape_sends_nothing_and_stays_open() {
        let (mut server, mut client) = pair();

        let err = client.send_matrix(&[1.0, 2.0, 3.0], 2, 2).unwrap_err();
        assert!(matches!(
            err,
            EndpointError::InvalidShape {
                rows: 2,
                cols: 2,
                payload_len: 24
            }
        ));
        assert!(client.is_open());

        client.send_bytes(b"next").expect("endpoint should still send");
        assert_eq!(server.recv_bytes().expect("recv").as_ref(), b"next");
    }

    #[test]
    fn wrong_kind_is_unexpected_kind() {
        let (mut server, mut client) = pair();

        client.send_bytes(b"not a matrix").expect("send should succeed");
        client.send_matrix(&[7.0], 1, 1).expect("send should succeed");

        let mut values = [0.0f64; 4];
        let err = server.receive_matrix(&mut values).unwrap_err();
        assert!(matches!(
            err,
            EndpointError::UnexpectedKind {
                expected: FrameKind::Table,
                found: FrameKind::Raw
            }
        ));

        // The mismatched frame was consumed whole, so the stream is still aligned.
        assert!(server.is_open());
        assert_eq!(server.receive_matrix(&mut values).expect("recv"), (1, 1));
        assert_eq!(values[0], 7.0);
    }

    #[test]
    fn peer_close_between_frames_is_disconnected() {
        let (mut server, client) = pair();
        drop(client);

        let mut buf = [0u8; 8];
        let err = server.receive_bytes(&mut buf).unwrap_err();

        assert!(matches!(err, EndpointError::Disconnected));
        assert_eq!(server.state(), EndpointState::Closed);
        assert!(server.close().is_ok());
        assert!(matches!(server.close(), Err(EndpointError::EndpointClosed)));
    }

    #[test]
    fn peer_close_inside_frame_is_truncated() {
        let (mut server, mut raw) = accepted_with_raw_peer();
        raw.write_all(&[0x00, 10, 0, 0, 0, b'a']).expect("write");
        drop(raw);

        let mut buf = [0u8; 32];
        let err = server.receive_bytes(&mut buf).unwrap_err();

        assert!(matches!(
            err,
            EndpointError::Truncated {
                expected: Some(15),
                received: 6
            }
        ));
        assert_eq!(server.state(), EndpointState::Closed);
    }

    #[test]
    fn unknown_kind_is_bad_kind() {
        let (mut server, mut raw) = accepted_with_raw_peer();
        raw.write_all(&[0x07, 0, 0, 0, 0]).expect("write");

        let err = server.recv_frame().unwrap_err();

        assert!(matches!(err, EndpointError::BadKind(7)));
        assert!(!server.is_open());
    }

    #[test]
    fn calls_after_close_report_endpoint_closed() {
        let (mut server, mut client) = pair();

        client.close().expect("first close should succeed");
        assert_eq!(client.state(), EndpointState::Closed);

        assert!(matches!(
            client.send_bytes(b"x"),
            Err(EndpointError::EndpointClosed)
        ));
        assert!(matches!(
            client.send_matrix(&[1.0], 1, 1),
            Err(EndpointError::EndpointClosed)
        ));
        let mut bytes = [0u8; 4];
        assert!(matches!(
            client.receive_bytes(&mut bytes),
            Err(EndpointError::EndpointClosed)
        ));
        let mut values = [0.0f64; 4];
        assert!(matches!(
            client.receive_matrix(&mut values),
            Err(EndpointError::EndpointClosed)
        ));
        assert!(matches!(client.close(), Err(EndpointError::EndpointClosed)));

        // The peer sees an orderly end of stream.
        assert!(matches!(
            server.recv_frame(),
            Err(EndpointError::Disconnected)
        ));
    }

    #[test]
    fn read_timeout_releases_endpoint() {
        let listener = ServerListener::bind("127.0.0.1:0")
            .expect("listener should bind")
            .with_config(
                EndpointConfig::default().with_read_timeout(Some(Duration::from_millis(50))),
            );
        let addr = listener.local_addr().to_string();
        let server = thread::spawn(move || listener.accept().expect("listener should accept"));
        let _client = create_client(&addr).expect("client should connect");
        let mut server = server.join().expect("server thread should finish");

        let err = server.recv_frame().unwrap_err();
        assert!(matches!(
            err,
            EndpointError::Io(ref e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
        ));
        assert_eq!(server.state(), EndpointState::Closed);
    }

    #[test]
    fn send_after_peer_close_is_disconnected() {
        let (mut server, client) = pair();
        drop(client);

        // The first writes may land in the socket buffer before the reset comes back.
        let payload = [0u8; 1024];
        let mut outcome = Ok(());
        for _ in 0..200 {
            outcome = server.send_bytes(&payload);
            if outcome.is_err() {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }

        assert!(matches!(outcome, Err(EndpointError::Disconnected)));
        assert_eq!(server.state(), EndpointState::Closed);
        assert!(server.close().is_ok());
    }

    #[test]
    fn write_timeout_fails_send_to_stalled_peer() {
        let listener = ServerListener::bind("127.0.0.1:0").expect("listener should bind");
        let addr = listener.local_addr().to_string();
        let server = thread::spawn(move || listener.accept().expect("listener should accept"));
        let mut client = crate::connector::create_client_with_config(
            &addr,
            EndpointConfig::default().with_write_timeout(Some(Duration::from_millis(100))),
        )
        .expect("client should connect");
        // Held open but never read, so the socket buffers fill up.
        let _server = server.join().expect("server thread should finish");

        let (done_tx, done_rx) = std::sync::mpsc::channel();
        let sender = thread::spawn(move || {
            let payload = vec![0u8; 64 * 1024 * 1024];
            let result = client.send_bytes(&payload);
            let state = client.state();
            let _ = done_tx.send(());
            (result, state)
        });

        done_rx
            .recv_timeout(Duration::from_secs(10))
            .expect("send should give up once the write timeout expires");
        let (result, state) = sender.join().expect("sender thread should finish");

        assert!(matches!(
            result,
            Err(EndpointError::Io(ref e)) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
        ));
        assert_eq!(state, EndpointState::Closed);
    }

    #[test]
    fn roles_and_addresses() {
        let (server, client) = pair();

        assert_eq!(server.role(), EndpointRole::Accepted);
        assert_eq!(client.role(), EndpointRole::Client);
        assert_eq!(server.peer_addr(), client.local_addr());
        assert_eq!(client.peer_addr(), server.local_addr());
        assert!(server.local_addr().as_socket().is_some());
        assert_eq!(EndpointRole::Accepted.to_string(), "accepted");
        assert_eq!(EndpointAddr::Memory.to_string(), "memory");
        assert!(format!("{client:?}").contains("Open"));
    }
}
