//! Connection Handler Module
//!
//! This module handles individual client connections to slotkv.
//! Each client gets its own handler task that runs in a loop,
//! reading lines and sending replies.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Client connects (TCP handshake)
//!        │
//!        ▼
//! 2. ConnectionHandler spawned, greeting sent
//!        │
//!        ▼
//! 3. ┌──────────────────────────────┐
//!    │      Main Loop               │
//!    │                              │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Read until a full line  │ │◄── idle timeout / shutdown
//!    │  └───────────┬─────────────┘ │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Parse command           │ │
//!    │  └───────────┬─────────────┘ │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Execute against store   │ │──► q / Q: echo, close
//!    │  └───────────┬─────────────┘ │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Send reply              │ │
//!    │  └───────────┬─────────────┘ │
//!    │              ▼               │
//!    │         [Loop back]          │
//!    └──────────────────────────────┘
//!        │
//!        ▼
//! 4. Client quits / disconnects / error
//!        │
//!        ▼
//! 5. Handler task ends, socket closed
//! ```
//!
//! ## Buffer Management
//!
//! Incoming bytes accumulate in a `BytesMut` until a newline shows up. TCP
//! may split a line across reads or deliver several lines at once; both
//! cases are handled. A line longer than the configured limit is skipped up
//! to its newline without growing the buffer, answered with an error reply,
//! and the connection carries on with the next line.

use crate::commands::CommandHandler;
use crate::protocol::{
    parse_command, strip_line_terminator, LineParser, Reply, GREETING, MAX_LINE_LENGTH,
};
use bytes::{Buf, Bytes, BytesMut};
use std::future::{self, Future};
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 1024;

/// How long closing the socket may wait on unsent replies
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total commands processed
    pub commands_processed: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn active(&self) -> u64 {
        self.active_connections.load(Ordering::Relaxed)
    }
}

/// Per-connection limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionOptions {
    /// Close the connection when no data arrives for this long (None = wait forever)
    pub idle_timeout: Option<Duration>,
    /// Longest accepted request line, terminator excluded
    pub max_line_length: usize,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            idle_timeout: None,
            max_line_length: MAX_LINE_LENGTH,
        }
    }
}

/// Handles a single client connection.
///
/// Generic over the transport so it can run on a `TcpStream` or on any
/// in-memory stream implementing `AsyncRead + AsyncWrite`.
pub struct ConnectionHandler<S> {
    /// The transport for this connection
    stream: BufWriter<S>,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// Buffer for incoming data
    buffer: BytesMut,

    /// The command handler (store shared across connections)
    command_handler: CommandHandler,

    /// Line framing
    parser: LineParser,

    /// Idle timeout
    idle_timeout: Option<Duration>,

    /// Server shutdown signal, if any
    shutdown: Option<watch::Receiver<bool>>,

    /// Set while skipping the tail of an oversized line; the reply it is owed
    discarding: Option<Reply>,

    /// Connection statistics (shared)
    stats: Arc<ConnectionStats>,
}

impl<S> ConnectionHandler<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new connection handler with default options and no shutdown signal.
    ///
    /// # Arguments
    ///
    /// * `stream` - The transport for this connection
    /// * `addr` - The client's socket address
    /// * `command_handler` - The command handler for executing commands
    /// * `stats` - Shared connection statistics
    pub fn new(
        stream: S,
        addr: SocketAddr,
        command_handler: CommandHandler,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        let options = ConnectionOptions::default();
        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            command_handler,
            parser: LineParser::with_max_line_length(options.max_line_length),
            idle_timeout: options.idle_timeout,
            shutdown: None,
            discarding: None,
            stats,
        }
    }

    /// Applies per-connection limits.
    pub fn with_options(mut self, options: ConnectionOptions) -> Self {
        self.parser = LineParser::with_max_line_length(options.max_line_length);
        self.idle_timeout = options.idle_timeout;
        self
    }

    /// Makes the handler stop waiting for input once `shutdown` turns true.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Runs the connection to completion.
    ///
    /// Returns `Ok(())` when the client quits with `q`/`Q`; every other way
    /// of ending the session is reported as a [`ConnectionError`].
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        self.stats.connection_opened();
        info!(client = %self.addr, "Client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(client = %self.addr, "Client quit"),
            Err(e) if e.is_disconnect() => {
                info!(client = %self.addr, "Client disconnected")
            }
            Err(ConnectionError::Shutdown) => {
                debug!(client = %self.addr, "Connection closed for server shutdown")
            }
            Err(ConnectionError::IdleTimeout(limit)) => {
                info!(
                    client = %self.addr,
                    timeout_secs = limit.as_secs_f64(),
                    "Idle timeout, closing connection"
                )
            }
            Err(e) => warn!(client = %self.addr, error = %e, "Connection error"),
        }

        // Best effort: the peer may already be gone, or may never read what is left
        let _ = tokio::time::timeout(CLOSE_TIMEOUT, self.stream.shutdown()).await;
        self.stats.connection_closed();
        result
    }

    /// The read-execute-respond loop.
    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        self.send_bytes(GREETING).await?;

        loop {
            while let Some(frame) = self.next_frame() {
                let keep_going = match frame {
                    Frame::Line(raw) => self.process_line(raw).await?,
                    Frame::Oversized(reply) => {
                        self.stats.command_processed();
                        self.send_bytes(&reply.serialize()).await?;
                        true
                    }
                };
                if !keep_going {
                    return Ok(());
                }
            }

            self.read_more_data().await?;
        }
    }

    /// Takes the next unit of work off the front of the buffer.
    ///
    /// Returns `None` when more data is needed. An oversized line yields a
    /// single [`Frame::Oversized`] once its terminating newline has arrived;
    /// until then its bytes are dropped as they come in.
    fn next_frame(&mut self) -> Option<Frame> {
        if self.discarding.is_none() {
            match self.parser.parse(&self.buffer) {
                Ok(Some((_, consumed))) => {
                    let raw = self.buffer.split_to(consumed).freeze();
                    trace!(
                        client = %self.addr,
                        consumed = consumed,
                        remaining = self.buffer.len(),
                        "Framed line"
                    );
                    return Some(Frame::Line(raw));
                }
                Ok(None) => return None,
                Err(e) => {
                    warn!(client = %self.addr, error = %e, "Discarding oversized line");
                    self.discarding = Some(oversized_reply(&self.buffer));
                }
            }
        }

        match self.buffer.iter().position(|&b| b == b'\n') {
            Some(pos) => {
                self.buffer.advance(pos + 1);
                self.discarding.take().map(Frame::Oversized)
            }
            None => {
                self.buffer.clear();
                None
            }
        }
    }

    /// Handles one line. Returns `false` once the session is over.
    async fn process_line(&mut self, raw: Bytes) -> Result<bool, ConnectionError> {
        let command = parse_command(strip_line_terminator(&raw));
        debug!(
            client = %self.addr,
            message = %String::from_utf8_lossy(strip_line_terminator(&raw)),
            command = command.name(),
            "Client message"
        );

        let reply = self.command_handler.execute(command);
        self.stats.command_processed();

        if reply == Reply::Quit {
            // Legacy clients expect their quit line echoed back before the close
            self.send_bytes(&raw).await?;
            return Ok(false);
        }

        self.send_bytes(&reply.serialize()).await?;
        Ok(true)
    }

    /// Reads more data from the transport into the buffer.
    ///
    /// Waits are bounded by the idle timeout and cut short by the shutdown
    /// signal.
    async fn read_more_data(&mut self) -> Result<(), ConnectionError> {
        if self.buffer.capacity() - self.buffer.len() < 256 {
            self.buffer.reserve(INITIAL_BUFFER_SIZE);
        }

        let idle_timeout = self.idle_timeout;
        let stream = self.stream.get_mut();
        let buffer = &mut self.buffer;
        let shutdown = &mut self.shutdown;

        let read = with_idle_timeout(idle_timeout, stream.read_buf(buffer));

        let n = tokio::select! {
            result = read => result?,
            _ = shutdown_signalled(shutdown) => return Err(ConnectionError::Shutdown),
        };

        if n == 0 {
            // Connection closed by client
            if self.buffer.is_empty() && self.discarding.is_none() {
                return Err(ConnectionError::ClientDisconnected);
            } else {
                debug!(
                    client = %self.addr,
                    discarded = self.buffer.len(),
                    "Discarding unterminated line at end of stream"
                );
                return Err(ConnectionError::UnexpectedEof);
            }
        }

        self.stats.bytes_read(n);
        trace!(client = %self.addr, bytes = n, "Read data");

        Ok(())
    }

    /// Writes `bytes` fully to the client.
    ///
    /// A peer that stops reading cannot stall the handler: the write is
    /// bounded by the idle timeout and abandoned on shutdown.
    async fn send_bytes(&mut self, bytes: &[u8]) -> Result<(), ConnectionError> {
        let idle_timeout = self.idle_timeout;
        let stream = &mut self.stream;
        let shutdown = &mut self.shutdown;

        let write = with_idle_timeout(idle_timeout, async move {
            stream.write_all(bytes).await?;
            stream.flush().await
        });

        tokio::select! {
            // A reply the peer is ready to take still goes out during shutdown
            biased;
            result = write => result?,
            _ = shutdown_signalled(shutdown) => return Err(ConnectionError::Shutdown),
        }

        self.stats.bytes_written(bytes.len());
        trace!(
            client = %self.addr,
            bytes = bytes.len(),
            "Sent response"
        );
        Ok(())
    }
}

/// One unit of work taken off the read buffer.
enum Frame {
    /// A complete line, terminator included
    Line(Bytes),
    /// An oversized line was skipped; it is answered with this reply
    Oversized(Reply),
}

/// Reply owed for a line over the length limit. Only a `set` can carry that
/// much data legitimately; anything else is not a command.
fn oversized_reply(head: &[u8]) -> Reply {
    let mut tokens = head
        .split(|b| b.is_ascii_whitespace())
        .filter(|token| !token.is_empty());
    match tokens.next() {
        Some(b"set") => Reply::ValueTooLong,
        _ => Reply::InvalidCommand,
    }
}

/// Runs an I/O future, failing with [`ConnectionError::IdleTimeout`] if it
/// takes longer than `limit`.
async fn with_idle_timeout<F, T>(limit: Option<Duration>, op: F) -> Result<T, ConnectionError>
where
    F: Future<Output = io::Result<T>>,
{
    match limit {
        Some(limit) => match tokio::time::timeout(limit, op).await {
            Ok(result) => result.map_err(ConnectionError::from),
            Err(_) => Err(ConnectionError::IdleTimeout(limit)),
        },
        None => op.await.map_err(ConnectionError::from),
    }
}

/// Resolves once the shutdown flag is set. Never resolves without a signal.
async fn shutdown_signalled(shutdown: &mut Option<watch::Receiver<bool>>) {
    match shutdown {
        Some(rx) => {
            let signalled = rx.wait_for(|stop| *stop).await.is_ok();
            if !signalled {
                // Sender dropped without signalling: nobody can stop us now
                future::pending::<()>().await
            }
        }
        None => future::pending::<()>().await,
    }
}

/// Errors that can occur while handling a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// Client disconnected normally
    #[error("Client disconnected")]
    ClientDisconnected,

    /// Unexpected end of stream (partial line)
    #[error("Unexpected end of stream")]
    UnexpectedEof,

    /// No data arrived within the idle timeout
    #[error("Idle for more than {0:?}")]
    IdleTimeout(Duration),

    /// The server is shutting down
    #[error("Server shutting down")]
    Shutdown,
}

impl ConnectionError {
    /// True when the peer simply went away.
    pub fn is_disconnect(&self) -> bool {
        match self {
            ConnectionError::ClientDisconnected | ConnectionError::UnexpectedEof => true,
            ConnectionError::IoError(e) => matches!(
                e.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }
}

/// Handles a client TCP connection.
///
/// This is a convenience function that creates a ConnectionHandler
/// and runs it to completion. Errors are logged by the handler and end
/// only this connection.
///
/// # Arguments
///
/// * `stream` - The TCP stream for this connection
/// * `addr` - The client's socket address
/// * `command_handler` - The command handler for executing commands
/// * `stats` - Shared connection statistics
/// * `options` - Per-connection limits
/// * `shutdown` - Server shutdown signal
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    command_handler: CommandHandler,
    stats: Arc<ConnectionStats>,
    options: ConnectionOptions,
    shutdown: watch::Receiver<bool>,
) {
    if let Err(e) = stream.set_nodelay(true) {
        debug!(client = %addr, error = %e, "Failed to set TCP_NODELAY");
    }

    let handler = ConnectionHandler::new(stream, addr, command_handler, stats)
        .with_options(options)
        .with_shutdown(shutdown);

    if let Err(e) = handler.run().await {
        trace!(client = %addr, error = %e, "Connection ended");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::{INVALID_COMMAND, OUT_OF_RANGE, SET_OK, VALUE_TOO_LONG};
    use crate::storage::SlotStore;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio_test::io::Builder;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    fn create_handler<S>(stream: S) -> (ConnectionHandler<S>, Arc<SlotStore>, Arc<ConnectionStats>)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let storage = Arc::new(SlotStore::new());
        let stats = Arc::new(ConnectionStats::new());
        let handler = ConnectionHandler::new(
            stream,
            test_addr(),
            CommandHandler::new(Arc::clone(&storage)),
            Arc::clone(&stats),
        );
        (handler, storage, stats)
    }

    #[tokio::test]
    async fn test_greeting_then_get() {
        let mock = Builder::new()
            .write(GREETING)
            .read(b"get 0\n")
            .write(b"Yarara")
            .build();

        let (handler, _, _) = create_handler(mock);
        let result = handler.run().await;

        assert!(matches!(result, Err(ConnectionError::ClientDisconnected)));
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let mock = Builder::new()
            .write(GREETING)
            .read(b"set 2 Gato\n")
            .write(SET_OK)
            .read(b"get 2\r\n")
            .write(b"Gato")
            .build();

        let (handler, storage, _) = create_handler(mock);
        let _ = handler.run().await;

        assert_eq!(storage.get(2).unwrap(), "Gato");
    }

    #[tokio::test]
    async fn test_protocol_errors_keep_connection_open() {
        let too_long = format!("set 0 {}\n", "x".repeat(40));
        let mock = Builder::new()
            .write(GREETING)
            .read(b"get 99\n")
            .write(OUT_OF_RANGE)
            .read(too_long.as_bytes())
            .write(VALUE_TOO_LONG)
            .read(b"hello\n")
            .write(INVALID_COMMAND)
            .read(b"get 0\n")
            .write(b"Yarara")
            .build();

        let (handler, storage, stats) = create_handler(mock);
        let result = handler.run().await;

        assert!(matches!(result, Err(ConnectionError::ClientDisconnected)));
        assert_eq!(storage.get(0).unwrap(), "Yarara");
        assert_eq!(stats.commands_processed.load(Ordering::Relaxed), 4);
    }

    #[tokio::test]
    async fn test_quit_echoes_and_closes() {
        let mock = Builder::new()
            .write(GREETING)
            .read(b"q\n")
            .write(b"q\n")
            .build();

        let (handler, _, stats) = create_handler(mock);
        let result = handler.run().await;

        assert!(result.is_ok());
        assert_eq!(stats.active(), 0);
    }

    #[tokio::test]
    async fn test_quit_stops_pipelined_lines() {
        let mock = Builder::new()
            .write(GREETING)
            .read(b"Q\nset 0 never\n")
            .write(b"Q\n")
            .build();

        let (handler, storage, _) = create_handler(mock);
        assert!(handler.run().await.is_ok());
        assert_eq!(storage.get(0).unwrap(), "Yarara");
    }

    #[tokio::test]
    async fn test_line_split_across_reads() {
        let mock = Builder::new()
            .write(GREETING)
            .read(b"ge")
            .read(b"t 1")
            .read(b"\n")
            .write(b"Tejon")
            .build();

        let (handler, _, _) = create_handler(mock);
        let _ = handler.run().await;
    }

    #[tokio::test]
    async fn test_pipelined_lines() {
        let mock = Builder::new()
            .write(GREETING)
            .read(b"set 4 Bota\nget 4\nget 3\n")
            .write(SET_OK)
            .write(b"Bota")
            .write(b"Dinosaurio")
            .build();

        let (handler, _, _) = create_handler(mock);
        let _ = handler.run().await;
    }

    #[tokio::test]
    async fn test_unterminated_line_at_eof() {
        let mock = Builder::new().write(GREETING).read(b"get 0").build();

        let (handler, _, _) = create_handler(mock);
        let result = handler.run().await;

        assert!(matches!(result, Err(ConnectionError::UnexpectedEof)));
    }

    #[tokio::test]
    async fn test_oversized_set_is_answered_and_connection_survives() {
        let oversized = format!("set 0 {}\n", "x".repeat(5000));
        let mock = Builder::new()
            .write(GREETING)
            .read(oversized.as_bytes())
            .write(VALUE_TOO_LONG)
            .read(b"get 0\n")
            .write(b"Yarara")
            .build();

        let (handler, storage, stats) = create_handler(mock);
        let result = handler.run().await;

        assert!(matches!(result, Err(ConnectionError::ClientDisconnected)));
        assert_eq!(storage.get(0).unwrap(), "Yarara");
        assert_eq!(stats.commands_processed.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn test_oversized_line_skipped_across_reads() {
        let mock = Builder::new()
            .write(GREETING)
            .read(b"hello wor")
            .read(b"ld and more")
            .read(b" and more\nget 1\n")
            .write(INVALID_COMMAND)
            .write(b"Tejon")
            .build();

        let (handler, _, _) = create_handler(mock);
        let handler = handler.with_options(ConnectionOptions {
            idle_timeout: None,
            max_line_length: 8,
        });
        let result = handler.run().await;

        assert!(matches!(result, Err(ConnectionError::ClientDisconnected)));
    }

    #[tokio::test]
    async fn test_eof_inside_oversized_line() {
        let mock = Builder::new()
            .write(GREETING)
            .read(b"set 0 xxxxxxxxxxxxxxxx")
            .build();

        let (handler, _, _) = create_handler(mock);
        let handler = handler.with_options(ConnectionOptions {
            idle_timeout: None,
            max_line_length: 8,
        });
        let result = handler.run().await;

        assert!(matches!(result, Err(ConnectionError::UnexpectedEof)));
    }

    #[test]
    fn test_oversized_reply() {
        assert_eq!(oversized_reply(b"set 0 xxxx"), Reply::ValueTooLong);
        assert_eq!(oversized_reply(b"  set\t1 xxxx"), Reply::ValueTooLong);
        assert_eq!(oversized_reply(b"get 00000000"), Reply::InvalidCommand);
        assert_eq!(oversized_reply(b"settle 1"), Reply::InvalidCommand);
        assert_eq!(oversized_reply(b""), Reply::InvalidCommand);
    }

    #[tokio::test]
    async fn test_idle_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (handler, _, _) = create_handler(stream);
            handler
                .with_options(ConnectionOptions {
                    idle_timeout: Some(Duration::from_millis(100)),
                    ..ConnectionOptions::default()
                })
                .run()
                .await
        });

        let mut client = TcpStream::connect(addr).await.unwrap();
        let mut greeting = [0u8; 12];
        client.read_exact(&mut greeting).await.unwrap();
        assert_eq!(&greeting, GREETING);

        // Say nothing; the server should hang up
        let mut buf = [0u8; 16];
        let n = tokio::time::timeout(Duration::from_secs(5), client.read(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(n, 0);

        let result = server.await.unwrap();
        assert!(matches!(result, Err(ConnectionError::IdleTimeout(_))));
    }

    #[tokio::test]
    async fn test_shutdown_while_waiting_for_input() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (handler, _, _) = create_handler(stream);
            handler.with_shutdown(shutdown_rx).run().await
        });

        let mut client = TcpStream::connect(addr).await.unwrap();
        let mut greeting = [0u8; 12];
        client.read_exact(&mut greeting).await.unwrap();

        // One request still completes normally
        client.write_all(b"get 1\n").await.unwrap();
        let mut value = [0u8; 5];
        client.read_exact(&mut value).await.unwrap();
        assert_eq!(&value, b"Tejon");

        shutdown_tx.send(true).unwrap();

        let result = tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(result, Err(ConnectionError::Shutdown)));

        let mut buf = [0u8; 16];
        assert_eq!(client.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_while_client_not_reading() {
        // Room for the greeting and a few replies, then writes block
        let (mut client, server_side) = tokio::io::duplex(64);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let (handler, _, stats) = create_handler(server_side);
        let server = tokio::spawn(handler.with_shutdown(shutdown_rx).run());

        client.write_all(&b"get 3\n".repeat(10)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!server.is_finished());

        shutdown_tx.send(true).unwrap();

        let result = tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(result, Err(ConnectionError::Shutdown)));
        assert_eq!(stats.active(), 0);
    }

    #[tokio::test]
    async fn test_idle_timeout_while_client_not_reading() {
        let (mut client, server_side) = tokio::io::duplex(64);

        let (handler, _, _) = create_handler(server_side);
        let server = tokio::spawn(
            handler
                .with_options(ConnectionOptions {
                    idle_timeout: Some(Duration::from_millis(100)),
                    ..ConnectionOptions::default()
                })
                .run(),
        );

        client.write_all(&b"get 3\n".repeat(10)).await.unwrap();

        let result = tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(result, Err(ConnectionError::IdleTimeout(_))));
    }

    #[tokio::test]
    async fn test_connection_stats() {
        let mock = Builder::new()
            .write(GREETING)
            .read(b"get 0\n")
            .write(b"Yarara")
            .build();

        let (handler, _, stats) = create_handler(mock);
        assert_eq!(stats.connections_accepted.load(Ordering::Relaxed), 0);

        let _ = handler.run().await;

        assert_eq!(stats.connections_accepted.load(Ordering::Relaxed), 1);
        assert_eq!(stats.active(), 0);
        assert_eq!(stats.commands_processed.load(Ordering::Relaxed), 1);
        assert_eq!(stats.bytes_read.load(Ordering::Relaxed), 6);
        assert_eq!(
            stats.bytes_written.load(Ordering::Relaxed),
            (GREETING.len() + "Yarara".len()) as u64
        );
    }

    #[tokio::test]
    async fn test_handler_dropped_without_running() {
        let (handler, _, stats) = create_handler(Builder::new().build());
        drop(handler);

        assert_eq!(stats.connections_accepted.load(Ordering::Relaxed), 0);
        assert_eq!(stats.active(), 0);
    }

    #[test]
    fn test_is_disconnect() {
        assert!(ConnectionError::ClientDisconnected.is_disconnect());
        assert!(ConnectionError::IoError(io::ErrorKind::BrokenPipe.into()).is_disconnect());
        assert!(!ConnectionError::Shutdown.is_disconnect());
    }
}
