//! Line protocol client
//!
//! A minimal async client used by the `slotkv-cli` binary. It mirrors how
//! the interactive terminal talks to the server: one line out, one read in.
//!
//! The server frames `get` replies with nothing at all, so a response is
//! whatever a single read returns. That is fine for the short replies this
//! protocol produces on a local network.

use bytes::{Bytes, BytesMut};
use std::net::SocketAddr;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::trace;

/// Size of the receive buffer; longer responses arrive over several reads.
const RECV_BUFFER_SIZE: usize = 1024;

/// Errors returned by [`Client`].
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to connect: {0}")]
    Connect(#[source] std::io::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("server closed the connection")]
    Closed,
}

/// A connected session.
#[derive(Debug)]
pub struct Client {
    stream: TcpStream,
    greeting: Bytes,
}

impl Client {
    /// Connects and reads the server's greeting.
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await.map_err(ClientError::Connect)?;
        let mut client = Self {
            stream,
            greeting: Bytes::new(),
        };
        client.greeting = client.receive().await?;
        Ok(client)
    }

    /// The message the server sent on connect.
    pub fn greeting(&self) -> &Bytes {
        &self.greeting
    }

    /// The server's address.
    pub fn peer_addr(&self) -> std::io::Result<SocketAddr> {
        self.stream.peer_addr()
    }

    /// Sends one request line and returns the response.
    pub async fn request(&mut self, line: &str) -> Result<Bytes, ClientError> {
        self.send_line(line).await?;
        self.receive().await
    }

    /// Ends the session. Returns the server's echo of the quit line.
    pub async fn quit(mut self) -> Result<Bytes, ClientError> {
        self.send_line("q").await?;
        let echo = self.receive().await?;
        self.stream.shutdown().await?;
        Ok(echo)
    }

    async fn send_line(&mut self, line: &str) -> Result<(), ClientError> {
        let mut out = Vec::with_capacity(line.len() + 1);
        out.extend_from_slice(line.trim_end_matches(['\r', '\n']).as_bytes());
        out.push(b'\n');
        self.stream.write_all(&out).await?;
        trace!(bytes = out.len(), "Sent request");
        Ok(())
    }

    async fn receive(&mut self) -> Result<Bytes, ClientError> {
        let mut buf = BytesMut::with_capacity(RECV_BUFFER_SIZE);
        let n = self.stream.read_buf(&mut buf).await?;
        if n == 0 {
            return Err(ClientError::Closed);
        }
        trace!(bytes = n, "Received response");
        Ok(buf.freeze())
    }
}
