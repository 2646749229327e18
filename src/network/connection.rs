//! Connection
//!
//! Wraps a single TCP stream owned by a client or a server.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::{Duration, Instant};

use bytes::{Buf, BytesMut};

use crate::error::{Result, TransportError};
use crate::protocol::is_connect;

use super::events::{ConnectFailure, DisconnectReason};

/// Lifecycle of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Outbound connection attempt not yet resolved by the OS
    Connecting,

    /// Established, bytes can flow
    Open,

    /// Outbound connection attempt failed (terminal)
    Failed,

    /// Closed locally or by the remote side (terminal)
    Closed,
}

/// Result of one non-blocking receive step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// Nothing to read right now
    Idle,

    /// This many bytes were written to the front of the buffer
    Data(usize),

    /// The stream is finished; the owner should close and remove it
    Closed(DisconnectReason),
}

/// Result of checking a pending outbound connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConnectProgress {
    Pending,
    Established,
    Failed(ConnectFailure),
}

/// A single TCP connection
///
/// The stream is always non-blocking. Dropping the stream (on `close`) releases
/// the socket, so no connection outlives its socket.
pub struct Connection {
    /// The socket, `None` once closed
    stream: Option<TcpStream>,

    /// Remote endpoint identity
    remote: SocketAddr,

    /// Current lifecycle state
    state: ConnectionState,

    /// Whether a connect handshake has already been forwarded
    handshake_seen: bool,

    /// Bytes accepted by `send` but not yet taken by the socket
    outbound: BytesMut,

    /// When the connection object was created
    created_at: Instant,

    /// Error returned synchronously by the OS when the connect was issued
    deferred_failure: Option<io::ErrorKind>,
}

impl Connection {
    /// Wrap a socket returned by `accept`
    pub(crate) fn accepted(stream: TcpStream, remote: SocketAddr) -> Self {
        Self::with_state(stream, remote, ConnectionState::Open)
    }

    /// Wrap a socket on which a non-blocking connect was issued
    pub(crate) fn connecting(stream: TcpStream, remote: SocketAddr) -> Self {
        Self::with_state(stream, remote, ConnectionState::Connecting)
    }

    fn with_state(stream: TcpStream, remote: SocketAddr, state: ConnectionState) -> Self {
        Self {
            stream: Some(stream),
            remote,
            state,
            handshake_seen: false,
            outbound: BytesMut::new(),
            created_at: Instant::now(),
            deferred_failure: None,
        }
    }

    /// Record a connect error to be reported on the next poll
    pub(crate) fn defer_failure(&mut self, kind: io::ErrorKind) {
        self.deferred_failure = Some(kind);
    }

    /// Resolve a pending outbound connection without blocking
    pub(crate) fn poll_connect(&mut self, timeout: Duration) -> ConnectProgress {
        debug_assert_eq!(self.state, ConnectionState::Connecting);

        let progress = match (self.deferred_failure.take(), self.stream.as_ref()) {
            (Some(kind), _) => ConnectProgress::Failed(ConnectFailure::Io(kind)),
            (None, None) => {
                ConnectProgress::Failed(ConnectFailure::Io(io::ErrorKind::NotConnected))
            }
            (None, Some(stream)) => match stream.take_error() {
                Ok(Some(e)) | Err(e) => ConnectProgress::Failed(ConnectFailure::Io(e.kind())),
                Ok(None) => match stream.peer_addr() {
                    Ok(_) => ConnectProgress::Established,
                    Err(e) if e.kind() == io::ErrorKind::NotConnected => {
                        if self.created_at.elapsed() >= timeout {
                            ConnectProgress::Failed(ConnectFailure::TimedOut)
                        } else {
                            ConnectProgress::Pending
                        }
                    }
                    Err(e) => ConnectProgress::Failed(ConnectFailure::Io(e.kind())),
                },
            },
        };

        match progress {
            ConnectProgress::Established => {
                self.state = ConnectionState::Open;
                tracing::debug!("Connection to {} established", self.remote);
            }
            ConnectProgress::Failed(failure) => {
                tracing::debug!("Connection to {} failed: {:?}", self.remote, failure);
                self.release();
                self.state = ConnectionState::Failed;
            }
            ConnectProgress::Pending => {}
        }

        progress
    }

    /// Attempt one non-blocking read into `buffer`
    ///
    /// Ordinary disconnects are reported as `ReceiveOutcome::Closed`, never as
    /// errors. The connection is not closed here; that is the owner's call.
    pub fn receive(&mut self, buffer: &mut [u8]) -> ReceiveOutcome {
        if self.state != ConnectionState::Open {
            return ReceiveOutcome::Idle;
        }
        let Some(stream) = self.stream.as_mut() else {
            return ReceiveOutcome::Idle;
        };

        match stream.read(buffer) {
            Ok(0) => {
                tracing::debug!("Connection {} closed by remote", self.remote);
                ReceiveOutcome::Closed(DisconnectReason::RemoteClosed)
            }
            Ok(amount) => {
                tracing::trace!("Received {} bytes from {}", amount, self.remote);
                ReceiveOutcome::Data(amount)
            }
            Err(ref e)
                if e.kind() == io::ErrorKind::WouldBlock
                    || e.kind() == io::ErrorKind::Interrupted =>
            {
                ReceiveOutcome::Idle
            }
            Err(ref e)
                if e.kind() == io::ErrorKind::ConnectionReset
                    || e.kind() == io::ErrorKind::ConnectionAborted =>
            {
                tracing::debug!("Connection {} reset by remote", self.remote);
                ReceiveOutcome::Closed(DisconnectReason::RemoteClosed)
            }
            Err(e) => {
                tracing::warn!("Error reading from {}: {}", self.remote, e);
                ReceiveOutcome::Closed(DisconnectReason::Io(e.kind()))
            }
        }
    }

    /// Queue bytes for the remote side and write as much as possible now
    pub fn send(&mut self, data: &[u8]) -> Result<()> {
        if self.state != ConnectionState::Open {
            return Err(TransportError::NotConnected);
        }
        self.outbound.extend_from_slice(data);
        self.flush()?;
        Ok(())
    }

    /// Write queued outbound bytes without blocking
    ///
    /// Leaves whatever the socket would not take in the queue.
    pub fn flush(&mut self) -> io::Result<()> {
        if self.state != ConnectionState::Open {
            return Ok(());
        }
        let Some(stream) = self.stream.as_mut() else {
            return Ok(());
        };

        while !self.outbound.is_empty() {
            match stream.write(&self.outbound) {
                Ok(0) => return Err(io::Error::from(io::ErrorKind::WriteZero)),
                Ok(written) => {
                    tracing::trace!("Sent {} bytes to {}", written, self.remote);
                    self.outbound.advance(written);
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Close the socket
    ///
    /// Only the first call has an effect. The connection stays in whatever
    /// table holds it.
    pub fn close(&mut self) {
        if self.stream.is_none() {
            return;
        }
        self.release();
        if self.state != ConnectionState::Failed {
            self.state = ConnectionState::Closed;
        }
        tracing::debug!("Connection {} closed", self.remote);
    }

    fn release(&mut self) {
        if let Some(stream) = self.stream.take() {
            // The remote may already be gone
            let _ = stream.shutdown(Shutdown::Both);
        }
        self.outbound.clear();
    }

    /// Decide whether a received payload should be forwarded
    ///
    /// Connect payloads pass once per connection. Everything else always passes.
    pub fn accept_handshake(&mut self, payload: &[u8]) -> bool {
        if !is_connect(payload) {
            return true;
        }
        if self.handshake_seen {
            return false;
        }
        self.handshake_seen = true;
        true
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Remote endpoint identity
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote
    }

    /// Current lifecycle state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    /// Whether a connect handshake was already forwarded on this connection
    pub fn handshake_seen(&self) -> bool {
        self.handshake_seen
    }

    /// Bytes waiting for the socket to accept them
    pub fn pending_outbound(&self) -> usize {
        self.outbound.len()
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("remote", &self.remote)
            .field("state", &self.state)
            .field("handshake_seen", &self.handshake_seen)
            .field("pending_outbound", &self.outbound.len())
            .finish()
    }
}
