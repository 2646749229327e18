//! TCP Server
//!
//! Accepts connections and drives every one of them from `poll`.

use std::collections::HashMap;
use std::io;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};

use bytes::Bytes;
use crossbeam::channel::Receiver;

use crate::config::Config;
use crate::error::{Result, TransportError};

use super::connection::{Connection, ReceiveOutcome};
use super::events::{DisconnectReason, ServerEvent};
use super::peer::Peer;

/// A server which accepts connections from `Client`s
///
/// ## Tick
/// Each `poll` runs three steps in order:
/// 1. accept at most one pending connection
/// 2. flush and receive once on every connection
/// 3. remove every connection marked closed during this tick
///
/// The table is never mutated while step 2 walks it.
pub struct Server {
    peer: Peer<ServerEvent>,

    /// Listening socket, `Some` while running
    listener: Option<TcpListener>,

    /// Port passed to the last `start`
    port: u16,

    /// Open connections by endpoint
    connections: HashMap<SocketAddr, Connection>,

    /// Endpoints to remove at the end of the tick
    closed: HashMap<SocketAddr, DisconnectReason>,
}

impl Server {
    /// Create a server with the given config
    pub fn new(config: Config) -> Result<Self> {
        Ok(Self {
            peer: Peer::new(config)?,
            listener: None,
            port: 0,
            connections: HashMap::new(),
            closed: HashMap::new(),
        })
    }

    /// Receiver for the events this server raises
    pub fn events(&self) -> Receiver<ServerEvent> {
        self.peer.subscribe()
    }

    /// Start listening on `port` (0 picks a free port)
    ///
    /// Restarting a running server closes its listener and connections first.
    pub fn start(&mut self, port: u16) -> Result<()> {
        if self.is_running() {
            self.shutdown();
        }

        let local = SocketAddr::new(self.peer.config().listen_addr, port);
        let socket = self.peer.new_socket(&local)?;
        socket.bind(&local.into())?;
        socket.listen(self.peer.config().max_pending_connections)?;
        socket.set_nonblocking(true)?;

        let listener: TcpListener = socket.into();
        let bound = listener.local_addr()?;

        self.port = port;
        self.connections = HashMap::new();
        self.closed.clear();
        self.listener = Some(listener);

        tracing::info!("Server listening on {}", bound);
        Ok(())
    }

    /// Perform all pending non-blocking work
    ///
    /// Does nothing when the server is not running.
    pub fn poll(&mut self) {
        if !self.is_running() {
            return;
        }

        self.accept();
        self.receive();
        self.prune();
    }

    /// Accept one pending connection, if there is one
    fn accept(&mut self) {
        let Some(listener) = self.listener.as_ref() else {
            return;
        };

        match listener.accept() {
            Ok((stream, remote)) => {
                self.admit(stream, remote);
            }
            Err(ref e)
                if e.kind() == io::ErrorKind::WouldBlock
                    || e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => tracing::warn!("Error accepting connection: {}", e),
        }
    }

    /// Insert an accepted stream unless its endpoint is already known
    ///
    /// A duplicate endpoint's stream is closed and the table is left as is.
    fn admit(&mut self, stream: TcpStream, remote: SocketAddr) -> bool {
        if self.connections.contains_key(&remote) {
            tracing::debug!("Rejecting duplicate connection from {}", remote);
            let _ = stream.shutdown(Shutdown::Both);
            return false;
        }

        if let Err(e) = self.peer.configure_stream(&stream) {
            tracing::warn!("Failed to configure connection from {}: {}", remote, e);
            let _ = stream.shutdown(Shutdown::Both);
            return false;
        }

        self.connections.insert(remote, Connection::accepted(stream, remote));
        tracing::info!("Accepted connection from {}", remote);
        self.peer.emit(ServerEvent::Connected { remote });
        true
    }

    /// Flush and receive once on every connection
    fn receive(&mut self) {
        let Self {
            peer,
            connections,
            closed,
            ..
        } = self;

        for (remote, connection) in connections.iter_mut() {
            if !connection.is_open() {
                continue;
            }

            let outcome = match connection.flush() {
                Ok(()) => connection.receive(peer.buffer_mut()),
                Err(e) => {
                    tracing::debug!("Error writing to {}: {}", remote, e);
                    ReceiveOutcome::Closed(DisconnectReason::Io(e.kind()))
                }
            };

            match outcome {
                ReceiveOutcome::Idle => {}
                ReceiveOutcome::Data(amount) => Self::on_data_received(peer, connection, amount),
                ReceiveOutcome::Closed(reason) => {
                    connection.close();
                    closed.entry(*remote).or_insert(reason);
                }
            }
        }
    }

    /// Forward a reception, dropping repeated connect handshakes
    fn on_data_received(peer: &Peer<ServerEvent>, connection: &mut Connection, amount: usize) {
        let payload = &peer.buffer()[..amount];
        if !connection.accept_handshake(payload) {
            tracing::debug!("Dropping duplicate connect from {}", connection.remote_addr());
            return;
        }

        peer.emit(ServerEvent::DataReceived {
            remote: connection.remote_addr(),
            data: Bytes::copy_from_slice(payload),
        });
    }

    /// Remove the connections marked closed
    fn prune(&mut self) {
        for (remote, reason) in self.closed.drain() {
            if self.connections.remove(&remote).is_some() {
                tracing::info!("Connection {} removed: {:?}", remote, reason);
                self.peer.emit(ServerEvent::Disconnected { remote, reason });
            }
        }
    }

    /// Send bytes to a connected endpoint
    pub fn send(&mut self, remote: SocketAddr, data: &[u8]) -> Result<()> {
        self.connections
            .get_mut(&remote)
            .ok_or(TransportError::UnknownConnection(remote))?
            .send(data)
    }

    /// Close a connection
    ///
    /// The socket closes now; the entry leaves the table on the next `poll`.
    /// Unknown or already closed endpoints are ignored.
    pub fn close(&mut self, remote: SocketAddr) {
        if let Some(connection) = self.connections.get_mut(&remote) {
            connection.close();
            self.closed.entry(remote).or_insert(DisconnectReason::LocalClosed);
        }
    }

    /// Stop listening and close every connection
    ///
    /// Raises no events. Safe to call when not running.
    pub fn shutdown(&mut self) {
        if let Some(listener) = self.listener.take() {
            drop(listener);
            tracing::info!("Server on port {} stopped listening", self.port);
        }

        for (_, mut connection) in self.connections.drain() {
            connection.close();
        }
        self.closed.clear();
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn is_running(&self) -> bool {
        self.listener.is_some()
    }

    /// Port passed to the last `start`
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Address the listener is bound to, while running
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().and_then(|l| l.local_addr().ok())
    }

    /// Number of entries in the connection table
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn connection(&self, remote: &SocketAddr) -> Option<&Connection> {
        self.connections.get(remote)
    }

    pub fn config(&self) -> &Config {
        self.peer.config()
    }
}
