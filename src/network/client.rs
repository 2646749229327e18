//! TCP Client
//!
//! Holds at most one outbound connection and drives it from `poll`.

use std::net::{SocketAddr, TcpStream};

use bytes::Bytes;
use crossbeam::channel::Receiver;

use crate::address::parse_host_address;
use crate::config::Config;
use crate::error::{Result, TransportError};

use super::connection::{ConnectProgress, Connection, ConnectionState, ReceiveOutcome};
use super::events::{ClientEvent, DisconnectReason};
use super::peer::{connect_in_progress, Peer};

/// A client which connects to a `Server`
///
/// `connect` never blocks: it starts the attempt and returns a connection in
/// the `Connecting` state. The outcome arrives later as a `Connected` or
/// `ConnectionFailed` event from `poll`.
pub struct Client {
    peer: Peer<ClientEvent>,

    /// The connection to the server, if any
    connection: Option<Connection>,
}

impl Client {
    /// Create a client with the given config
    pub fn new(config: Config) -> Result<Self> {
        Ok(Self {
            peer: Peer::new(config)?,
            connection: None,
        })
    }

    /// Receiver for the events this client raises
    pub fn events(&self) -> Receiver<ClientEvent> {
        self.peer.subscribe()
    }

    /// Start connecting to `host_address` (`ip:port`)
    ///
    /// An invalid address fails without side effects. Otherwise any current
    /// connection is dropped and a new attempt is started. Failures of the
    /// attempt itself are only ever reported by `poll`.
    pub fn connect(&mut self, host_address: &str) -> Result<&Connection> {
        let remote = parse_host_address(host_address)?;
        self.disconnect();

        let socket = self.peer.new_socket(&remote)?;
        socket.set_nonblocking(true)?;

        let deferred = match socket.connect(&remote.into()) {
            Ok(()) => None,
            Err(ref e) if connect_in_progress(e) => None,
            Err(e) => {
                tracing::debug!("Connect to {} failed immediately: {}", remote, e);
                Some(e.kind())
            }
        };

        let stream: TcpStream = socket.into();
        let mut connection = Connection::connecting(stream, remote);
        if let Some(kind) = deferred {
            connection.defer_failure(kind);
        }

        tracing::debug!("Connecting to {}", remote);
        Ok(self.connection.insert(connection))
    }

    /// Perform all pending non-blocking work
    pub fn poll(&mut self) {
        let Some(connection) = self.connection.as_mut() else {
            return;
        };
        let remote = connection.remote_addr();

        if connection.state() == ConnectionState::Connecting {
            match connection.poll_connect(self.peer.config().connect_timeout()) {
                ConnectProgress::Pending => return,
                ConnectProgress::Established => {
                    tracing::info!("Connected to {}", remote);
                    self.peer.emit(ClientEvent::Connected { remote });
                }
                ConnectProgress::Failed(reason) => {
                    tracing::info!("Connection to {} failed: {:?}", remote, reason);
                    self.connection = None;
                    self.peer.emit(ClientEvent::ConnectionFailed { remote, reason });
                    return;
                }
            }
        }

        self.receive();
    }

    fn receive(&mut self) {
        let Some(connection) = self.connection.as_mut() else {
            return;
        };
        let remote = connection.remote_addr();

        let outcome = match connection.flush() {
            Ok(()) => connection.receive(self.peer.buffer_mut()),
            Err(e) => {
                tracing::debug!("Error writing to {}: {}", remote, e);
                ReceiveOutcome::Closed(DisconnectReason::Io(e.kind()))
            }
        };

        match outcome {
            ReceiveOutcome::Idle => {}
            ReceiveOutcome::Data(amount) => self.on_data_received(amount, remote),
            ReceiveOutcome::Closed(reason) => {
                connection.close();
                self.connection = None;
                tracing::info!("Disconnected from {}: {:?}", remote, reason);
                self.peer.emit(ClientEvent::Disconnected { remote, reason });
            }
        }
    }

    /// Every reception is forwarded as is
    fn on_data_received(&self, amount: usize, remote: SocketAddr) {
        let data = Bytes::copy_from_slice(&self.peer.buffer()[..amount]);
        self.peer.emit(ClientEvent::DataReceived { remote, data });
    }

    /// Send bytes to the server
    pub fn send(&mut self, data: &[u8]) -> Result<()> {
        self.connection
            .as_mut()
            .ok_or(TransportError::NotConnected)?
            .send(data)
    }

    /// Close the connection, if any
    ///
    /// Calling this without a connection does nothing.
    pub fn disconnect(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            connection.close();
            tracing::debug!("Disconnected from {}", connection.remote_addr());
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The current connection, if any
    pub fn connection(&self) -> Option<&Connection> {
        self.connection.as_ref()
    }

    /// Whether the connection is established
    pub fn is_connected(&self) -> bool {
        self.connection.as_ref().is_some_and(Connection::is_open)
    }

    pub fn config(&self) -> &Config {
        self.peer.config()
    }
}
