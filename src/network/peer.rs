//! Peer
//!
//! State shared by clients and servers: configuration, socket setup, the
//! reusable receive buffer and the event channel.

use std::io;
use std::net::{SocketAddr, TcpStream};

use crossbeam::channel::{self, Receiver, Sender};
use socket2::{Domain, Protocol, SockRef, Socket, Type};

use crate::config::Config;
use crate::error::Result;

pub(crate) struct Peer<E> {
    /// Validated configuration
    config: Config,

    /// Receive buffer reused by every read, `socket_buffer_size` bytes long
    buffer: Vec<u8>,

    /// Event channel to the layer above
    events: Sender<E>,
    receiver: Receiver<E>,
}

impl<E> Peer<E> {
    pub(crate) fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let (events, receiver) = channel::unbounded();
        Ok(Self {
            buffer: vec![0u8; config.socket_buffer_size],
            config,
            events,
            receiver,
        })
    }

    pub(crate) fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    pub(crate) fn buffer_mut(&mut self) -> &mut [u8] {
        &mut self.buffer
    }

    /// A new handle on the event channel
    pub(crate) fn subscribe(&self) -> Receiver<E> {
        self.receiver.clone()
    }

    pub(crate) fn emit(&self, event: E) {
        // Cannot fail: the peer holds a receiver for its whole lifetime
        let _ = self.events.send(event);
    }

    /// Create a TCP socket for `addr` with the configured options
    pub(crate) fn new_socket(&self, addr: &SocketAddr) -> io::Result<Socket> {
        let socket = Socket::new(Domain::for_address(*addr), Type::STREAM, Some(Protocol::TCP))?;
        self.configure_socket(&socket)?;
        Ok(socket)
    }

    /// Apply the configured options to a stream returned by `accept`
    pub(crate) fn configure_stream(&self, stream: &TcpStream) -> io::Result<()> {
        let socket = SockRef::from(stream);
        self.configure_socket(&socket)?;
        stream.set_nonblocking(true)
    }

    fn configure_socket(&self, socket: &Socket) -> io::Result<()> {
        socket.set_send_buffer_size(self.config.socket_buffer_size)?;
        socket.set_recv_buffer_size(self.config.socket_buffer_size)?;
        socket.set_nodelay(true)
    }
}

/// Whether a non-blocking connect returned "still in progress"
pub(crate) fn connect_in_progress(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock || is_einprogress(err)
}

#[cfg(unix)]
fn is_einprogress(err: &io::Error) -> bool {
    err.raw_os_error() == Some(libc::EINPROGRESS)
}

#[cfg(not(unix))]
fn is_einprogress(_err: &io::Error) -> bool {
    false
}
