//! Events raised to the layer above
//!
//! Delivered in order over a channel, at most once per occurrence.

use std::io;
use std::net::SocketAddr;

use bytes::Bytes;

/// Why a connection went away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The remote side shut the stream down or reset it
    RemoteClosed,

    /// Closed by this side
    LocalClosed,

    /// The socket reported an unexpected error
    Io(io::ErrorKind),
}

/// Why an outbound connection attempt failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectFailure {
    /// The attempt was still pending when the connect timeout elapsed
    TimedOut,

    /// The OS reported an error for the attempt
    Io(io::ErrorKind),
}

/// Events raised by a `Server`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// A new endpoint was accepted
    Connected { remote: SocketAddr },

    /// Bytes arrived from an endpoint
    DataReceived { remote: SocketAddr, data: Bytes },

    /// An endpoint was removed from the connection table
    Disconnected {
        remote: SocketAddr,
        reason: DisconnectReason,
    },
}

/// Events raised by a `Client`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// The connection attempt completed
    Connected { remote: SocketAddr },

    /// The connection attempt failed or timed out
    ConnectionFailed {
        remote: SocketAddr,
        reason: ConnectFailure,
    },

    /// Bytes arrived from the server
    DataReceived { remote: SocketAddr, data: Bytes },

    /// An established connection was closed by the remote side or by an error
    Disconnected {
        remote: SocketAddr,
        reason: DisconnectReason,
    },
}
