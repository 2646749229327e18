//! Network Module
//!
//! Polling TCP client and server.
//!
//! ## Architecture
//! - No threads: the owner calls `poll()` once per tick
//! - Every step inside `poll()` is non-blocking
//! - Events handed to the layer above over a channel

mod client;
mod connection;
mod events;
mod peer;
mod server;

pub use client::Client;
pub use connection::{Connection, ConnectionState, ReceiveOutcome};
pub use events::{ClientEvent, ConnectFailure, DisconnectReason, ServerEvent};
pub use server::Server;
