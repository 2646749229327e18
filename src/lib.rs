//! # ticknet
//!
//! A polling-based, single-threaded TCP transport for message-oriented
//! networking layers:
//! - No thread per connection, no OS readiness notification
//! - The owner drives every peer by calling `poll()` once per tick
//! - Connection table keyed by remote endpoint, duplicates rejected
//! - Deferred (mark-then-sweep) removal of closed connections
//! - Duplicate connect handshakes suppressed on the server
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Message layer (external)                     │
//! └──────────────▲───────────────────────────────┬──────────────┘
//!       events   │                               │ connect / send / poll
//!  (channel)     │                               ▼
//! ┌──────────────┴──────────┐         ┌─────────────────────────┐
//! │         Client          │         │         Server          │
//! │   (one Connection)      │         │ (Connection per remote) │
//! └──────────────┬──────────┘         └────────────┬────────────┘
//!                │                                 │
//!                ▼                                 ▼
//!         ┌─────────────────────────────────────────────┐
//!         │  Peer: socket options, receive buffer       │
//!         └─────────────────────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod address;
pub mod protocol;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, TransportError};
pub use config::Config;
pub use address::parse_host_address;
pub use network::{Client, ClientEvent, Server, ServerEvent};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of ticknet
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
