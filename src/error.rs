//! Error types for ticknet
//!
//! Provides a unified error type for all operations.

use std::net::SocketAddr;

use thiserror::Error;

/// Result type alias using TransportError
pub type Result<T> = std::result::Result<T, TransportError>;

/// Unified error type for ticknet operations
#[derive(Debug, Error)]
pub enum TransportError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Address Errors
    // -------------------------------------------------------------------------
    #[error(
        "Invalid host address '{0}'! IP and port should be separated by a colon, for example: '127.0.0.1:7777'."
    )]
    InvalidAddress(String),

    // -------------------------------------------------------------------------
    // Connection Errors
    // -------------------------------------------------------------------------
    #[error("Not connected")]
    NotConnected,

    #[error("Server is not running")]
    NotRunning,

    #[error("No connection to {0}")]
    UnknownConnection(SocketAddr),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
