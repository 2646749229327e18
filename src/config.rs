//! Configuration for ticknet
//!
//! Centralized configuration with sensible defaults.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use crate::error::{Result, TransportError};

/// Default size of the send and receive buffers of every socket (1 MiB)
pub const DEFAULT_SOCKET_BUFFER_SIZE: usize = 1024 * 1024;

/// Default listen backlog
pub const DEFAULT_MAX_PENDING_CONNECTIONS: i32 = 5;

/// Default time a client waits for the OS to resolve a connection attempt
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

/// Main configuration shared by clients and servers
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Socket Configuration
    // -------------------------------------------------------------------------
    /// Size of the send and receive buffers of every socket, and of the
    /// peer's reusable receive buffer
    pub socket_buffer_size: usize,

    // -------------------------------------------------------------------------
    // Server Configuration
    // -------------------------------------------------------------------------
    /// IP address the server binds to
    pub listen_addr: IpAddr,

    /// Max connections waiting in the OS accept queue
    pub max_pending_connections: i32,

    // -------------------------------------------------------------------------
    // Client Configuration
    // -------------------------------------------------------------------------
    /// How long a connection attempt may stay pending (milliseconds)
    pub connect_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            socket_buffer_size: DEFAULT_SOCKET_BUFFER_SIZE,
            listen_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            max_pending_connections: DEFAULT_MAX_PENDING_CONNECTIONS,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check that every value is usable
    pub fn validate(&self) -> Result<()> {
        if self.socket_buffer_size == 0 {
            return Err(TransportError::Config(
                "socket_buffer_size must be greater than zero".to_string(),
            ));
        }
        if self.max_pending_connections <= 0 {
            return Err(TransportError::Config(format!(
                "max_pending_connections must be positive, got {}",
                self.max_pending_connections
            )));
        }
        if self.connect_timeout_ms == 0 {
            return Err(TransportError::Config(
                "connect_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Connect timeout as a Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the socket send/receive buffer size (in bytes)
    pub fn socket_buffer_size(mut self, size: usize) -> Self {
        self.config.socket_buffer_size = size;
        self
    }

    /// Set the IP address the server binds to
    pub fn listen_addr(mut self, addr: impl Into<IpAddr>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the listen backlog
    pub fn max_pending_connections(mut self, count: i32) -> Self {
        self.config.max_pending_connections = count;
        self
    }

    /// Set the connect timeout (in milliseconds)
    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.connect_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
