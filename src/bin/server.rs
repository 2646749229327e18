//! ticknet Server Binary
//!
//! Runs an echo server driven by a fixed tick loop.

use std::net::IpAddr;
use std::thread;
use std::time::Duration;

use clap::Parser;
use ticknet::{Config, Server, ServerEvent};
use tracing_subscriber::{fmt, EnvFilter};

/// ticknet echo server
#[derive(Parser, Debug)]
#[command(name = "ticknet-server")]
#[command(about = "Polling TCP echo server")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "7777")]
    port: u16,

    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0")]
    listen: IpAddr,

    /// Socket send/receive buffer size in bytes
    #[arg(short, long, default_value = "1048576")]
    buffer_size: usize,

    /// Listen backlog
    #[arg(short, long, default_value = "5")]
    max_pending: i32,

    /// Milliseconds between ticks
    #[arg(short, long, default_value = "10")]
    tick_ms: u64,

    /// Stop after this many ticks (runs forever if omitted)
    #[arg(long)]
    max_ticks: Option<u64>,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,ticknet=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("ticknet Server v{}", ticknet::VERSION);

    let config = Config::builder()
        .listen_addr(args.listen)
        .socket_buffer_size(args.buffer_size)
        .max_pending_connections(args.max_pending)
        .build();

    let mut server = match Server::new(config) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.start(args.port) {
        tracing::error!("Failed to start server: {}", e);
        std::process::exit(1);
    }

    let events = server.events();
    let tick = Duration::from_millis(args.tick_ms);
    let mut ticks = 0u64;

    while args.max_ticks.map_or(true, |max| ticks < max) {
        server.poll();

        for event in events.try_iter() {
            match event {
                ServerEvent::Connected { remote } => {
                    tracing::info!("Client {} connected", remote);
                }
                ServerEvent::DataReceived { remote, data } => {
                    tracing::debug!("Echoing {} bytes to {}", data.len(), remote);
                    if let Err(e) = server.send(remote, &data) {
                        tracing::warn!("Echo to {} failed: {}", remote, e);
                        server.close(remote);
                    }
                }
                ServerEvent::Disconnected { remote, reason } => {
                    tracing::info!("Client {} disconnected: {:?}", remote, reason);
                }
            }
        }

        ticks += 1;
        thread::sleep(tick);
    }

    server.shutdown();
    tracing::info!("Server stopped");
}
