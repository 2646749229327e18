//! Integration tests for ticknet
//!
//! Real client and server over loopback, driven by explicit ticks.

use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel::Receiver;
use ticknet::network::{ConnectionState, DisconnectReason};
use ticknet::protocol::{encode_message, MessageHeader};
use ticknet::{Client, ClientEvent, Config, Server, ServerEvent, TransportError};

// =============================================================================
// Helper Functions
// =============================================================================

fn local_config() -> Config {
    Config::builder()
        .listen_addr(IpAddr::V4(Ipv4Addr::LOCALHOST))
        .socket_buffer_size(64 * 1024)
        .connect_timeout_ms(2000)
        .build()
}

struct Harness {
    server: Server,
    client: Client,
    server_rx: Receiver<ServerEvent>,
    client_rx: Receiver<ClientEvent>,
    server_events: Vec<ServerEvent>,
    client_events: Vec<ClientEvent>,
    address: String,
}

impl Harness {
    fn new() -> Self {
        let mut server = Server::new(local_config()).unwrap();
        server.start(0).unwrap();
        let port = server.local_addr().unwrap().port();
        let client = Client::new(local_config()).unwrap();

        Self {
            server_rx: server.events(),
            client_rx: client.events(),
            server,
            client,
            server_events: Vec::new(),
            client_events: Vec::new(),
            address: format!("127.0.0.1:{}", port),
        }
    }

    fn tick(&mut self) {
        self.client.poll();
        self.server.poll();
        self.server_events.extend(self.server_rx.try_iter());
        self.client_events.extend(self.client_rx.try_iter());
    }

    fn run_until(&mut self, mut done: impl FnMut(&Self) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            self.tick();
            if done(self) {
                return;
            }
            thread::sleep(Duration::from_millis(2));
        }
        panic!(
            "condition not reached; server events: {:?}, client events: {:?}",
            self.server_events, self.client_events
        );
    }

    fn run_for(&mut self, duration: Duration) {
        let deadline = Instant::now() + duration;
        while Instant::now() < deadline {
            self.tick();
            thread::sleep(Duration::from_millis(2));
        }
    }

    /// Connect the client and return its endpoint as seen by the server
    fn connect(&mut self) -> SocketAddr {
        let address = self.address.clone();
        self.client.connect(&address).unwrap();
        self.run_until(|h| {
            h.client_events
                .iter()
                .any(|e| matches!(e, ClientEvent::Connected { .. }))
                && h.server_events
                    .iter()
                    .any(|e| matches!(e, ServerEvent::Connected { .. }))
        });
        self.server_events
            .iter()
            .find_map(|e| match e {
                ServerEvent::Connected { remote } => Some(*remote),
                _ => None,
            })
            .unwrap()
    }

    fn server_data(&self) -> Vec<Vec<u8>> {
        self.server_events
            .iter()
            .filter_map(|e| match e {
                ServerEvent::DataReceived { data, .. } => Some(data.to_vec()),
                _ => None,
            })
            .collect()
    }

    fn client_data(&self) -> Vec<Vec<u8>> {
        self.client_events
            .iter()
            .filter_map(|e| match e {
                ClientEvent::DataReceived { data, .. } => Some(data.to_vec()),
                _ => None,
            })
            .collect()
    }
}

// =============================================================================
// Connection Lifecycle Tests
// =============================================================================

#[test]
fn test_connect_returns_pending_connection() {
    let mut h = Harness::new();
    let address = h.address.clone();

    let connection = h.client.connect(&address).unwrap();
    assert_eq!(connection.state(), ConnectionState::Connecting);
    assert_eq!(connection.remote_addr().to_string(), address);

    // Nothing is reported from inside connect
    assert!(h.client_rx.try_recv().is_err());
}

#[test]
fn test_connect_and_exchange_data() {
    let mut h = Harness::new();
    let remote = h.connect();

    assert!(h.client.is_connected());
    assert_eq!(h.server.connection_count(), 1);

    let hello = encode_message(MessageHeader::Unreliable, b"hello");
    h.client.send(&hello).unwrap();
    h.run_until(|h| !h.server_data().is_empty());
    assert_eq!(h.server_data(), vec![hello.clone()]);

    let reply = encode_message(MessageHeader::Reliable, b"world");
    h.server.send(remote, &reply).unwrap();
    h.run_until(|h| !h.client_data().is_empty());
    assert_eq!(h.client_data(), vec![reply]);
}

#[test]
fn test_multiple_clients_get_distinct_entries() {
    let mut h = Harness::new();
    h.connect();

    let mut others = Vec::new();
    for _ in 0..3 {
        let mut client = Client::new(local_config()).unwrap();
        client.connect(&h.address).unwrap();
        others.push(client);
    }

    h.run_until(|h| h.server.connection_count() == 4);
    for _ in 0..20 {
        for client in others.iter_mut() {
            client.poll();
        }
        h.tick();
    }

    let mut remotes: Vec<SocketAddr> = h
        .server_events
        .iter()
        .filter_map(|e| match e {
            ServerEvent::Connected { remote } => Some(*remote),
            _ => None,
        })
        .collect();
    assert_eq!(remotes.len(), 4);
    remotes.sort();
    remotes.dedup();
    assert_eq!(remotes.len(), 4);
    assert_eq!(h.server.connection_count(), 4);
}

#[test]
fn test_remote_close_removes_connection() {
    let mut h = Harness::new();
    let remote = h.connect();

    h.client.disconnect();
    h.run_until(|h| {
        h.server_events
            .iter()
            .any(|e| matches!(e, ServerEvent::Disconnected { .. }))
    });

    // Removal happened in the same tick that raised the event
    assert_eq!(h.server.connection_count(), 0);
    assert!(h.server.connection(&remote).is_none());
    assert!(h.server_events.contains(&ServerEvent::Disconnected {
        remote,
        reason: DisconnectReason::RemoteClosed,
    }));
}

#[test]
fn test_server_close_notifies_client() {
    let mut h = Harness::new();
    let remote = h.connect();

    h.server.close(remote);
    assert_eq!(h.server.connection_count(), 1);

    h.run_until(|h| {
        h.client_events
            .iter()
            .any(|e| matches!(e, ClientEvent::Disconnected { .. }))
    });

    assert_eq!(h.server.connection_count(), 0);
    assert!(h.server_events.contains(&ServerEvent::Disconnected {
        remote,
        reason: DisconnectReason::LocalClosed,
    }));
    assert!(!h.client.is_connected());
    assert!(h.client.connection().is_none());
}

#[test]
fn test_shutdown_disconnects_clients() {
    let mut h = Harness::new();
    h.connect();

    h.server.shutdown();
    assert!(!h.server.is_running());
    assert_eq!(h.server.connection_count(), 0);

    h.run_until(|h| {
        h.client_events
            .iter()
            .any(|e| matches!(e, ClientEvent::Disconnected { .. }))
    });
}

// =============================================================================
// Handshake Suppression Tests
// =============================================================================

#[test]
fn test_duplicate_connect_forwarded_once() {
    let mut h = Harness::new();
    let remote = h.connect();
    let connect = encode_message(MessageHeader::Connect, b"handshake");

    h.client.send(&connect).unwrap();
    h.run_until(|h| h.server_data().len() == 1);
    assert!(h.server.connection(&remote).unwrap().handshake_seen());

    h.client.send(&connect).unwrap();
    h.run_for(Duration::from_millis(200));
    assert_eq!(h.server_data().len(), 1);

    let after = encode_message(MessageHeader::Reliable, b"after");
    h.client.send(&after).unwrap();
    h.run_until(|h| h.server_data().len() == 2);

    assert_eq!(h.server_data(), vec![connect, after]);
}

#[test]
fn test_connect_is_forwarded_once_per_connection() {
    let mut h = Harness::new();
    h.connect();
    let connect = encode_message(MessageHeader::Connect, b"hs");

    let mut second = Client::new(local_config()).unwrap();
    let second_rx = second.events();
    second.connect(&h.address).unwrap();
    let deadline = Instant::now() + Duration::from_secs(5);
    while !second.is_connected() && Instant::now() < deadline {
        second.poll();
        h.tick();
        thread::sleep(Duration::from_millis(2));
    }
    assert!(second.is_connected());
    assert!(matches!(
        second_rx.try_recv().unwrap(),
        ClientEvent::Connected { .. }
    ));

    h.client.send(&connect).unwrap();
    second.send(&connect).unwrap();
    h.run_until(|h| h.server_data().len() == 2);
}

// =============================================================================
// Client Error Handling Tests
// =============================================================================

#[test]
fn test_invalid_address_has_no_side_effects() {
    let mut h = Harness::new();

    let err = h.client.connect("not-an-address").unwrap_err();
    assert!(matches!(err, TransportError::InvalidAddress(_)));
    assert!(err.to_string().contains("'127.0.0.1:7777'"));
    assert!(h.client.connection().is_none());
    assert!(h.client_rx.try_recv().is_err());
}

#[test]
fn test_invalid_address_keeps_existing_connection() {
    let mut h = Harness::new();
    h.connect();

    assert!(h.client.connect("127.0.0.1").is_err());
    assert!(h.client.is_connected());

    h.tick();
    assert!(!h
        .client_events
        .iter()
        .any(|e| matches!(e, ClientEvent::Disconnected { .. })));
}

#[test]
fn test_connection_refused_reports_failure() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let mut client = Client::new(local_config()).unwrap();
    let events = client.events();
    client.connect(&format!("127.0.0.1:{}", port)).unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    let mut failed = None;
    while failed.is_none() && Instant::now() < deadline {
        client.poll();
        failed = events.try_iter().find_map(|e| match e {
            ClientEvent::ConnectionFailed { reason, .. } => Some(reason),
            _ => None,
        });
        thread::sleep(Duration::from_millis(2));
    }

    assert!(failed.is_some());
    assert!(client.connection().is_none());
    assert!(!client.is_connected());
}

#[test]
fn test_disconnect_without_connection_is_noop() {
    let mut client = Client::new(local_config()).unwrap();
    let events = client.events();

    client.disconnect();
    client.disconnect();
    client.poll();

    assert!(client.connection().is_none());
    assert!(events.try_recv().is_err());
}

#[test]
fn test_send_without_connection_fails() {
    let mut client = Client::new(local_config()).unwrap();
    assert!(matches!(
        client.send(b"x"),
        Err(TransportError::NotConnected)
    ));
}

#[test]
fn test_send_while_connecting_fails() {
    let mut h = Harness::new();
    let address = h.address.clone();
    h.client.connect(&address).unwrap();
    assert!(matches!(
        h.client.send(b"x"),
        Err(TransportError::NotConnected)
    ));
}

#[test]
fn test_invalid_config_rejected() {
    let config = Config::builder().socket_buffer_size(0).build();
    assert!(matches!(Server::new(config.clone()), Err(TransportError::Config(_))));
    assert!(matches!(Client::new(config), Err(TransportError::Config(_))));
}
