//! ticknet CLI Client
//!
//! Sends one message to a ticknet server and prints the echo.

use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use ticknet::protocol::{encode_message, MessageHeader};
use ticknet::{Client, ClientEvent, Config};

/// ticknet CLI
#[derive(Parser, Debug)]
#[command(name = "ticknet-cli")]
#[command(about = "Send a message to a ticknet server")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:7777")]
    server: String,

    /// Message type written into the header byte
    #[arg(long, default_value = "unreliable")]
    header: String,

    /// Overall timeout in milliseconds
    #[arg(short, long, default_value = "5000")]
    timeout_ms: u64,

    /// Message body
    message: String,
}

fn main() {
    let args = Args::parse();

    let Some(header) = MessageHeader::from_name(&args.header) else {
        eprintln!("Unknown header type '{}'", args.header);
        std::process::exit(2);
    };

    let config = Config::builder().connect_timeout_ms(args.timeout_ms).build();
    let mut client = match Client::new(config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };
    let events = client.events();

    if let Err(e) = client.connect(&args.server) {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    let deadline = Instant::now() + Duration::from_millis(args.timeout_ms);
    let payload = encode_message(header, args.message.as_bytes());

    let code = loop {
        if Instant::now() >= deadline {
            eprintln!("Timed out");
            break 1;
        }

        client.poll();

        let mut done = None;
        for event in events.try_iter() {
            match event {
                ClientEvent::Connected { remote } => {
                    println!("Connected to {}", remote);
                    if let Err(e) = client.send(&payload) {
                        eprintln!("Send failed: {}", e);
                        done = Some(1);
                    }
                }
                ClientEvent::ConnectionFailed { remote, reason } => {
                    eprintln!("Could not connect to {}: {:?}", remote, reason);
                    done = Some(1);
                }
                ClientEvent::DataReceived { data, .. } => {
                    println!("{}", String::from_utf8_lossy(data.get(1..).unwrap_or(&[])));
                    done = Some(0);
                }
                ClientEvent::Disconnected { reason, .. } => {
                    eprintln!("Disconnected: {:?}", reason);
                    done = Some(1);
                }
            }
        }

        if let Some(code) = done {
            break code;
        }
        thread::sleep(Duration::from_millis(10));
    };

    client.disconnect();
    std::process::exit(code);
}
