//! Protocol Module
//!
//! The framing boundary between raw byte delivery and the message layer above.
//!
//! ## Header Byte
//! ```text
//! ┌───────────────────┬───────────────────┐
//! │  Reserved (4 bit) │    Type (4 bit)   │
//! └───────────────────┴───────────────────┘
//! ```
//!
//! Only the `Connect` type is inspected by this crate (server-side handshake
//! dedup). Every other byte is passed through untouched.

mod header;

pub use header::{encode_message, is_connect, MessageHeader, HEADER_BITMASK, HEADER_BITS};
