//! Message header definitions
//!
//! The first byte of every payload carries the message type in its low bits.
//! The remaining bits belong to the layer above and are never interpreted here.

/// Number of low bits of the first byte that hold the message type
pub const HEADER_BITS: u8 = 4;

/// Mask selecting the message type bits of the header byte
pub const HEADER_BITMASK: u8 = (1 << HEADER_BITS) - 1;

/// Message types shared with the layer above
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageHeader {
    Unreliable = 0x00,
    Ack = 0x01,
    Connect = 0x02,
    Reject = 0x03,
    Heartbeat = 0x04,
    Disconnect = 0x05,
    Notify = 0x06,
    Reliable = 0x07,
    Welcome = 0x08,
    ClientConnected = 0x09,
    ClientDisconnected = 0x0A,
}

impl MessageHeader {
    /// Decode the message type of a header byte, ignoring the reserved bits
    ///
    /// Returns `None` for type values this layer does not know.
    pub fn from_byte(byte: u8) -> Option<Self> {
        let header = match byte & HEADER_BITMASK {
            0x00 => MessageHeader::Unreliable,
            0x01 => MessageHeader::Ack,
            0x02 => MessageHeader::Connect,
            0x03 => MessageHeader::Reject,
            0x04 => MessageHeader::Heartbeat,
            0x05 => MessageHeader::Disconnect,
            0x06 => MessageHeader::Notify,
            0x07 => MessageHeader::Reliable,
            0x08 => MessageHeader::Welcome,
            0x09 => MessageHeader::ClientConnected,
            0x0A => MessageHeader::ClientDisconnected,
            _ => return None,
        };
        Some(header)
    }

    /// Decode the header of a payload (first byte)
    pub fn of(payload: &[u8]) -> Option<Self> {
        payload.first().copied().and_then(Self::from_byte)
    }

    /// Parse a lowercase header name, as used on the command line
    pub fn from_name(name: &str) -> Option<Self> {
        let header = match name {
            "unreliable" => MessageHeader::Unreliable,
            "ack" => MessageHeader::Ack,
            "connect" => MessageHeader::Connect,
            "reject" => MessageHeader::Reject,
            "heartbeat" => MessageHeader::Heartbeat,
            "disconnect" => MessageHeader::Disconnect,
            "notify" => MessageHeader::Notify,
            "reliable" => MessageHeader::Reliable,
            "welcome" => MessageHeader::Welcome,
            "client-connected" => MessageHeader::ClientConnected,
            "client-disconnected" => MessageHeader::ClientDisconnected,
            _ => return None,
        };
        Some(header)
    }
}

/// Check whether a payload is a connect handshake
pub fn is_connect(payload: &[u8]) -> bool {
    MessageHeader::of(payload) == Some(MessageHeader::Connect)
}

/// Build a payload from a header and a body
///
/// Format: header (1) + body
pub fn encode_message(header: MessageHeader, body: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(1 + body.len());
    message.push(header as u8);
    message.extend_from_slice(body);
    message
}
