//! The single frame-relay message type and its kind codes.
//!
//! A [`Message`] is one transmissible unit: a kind byte, a short name, and
//! an opaque payload.  The server interprets the name of an `Image` message
//! as its control-parameter string and the payload as a raw grayscale frame,
//! but the protocol itself attaches no meaning to either.

use std::fmt;

// ── Protocol constants ────────────────────────────────────────────────────────

/// Size of the fixed header: kind (1) + name length (1) + payload length (4).
pub const HEADER_SIZE: usize = 6;

/// Longest name that fits in the one-byte name-length field.
pub const MAX_NAME_LEN: usize = 255;

// ── Message kind codes ────────────────────────────────────────────────────────

/// Message kind byte, the first byte of every header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageKind {
    None = 0,
    /// Ask the receiver to show the image previously sent under this name.
    DisplayNow = 1,
    /// A frame: name carries control parameters, payload carries pixels.
    Image = 2,
    /// Reset the receiver's timing statistics.
    StartTimer = 3,
    /// Acknowledge a named image.
    Ack = 4,
}

impl TryFrom<u8> for MessageKind {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, ()> {
        match value {
            0 => Ok(MessageKind::None),
            1 => Ok(MessageKind::DisplayNow),
            2 => Ok(MessageKind::Image),
            3 => Ok(MessageKind::StartTimer),
            4 => Ok(MessageKind::Ack),
            _ => Err(()),
        }
    }
}

// ── Message ───────────────────────────────────────────────────────────────────

/// One protocol-level unit of kind + name + payload.
///
/// Outbound messages are shared between connections as `Arc<Message>`; the
/// number of outstanding handles is the number of connections that still
/// have to transmit it.
#[derive(Clone, PartialEq, Eq)]
pub struct Message {
    pub kind: MessageKind,
    /// Identifying string.  Only the first [`MAX_NAME_LEN`] bytes go on the wire.
    pub name: String,
    pub payload: Vec<u8>,
}

impl Message {
    pub fn new(kind: MessageKind, name: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            kind,
            name: name.into(),
            payload,
        }
    }

    pub fn display_now(name: impl Into<String>) -> Self {
        Self::new(MessageKind::DisplayNow, name, Vec::new())
    }

    pub fn image(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self::new(MessageKind::Image, name, data)
    }

    pub fn start_timer() -> Self {
        Self::new(MessageKind::StartTimer, String::new(), Vec::new())
    }

    pub fn ack(name: impl Into<String>) -> Self {
        Self::new(MessageKind::Ack, name, Vec::new())
    }

    /// The name bytes that are actually transmitted: at most 255 bytes, cut
    /// back to the last whole UTF-8 character so the receiver always gets a
    /// prefix of the name.
    pub fn wire_name(&self) -> &[u8] {
        let mut end = self.name.len().min(MAX_NAME_LEN);
        while !self.name.is_char_boundary(end) {
            end -= 1;
        }
        &self.name.as_bytes()[..end]
    }

    /// Total encoded size: header + transmitted name + payload.
    pub fn wire_len(&self) -> usize {
        HEADER_SIZE + self.wire_name().len() + self.payload.len()
    }
}

impl fmt::Debug for Message {
    // Payloads are whole frames; print their size, not their bytes.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
