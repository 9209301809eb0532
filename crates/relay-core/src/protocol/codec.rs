//! Binary codec for encoding and decoding frame-relay messages.
//!
//! Wire format:
//! ```text
//! [kind:1][name_len:1][payload_len:4][name:name_len][payload:payload_len]
//! ```
//! Header size: 6 bytes.  `payload_len` is an unsigned 32-bit little-endian
//! integer.  Names longer than 255 bytes are truncated on encode, at a
//! character boundary.  Payloads that do not fit the 32-bit length field are
//! rejected rather than wrapped.
//!
//! # Streaming decode
//!
//! TCP delivers a byte stream, not messages, so the receiver appends whatever
//! arrived to an accumulation buffer and calls [`decode_message`] until it
//! returns `Ok(None)`.  Each successful call removes exactly one frame from
//! the front of the buffer and leaves the remainder for the next call.

use thiserror::Error;

use crate::protocol::messages::{Message, MessageKind, HEADER_SIZE};

/// Errors that can occur while encoding or decoding a message.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The kind byte in the header is not a recognized value.  The frame has
    /// already been consumed from the buffer, so decoding can continue.
    #[error("unknown message kind: {0}")]
    UnknownMessageKind(u8),
    /// The payload is longer than `u32::MAX` bytes and cannot be framed.
    #[error("payload of {0} bytes exceeds the 32-bit length field")]
    PayloadTooLarge(usize),
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes the header and the (truncated) name of `msg`, without the payload.
///
/// The send path writes this first and the payload second, so large frames
/// are never copied into a single contiguous buffer.
///
/// # Errors
///
/// Returns [`ProtocolError::PayloadTooLarge`] when the payload length does
/// not fit in the header.
pub fn encode_header(msg: &Message) -> Result<Vec<u8>, ProtocolError> {
    let name = msg.wire_name();
    let payload_len = payload_len_field(msg.payload.len())?;

    let mut buf = Vec::with_capacity(HEADER_SIZE + name.len());
    buf.push(msg.kind as u8);
    buf.push(name.len() as u8);
    buf.extend_from_slice(&payload_len.to_le_bytes());
    buf.extend_from_slice(name);
    Ok(buf)
}

/// The header's `payload_len` value for a payload of `len` bytes.
///
/// # Errors
///
/// Returns [`ProtocolError::PayloadTooLarge`] when `len` exceeds `u32::MAX`.
pub fn payload_len_field(len: usize) -> Result<u32, ProtocolError> {
    u32::try_from(len).map_err(|_| ProtocolError::PayloadTooLarge(len))
}

/// Encodes a complete [`Message`]: header, name, then payload.
///
/// # Examples
///
/// ```rust
/// use relay_core::protocol::{decode_message, encode_message, Message};
///
/// let msg = Message::image("Scrn_H 1024", vec![1, 2, 3]);
/// let mut buf = encode_message(&msg).unwrap();
/// let decoded = decode_message(&mut buf).unwrap().unwrap();
/// assert_eq!(decoded, msg);
/// assert!(buf.is_empty());
/// ```
///
/// # Errors
///
/// See [`encode_header`].
pub fn encode_message(msg: &Message) -> Result<Vec<u8>, ProtocolError> {
    let mut buf = encode_header(msg)?;
    buf.reserve_exact(msg.payload.len());
    buf.extend_from_slice(&msg.payload);
    Ok(buf)
}

/// Decodes one [`Message`] from the front of `buffer`.
///
/// Returns `Ok(None)` and leaves `buffer` untouched when it holds fewer than
/// 6 bytes or fewer than `6 + name_len + payload_len` bytes.  On success the
/// frame is drained from the front of `buffer`.
///
/// # Errors
///
/// Returns [`ProtocolError::UnknownMessageKind`] when the kind byte is not
/// recognized; the offending frame is still consumed.
pub fn decode_message(buffer: &mut Vec<u8>) -> Result<Option<Message>, ProtocolError> {
    if buffer.len() < HEADER_SIZE {
        return Ok(None);
    }

    let kind_byte = buffer[0];
    let name_len = buffer[1] as usize;
    let payload_len = u32::from_le_bytes([buffer[2], buffer[3], buffer[4], buffer[5]]) as usize;

    let total = match (HEADER_SIZE + name_len).checked_add(payload_len) {
        Some(total) => total,
        None => return Ok(None),
    };
    if buffer.len() < total {
        return Ok(None);
    }

    let name_end = HEADER_SIZE + name_len;
    let kind = MessageKind::try_from(kind_byte);
    let message = kind.map(|kind| Message {
        kind,
        name: String::from_utf8_lossy(&buffer[HEADER_SIZE..name_end]).into_owned(),
        payload: buffer[name_end..total].to_vec(),
    });
    buffer.drain(..total);

    message
        .map(Some)
        .map_err(|()| ProtocolError::UnknownMessageKind(kind_byte))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
