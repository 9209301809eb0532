//! Send and receive workers, and the single-frame send attempt they share.
//!
//! # Send attempt
//!
//! One attempt writes the encoded header (with name) and then the payload.
//! The socket's write timeout is the poll bound:
//!
//! | what happened                                | result                    |
//! |----------------------------------------------|---------------------------|
//! | every byte written                           | `Ok(bytes)`               |
//! | timed out before the first byte              | `SendTimeout` (transient) |
//! | stopped after some bytes                     | `SendCount` (fatal)       |
//! | any other OS error                           | `SendPoll` (fatal)        |
//! | payload longer than `u32::MAX` bytes         | `PayloadTooLarge` (fatal) |
//!
//! [`send_with_retry`] repeats a transient failure up to
//! `send_retry_limit` more times, sleeping `send_retry_delay` in between.
//!
//! # Workers
//!
//! Every connection runs two threads.  The send worker drains the outbound
//! FIFO; the receive worker reads into a scratch buffer, appends to a
//! private accumulator, and decodes until no complete frame remains.

use std::io::{self, Write};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use relay_core::protocol::{decode_message, encode_header, Message, ProgressTracker, HEADER_SIZE};
use tracing::{debug, trace, warn};

use crate::connection::Connection;
use crate::endpoint::Shared;
use crate::error::TransportError;
use crate::registry::ConnectionHandle;
use crate::settings::CommSettings;

/// Returns `true` for OS timeout / would-block errors that should be retried.
pub fn is_timeout_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

/// Makes one attempt to write `message` as a single frame.
///
/// # Errors
///
/// See the module table.
pub fn send_once<W: Write>(writer: &mut W, message: &Message) -> Result<usize, TransportError> {
    let header = encode_header(message)
        .map_err(|_| TransportError::PayloadTooLarge(message.payload.len()))?;
    let expected = header.len() + message.payload.len();
    let mut sent = 0;

    for part in [header.as_slice(), message.payload.as_slice()] {
        let mut offset = 0;
        while offset < part.len() {
            match writer.write(&part[offset..]) {
                Ok(0) => return Err(TransportError::SendCount { sent, expected }),
                Ok(n) => {
                    offset += n;
                    sent += n;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) if is_timeout_error(&e) => {
                    return Err(if sent == 0 {
                        TransportError::SendTimeout
                    } else {
                        TransportError::SendCount { sent, expected }
                    });
                }
                Err(e) => return Err(TransportError::SendPoll(e.kind())),
            }
        }
    }
    Ok(sent)
}

/// [`send_once`], retried while it reports a transient error.
///
/// # Errors
///
/// Returns the last attempt's error: `SendTimeout` after
/// `1 + send_retry_limit` timed-out attempts, or the first fatal error.
pub fn send_with_retry<W: Write>(
    writer: &mut W,
    message: &Message,
    settings: &CommSettings,
) -> Result<usize, TransportError> {
    let mut result = send_once(writer, message);
    let mut retries = 0;
    while matches!(&result, Err(e) if e.is_transient()) && retries < settings.send_retry_limit {
        retries += 1;
        thread::sleep(settings.send_retry_delay());
        result = send_once(writer, message);
    }
    if retries > 0 {
        debug!("send of '{}' needed {retries} retries", message.name);
    }
    result
}

/// Starts the receive and send workers for `conn`.
///
/// `slot` is the connection's registry handle on a server, `None` for a
/// client's own connection.
pub(crate) fn spawn_workers(
    shared: &Arc<Shared>,
    conn: &Arc<Connection>,
    slot: Option<ConnectionHandle>,
) -> io::Result<()> {
    let peer = conn.peer();

    let (s, c) = (Arc::clone(shared), Arc::clone(conn));
    let receiver = thread::Builder::new()
        .name(format!("relay-recv-{peer}"))
        .spawn(move || receive_loop(&s, &c, slot))?;
    conn.attach_worker(receiver);

    let (s, c) = (Arc::clone(shared), Arc::clone(conn));
    let sender = thread::Builder::new()
        .name(format!("relay-send-{peer}"))
        .spawn(move || send_loop(&s, &c, slot))?;
    conn.attach_worker(sender);
    Ok(())
}

fn send_loop(shared: &Arc<Shared>, conn: &Arc<Connection>, slot: Option<ConnectionHandle>) {
    let settings = shared.settings();
    while conn.is_alive() {
        let Some(message) = conn.dequeue_send() else {
            thread::sleep(settings.send_idle());
            continue;
        };
        let begin = Instant::now();
        match conn.transmit(&message, settings) {
            Ok(bytes) => trace!(
                "sent {:?} '{}' ({bytes} bytes) to {} in {:?}",
                message.kind,
                message.name,
                conn.peer(),
                begin.elapsed()
            ),
            Err(e) => {
                shared.connection_lost(conn, slot, e);
                break;
            }
        }
    }
    debug!("send worker for {} exiting", conn.peer());
}

fn receive_loop(shared: &Arc<Shared>, conn: &Arc<Connection>, slot: Option<ConnectionHandle>) {
    let mut scratch = vec![0u8; shared.settings().receive_buffer_size.max(HEADER_SIZE)];
    let mut inbound: Vec<u8> = Vec::new();
    let mut progress = ProgressTracker::new();

    while conn.is_alive() {
        let n = match conn.read_chunk(&mut scratch) {
            Ok(0) => {
                if conn.is_alive() {
                    shared.connection_lost(conn, slot, TransportError::PeerDisconnected);
                }
                break;
            }
            Ok(n) => n,
            Err(e) if is_timeout_error(&e) || e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                if conn.is_alive() {
                    shared.connection_lost(conn, slot, TransportError::ReceivePoll(e.kind()));
                }
                break;
            }
        };

        inbound.extend_from_slice(&scratch[..n]);
        progress.on_bytes(inbound.len());
        if progress.is_new_header() {
            let payload_len = u32::from_le_bytes([inbound[2], inbound[3], inbound[4], inbound[5]]);
            debug!(
                "receiving kind={} name_len={} payload_len={payload_len} from {}",
                inbound[0],
                inbound[1],
                conn.peer()
            );
        }

        loop {
            match decode_message(&mut inbound) {
                Ok(Some(message)) => {
                    if let Some(elapsed) = progress.on_message() {
                        trace!("received {:?} '{}' in {elapsed:?}", message.kind, message.name);
                    }
                    shared.deliver(message);
                }
                Ok(None) => break,
                Err(e) => {
                    progress.on_message();
                    warn!("{e} from {}; frame skipped", conn.peer());
                }
            }
        }
    }
    debug!("receive worker for {} exiting", conn.peer());
}

// ── Tests ─────────────────────────────────────────────────────────────────────
