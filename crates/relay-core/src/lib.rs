//! # relay-core
//!
//! Shared library for frame-relay containing the binary wire codec, the
//! streaming timing statistics, and the display router.
//!
//! This crate is used by the transport crate (`relay-comm`) and by both the
//! server and client applications.  It has no dependencies on network
//! sockets: everything here operates on byte buffers, durations, and
//! in-memory queues.
//!
//! # Architecture overview (for beginners)
//!
//! frame-relay streams captured images from one or more camera clients to a
//! display server over TCP.  The client pushes raw grayscale frames; the
//! server keeps the most recent ones and hands them to a renderer.
//!
//! - **`protocol`** – How bytes travel over the network.  Every message is a
//!   6-byte header (kind, name length, payload length) followed by the name
//!   and the payload.  [`protocol::decode_message`] pulls complete messages
//!   off the front of a growing receive buffer.
//!
//! - **`stats`** – A Welford running mean / standard deviation of inter-event
//!   timings, used to diagnose frame cadence.
//!
//! - **`display`** – A keyed store of pending images plus an ordered queue of
//!   "display this name now" requests, drained into a render callback.

pub mod display;
pub mod protocol;
pub mod stats;

pub use display::router::{DisplayFunction, DisplayRouter, DrainOutcome, RouterCounters};
pub use protocol::codec::{
    decode_message, encode_header, encode_message, payload_len_field, ProtocolError,
};
pub use protocol::messages::{Message, MessageKind, HEADER_SIZE, MAX_NAME_LEN};
pub use protocol::progress::{DecodeProgress, ProgressTracker};
pub use stats::TimingStats;
