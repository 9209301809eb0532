//! Protocol module containing the message type, the binary codec, and the
//! decode-progress marker used for receive-side logging.

pub mod codec;
pub mod messages;
pub mod progress;

pub use codec::{decode_message, encode_header, encode_message, payload_len_field, ProtocolError};
pub use messages::*;
pub use progress::{DecodeProgress, ProgressTracker};
