//! Application layer use cases for the display server.
//!
//! Nothing in here opens a socket or a file.  Received messages come in
//! through the [`frame_intake::Inbox`] trait, and snapshots are written to
//! any `std::io::Write`.
//!
//! - **`control_params`** – Parses the `key value` control string carried in
//!   the name of every image message.
//!
//! - **`frame_intake`** – Drains received messages once per display tick,
//!   caches the newest images, and feeds the display router.

pub mod control_params;
pub mod frame_intake;
