//! Application layer use cases for the relay client.
//!
//! - **`frame_broadcast`** – Sends each captured frame to every connected
//!   display server under that server's name, then asks it to show the
//!   frame.  Servers are reached through the [`frame_broadcast::PeerLink`]
//!   trait so the use case can be tested without sockets.

pub mod frame_broadcast;
