//! Display routing: pairing received images with "display now" requests.
//!
//! Images and display requests travel as separate messages, possibly on
//! separate connections, so they can arrive in either order.  The
//! [`router::DisplayRouter`] parks images by name and serves requests in
//! arrival order, dropping any request whose image never arrived.

pub mod router;

pub use router::{DisplayFunction, DisplayRouter, DrainOutcome, RouterCounters};
