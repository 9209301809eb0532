//! # relay-comm
//!
//! TCP transport for frame-relay.  An [`Endpoint`] plays one role:
//!
//! - **client** – resolves a host, connects, and runs one send worker and one
//!   receive worker on the resulting [`Connection`];
//! - **server** – binds a port, runs an accept loop, offers each candidate to
//!   an [`AdmissionPolicy`], and runs a worker pair per admitted peer.
//!
//! Everything here uses blocking `std::net` sockets on dedicated OS threads.
//! Every blocking wait is bounded by [`CommSettings::poll_timeout`], so
//! clearing a liveness flag stops any worker within one poll period.
//!
//! # Lifecycle (for beginners)
//!
//! ```text
//! Endpoint::client(..) / Endpoint::server(..)
//!        │
//!        ▼
//!   connect() ──► connect_result() == Pending ... Success | <failure>
//!        │
//!        ▼
//!   send(msg, mode) / next_received()
//!        │
//!        ▼
//!   disconnect()   (also run on drop)
//! ```
//!
//! [`start_clients`] and [`start_server`] wrap this lifecycle for the
//! applications: they connect, poll the result every millisecond, and hand
//! back only fully-connected endpoints.

pub mod admission;
pub mod connection;
pub mod diagnostics;
pub mod endpoint;
pub mod error;
pub mod pipeline;
pub mod registry;
pub mod settings;
pub mod startup;
pub mod waiter;

pub use admission::{AdmissionPolicy, MaxPeers, SinglePeer};
pub use connection::Connection;
pub use endpoint::{Endpoint, EndpointOptions, Role, SendMode};
pub use error::{CommError, ConnectResult, TransportError};
pub use registry::{ConnectionHandle, ConnectionRegistry};
pub use settings::CommSettings;
pub use startup::{start_clients, start_server, DEFAULT_HOST, DEFAULT_PORT};
pub use waiter::Waiter;
