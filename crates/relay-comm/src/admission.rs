//! Server-side admission of inbound connections.
//!
//! The accept loop asks the endpoint's [`AdmissionPolicy`] about every
//! candidate socket.  A rejected candidate is closed straight away; the peer
//! sees nothing but the closed socket.
//!
//! Policies are injected through
//! [`EndpointOptions`](crate::endpoint::EndpointOptions).  Plain closures
//! work too:
//!
//! ```rust
//! use std::sync::Arc;
//! use relay_comm::EndpointOptions;
//!
//! // Only peers on the loopback interface, any number of them.
//! let policy = |peer: std::net::SocketAddr, _active: usize| peer.ip().is_loopback();
//! let options = EndpointOptions {
//!     policy: Arc::new(policy),
//!     ..EndpointOptions::default()
//! };
//! # let _ = options;
//! ```

use std::net::SocketAddr;

use tracing::info;

pub trait AdmissionPolicy: Send + Sync {
    /// Decides whether `peer` may connect while `active` remote connections
    /// are registered.
    fn allow(&self, peer: SocketAddr, active: usize) -> bool;

    /// Called once a candidate has been admitted and its workers started.
    fn on_admitted(&self, peer: SocketAddr) {
        info!("admitted {peer}");
    }
}

/// Admits a candidate only while no remote connection is registered.
#[derive(Debug, Clone, Copy, Default)]
pub struct SinglePeer;

impl AdmissionPolicy for SinglePeer {
    fn allow(&self, _peer: SocketAddr, active: usize) -> bool {
        active == 0
    }
}

/// Admits up to `n` simultaneous remote connections.
#[derive(Debug, Clone, Copy)]
pub struct MaxPeers(pub usize);

impl AdmissionPolicy for MaxPeers {
    fn allow(&self, _peer: SocketAddr, active: usize) -> bool {
        active < self.0
    }
}

impl<F> AdmissionPolicy for F
where
    F: Fn(SocketAddr, usize) -> bool + Send + Sync,
{
    fn allow(&self, peer: SocketAddr, active: usize) -> bool {
        self(peer, active)
    }
}
