//! Infrastructure layer for the relay client.
//!
//! Contains the adapters around the application layer: TOML configuration,
//! command-line parsing, the frame source, and the transport peer link.
//!
//! **Dependency rule**: this layer may depend on `application`, `relay_core`
//! and `relay_comm`, but MUST NOT be imported by the `application` layer.

pub mod cli;
pub mod config;
pub mod frame_source;
pub mod network;
