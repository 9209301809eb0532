//! Infrastructure layer for the display server.
//!
//! Contains the adapters around the application layer: TOML configuration,
//! command-line parsing, the transport inbox, and the frame sinks that act
//! as render callbacks.
//!
//! **Dependency rule**: this layer may depend on `application`, `relay_core`
//! and `relay_comm`, but MUST NOT be imported by the `application` layer.

pub mod cli;
pub mod config;
pub mod frame_sink;
pub mod network;
