//! TRELLIS Protocol - Server Library
//!
//! High-level API for TRELLIS servers: accept connections, echo
//! application messages, and honor teardown.

#[allow(clippy::module_inception)]
mod server;

pub use server::*;
