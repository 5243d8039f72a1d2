//! TRELLIS Protocol - Client Library
//!
//! High-level API for TRELLIS clients: connect, exchange messages, and
//! tear the connection down.

#[allow(clippy::module_inception)]
mod client;

pub use client::*;
