//! TRELLIS Protocol - Transport Layer
//!
//! This module implements the connection-oriented transport that every other
//! layer builds on. It provides:
//!
//! - **Frame encoding/decoding**: [`ControlFrame`] and the text wire format
//! - **Unit channel**: [`TrellisChannel`] wrapping a TCP stream into one
//!   frame per send/receive with timeout-bounded reads
//! - **Fault injection**: [`FaultInjector`] for probabilistic outbound loss
//! - **Handshake machines**: [`InitiatorHandshake`] and [`ResponderHandshake`]
//!   driving the SYN / SYN-ACK / ACK exchange
//! - **Connection lifecycle**: [`ConnectionState`] with [`Role`] and [`Phase`]
//!
//! # Architecture
//!
//! The transport layer turns a raw byte stream into discrete control frames
//! with explicit connection phases. It knows nothing about retries or
//! encryption; those live above it.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │       Reliable / Secure Layers          │
//! ├─────────────────────────────────────────┤
//! │         Transport Layer                 │  ← This module
//! │   frames, handshake, channel, faults    │
//! ├─────────────────────────────────────────┤
//! │              TCP                        │
//! └─────────────────────────────────────────┘
//! ```

mod channel;
mod connection;
mod faults;
mod frame;
mod handshake;

pub use channel::*;
pub use connection::*;
pub use faults::*;
pub use frame::*;
pub use handshake::*;
