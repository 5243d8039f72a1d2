//! Connection state management for the TRELLIS transport layer.
//!
//! Tracks which side of the conversation we are ([`Role`]) and where the
//! connection sits in its lifecycle ([`Phase`]). Phase ordering during
//! establishment is enforced by the handshake machines in
//! [`super::handshake`]; this module owns the bookkeeping that outlives
//! the handshake.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Which side of the connection this endpoint plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Opens the connection: sends SYN, waits for SYN-ACK, confirms with ACK.
    Initiator,
    /// Accepts the connection: waits for SYN, replies SYN-ACK, waits for ACK.
    Responder,
}

impl Role {
    /// Short name for log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Role::Initiator => "initiator",
            Role::Responder => "responder",
        }
    }
}

/// Connection lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No handshake traffic yet.
    Idle,
    /// Initiator has sent SYN and awaits SYN-ACK.
    SynSent,
    /// Responder has seen SYN, replied SYN-ACK, and awaits ACK.
    SynRcvd,
    /// Handshake complete, data transfer active.
    Established,
    /// FIN sent, waiting for the closing ACK.
    Closing,
    /// Connection closed cleanly.
    Closed,
    /// Connection aborted (protocol violation, auth failure, dead peer).
    Failed,
}

impl Phase {
    /// Short name for log lines and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Idle => "Idle",
            Phase::SynSent => "SynSent",
            Phase::SynRcvd => "SynRcvd",
            Phase::Established => "Established",
            Phase::Closing => "Closing",
            Phase::Closed => "Closed",
            Phase::Failed => "Failed",
        }
    }

    /// Whether the connection has reached a state it cannot leave.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Closed | Phase::Failed)
    }
}

/// Per-connection state shared by client and server sessions.
#[derive(Debug)]
pub struct ConnectionState {
    /// Which side we play.
    pub role: Role,
    /// Current lifecycle phase.
    pub phase: Phase,
    /// Remote peer address.
    pub remote_endpoint: SocketAddr,
    /// When we last received a frame from the peer.
    pub last_received: Instant,
    /// Frames sent on this connection (drops by the fault injector included,
    /// since the sender cannot tell them apart).
    pub frames_sent: u64,
    /// Frames received on this connection.
    pub frames_received: u64,
}

impl ConnectionState {
    /// Fresh state for the side that opens the connection.
    pub fn initiator(remote_endpoint: SocketAddr) -> Self {
        Self::new(Role::Initiator, remote_endpoint)
    }

    /// Fresh state for the side that accepts the connection.
    pub fn responder(remote_endpoint: SocketAddr) -> Self {
        Self::new(Role::Responder, remote_endpoint)
    }

    fn new(role: Role, remote_endpoint: SocketAddr) -> Self {
        Self {
            role,
            phase: Phase::Idle,
            remote_endpoint,
            last_received: Instant::now(),
            frames_sent: 0,
            frames_received: 0,
        }
    }

    /// Record an outbound frame.
    pub fn record_sent(&mut self) {
        self.frames_sent = self.frames_sent.saturating_add(1);
    }

    /// Record an inbound frame and refresh the idle clock.
    pub fn record_received(&mut self) {
        self.frames_received = self.frames_received.saturating_add(1);
        self.last_received = Instant::now();
    }

    /// Whether the peer has been silent longer than `idle_timeout`.
    pub fn is_idle_expired(&self, idle_timeout: Duration) -> bool {
        self.last_received.elapsed() > idle_timeout
    }

    /// Whether application data may flow.
    pub fn is_established(&self) -> bool {
        self.phase == Phase::Established
    }

    /// Mark the handshake complete.
    pub fn complete_handshake(&mut self) {
        self.phase = Phase::Established;
    }

    /// Begin graceful teardown.
    pub fn close(&mut self) {
        self.phase = Phase::Closing;
    }

    /// Mark the teardown finished.
    pub fn mark_closed(&mut self) {
        self.phase = Phase::Closed;
    }

    /// Abort the connection.
    pub fn mark_failed(&mut self) {
        self.phase = Phase::Failed;
    }
}
