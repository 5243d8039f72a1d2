//! Three-way handshake state machines.
//!
//! The exchange that establishes a TRELLIS connection:
//!
//! ```text
//! Initiator                    Responder
//!    |----------- SYN ----------->|   Idle    -> SynRcvd
//!    |<--------- SYN-ACK ---------|   SynSent -> Established (on receipt)
//!    |----------- ACK ----------->|   SynRcvd -> Established
//!    |<-- "Connection Established"|   greeting DATA frame
//! ```
//!
//! Both machines are pure: they consume and produce [`ControlFrame`]s and
//! never touch a socket, so the same logic drives the client and server
//! paths and tests can exercise every transition without I/O. Any frame
//! other than the one the current phase expects aborts the handshake and
//! parks the machine in [`Phase::Failed`]. A completed machine converts
//! into a [`ConnectionState`] via `into_connection`.

use std::net::SocketAddr;

use tracing::debug;

use super::connection::{ConnectionState, Phase};
use super::frame::ControlFrame;
use crate::core::{ProtocolError, ESTABLISHED_MESSAGE, TAG_ACK, TAG_SYN, TAG_SYN_ACK};

/// Handshake driver for the side that opens the connection.
#[derive(Debug)]
pub struct InitiatorHandshake {
    phase: Phase,
}

impl Default for InitiatorHandshake {
    fn default() -> Self {
        Self::new()
    }
}

impl InitiatorHandshake {
    /// A machine ready to send its SYN.
    pub fn new() -> Self {
        Self { phase: Phase::Idle }
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Whether the handshake has completed.
    pub fn is_established(&self) -> bool {
        self.phase == Phase::Established
    }

    /// Produce the opening SYN. Valid only once, from `Idle`.
    pub fn start(&mut self) -> Result<ControlFrame, ProtocolError> {
        if self.phase != Phase::Idle {
            return Err(ProtocolError::InvalidTransition {
                phase: self.phase.name(),
                action: "start",
            });
        }
        self.phase = Phase::SynSent;
        debug!("handshake: sent SYN, awaiting SYN-ACK");
        Ok(ControlFrame::Syn)
    }

    /// Feed the peer's reply. SYN-ACK establishes the connection and
    /// yields the confirming ACK for the caller to transmit; anything
    /// else aborts.
    pub fn on_reply(&mut self, frame: &ControlFrame) -> Result<ControlFrame, ProtocolError> {
        match (self.phase, frame) {
            (Phase::SynSent, ControlFrame::SynAck) => {
                self.phase = Phase::Established;
                debug!("handshake: received SYN-ACK, established");
                Ok(ControlFrame::Ack)
            }
            (Phase::SynSent, other) => {
                self.phase = Phase::Failed;
                Err(ProtocolError::UnexpectedFrame {
                    expected: TAG_SYN_ACK,
                    got: other.tag().to_string(),
                })
            }
            _ => Err(ProtocolError::InvalidTransition {
                phase: self.phase.name(),
                action: "on_reply",
            }),
        }
    }

    /// Convert a completed handshake into connection state for `peer`.
    pub fn into_connection(self, peer: SocketAddr) -> Result<ConnectionState, ProtocolError> {
        if self.phase != Phase::Established {
            return Err(ProtocolError::InvalidTransition {
                phase: self.phase.name(),
                action: "into_connection",
            });
        }
        let mut conn = ConnectionState::initiator(peer);
        conn.complete_handshake();
        Ok(conn)
    }
}

/// Handshake driver for the side that accepts the connection.
#[derive(Debug)]
pub struct ResponderHandshake {
    phase: Phase,
}

impl Default for ResponderHandshake {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponderHandshake {
    /// A machine waiting for the peer's SYN.
    pub fn new() -> Self {
        Self { phase: Phase::Idle }
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Whether the handshake has completed.
    pub fn is_established(&self) -> bool {
        self.phase == Phase::Established
    }

    /// Feed an inbound frame and get the frame to send back.
    ///
    /// SYN in `Idle` yields the SYN-ACK; ACK in `SynRcvd` completes the
    /// handshake and yields the greeting DATA frame. Anything else aborts.
    pub fn on_frame(&mut self, frame: &ControlFrame) -> Result<ControlFrame, ProtocolError> {
        match (self.phase, frame) {
            (Phase::Idle, ControlFrame::Syn) => {
                self.phase = Phase::SynRcvd;
                debug!("handshake: received SYN, sending SYN-ACK");
                Ok(ControlFrame::SynAck)
            }
            (Phase::Idle, other) => {
                self.phase = Phase::Failed;
                Err(ProtocolError::UnexpectedFrame {
                    expected: TAG_SYN,
                    got: other.tag().to_string(),
                })
            }
            (Phase::SynRcvd, ControlFrame::Ack) => {
                self.phase = Phase::Established;
                debug!("handshake: received ACK, established");
                Ok(ControlFrame::data(ESTABLISHED_MESSAGE))
            }
            (Phase::SynRcvd, other) => {
                self.phase = Phase::Failed;
                Err(ProtocolError::UnexpectedFrame {
                    expected: TAG_ACK,
                    got: other.tag().to_string(),
                })
            }
            _ => Err(ProtocolError::InvalidTransition {
                phase: self.phase.name(),
                action: "on_frame",
            }),
        }
    }

    /// Convert a completed handshake into connection state for `peer`.
    pub fn into_connection(self, peer: SocketAddr) -> Result<ConnectionState, ProtocolError> {
        if self.phase != Phase::Established {
            return Err(ProtocolError::InvalidTransition {
                phase: self.phase.name(),
                action: "into_connection",
            });
        }
        let mut conn = ConnectionState::responder(peer);
        conn.complete_handshake();
        Ok(conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TAG_FIN;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:5555".parse().unwrap()
    }

    #[test]
    fn test_full_handshake_establishes_both_sides() {
        let mut initiator = InitiatorHandshake::new();
        let mut responder = ResponderHandshake::new();

        let syn = initiator.start().unwrap();
        assert_eq!(initiator.phase(), Phase::SynSent);

        let syn_ack = responder.on_frame(&syn).unwrap();
        assert_eq!(responder.phase(), Phase::SynRcvd);
        assert_eq!(syn_ack, ControlFrame::SynAck);

        let ack = initiator.on_reply(&syn_ack).unwrap();
        assert!(initiator.is_established());
        assert_eq!(ack, ControlFrame::Ack);

        let greeting = responder.on_frame(&ack).unwrap();
        assert!(responder.is_established());
        assert_eq!(greeting, ControlFrame::data(ESTABLISHED_MESSAGE));
    }

    #[test]
    fn test_completed_machines_convert_to_connections() {
        let mut initiator = InitiatorHandshake::new();
        let mut responder = ResponderHandshake::new();

        let syn = initiator.start().unwrap();
        let syn_ack = responder.on_frame(&syn).unwrap();
        let ack = initiator.on_reply(&syn_ack).unwrap();
        responder.on_frame(&ack).unwrap();

        let conn = initiator.into_connection(test_addr()).unwrap();
        assert!(conn.is_established());

        let conn = responder.into_connection(test_addr()).unwrap();
        assert!(conn.is_established());
    }

    #[test]
    fn test_incomplete_machine_cannot_convert() {
        let mut initiator = InitiatorHandshake::new();
        initiator.start().unwrap();

        let err = initiator.into_connection(test_addr()).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidTransition { .. }));
    }

    #[test]
    fn test_initiator_aborts_on_unexpected_frame() {
        let mut initiator = InitiatorHandshake::new();
        initiator.start().unwrap();

        let err = initiator.on_reply(&ControlFrame::data("hello")).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::UnexpectedFrame { expected: "SYN-ACK", .. }
        ));
        assert_eq!(initiator.phase(), Phase::Failed);
    }

    #[test]
    fn test_responder_rejects_ack_before_syn() {
        let mut responder = ResponderHandshake::new();

        let err = responder.on_frame(&ControlFrame::Ack).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::UnexpectedFrame { expected: "SYN", .. }
        ));
        assert_eq!(responder.phase(), Phase::Failed);
    }

    #[test]
    fn test_responder_rejects_duplicate_syn() {
        let mut responder = ResponderHandshake::new();
        responder.on_frame(&ControlFrame::Syn).unwrap();

        let err = responder.on_frame(&ControlFrame::Syn).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::UnexpectedFrame { expected: "ACK", .. }
        ));
        assert_eq!(responder.phase(), Phase::Failed);
    }

    #[test]
    fn test_responder_aborts_on_fin_during_establishment() {
        let mut responder = ResponderHandshake::new();
        responder.on_frame(&ControlFrame::Syn).unwrap();

        let err = responder.on_frame(&ControlFrame::Fin).unwrap_err();
        match err {
            ProtocolError::UnexpectedFrame { expected, got } => {
                assert_eq!(expected, TAG_ACK);
                assert_eq!(got, TAG_FIN);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_start_is_single_shot() {
        let mut initiator = InitiatorHandshake::new();
        initiator.start().unwrap();

        let err = initiator.start().unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::InvalidTransition { phase: "SynSent", action: "start" }
        ));
    }

    #[test]
    fn test_no_frames_accepted_after_establishment() {
        let mut initiator = InitiatorHandshake::new();
        initiator.start().unwrap();
        initiator.on_reply(&ControlFrame::SynAck).unwrap();

        let err = initiator.on_reply(&ControlFrame::SynAck).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidTransition { .. }));
    }

    #[test]
    fn test_failed_machine_stays_failed() {
        let mut responder = ResponderHandshake::new();
        responder.on_frame(&ControlFrame::Fin).unwrap_err();

        let err = responder.on_frame(&ControlFrame::Syn).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidTransition { .. }));
        assert_eq!(responder.phase(), Phase::Failed);
    }
}
