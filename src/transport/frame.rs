//! Control-frame encoding and decoding for the TRELLIS transport layer.
//!
//! The control protocol is a tag-string protocol: every frame is UTF-8
//! text, one frame per channel unit, and the receiver infers the protocol
//! phase purely from its own state plus the tag of the next frame. There
//! are no sequence numbers and no length prefixes; this is a deliberate
//! simplification and part of the tested wire behavior.
//!
//! Wire forms:
//!
//! ```text
//! "SYN"              connection request
//! "SYN-ACK"          handshake acknowledgment
//! "ACK"              positive acknowledgment
//! "FIN"              termination request
//! "Message 1"        DATA - arbitrary payload text
//! "Echo: Message 1"  ECHO - payload text behind the echo prefix
//! ```
//!
//! Payload text that collides with a reserved tag (a DATA frame reading
//! exactly `"SYN"`, say) is indistinguishable from that tag on the wire.
//! Known limitation of the tag encoding; callers own their payloads.

use std::fmt;

use crate::core::{ECHO_PREFIX, MAX_FRAME_SIZE, ProtocolError, TAG_ACK, TAG_FIN, TAG_SYN, TAG_SYN_ACK};

/// A tagged unit of the control protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlFrame {
    /// Connection request (initiator's first frame).
    Syn,
    /// Responder's handshake acknowledgment.
    SynAck,
    /// Positive acknowledgment (completes handshake, answers FIN).
    Ack,
    /// Termination request.
    Fin,
    /// Application payload text.
    Data(String),
    /// Echoed payload text (stored without the wire prefix).
    Echo(String),
}

impl ControlFrame {
    /// Convenience constructor for a DATA frame.
    pub fn data(text: impl Into<String>) -> Self {
        ControlFrame::Data(text.into())
    }

    /// Build the ECHO frame answering the given payload text.
    pub fn echo_of(payload: &str) -> Self {
        ControlFrame::Echo(payload.to_string())
    }

    /// Short tag name for diagnostics and error reporting.
    pub fn tag(&self) -> &'static str {
        match self {
            ControlFrame::Syn => TAG_SYN,
            ControlFrame::SynAck => TAG_SYN_ACK,
            ControlFrame::Ack => TAG_ACK,
            ControlFrame::Fin => TAG_FIN,
            ControlFrame::Data(_) => "DATA",
            ControlFrame::Echo(_) => "ECHO",
        }
    }

    /// Encode to the wire representation.
    pub fn encode(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }

    /// Decode a received unit into a control frame.
    ///
    /// Any valid UTF-8 text that is not a reserved tag and does not carry
    /// the echo prefix is a DATA frame; only empty, oversized, or
    /// non-UTF-8 units are malformed.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.is_empty() {
            return Err(ProtocolError::MalformedFrame("empty frame".to_string()));
        }
        if bytes.len() > MAX_FRAME_SIZE {
            return Err(ProtocolError::MalformedFrame(format!(
                "frame of {} bytes exceeds the {MAX_FRAME_SIZE}-byte maximum",
                bytes.len()
            )));
        }

        let text = std::str::from_utf8(bytes)
            .map_err(|_| ProtocolError::MalformedFrame("frame is not valid UTF-8".to_string()))?;

        Ok(match text {
            TAG_SYN => ControlFrame::Syn,
            TAG_SYN_ACK => ControlFrame::SynAck,
            TAG_ACK => ControlFrame::Ack,
            TAG_FIN => ControlFrame::Fin,
            _ => match text.strip_prefix(ECHO_PREFIX) {
                Some(payload) => ControlFrame::Echo(payload.to_string()),
                None => ControlFrame::Data(text.to_string()),
            },
        })
    }

    /// The tag a matching acknowledgment carries, if this frame has an
    /// acknowledgment pattern at all.
    ///
    /// DATA is answered by ECHO, FIN by ACK, and SYN by SYN-ACK (so the
    /// handshake's first step composes with the delivery layer's retry).
    /// Acknowledgments themselves have no pattern.
    pub fn expected_ack_tag(&self) -> Option<&'static str> {
        match self {
            ControlFrame::Data(_) => Some("ECHO"),
            ControlFrame::Fin => Some(TAG_ACK),
            ControlFrame::Syn => Some(TAG_SYN_ACK),
            _ => None,
        }
    }

    /// Check whether `reply` satisfies this frame's acknowledgment pattern.
    ///
    /// Matching is by tag only: any ECHO acknowledges a DATA frame,
    /// whatever its payload. The responder echoes whatever it received,
    /// so under retransmission the first echo observed wins.
    pub fn is_acknowledged_by(&self, reply: &ControlFrame) -> bool {
        matches!(
            (self, reply),
            (ControlFrame::Data(_), ControlFrame::Echo(_))
                | (ControlFrame::Fin, ControlFrame::Ack)
                | (ControlFrame::Syn, ControlFrame::SynAck)
        )
    }
}

impl fmt::Display for ControlFrame {
    /// Formats the frame exactly as it appears on the wire.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlFrame::Syn => f.write_str(TAG_SYN),
            ControlFrame::SynAck => f.write_str(TAG_SYN_ACK),
            ControlFrame::Ack => f.write_str(TAG_ACK),
            ControlFrame::Fin => f.write_str(TAG_FIN),
            ControlFrame::Data(text) => f.write_str(text),
            ControlFrame::Echo(payload) => write!(f, "{ECHO_PREFIX}{payload}"),
        }
    }
}
