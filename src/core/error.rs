//! Error types for the TRELLIS protocol.
//!
//! One enum per layer, composed into [`TrellisError`] at the top. Only
//! `ChannelError::Timeout` is ever recovered from (by the delivery layer's
//! retry loop, within its budget); every other variant is fatal to the
//! connection that produced it.

use thiserror::Error;

/// Errors raised by the channel abstraction.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// No unit arrived within the receive timeout.
    #[error("receive timed out")]
    Timeout,

    /// The peer closed the stream.
    #[error("connection closed by peer")]
    Closed,

    /// Underlying socket failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChannelError {
    /// Check whether this error is recoverable by retrying the exchange.
    ///
    /// Only timeouts are; a closed or broken stream cannot be retried on.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ChannelError::Timeout)
    }
}

/// Errors raised by the control-frame protocol.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A frame arrived that the current phase cannot accept.
    ///
    /// Indicates a desynchronized peer, never transient loss, so it is
    /// fatal to the connection and never retried.
    #[error("unexpected frame: expected {expected}, got {got}")]
    UnexpectedFrame {
        /// Tag the state machine was prepared to accept.
        expected: &'static str,
        /// Wire text of the frame actually observed.
        got: String,
    },

    /// Bytes on the wire do not decode to any control frame.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// A state machine was driven from a phase that does not permit it.
    #[error("invalid transition: cannot {action} while {phase}")]
    InvalidTransition {
        /// Name of the phase the machine was in.
        phase: &'static str,
        /// The operation that was attempted.
        action: &'static str,
    },
}

/// Errors raised by the reliable delivery layer.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The retry budget ran out without observing a matching reply.
    #[error("delivery exhausted after {attempts} attempts (last reply: {last_reply:?})")]
    Exhausted {
        /// How many sends were attempted.
        attempts: u32,
        /// Wire text of the last non-matching reply, if any arrived at all.
        last_reply: Option<String>,
    },

    /// The frame kind has no acknowledgment pattern and cannot be sent
    /// reliably (it is itself an acknowledgment).
    #[error("frame {0} has no acknowledgment pattern")]
    NoAckPattern(&'static str),

    /// The channel failed in a way retrying cannot fix.
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),
}

/// Errors raised by the secure session layer.
#[derive(Debug, Error)]
pub enum SecurityError {
    /// The integrity tag did not match the recovered plaintext.
    ///
    /// The plaintext is discarded; the connection must be closed.
    #[error("record authentication failed")]
    AuthenticationFailed,

    /// The ciphertext is structurally impossible to decrypt.
    #[error("record decryption failed")]
    DecryptionFailed,
}

/// Top-level TRELLIS errors.
#[derive(Debug, Error)]
pub enum TrellisError {
    /// Channel error.
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Protocol error.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Delivery error.
    #[error("delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    /// Security error.
    #[error("security error: {0}")]
    Security(#[from] SecurityError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl TrellisError {
    /// Check whether this error is fatal to its connection.
    ///
    /// Everything except a bare channel timeout is; timeouts are only
    /// recoverable inside the delivery layer's own retry budget.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, TrellisError::Channel(ChannelError::Timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_channel_errors() {
        assert!(ChannelError::Timeout.is_retryable());
        assert!(!ChannelError::Closed.is_retryable());
        assert!(
            !ChannelError::Io(std::io::Error::new(std::io::ErrorKind::Other, "boom"))
                .is_retryable()
        );
    }

    #[test]
    fn test_fatal_classification() {
        assert!(!TrellisError::Channel(ChannelError::Timeout).is_fatal());
        assert!(TrellisError::Channel(ChannelError::Closed).is_fatal());
        assert!(TrellisError::Security(SecurityError::AuthenticationFailed).is_fatal());
        assert!(
            TrellisError::Delivery(DeliveryError::Exhausted {
                attempts: 5,
                last_reply: None,
            })
            .is_fatal()
        );
    }

    #[test]
    fn test_error_display() {
        let err = ProtocolError::UnexpectedFrame {
            expected: "SYN-ACK",
            got: "FIN".to_string(),
        };
        assert_eq!(err.to_string(), "unexpected frame: expected SYN-ACK, got FIN");

        let err = DeliveryError::Exhausted {
            attempts: 5,
            last_reply: None,
        };
        assert!(err.to_string().contains("5 attempts"));
    }

    #[test]
    fn test_from_conversions() {
        let err: DeliveryError = ChannelError::Closed.into();
        assert!(matches!(err, DeliveryError::Channel(ChannelError::Closed)));

        let err: TrellisError = SecurityError::DecryptionFailed.into();
        assert!(matches!(
            err,
            TrellisError::Security(SecurityError::DecryptionFailed)
        ));
    }
}
