//! Protocol constants for TRELLIS.
//!
//! Wire tags, record sizes, and the fixed shared parameters both ends must
//! agree on out-of-band. These values define the tested wire behavior and
//! MUST NOT be changed.

use std::time::Duration;

// =============================================================================
// CONTROL FRAME TAGS
// =============================================================================

/// Connection request, first frame of the three-way handshake.
pub const TAG_SYN: &str = "SYN";

/// Responder's acknowledgment of SYN, second frame of the handshake.
pub const TAG_SYN_ACK: &str = "SYN-ACK";

/// Positive acknowledgment (completes the handshake, answers FIN).
pub const TAG_ACK: &str = "ACK";

/// Connection termination request.
pub const TAG_FIN: &str = "FIN";

/// Prefix the responder puts in front of every echoed payload.
pub const ECHO_PREFIX: &str = "Echo: ";

/// Confirmation text the responder emits once the handshake completes.
pub const ESTABLISHED_MESSAGE: &str = "Connection Established";

// =============================================================================
// FRAME AND RECORD SIZES
// =============================================================================

/// Maximum size of a single channel unit (one write, one read).
pub const MAX_FRAME_SIZE: usize = 1024;

/// AES block size; also the initialization-vector length of a secure record.
pub const IV_SIZE: usize = 16;

/// Derived symmetric key length (AES-128).
pub const SESSION_KEY_SIZE: usize = 16;

/// HMAC-SHA256 integrity tag length.
pub const AUTH_TAG_SIZE: usize = 32;

// =============================================================================
// SHARED SECURITY PARAMETERS
// =============================================================================
// Deliberately tiny demonstration group. The derived key space is capped by
// the prime's range; see `crypto::keys` for why this stays unfixed.

/// Default public prime modulus for key agreement.
pub const DEFAULT_PRIME: u64 = 23;

/// Default public generator for key agreement.
pub const DEFAULT_BASE: u64 = 5;

/// Default static pre-shared key for the record integrity tag.
pub const DEFAULT_AUTH_KEY: &[u8] = b"shared_hmac_key";

// =============================================================================
// ENDPOINTS AND TIMING DEFAULTS
// =============================================================================

/// Default endpoint for both the listener and the connecting client.
pub const DEFAULT_ENDPOINT: &str = "127.0.0.1:5555";

/// Default bound on waiting for one reply before retransmitting.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Default retry ceiling for reliable delivery.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default bound on establishing the TCP connection itself.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Responder gives up on a connection idle for this long.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

// =============================================================================
// FAULT INJECTION
// =============================================================================

/// Loss probability used by the lossy demo profile.
pub const DEMO_LOSS_RATE: f64 = 0.2;
