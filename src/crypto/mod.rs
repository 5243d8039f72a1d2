//! TRELLIS Protocol - Secure Session Layer
//!
//! One-shot encrypted-and-authenticated messaging layered after the
//! handshake. It provides:
//!
//! - **Key agreement**: [`DhParams`] and [`KeyExchange`] over small prime
//!   fields (textbook Diffie-Hellman, u64 modular exponentiation)
//! - **Key derivation**: [`SessionKey`] from the decimal rendering of the
//!   shared secret, plus the static [`AuthKey`] for integrity tags
//! - **Records**: [`SecureRecord`] sealing with AES-128-CBC/PKCS#7 and
//!   HMAC-SHA256 over the plaintext, verified in constant time
//! - **Sessions**: [`SecureSession`] driving the exchange over a channel
//!   and carrying records as single wire units
//!
//! The default parameters are demonstration-grade and documented as such;
//! every type accepts real parameters through [`SecurityConfig`].

mod exchange;
mod keys;
mod record;
mod session;

pub use exchange::*;
pub use keys::*;
pub use record::*;
pub use session::*;
