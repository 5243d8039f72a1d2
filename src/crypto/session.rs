//! Secure session management.
//!
//! This module combines the cryptographic pieces into a high-level
//! [`SecureSession`] that handles:
//! - Driving the key agreement over an established channel
//! - Deriving and holding the session key and authentication key
//! - Sealing and opening records, and carrying them over the wire
//!
//! The key exchange order is initiator-writes-first: the initiator
//! transmits its public value as soon as the secure phase begins, then
//! reads the responder's; the responder reads first, then writes. Both
//! values must cross before either side derives the key, and the strict
//! write/read alternation keeps adjacent writes from one side from
//! coalescing into a single unit on the byte stream.

use std::time::Duration;

use tracing::debug;

use crate::core::{ChannelError, ProtocolError, SecurityError, TrellisError};
use crate::transport::TrellisChannel;

use super::exchange::{DhParams, KeyExchange};
use super::keys::{AuthKey, SessionKey};
use super::record::SecureRecord;

/// Security parameters both endpoints must agree on out of band.
///
/// Nothing here is negotiated at runtime; mismatched parameters surface
/// as a failed record, not a protocol error.
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// Diffie-Hellman group.
    pub params: DhParams,
    /// Static pre-shared HMAC key.
    pub auth_key: AuthKey,
    /// Fixed private exponent for reproducible sessions. `None` draws a
    /// fresh exponent per session.
    pub private_exponent: Option<u64>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            params: DhParams::default(),
            auth_key: AuthKey::default(),
            private_exponent: None,
        }
    }
}

impl SecurityConfig {
    fn make_exchange(&self) -> KeyExchange {
        match self.private_exponent {
            Some(private) => KeyExchange::with_private(self.params, private),
            None => KeyExchange::generate(self.params),
        }
    }
}

/// An established secure sub-channel: the derived session key plus the
/// shared authentication key.
#[derive(Debug)]
pub struct SecureSession {
    key: SessionKey,
    auth: AuthKey,
}

impl SecureSession {
    /// Assemble a session from already-derived key material.
    pub fn new(key: SessionKey, auth: AuthKey) -> Self {
        Self { key, auth }
    }

    /// Run the key agreement as the initiator: send our public value,
    /// then read the peer's.
    pub async fn establish_initiator(
        channel: &mut TrellisChannel,
        config: &SecurityConfig,
        timeout: Duration,
    ) -> Result<Self, TrellisError> {
        let exchange = config.make_exchange();
        let own_public = exchange.public_value();

        send_public_value(channel, own_public).await?;
        let peer_public = receive_public_value(channel, timeout).await?;

        debug!(own_public, peer_public, "key agreement complete (initiator)");
        Ok(Self::new(
            exchange.into_session_key(peer_public),
            config.auth_key.clone(),
        ))
    }

    /// Run the key agreement as the responder: read the peer's public
    /// value, then send our own.
    pub async fn establish_responder(
        channel: &mut TrellisChannel,
        config: &SecurityConfig,
        timeout: Duration,
    ) -> Result<Self, TrellisError> {
        let exchange = config.make_exchange();
        let own_public = exchange.public_value();

        let peer_public = receive_public_value(channel, timeout).await?;
        send_public_value(channel, own_public).await?;

        debug!(own_public, peer_public, "key agreement complete (responder)");
        Ok(Self::new(
            exchange.into_session_key(peer_public),
            config.auth_key.clone(),
        ))
    }

    /// Encrypt and authenticate one plaintext into a record.
    pub fn seal(&self, plaintext: &[u8]) -> SecureRecord {
        SecureRecord::seal(&self.key, &self.auth, plaintext)
    }

    /// Decrypt and verify one record, returning the plaintext.
    pub fn open(&self, record: &SecureRecord) -> Result<Vec<u8>, SecurityError> {
        record.open(&self.key, &self.auth)
    }

    /// Seal `plaintext` and transmit the record as one channel unit.
    pub async fn send_record(
        &self,
        channel: &mut TrellisChannel,
        plaintext: &[u8],
    ) -> Result<(), ChannelError> {
        let record = self.seal(plaintext);
        channel.send(&record.to_bytes()).await
    }

    /// Receive one record unit, split it structurally, and open it.
    pub async fn receive_record(
        &self,
        channel: &mut TrellisChannel,
        timeout: Duration,
    ) -> Result<Vec<u8>, TrellisError> {
        let unit = channel.receive(timeout).await?;
        let record = SecureRecord::from_bytes(unit)?;
        Ok(self.open(&record)?)
    }

    /// The derived session key.
    ///
    /// Handle with care, this exposes sensitive key material.
    pub fn session_key(&self) -> &SessionKey {
        &self.key
    }
}

async fn send_public_value(channel: &mut TrellisChannel, value: u64) -> Result<(), ChannelError> {
    channel.send(value.to_string().as_bytes()).await
}

async fn receive_public_value(
    channel: &mut TrellisChannel,
    timeout: Duration,
) -> Result<u64, TrellisError> {
    let unit = channel.receive(timeout).await?;
    let text = std::str::from_utf8(unit)
        .map_err(|_| ProtocolError::MalformedFrame("key-exchange message is not UTF-8".into()))?;
    let value = text.trim().parse::<u64>().map_err(|_| {
        ProtocolError::MalformedFrame(format!(
            "key-exchange message is not a decimal integer: {text:?}"
        ))
    })?;
    Ok(value)
}
