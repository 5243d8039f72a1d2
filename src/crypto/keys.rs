//! Session key material and derivation.
//!
//! The session key is derived from the Diffie-Hellman shared secret by
//! formatting it as a decimal string, left-padded with zeros to 16
//! characters and truncated to 16, whose ASCII bytes become the AES-128
//! key. Both endpoints perform the identical derivation, so the keys
//! match whenever the secrets do. The keyspace is bounded by the DH
//! group, so key strength is only ever as good as the group in use.

use std::fmt;

use rand::{rngs::OsRng, RngCore};
use zeroize::Zeroize;

use crate::core::{DEFAULT_AUTH_KEY, IV_SIZE, SESSION_KEY_SIZE};

/// A 16-byte AES-128 session key.
///
/// Zeroized on drop.
#[derive(Clone)]
pub struct SessionKey([u8; SESSION_KEY_SIZE]);

impl SessionKey {
    /// Derive the key from a Diffie-Hellman shared secret.
    pub fn from_shared_secret(secret: u64) -> Self {
        let digits = format!("{secret:016}");
        let mut key = [0u8; SESSION_KEY_SIZE];
        key.copy_from_slice(&digits.as_bytes()[..SESSION_KEY_SIZE]);
        Self(key)
    }

    /// Wrap existing key material.
    pub fn from_bytes(bytes: [u8; SESSION_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// The raw key bytes.
    ///
    /// Handle with care, this exposes sensitive key material.
    pub fn as_bytes(&self) -> &[u8; SESSION_KEY_SIZE] {
        &self.0
    }
}

impl Drop for SessionKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKey(..)")
    }
}

/// The shared HMAC authentication key.
///
/// Both endpoints hold the same statically configured key; it
/// authenticates plaintext, it is not negotiated per session.
/// Zeroized on drop.
#[derive(Clone)]
pub struct AuthKey(Vec<u8>);

impl Default for AuthKey {
    fn default() -> Self {
        Self(DEFAULT_AUTH_KEY.to_vec())
    }
}

impl AuthKey {
    /// Wrap an explicit authentication key.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// The raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Drop for AuthKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for AuthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthKey(..)")
    }
}

/// A fresh random initialization vector for one record.
pub fn generate_iv() -> [u8; IV_SIZE] {
    let mut iv = [0u8; IV_SIZE];
    OsRng.fill_bytes(&mut iv);
    iv
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_derivation_pads_small_secrets() {
        let key = SessionKey::from_shared_secret(2);
        assert_eq!(key.as_bytes(), b"0000000000000002");
    }

    #[test]
    fn test_key_derivation_keeps_sixteen_digit_secrets() {
        let key = SessionKey::from_shared_secret(1_234_567_890_123_456);
        assert_eq!(key.as_bytes(), b"1234567890123456");
    }

    #[test]
    fn test_key_derivation_truncates_long_secrets() {
        // u64::MAX has 20 decimal digits; only the first 16 survive.
        let key = SessionKey::from_shared_secret(u64::MAX);
        assert_eq!(key.as_bytes(), b"1844674407370955");
    }

    #[test]
    fn test_auth_key_default() {
        let auth = AuthKey::default();
        assert_eq!(auth.as_bytes(), b"shared_hmac_key");
    }

    #[test]
    fn test_auth_key_from_bytes() {
        let auth = AuthKey::from_bytes(b"other_key".to_vec());
        assert_eq!(auth.as_bytes(), b"other_key");
    }

    #[test]
    fn test_generated_ivs_differ() {
        assert_ne!(generate_iv(), generate_iv());
    }
}
