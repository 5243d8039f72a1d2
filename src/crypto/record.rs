//! Sealed records: AES-128-CBC encryption with HMAC-SHA256 authentication.
//!
//! One record carries one protected message. On the wire it is the
//! concatenation of its three parts:
//!
//! ```text
//! +------------+----------------------+------------+
//! | iv (16 B)  | ciphertext (16n B)   | tag (32 B) |
//! +------------+----------------------+------------+
//! ```
//!
//! The tag authenticates the plaintext, not the ciphertext, so a record
//! must be decrypted before it can be verified. Every failure on that
//! path, padding included, is reported as [`SecurityError::AuthenticationFailed`];
//! only structurally impossible input (too short, ciphertext not a whole
//! number of blocks) is [`SecurityError::DecryptionFailed`]. Tag
//! comparison is constant-time.

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::core::{SecurityError, AUTH_TAG_SIZE, IV_SIZE};

use super::keys::{generate_iv, AuthKey, SessionKey};

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;
type HmacSha256 = Hmac<Sha256>;

/// AES block size; ciphertext length is always a multiple of this.
const BLOCK_SIZE: usize = 16;

/// One encrypted, authenticated message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecureRecord {
    iv: [u8; IV_SIZE],
    ciphertext: Vec<u8>,
    tag: [u8; AUTH_TAG_SIZE],
}

impl SecureRecord {
    /// Encrypt and authenticate `plaintext` under a fresh random IV.
    pub fn seal(key: &SessionKey, auth: &AuthKey, plaintext: &[u8]) -> Self {
        Self::seal_with_iv(key, auth, plaintext, generate_iv())
    }

    /// Encrypt and authenticate `plaintext` under the given IV.
    ///
    /// Reusing an IV under the same key leaks plaintext prefix equality;
    /// callers other than tests should prefer [`SecureRecord::seal`].
    pub fn seal_with_iv(
        key: &SessionKey,
        auth: &AuthKey,
        plaintext: &[u8],
        iv: [u8; IV_SIZE],
    ) -> Self {
        let ciphertext = Aes128CbcEnc::new(key.as_bytes().into(), &iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext);
        let tag = compute_tag(auth, plaintext);
        Self {
            iv,
            ciphertext,
            tag,
        }
    }

    /// Decrypt and verify, returning the plaintext.
    pub fn open(&self, key: &SessionKey, auth: &AuthKey) -> Result<Vec<u8>, SecurityError> {
        let plaintext = Aes128CbcDec::new(key.as_bytes().into(), &self.iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(&self.ciphertext)
            .map_err(|_| SecurityError::AuthenticationFailed)?;

        let mut mac = HmacSha256::new_from_slice(auth.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(&plaintext);
        mac.verify_slice(&self.tag)
            .map_err(|_| SecurityError::AuthenticationFailed)?;

        Ok(plaintext)
    }

    /// The initialization vector.
    pub fn iv(&self) -> &[u8; IV_SIZE] {
        &self.iv
    }

    /// The ciphertext blocks.
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// The authentication tag.
    pub fn tag(&self) -> &[u8; AUTH_TAG_SIZE] {
        &self.tag
    }

    /// Serialize as `iv || ciphertext || tag`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(IV_SIZE + self.ciphertext.len() + AUTH_TAG_SIZE);
        out.extend_from_slice(&self.iv);
        out.extend_from_slice(&self.ciphertext);
        out.extend_from_slice(&self.tag);
        out
    }

    /// Parse a serialized record, checking structure only.
    ///
    /// The record still has to pass [`SecureRecord::open`] before any of
    /// its content can be trusted.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SecurityError> {
        if bytes.len() < IV_SIZE + BLOCK_SIZE + AUTH_TAG_SIZE {
            return Err(SecurityError::DecryptionFailed);
        }
        let ct_len = bytes.len() - IV_SIZE - AUTH_TAG_SIZE;
        if ct_len % BLOCK_SIZE != 0 {
            return Err(SecurityError::DecryptionFailed);
        }

        let mut iv = [0u8; IV_SIZE];
        iv.copy_from_slice(&bytes[..IV_SIZE]);
        let ciphertext = bytes[IV_SIZE..IV_SIZE + ct_len].to_vec();
        let mut tag = [0u8; AUTH_TAG_SIZE];
        tag.copy_from_slice(&bytes[IV_SIZE + ct_len..]);

        Ok(Self {
            iv,
            ciphertext,
            tag,
        })
    }
}

fn compute_tag(auth: &AuthKey, plaintext: &[u8]) -> [u8; AUTH_TAG_SIZE] {
    let mut mac =
        HmacSha256::new_from_slice(auth.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(plaintext);
    mac.finalize().into_bytes().into()
}
