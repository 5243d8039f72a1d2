//! Diffie-Hellman key agreement over small prime fields.
//!
//! Both endpoints pick a private exponent, exchange the public values
//! `base^private mod prime`, and raise the peer's value to their own
//! exponent. The two results agree and seed the session key.
//!
//! The default group uses deliberately tiny textbook parameters
//! (prime 23, base 5). They demonstrate the agreement, nothing more;
//! deployments that care about secrecy must supply a real group via
//! [`DhParams::new`].

use rand::Rng;

use crate::core::{DEFAULT_BASE, DEFAULT_PRIME};

use super::keys::SessionKey;

/// Public group parameters shared by both endpoints out of band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DhParams {
    /// The modulus. Prime for the algebra to hold.
    pub prime: u64,
    /// The generator.
    pub base: u64,
}

impl Default for DhParams {
    fn default() -> Self {
        Self {
            prime: DEFAULT_PRIME,
            base: DEFAULT_BASE,
        }
    }
}

impl DhParams {
    /// Group with an explicit prime and generator.
    pub fn new(prime: u64, base: u64) -> Self {
        Self { prime, base }
    }
}

/// One endpoint's half of a key agreement.
///
/// Holds the private exponent; consumed by [`KeyExchange::into_session_key`]
/// once the peer's public value arrives.
#[derive(Debug)]
pub struct KeyExchange {
    params: DhParams,
    private: u64,
}

impl KeyExchange {
    /// Pick a fresh private exponent in `1..prime`.
    pub fn generate(params: DhParams) -> Self {
        let mut rng = rand::thread_rng();
        let private = rng.gen_range(1..params.prime.max(2));
        Self { params, private }
    }

    /// Build an exchange with a fixed private exponent, for reproducible
    /// sessions and tests.
    pub fn with_private(params: DhParams, private: u64) -> Self {
        Self { params, private }
    }

    /// The group in use.
    pub fn params(&self) -> DhParams {
        self.params
    }

    /// The value to send to the peer: `base^private mod prime`.
    pub fn public_value(&self) -> u64 {
        mod_pow(self.params.base, self.private, self.params.prime)
    }

    /// The shared secret: `peer_public^private mod prime`.
    pub fn shared_secret(&self, peer_public: u64) -> u64 {
        mod_pow(peer_public, self.private, self.params.prime)
    }

    /// Finish the agreement, consuming the private exponent.
    pub fn into_session_key(self, peer_public: u64) -> SessionKey {
        SessionKey::from_shared_secret(self.shared_secret(peer_public))
    }
}

/// `base^exp mod modulus` by square-and-multiply.
///
/// Intermediate products are widened to `u128` so the largest `u64`
/// modulus cannot overflow.
pub fn mod_pow(base: u64, mut exp: u64, modulus: u64) -> u64 {
    if modulus <= 1 {
        return 0;
    }
    let m = modulus as u128;
    let mut result: u128 = 1;
    let mut factor = base as u128 % m;
    while exp > 0 {
        if exp & 1 == 1 {
            result = result * factor % m;
        }
        factor = factor * factor % m;
        exp >>= 1;
    }
    result as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mod_pow_known_values() {
        assert_eq!(mod_pow(5, 6, 23), 8);
        assert_eq!(mod_pow(5, 15, 23), 19);
        assert_eq!(mod_pow(2, 10, 1000), 24);
        assert_eq!(mod_pow(7, 0, 13), 1);
        assert_eq!(mod_pow(7, 3, 1), 0);
    }

    #[test]
    fn test_mod_pow_large_operands_do_not_overflow() {
        // Largest prime below 2^64; squaring its residues needs u128.
        let p = 18_446_744_073_709_551_557;
        let got = mod_pow(p - 1, 2, p);
        assert_eq!(got, 1);
    }

    #[test]
    fn test_agreement_is_symmetric() {
        let params = DhParams::default();
        let alice = KeyExchange::with_private(params, 6);
        let bob = KeyExchange::with_private(params, 15);

        assert_eq!(alice.public_value(), 8);
        assert_eq!(bob.public_value(), 19);

        let from_alice = alice.shared_secret(bob.public_value());
        let from_bob = bob.shared_secret(alice.public_value());
        assert_eq!(from_alice, from_bob);
        assert_eq!(from_alice, 2);
    }

    #[test]
    fn test_agreement_for_every_exponent_pair() {
        let params = DhParams::default();
        for a in 1..params.prime {
            for b in 1..params.prime {
                let alice = KeyExchange::with_private(params, a);
                let bob = KeyExchange::with_private(params, b);
                assert_eq!(
                    alice.shared_secret(bob.public_value()),
                    bob.shared_secret(alice.public_value()),
                    "exponents {a}/{b} disagree"
                );
            }
        }
    }

    #[test]
    fn test_generated_exchanges_agree() {
        let params = DhParams::default();
        let alice = KeyExchange::generate(params);
        let bob = KeyExchange::generate(params);

        let alice_public = alice.public_value();
        let bob_public = bob.public_value();
        assert!(alice_public < params.prime);
        assert!(bob_public < params.prime);

        assert_eq!(
            alice.shared_secret(bob_public),
            bob.shared_secret(alice_public)
        );
    }

    #[test]
    fn test_into_session_key_matches_manual_derivation() {
        let params = DhParams::default();
        let exchange = KeyExchange::with_private(params, 6);
        let key = exchange.into_session_key(19);

        assert_eq!(key.as_bytes(), SessionKey::from_shared_secret(2).as_bytes());
    }
}
