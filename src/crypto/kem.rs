//! # Key Agreement
//!
//! X25519 Diffie-Hellman, used only to wrap file keys for a share recipient.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     SHARE KEY AGREEMENT                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  OWNER                                  RECIPIENT                       │
//! │  ─────                                  ─────────                       │
//! │  ephemeral secret e (single use)        identity secret r               │
//! │  agree_ephemeral(R)                     agree(r, E)                     │
//! │        │                                      │                         │
//! │        ▼                                      ▼                         │
//! │   e × R = shared ═══════════════════ r × E = shared                    │
//! │                                                                         │
//! │  E travels in the share grant; e is dropped inside agree_ephemeral.   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use rand::rngs::OsRng;
use x25519_dalek::{EphemeralSecret, PublicKey as X25519PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::signing::SchemeKeyPair;
use crate::error::{Error, Result};

/// Raw output of a key agreement
///
/// Never used as a key directly; see [`super::kdf::derive_wrap_key`].
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret([u8; 32]);

impl SharedSecret {
    /// Create from raw DH output
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes (for key derivation)
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// A key agreement family
pub trait KeyAgreement {
    /// Human-readable algorithm name
    const NAME: &'static str;

    /// Generate a long-term keypair
    fn generate() -> SchemeKeyPair;

    /// Derive the public key belonging to `secret`
    fn public_from_secret(secret: &[u8]) -> Result<Vec<u8>>;

    /// Static agreement: `secret × public`
    fn agree(secret: &[u8], public: &[u8]) -> Result<SharedSecret>;

    /// Ephemeral agreement against `public`
    ///
    /// Returns `(ephemeral_public, shared)`. The ephemeral secret is consumed
    /// here and never leaves this call.
    fn agree_ephemeral(public: &[u8]) -> Result<(Vec<u8>, SharedSecret)>;
}

/// X25519 (RFC 7748) via `x25519-dalek`
#[derive(Debug, Clone, Copy)]
pub struct X25519;

impl X25519 {
    /// Size of public and secret keys in bytes
    pub const KEY_SIZE: usize = 32;

    fn array(bytes: &[u8], what: &str) -> Result<[u8; 32]> {
        bytes.try_into().map_err(|_| {
            Error::InvalidKeyEncoding(format!(
                "X25519 {} must be {} bytes, got {}",
                what,
                Self::KEY_SIZE,
                bytes.len()
            ))
        })
    }

    fn contributory(shared: x25519_dalek::SharedSecret) -> Result<SharedSecret> {
        // Low-order peer keys force an all-zero output
        if !shared.was_contributory() {
            return Err(Error::InvalidKeyEncoding(
                "X25519 public key is of low order".into(),
            ));
        }
        Ok(SharedSecret::from_bytes(shared.to_bytes()))
    }
}

impl KeyAgreement for X25519 {
    const NAME: &'static str = "X25519";

    fn generate() -> SchemeKeyPair {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = X25519PublicKey::from(&secret);
        SchemeKeyPair::new(public.to_bytes().to_vec(), Zeroizing::new(secret.to_bytes().to_vec()))
    }

    fn public_from_secret(secret: &[u8]) -> Result<Vec<u8>> {
        let bytes = Zeroizing::new(Self::array(secret, "secret key")?);
        let secret = StaticSecret::from(*bytes);
        Ok(X25519PublicKey::from(&secret).to_bytes().to_vec())
    }

    fn agree(secret: &[u8], public: &[u8]) -> Result<SharedSecret> {
        let bytes = Zeroizing::new(Self::array(secret, "secret key")?);
        let secret = StaticSecret::from(*bytes);
        let public = X25519PublicKey::from(Self::array(public, "public key")?);

        Self::contributory(secret.diffie_hellman(&public))
    }

    fn agree_ephemeral(public: &[u8]) -> Result<(Vec<u8>, SharedSecret)> {
        let their_public = X25519PublicKey::from(Self::array(public, "public key")?);

        let ephemeral = EphemeralSecret::random_from_rng(OsRng);
        let ephemeral_public = X25519PublicKey::from(&ephemeral);
        let shared = Self::contributory(ephemeral.diffie_hellman(&their_public))?;

        Ok((ephemeral_public.to_bytes().to_vec(), shared))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_agreement_matches() {
        let alice = X25519::generate();
        let bob = X25519::generate();

        let a = X25519::agree(alice.secret(), &bob.public).unwrap();
        let b = X25519::agree(bob.secret(), &alice.public).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_ephemeral_agreement_matches_recipient() {
        let recipient = X25519::generate();

        let (ephemeral_public, sender_shared) = X25519::agree_ephemeral(&recipient.public).unwrap();
        let recipient_shared = X25519::agree(recipient.secret(), &ephemeral_public).unwrap();

        assert_eq!(sender_shared.as_bytes(), recipient_shared.as_bytes());
    }

    #[test]
    fn test_ephemeral_keys_are_fresh() {
        let recipient = X25519::generate();
        let (e1, _) = X25519::agree_ephemeral(&recipient.public).unwrap();
        let (e2, _) = X25519::agree_ephemeral(&recipient.public).unwrap();
        assert_ne!(e1, e2);
    }

    #[test]
    fn test_public_from_secret() {
        let kp = X25519::generate();
        assert_eq!(X25519::public_from_secret(kp.secret()).unwrap(), kp.public);
    }

    #[test]
    fn test_low_order_point_rejected() {
        // The identity point yields an all-zero shared secret
        let result = X25519::agree_ephemeral(&[0u8; 32]);
        assert!(matches!(result, Err(Error::InvalidKeyEncoding(_))));
    }

    #[test]
    fn test_wrong_length_rejected() {
        assert!(X25519::agree_ephemeral(&[9u8; 31]).is_err());
        let kp = X25519::generate();
        assert!(X25519::agree(&kp.secret()[..16], &kp.public).is_err());
    }
}
