//! # Digital Signatures Module
//!
//! Every signed artifact in the protocol carries two signatures over the same
//! bytes: one classical (Ed25519) and one post-quantum (Dilithium5). An
//! artifact is accepted only when **both** verify.
//!
//! ## Scheme Interface
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      SIGNATURE SCHEME ROLES                             │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │   trait SignatureScheme                                                │
//! │     generate() -> SchemeKeyPair                                        │
//! │     sign(secret, message) -> signature                                 │
//! │     verify(public, message, signature) -> Ok | SignatureInvalid        │
//! │                                                                         │
//! │   ┌───────────────────────┐          ┌───────────────────────┐         │
//! │   │ ClassicalScheme       │          │ PostQuantumScheme     │         │
//! │   │   = Ed25519           │          │   = Dilithium5        │         │
//! │   │                       │          │                       │         │
//! │   │ pk 32 B, sk 32 B      │          │ pk 2592 B             │         │
//! │   │ sig 64 B              │          │ sig ~4.6 KB           │         │
//! │   └───────────────────────┘          └───────────────────────┘         │
//! │                                                                         │
//! │   Callers name the role, never the algorithm, so replacing one         │
//! │   algorithm is a change to one alias and one impl.                     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Keys and signatures cross this boundary as byte slices because they come
//! straight out of base64 on the wire; every impl validates lengths itself.

use ed25519_dalek::{Signature as Ed25519Signature, Signer, SigningKey, Verifier, VerifyingKey};
use pqcrypto_dilithium::dilithium5;
use pqcrypto_traits::sign::{
    DetachedSignature as _, PublicKey as _, SecretKey as _,
};
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use crate::error::{Error, Result};

/// Message used to check that a signing secret matches its public key
const PAIR_CHECK_MESSAGE: &[u8] = b"ssshare-keypair-consistency-check";

/// A freshly generated keypair for any scheme
///
/// The secret half is zeroized when dropped.
pub struct SchemeKeyPair {
    /// Public key bytes in the scheme's raw encoding
    pub public: Vec<u8>,
    secret: Zeroizing<Vec<u8>>,
}

impl SchemeKeyPair {
    /// Assemble a keypair from raw parts
    pub fn new(public: Vec<u8>, secret: Zeroizing<Vec<u8>>) -> Self {
        Self { public, secret }
    }

    /// Secret key bytes
    ///
    /// Only the vault persists these, and only encrypted.
    pub fn secret(&self) -> &[u8] {
        &self.secret
    }

    /// Split into (public, secret)
    pub fn into_parts(self) -> (Vec<u8>, Zeroizing<Vec<u8>>) {
        (self.public, self.secret)
    }
}

impl std::fmt::Debug for SchemeKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemeKeyPair")
            .field("public_len", &self.public.len())
            .finish_non_exhaustive()
    }
}

/// A signature algorithm family
pub trait SignatureScheme {
    /// Human-readable algorithm name, used in error messages and logs
    const NAME: &'static str;

    /// Generate a fresh keypair from the OS RNG
    fn generate() -> SchemeKeyPair;

    /// Sign `message` with the raw secret key
    fn sign(secret: &[u8], message: &[u8]) -> Result<Vec<u8>>;

    /// Verify `signature` over `message` with the raw public key
    ///
    /// Returns [`Error::SignatureInvalid`] for any mismatch, including a
    /// malformed signature. A malformed *key* is [`Error::InvalidKeyEncoding`].
    fn verify(public: &[u8], message: &[u8], signature: &[u8]) -> Result<()>;

    /// Check that `public` is a well-formed public key for this scheme
    fn validate_public_key(public: &[u8]) -> Result<()>;

    /// Check that `secret` belongs to `public`
    ///
    /// The default signs a fixed message and verifies it.
    fn check_pair(public: &[u8], secret: &[u8]) -> Result<()> {
        let signature = Self::sign(secret, PAIR_CHECK_MESSAGE)?;
        Self::verify(public, PAIR_CHECK_MESSAGE, &signature)
    }
}

// ============================================================================
// ED25519
// ============================================================================

/// Ed25519 (RFC 8032) via `ed25519-dalek`
#[derive(Debug, Clone, Copy)]
pub struct Ed25519;

impl Ed25519 {
    /// Size of a public key in bytes
    pub const PUBLIC_KEY_SIZE: usize = 32;
    /// Size of a secret key (seed) in bytes
    pub const SECRET_KEY_SIZE: usize = 32;
    /// Size of a signature in bytes
    pub const SIGNATURE_SIZE: usize = 64;

    fn signing_key(secret: &[u8]) -> Result<SigningKey> {
        let seed: Zeroizing<[u8; 32]> = Zeroizing::new(secret.try_into().map_err(|_| {
            Error::InvalidKeyEncoding(format!(
                "Ed25519 secret key must be {} bytes, got {}",
                Self::SECRET_KEY_SIZE,
                secret.len()
            ))
        })?);
        Ok(SigningKey::from_bytes(&seed))
    }

    fn verifying_key(public: &[u8]) -> Result<VerifyingKey> {
        let bytes: [u8; 32] = public.try_into().map_err(|_| {
            Error::InvalidKeyEncoding(format!(
                "Ed25519 public key must be {} bytes, got {}",
                Self::PUBLIC_KEY_SIZE,
                public.len()
            ))
        })?;
        VerifyingKey::from_bytes(&bytes)
            .map_err(|e| Error::InvalidKeyEncoding(format!("Invalid Ed25519 public key: {}", e)))
    }
}

impl SignatureScheme for Ed25519 {
    const NAME: &'static str = "Ed25519";

    fn generate() -> SchemeKeyPair {
        let signing_key = SigningKey::generate(&mut OsRng);
        SchemeKeyPair::new(
            signing_key.verifying_key().to_bytes().to_vec(),
            Zeroizing::new(signing_key.to_bytes().to_vec()),
        )
    }

    fn sign(secret: &[u8], message: &[u8]) -> Result<Vec<u8>> {
        let signing_key = Self::signing_key(secret)?;
        Ok(signing_key.sign(message).to_bytes().to_vec())
    }

    fn verify(public: &[u8], message: &[u8], signature: &[u8]) -> Result<()> {
        let verifying_key = Self::verifying_key(public)?;
        let sig = Ed25519Signature::from_slice(signature).map_err(|_| Error::SignatureInvalid)?;

        verifying_key
            .verify(message, &sig)
            .map_err(|_| Error::SignatureInvalid)
    }

    fn validate_public_key(public: &[u8]) -> Result<()> {
        Self::verifying_key(public).map(|_| ())
    }

    fn check_pair(public: &[u8], secret: &[u8]) -> Result<()> {
        let derived = Self::signing_key(secret)?.verifying_key().to_bytes();
        if derived.as_slice() != public {
            return Err(Error::InvalidKeyEncoding(
                "Ed25519 secret key does not match public key".into(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// DILITHIUM5
// ============================================================================

/// CRYSTALS-Dilithium at NIST level 5 via `pqcrypto-dilithium`
#[derive(Debug, Clone, Copy)]
pub struct Dilithium5;

impl Dilithium5 {
    /// Size of a public key in bytes
    pub fn public_key_size() -> usize {
        dilithium5::public_key_bytes()
    }

    /// Size of a secret key in bytes
    pub fn secret_key_size() -> usize {
        dilithium5::secret_key_bytes()
    }

    /// Size of a detached signature in bytes
    pub fn signature_size() -> usize {
        dilithium5::signature_bytes()
    }

    fn public_key(public: &[u8]) -> Result<dilithium5::PublicKey> {
        dilithium5::PublicKey::from_bytes(public).map_err(|_| {
            Error::InvalidKeyEncoding(format!(
                "Dilithium5 public key must be {} bytes, got {}",
                Self::public_key_size(),
                public.len()
            ))
        })
    }
}

impl SignatureScheme for Dilithium5 {
    const NAME: &'static str = "Dilithium5";

    fn generate() -> SchemeKeyPair {
        let (pk, sk) = dilithium5::keypair();
        SchemeKeyPair::new(pk.as_bytes().to_vec(), Zeroizing::new(sk.as_bytes().to_vec()))
    }

    fn sign(secret: &[u8], message: &[u8]) -> Result<Vec<u8>> {
        let sk = dilithium5::SecretKey::from_bytes(secret).map_err(|_| {
            Error::InvalidKeyEncoding(format!(
                "Dilithium5 secret key must be {} bytes, got {}",
                Self::secret_key_size(),
                secret.len()
            ))
        })?;
        let sig = dilithium5::detached_sign(message, &sk);
        Ok(sig.as_bytes().to_vec())
    }

    fn verify(public: &[u8], message: &[u8], signature: &[u8]) -> Result<()> {
        let pk = Self::public_key(public)?;
        let sig = dilithium5::DetachedSignature::from_bytes(signature)
            .map_err(|_| Error::SignatureInvalid)?;

        dilithium5::verify_detached_signature(&sig, message, &pk)
            .map_err(|_| Error::SignatureInvalid)
    }

    fn validate_public_key(public: &[u8]) -> Result<()> {
        Self::public_key(public).map(|_| ())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sign_verify_roundtrip<S: SignatureScheme>() {
        let keypair = S::generate();
        let message = b"alice|2025-01-01T00:00:00Z|POST|/api/fs/list|{\"page\":1}";

        let signature = S::sign(keypair.secret(), message).unwrap();
        assert!(S::verify(&keypair.public, message, &signature).is_ok());
    }

    fn wrong_message_fails<S: SignatureScheme>() {
        let keypair = S::generate();
        let signature = S::sign(keypair.secret(), b"Hello, World!").unwrap();

        assert!(matches!(
            S::verify(&keypair.public, b"Wrong message!", &signature),
            Err(Error::SignatureInvalid)
        ));
    }

    fn wrong_key_fails<S: SignatureScheme>() {
        let keypair1 = S::generate();
        let keypair2 = S::generate();
        let signature = S::sign(keypair1.secret(), b"Hello, World!").unwrap();

        assert!(matches!(
            S::verify(&keypair2.public, b"Hello, World!", &signature),
            Err(Error::SignatureInvalid)
        ));
    }

    #[test]
    fn test_ed25519_sign_verify() {
        sign_verify_roundtrip::<Ed25519>();
        wrong_message_fails::<Ed25519>();
        wrong_key_fails::<Ed25519>();
    }

    #[test]
    fn test_dilithium5_sign_verify() {
        sign_verify_roundtrip::<Dilithium5>();
        wrong_message_fails::<Dilithium5>();
        wrong_key_fails::<Dilithium5>();
    }

    #[test]
    fn test_key_sizes() {
        let ed = Ed25519::generate();
        assert_eq!(ed.public.len(), Ed25519::PUBLIC_KEY_SIZE);
        assert_eq!(ed.secret().len(), Ed25519::SECRET_KEY_SIZE);

        let pq = Dilithium5::generate();
        assert_eq!(pq.public.len(), Dilithium5::public_key_size());
        assert_eq!(pq.secret().len(), Dilithium5::secret_key_size());
        assert_eq!(pq.public.len(), 2592);
    }

    #[test]
    fn test_truncated_signature_is_invalid() {
        let keypair = Ed25519::generate();
        let signature = Ed25519::sign(keypair.secret(), b"msg").unwrap();
        assert!(matches!(
            Ed25519::verify(&keypair.public, b"msg", &signature[..63]),
            Err(Error::SignatureInvalid)
        ));

        let keypair = Dilithium5::generate();
        let signature = Dilithium5::sign(keypair.secret(), b"msg").unwrap();
        assert!(matches!(
            Dilithium5::verify(&keypair.public, b"msg", &signature[1..]),
            Err(Error::SignatureInvalid)
        ));
    }

    #[test]
    fn test_malformed_public_key() {
        assert!(matches!(
            Ed25519::validate_public_key(&[0u8; 31]),
            Err(Error::InvalidKeyEncoding(_))
        ));
        assert!(matches!(
            Dilithium5::validate_public_key(&[0u8; 100]),
            Err(Error::InvalidKeyEncoding(_))
        ));
    }

    #[test]
    fn test_check_pair() {
        let a = Ed25519::generate();
        let b = Ed25519::generate();
        assert!(Ed25519::check_pair(&a.public, a.secret()).is_ok());
        assert!(Ed25519::check_pair(&b.public, a.secret()).is_err());

        let a = Dilithium5::generate();
        let b = Dilithium5::generate();
        assert!(Dilithium5::check_pair(&a.public, a.secret()).is_ok());
        assert!(Dilithium5::check_pair(&b.public, a.secret()).is_err());
    }

    #[test]
    fn test_ed25519_deterministic() {
        let keypair = Ed25519::generate();
        let sig1 = Ed25519::sign(keypair.secret(), b"test").unwrap();
        let sig2 = Ed25519::sign(keypair.secret(), b"test").unwrap();
        assert_eq!(sig1, sig2);
    }
}
