//! # Identity Module
//!
//! A user's long-term key material: one key-agreement keypair and two
//! signing keypairs.
//!
//! ## Identity Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         IDENTITY                                        │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  PublicIdentity  (safe to share, served by the key directory)   │   │
//! │  │                                                                 │   │
//! │  │   kem_public            X25519      32 B                        │   │
//! │  │   classical_public      Ed25519     32 B                        │   │
//! │  │   post_quantum_public   Dilithium5  2592 B                      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                              ▲                                          │
//! │                              │ to_public()                              │
//! │  ┌───────────────────────────┴─────────────────────────────────────┐   │
//! │  │  Identity  (never leaves the vault unencrypted)                  │   │
//! │  │                                                                 │   │
//! │  │   public: PublicIdentity                                        │   │
//! │  │   kem_secret, classical_secret, post_quantum_secret             │   │
//! │  │   (Zeroizing, wiped on drop)                                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Private fields are present together or not at all: that is the
//! difference between the two types, not an optional field.
//!
//! ## Serialization
//!
//! | Form | Used for | Encoding |
//! |------|----------|----------|
//! | [`KeyBundle`] | Registration, key lookup | SPKI DER (classical), raw (PQ), base64 |
//! | private JSON | Vault blob only | raw bytes, base64 |

mod bundle;

pub use bundle::{KeyBundle, PostQuantumKeys, PreQuantumKeys};

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use bundle::PrivateBundle;

use crate::crypto::{
    decode_spki, encode_spki, ClassicalScheme, KemScheme, KeyAgreement, PostQuantumScheme,
    SharedSecret, SignatureScheme, SpkiAlgorithm,
};
use crate::encoding::{b64_decode, b64_encode};
use crate::error::{Error, Result};

/// A classical signature and a post-quantum signature over the same bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DualSignature {
    /// Ed25519 signature
    pub classical: Vec<u8>,
    /// Dilithium5 signature
    pub post_quantum: Vec<u8>,
}

// ============================================================================
// PUBLIC IDENTITY
// ============================================================================

/// Public portion of an identity
///
/// Serializes as a [`KeyBundle`]; deserializing validates every key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "KeyBundle", into = "KeyBundle")]
pub struct PublicIdentity {
    kem_public: [u8; 32],
    classical_public: [u8; 32],
    post_quantum_public: Vec<u8>,
}

impl PublicIdentity {
    /// Build from raw public keys, validating each one
    pub fn from_raw(kem_public: &[u8], classical_public: &[u8], post_quantum_public: &[u8]) -> Result<Self> {
        let kem_public: [u8; 32] = kem_public.try_into().map_err(|_| {
            Error::InvalidKeyEncoding(format!(
                "X25519 public key must be 32 bytes, got {}",
                kem_public.len()
            ))
        })?;
        ClassicalScheme::validate_public_key(classical_public)?;
        PostQuantumScheme::validate_public_key(post_quantum_public)?;

        let mut classical = [0u8; 32];
        classical.copy_from_slice(classical_public);

        Ok(Self {
            kem_public,
            classical_public: classical,
            post_quantum_public: post_quantum_public.to_vec(),
        })
    }

    /// X25519 public key
    pub fn kem_public(&self) -> &[u8; 32] {
        &self.kem_public
    }

    /// Ed25519 public key
    pub fn classical_public(&self) -> &[u8; 32] {
        &self.classical_public
    }

    /// Dilithium5 public key
    pub fn post_quantum_public(&self) -> &[u8] {
        &self.post_quantum_public
    }

    /// Verify a dual signature over `message`
    ///
    /// Both halves must verify; there is no fallback to one of them.
    pub fn verify(&self, message: &[u8], signature: &DualSignature) -> Result<()> {
        ClassicalScheme::verify(&self.classical_public, message, &signature.classical)?;
        PostQuantumScheme::verify(&self.post_quantum_public, message, &signature.post_quantum)?;
        Ok(())
    }

    /// Encode as the key directory's bundle shape
    pub fn to_key_bundle(&self) -> KeyBundle {
        KeyBundle {
            pre_quantum: PreQuantumKeys {
                identity_kem_public_key: b64_encode(encode_spki(
                    SpkiAlgorithm::X25519,
                    &self.kem_public,
                )),
                identity_signing_public_key: b64_encode(encode_spki(
                    SpkiAlgorithm::Ed25519,
                    &self.classical_public,
                )),
            },
            post_quantum: PostQuantumKeys {
                identity_signing_public_key: b64_encode(&self.post_quantum_public),
            },
        }
    }

    /// Decode from the key directory's bundle shape
    pub fn from_key_bundle(bundle: &KeyBundle) -> Result<Self> {
        let kem_der = decode_field(&bundle.pre_quantum.identity_kem_public_key, "KEM key")?;
        let classical_der =
            decode_field(&bundle.pre_quantum.identity_signing_public_key, "classical key")?;
        let post_quantum =
            decode_field(&bundle.post_quantum.identity_signing_public_key, "post-quantum key")?;

        let kem = decode_spki(SpkiAlgorithm::X25519, &kem_der)?;
        let classical = decode_spki(SpkiAlgorithm::Ed25519, &classical_der)?;

        Self::from_raw(&kem, &classical, &post_quantum)
    }
}

impl TryFrom<KeyBundle> for PublicIdentity {
    type Error = Error;

    fn try_from(bundle: KeyBundle) -> Result<Self> {
        Self::from_key_bundle(&bundle)
    }
}

impl From<PublicIdentity> for KeyBundle {
    fn from(identity: PublicIdentity) -> Self {
        identity.to_key_bundle()
    }
}

fn decode_field(text: &str, what: &str) -> Result<Vec<u8>> {
    b64_decode(text).map_err(|_| Error::InvalidKeyEncoding(format!("{} is not valid base64", what)))
}

// ============================================================================
// FULL IDENTITY
// ============================================================================

/// A user's complete identity including private keys
///
/// ## Security
///
/// - Not `Clone`; use [`Identity::try_clone`] for an independent copy
/// - Secrets are zeroized when dropped
/// - Should only exist in memory while the vault is unlocked
pub struct Identity {
    public: PublicIdentity,
    kem_secret: Zeroizing<Vec<u8>>,
    classical_secret: Zeroizing<Vec<u8>>,
    post_quantum_secret: Zeroizing<Vec<u8>>,
}

impl Identity {
    /// Generate a fresh identity: one KEM and two signing keypairs
    pub fn generate() -> Self {
        let (kem_public, kem_secret) = KemScheme::generate().into_parts();
        let (classical_public, classical_secret) = ClassicalScheme::generate().into_parts();
        let (post_quantum_public, post_quantum_secret) = PostQuantumScheme::generate().into_parts();

        let mut kem = [0u8; 32];
        kem.copy_from_slice(&kem_public);
        let mut classical = [0u8; 32];
        classical.copy_from_slice(&classical_public);

        tracing::debug!("Generated new identity keypairs");

        Self {
            public: PublicIdentity {
                kem_public: kem,
                classical_public: classical,
                post_quantum_public,
            },
            kem_secret,
            classical_secret,
            post_quantum_secret,
        }
    }

    /// Assemble from raw keys, checking that every secret matches its public key
    pub fn from_raw_parts(
        public: PublicIdentity,
        kem_secret: Zeroizing<Vec<u8>>,
        classical_secret: Zeroizing<Vec<u8>>,
        post_quantum_secret: Zeroizing<Vec<u8>>,
    ) -> Result<Self> {
        let derived_kem = KemScheme::public_from_secret(&kem_secret)?;
        if derived_kem.as_slice() != public.kem_public.as_slice() {
            return Err(Error::InvalidKeyEncoding(
                "X25519 secret key does not match public key".into(),
            ));
        }
        ClassicalScheme::check_pair(&public.classical_public, &classical_secret)?;
        PostQuantumScheme::check_pair(&public.post_quantum_public, &post_quantum_secret)
            .map_err(|_| {
                Error::InvalidKeyEncoding("Dilithium5 secret key does not match public key".into())
            })?;

        Ok(Self {
            public,
            kem_secret,
            classical_secret,
            post_quantum_secret,
        })
    }

    /// The public half
    pub fn public(&self) -> &PublicIdentity {
        &self.public
    }

    /// An owned copy of the public half
    pub fn to_public(&self) -> PublicIdentity {
        self.public.clone()
    }

    /// Sign `message` with both signing keys
    pub fn sign(&self, message: &[u8]) -> Result<DualSignature> {
        Ok(DualSignature {
            classical: ClassicalScheme::sign(&self.classical_secret, message)?,
            post_quantum: PostQuantumScheme::sign(&self.post_quantum_secret, message)?,
        })
    }

    /// Key agreement between our KEM secret and `their_public`
    pub fn agree(&self, their_public: &[u8]) -> Result<SharedSecret> {
        KemScheme::agree(&self.kem_secret, their_public)
    }

    /// Serialize all six keys as JSON
    ///
    /// The result is secret; it only ever goes into the vault cipher.
    pub fn to_private_json(&self) -> Result<Zeroizing<String>> {
        let bundle = PrivateBundle {
            x25519_public: b64_encode(self.public.kem_public),
            ed25519_public: b64_encode(self.public.classical_public),
            dilithium_public: b64_encode(&self.public.post_quantum_public),
            x25519_private: b64_encode(&*self.kem_secret),
            ed25519_private: b64_encode(&*self.classical_secret),
            dilithium_private: b64_encode(&*self.post_quantum_secret),
        };
        Ok(Zeroizing::new(serde_json::to_string(&bundle)?))
    }

    /// Parse the JSON produced by [`Identity::to_private_json`]
    ///
    /// Fails with [`Error::InvalidKeyEncoding`] if any key is malformed or a
    /// secret does not belong to its public key.
    pub fn from_private_json(json: &str) -> Result<Self> {
        let bundle: PrivateBundle = serde_json::from_str(json)
            .map_err(|_| Error::InvalidKeyEncoding("Malformed private key bundle".into()))?;

        let public = PublicIdentity::from_raw(
            &decode_field(&bundle.x25519_public, "X25519 public key")?,
            &decode_field(&bundle.ed25519_public, "Ed25519 public key")?,
            &decode_field(&bundle.dilithium_public, "Dilithium5 public key")?,
        )?;

        Self::from_raw_parts(
            public,
            Zeroizing::new(decode_field(&bundle.x25519_private, "X25519 secret key")?),
            Zeroizing::new(decode_field(&bundle.ed25519_private, "Ed25519 secret key")?),
            Zeroizing::new(decode_field(&bundle.dilithium_private, "Dilithium5 secret key")?),
        )
    }

    /// Create an independent copy from the key bytes
    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self {
            public: self.public.clone(),
            kem_secret: self.kem_secret.clone(),
            classical_secret: self.classical_secret.clone(),
            post_quantum_secret: self.post_quantum_secret.clone(),
        })
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// TESTS
// ============================================================================
