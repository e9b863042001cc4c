//! Serialized shapes of an identity.
//!
//! - [`KeyBundle`]: the public bundle registered with, and served by, the key
//!   directory. Classical keys are base64 of their SPKI DER encoding, the
//!   post-quantum key is base64 of its raw bytes.
//! - [`PrivateBundle`]: all six keys as base64 of raw bytes. Lives only
//!   inside the vault's encrypted blob.

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Public key bundle as exchanged with the key directory
///
/// ```json
/// {"preQuantum":{"identityKemPublicKey":"…","identitySigningPublicKey":"…"},
///  "postQuantum":{"identitySigningPublicKey":"…"}}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyBundle {
    /// Classical keys
    pub pre_quantum: PreQuantumKeys,
    /// Post-quantum keys
    pub post_quantum: PostQuantumKeys,
}

/// Classical half of a [`KeyBundle`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreQuantumKeys {
    /// base64(SPKI DER of the X25519 public key)
    pub identity_kem_public_key: String,
    /// base64(SPKI DER of the Ed25519 public key)
    pub identity_signing_public_key: String,
}

/// Post-quantum half of a [`KeyBundle`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostQuantumKeys {
    /// base64(raw Dilithium5 public key)
    pub identity_signing_public_key: String,
}

/// Full key material of an identity, base64 of raw bytes
#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub(crate) struct PrivateBundle {
    pub x25519_public: String,
    pub ed25519_public: String,
    pub dilithium_public: String,
    pub x25519_private: String,
    pub ed25519_private: String,
    pub dilithium_private: String,
}
