//! # Sharing Protocol
//!
//! Hands a file's FEK and MEK to another identity without the server ever
//! seeing them.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         SHARE FLOW                                      │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  OWNER (Alice)                                                         │
//! │  ─────────────                                                         │
//! │  1. Fetch Bob's key bundle          POST /api/keyhandler/getbundle     │
//! │  2. (E, shared) = X25519 ephemeral agreement with Bob's KEM key        │
//! │  3. wrap = SHA-256(shared)                                             │
//! │  4. (wFEK, nFEK) = AES-CTR(FEK, wrap)                                  │
//! │     (wMEK, nMEK) = AES-CTR(MEK, wrap)     independent IVs              │
//! │  5. POST /api/fs/share {file_id, shared_with_username, wFEK, nFEK,     │
//! │       wMEK, nMEK, E, file_content_nonce, metadata_nonce}               │
//! │                                                                         │
//! │  RECIPIENT (Bob)                                                       │
//! │  ───────────────                                                       │
//! │  1. POST /api/fs/list returns the grant as `shared_access`             │
//! │  2. shared = X25519(Bob's KEM secret, E)                               │
//! │  3. wrap = SHA-256(shared); FEK, MEK = AES-CTR⁻¹(...)                  │
//! │  4. Store a FileEnvelope for later downloads                           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The ephemeral secret never leaves [`KemScheme::agree_ephemeral`]; each
//! grant uses a new one.

use serde::{Deserialize, Serialize};

use crate::crypto::{decrypt, derive_wrap_key, encrypt, Iv, KemScheme, KeyAgreement, SymmetricKey, KEY_SIZE};
use crate::encoding::{base64_bytes, base64_iv};
use crate::envelope::FileEnvelope;
use crate::error::{Error, Result};
use crate::identity::{Identity, PublicIdentity};

/// Wrapped file keys for one (file, recipient) pair
///
/// Serializes with the wire names of the share request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareGrant {
    /// Who the keys are wrapped for
    #[serde(rename = "shared_with_username")]
    pub recipient_username: String,
    /// FEK under the wrap key
    #[serde(rename = "encrypted_fek", with = "base64_bytes")]
    pub wrapped_fek: Vec<u8>,
    /// IV of `wrapped_fek`
    #[serde(rename = "encrypted_fek_nonce", with = "base64_iv")]
    pub wrapped_fek_nonce: Iv,
    /// MEK under the wrap key
    #[serde(rename = "encrypted_mek", with = "base64_bytes")]
    pub wrapped_mek: Vec<u8>,
    /// IV of `wrapped_mek`
    #[serde(rename = "encrypted_mek_nonce", with = "base64_iv")]
    pub wrapped_mek_nonce: Iv,
    /// Public half of the single-use agreement key
    #[serde(rename = "ephemeral_public_key", with = "base64_bytes")]
    pub ephemeral_public: Vec<u8>,
    /// IV of the file content ciphertext
    #[serde(rename = "file_content_nonce", with = "base64_iv")]
    pub file_nonce: Iv,
    /// IV of the metadata ciphertext
    #[serde(with = "base64_iv")]
    pub metadata_nonce: Iv,
}

/// Body of `POST /api/fs/share`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareBody {
    /// File being shared
    pub file_id: u64,
    /// The grant, flattened after `file_id`
    #[serde(flatten)]
    pub grant: ShareGrant,
}

/// A grant as the recipient sees it inside a file list entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedAccess {
    /// Public half of the owner's single-use agreement key
    #[serde(with = "base64_bytes")]
    pub ephemeral_public_key: Vec<u8>,
    /// Wrapped FEK
    #[serde(with = "base64_bytes")]
    pub encrypted_fek: Vec<u8>,
    /// IV of the wrapped FEK
    #[serde(with = "base64_iv")]
    pub encrypted_fek_nonce: Iv,
    /// Wrapped MEK
    #[serde(with = "base64_bytes")]
    pub encrypted_mek: Vec<u8>,
    /// IV of the wrapped MEK
    #[serde(with = "base64_iv")]
    pub encrypted_mek_nonce: Iv,
    /// IV of the file content ciphertext
    #[serde(with = "base64_iv")]
    pub file_content_nonce: Iv,
    /// IV of the metadata ciphertext
    #[serde(with = "base64_iv")]
    pub metadata_nonce: Iv,
    /// Username of the owner who shared the file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_by: Option<String>,
}

impl SharedAccess {
    /// Convert to a grant addressed to `recipient_username`
    pub fn into_grant(self, recipient_username: impl Into<String>) -> ShareGrant {
        ShareGrant {
            recipient_username: recipient_username.into(),
            wrapped_fek: self.encrypted_fek,
            wrapped_fek_nonce: self.encrypted_fek_nonce,
            wrapped_mek: self.encrypted_mek,
            wrapped_mek_nonce: self.encrypted_mek_nonce,
            ephemeral_public: self.ephemeral_public_key,
            file_nonce: self.file_content_nonce,
            metadata_nonce: self.metadata_nonce,
        }
    }
}

/// Wrap a file's keys for `recipient`
///
/// Sharing with an identity whose KEM key is our own is rejected.
pub fn share(
    envelope: &FileEnvelope,
    recipient_username: &str,
    recipient: &PublicIdentity,
    owner: &Identity,
) -> Result<ShareGrant> {
    if recipient.kem_public() == owner.public().kem_public() {
        return Err(Error::InvalidInput("Cannot share a file with yourself".into()));
    }

    let (ephemeral_public, shared) = KemScheme::agree_ephemeral(recipient.kem_public())?;
    let wrap_key = derive_wrap_key(&shared);

    let (wrapped_fek, wrapped_fek_nonce) = encrypt(envelope.fek.as_bytes(), &wrap_key)?;
    let (wrapped_mek, wrapped_mek_nonce) = encrypt(envelope.mek.as_bytes(), &wrap_key)?;

    tracing::info!(
        file_id = envelope.file_id,
        recipient = recipient_username,
        "Wrapped file keys for recipient"
    );

    Ok(ShareGrant {
        recipient_username: recipient_username.to_string(),
        wrapped_fek,
        wrapped_fek_nonce,
        wrapped_mek,
        wrapped_mek_nonce,
        ephemeral_public,
        file_nonce: envelope.file_nonce,
        metadata_nonce: envelope.metadata_nonce,
    })
}

/// Recover the file keys from a grant addressed to `identity`
///
/// Both unwrapped keys must be exactly 32 bytes, else
/// [`Error::KeyUnwrapFailed`].
pub fn unwrap_grant(
    grant: &ShareGrant,
    file_id: u64,
    filename: &str,
    identity: &Identity,
) -> Result<FileEnvelope> {
    let shared = identity
        .agree(&grant.ephemeral_public)
        .map_err(|e| Error::KeyUnwrapFailed(format!("Ephemeral key unusable: {}", e)))?;
    let wrap_key = derive_wrap_key(&shared);

    let fek = unwrap_key(&grant.wrapped_fek, &wrap_key, &grant.wrapped_fek_nonce, "FEK")?;
    let mek = unwrap_key(&grant.wrapped_mek, &wrap_key, &grant.wrapped_mek_nonce, "MEK")?;

    Ok(FileEnvelope {
        file_id,
        filename: filename.to_string(),
        fek,
        file_nonce: grant.file_nonce,
        mek,
        metadata_nonce: grant.metadata_nonce,
    })
}

fn unwrap_key(wrapped: &[u8], wrap_key: &SymmetricKey, nonce: &Iv, what: &str) -> Result<SymmetricKey> {
    if wrapped.len() != KEY_SIZE {
        return Err(Error::KeyUnwrapFailed(format!(
            "Wrapped {} must be {} bytes, got {}",
            what,
            KEY_SIZE,
            wrapped.len()
        )));
    }
    let plain = zeroize::Zeroizing::new(decrypt(wrapped, wrap_key, nonce)?);
    SymmetricKey::from_slice(&plain)
        .map_err(|_| Error::KeyUnwrapFailed(format!("{} has the wrong length", what)))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope() -> FileEnvelope {
        FileEnvelope {
            file_id: 9,
            filename: "plans.txt".into(),
            fek: SymmetricKey::random(),
            file_nonce: Iv::random(),
            mek: SymmetricKey::random(),
            metadata_nonce: Iv::random(),
        }
    }

    #[test]
    fn test_share_and_unwrap() {
        let alice = Identity::generate();
        let bob = Identity::generate();
        let original = envelope();

        let grant = share(&original, "bob", bob.public(), &alice).unwrap();
        let recovered = unwrap_grant(&grant, 9, "plans.txt", &bob).unwrap();

        assert_eq!(recovered, original);
    }

    #[test]
    fn test_third_party_cannot_unwrap() {
        let alice = Identity::generate();
        let bob = Identity::generate();
        let eve = Identity::generate();
        let original = envelope();

        let grant = share(&original, "bob", bob.public(), &alice).unwrap();
        let stolen = unwrap_grant(&grant, 9, "plans.txt", &eve).unwrap();

        assert_ne!(stolen.fek, original.fek);
        assert_ne!(stolen.mek, original.mek);
    }

    #[test]
    fn test_independent_nonces_and_fresh_ephemeral() {
        let alice = Identity::generate();
        let bob = Identity::generate();
        let original = envelope();

        let g1 = share(&original, "bob", bob.public(), &alice).unwrap();
        let g2 = share(&original, "bob", bob.public(), &alice).unwrap();

        assert_ne!(g1.wrapped_fek_nonce, g1.wrapped_mek_nonce);
        assert_ne!(g1.ephemeral_public, g2.ephemeral_public);
        assert_eq!(g1.file_nonce, original.file_nonce);
        assert_eq!(g1.metadata_nonce, original.metadata_nonce);
    }

    #[test]
    fn test_self_share_rejected() {
        let alice = Identity::generate();
        let result = share(&envelope(), "alice", alice.public(), &alice);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_truncated_wrapped_key_rejected() {
        let alice = Identity::generate();
        let bob = Identity::generate();

        let mut grant = share(&envelope(), "bob", bob.public(), &alice).unwrap();
        grant.wrapped_mek.truncate(31);

        assert!(matches!(
            unwrap_grant(&grant, 9, "x", &bob),
            Err(Error::KeyUnwrapFailed(_))
        ));
    }

    #[test]
    fn test_low_order_ephemeral_rejected() {
        let alice = Identity::generate();
        let bob = Identity::generate();

        let mut grant = share(&envelope(), "bob", bob.public(), &alice).unwrap();
        grant.ephemeral_public = vec![0u8; 32];

        assert!(matches!(
            unwrap_grant(&grant, 9, "x", &bob),
            Err(Error::KeyUnwrapFailed(_))
        ));
    }

    #[test]
    fn test_share_body_field_order() {
        let alice = Identity::generate();
        let bob = Identity::generate();
        let grant = share(&envelope(), "bob", bob.public(), &alice).unwrap();

        let json = serde_json::to_string(&ShareBody { file_id: 9, grant }).unwrap();
        let order = [
            "\"file_id\"",
            "\"shared_with_username\"",
            "\"encrypted_fek\"",
            "\"encrypted_fek_nonce\"",
            "\"encrypted_mek\"",
            "\"encrypted_mek_nonce\"",
            "\"ephemeral_public_key\"",
            "\"file_content_nonce\"",
            "\"metadata_nonce\"",
        ];
        let positions: Vec<usize> = order.iter().map(|k| json.find(k).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{}", json);
    }

    #[test]
    fn test_round_trip_through_shared_access() {
        let alice = Identity::generate();
        let bob = Identity::generate();
        let original = envelope();
        let grant = share(&original, "bob", bob.public(), &alice).unwrap();

        // What the server hands back to Bob in a list entry
        let mut value = serde_json::to_value(&ShareBody { file_id: 9, grant }).unwrap();
        let map = value.as_object_mut().unwrap();
        map.remove("file_id");
        map.remove("shared_with_username");
        map.insert("shared_by".into(), "alice".into());

        let access: SharedAccess = serde_json::from_value(value).unwrap();
        assert_eq!(access.shared_by.as_deref(), Some("alice"));

        let recovered = unwrap_grant(&access.into_grant("bob"), 9, "plans.txt", &bob).unwrap();
        assert_eq!(recovered, original);
    }
}
