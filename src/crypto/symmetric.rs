//! # Symmetric Cipher
//!
//! AES-256 in counter mode, the only symmetric construction the file-sharing
//! protocol uses. File content, file metadata, the vault master key, the
//! private identity bundle and wrapped share keys all go through here.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         AES-256-CTR                                     │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  key (32 bytes) ──┐                                                    │
//! │                   ├──► AES-256 keystream ──► XOR ──► ciphertext         │
//! │  iv  (16 bytes) ──┘    (128-bit BE counter)   ▲                         │
//! │   random per call                              │                         │
//! │                                            plaintext                    │
//! │                                                                         │
//! │  Output: (ciphertext, iv)   same length as the plaintext, no tag       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Critical Security Requirement
//!
//! **NEVER reuse an IV with the same key.** Two messages under the same
//! (key, iv) leak their XOR. [`encrypt`] draws a fresh IV from the OS RNG on
//! every call and returns it; callers never choose one.
//!
//! There is no authentication tag. Integrity of uploaded content comes from
//! the dual signature over the ciphertext digests, not from this layer.

use aes::Aes256;
use ctr::cipher::{KeyIvInit, StreamCipher};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Error, Result};

/// Size of an AES-256 key in bytes
pub const KEY_SIZE: usize = 32;

/// Size of a CTR initialization vector in bytes
pub const IV_SIZE: usize = 16;

type Aes256Ctr = ctr::Ctr128BE<Aes256>;

/// A 256-bit symmetric key (FEK, MEK, master key, password key, wrap key)
///
/// Zeroized when dropped.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey([u8; KEY_SIZE]);

impl SymmetricKey {
    /// Generate a fresh random key from the OS RNG
    pub fn random() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, which must be exactly 32 bytes
    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        let bytes: [u8; KEY_SIZE] = slice.try_into().map_err(|_| {
            Error::InvalidKeyEncoding(format!(
                "Symmetric key must be {} bytes, got {}",
                KEY_SIZE,
                slice.len()
            ))
        })?;
        Ok(Self(bytes))
    }

    /// Get the raw key bytes
    ///
    /// Never log these.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SymmetricKey(..)")
    }
}

/// A 16-byte CTR initialization vector
///
/// Public value; travels next to the ciphertext it belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Iv([u8; IV_SIZE]);

impl Iv {
    /// Generate a cryptographically random IV
    pub fn random() -> Self {
        let mut bytes = [0u8; IV_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; IV_SIZE]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, which must be exactly 16 bytes
    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        let bytes: [u8; IV_SIZE] = slice.try_into().map_err(|_| {
            Error::DecryptionFailed(format!(
                "IV must be {} bytes, got {}",
                IV_SIZE,
                slice.len()
            ))
        })?;
        Ok(Self(bytes))
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; IV_SIZE] {
        &self.0
    }
}

/// Encrypt `plaintext` under `key` with a fresh random IV
///
/// ## Returns
///
/// `(ciphertext, iv)`. The ciphertext has the same length as the plaintext.
pub fn encrypt(plaintext: &[u8], key: &SymmetricKey) -> Result<(Vec<u8>, Iv)> {
    let iv = Iv::random();
    let mut cipher = Aes256Ctr::new_from_slices(key.as_bytes(), iv.as_bytes())
        .map_err(|e| Error::EncryptionFailed(format!("Invalid key or IV: {}", e)))?;

    let mut buffer = plaintext.to_vec();
    cipher.apply_keystream(&mut buffer);

    Ok((buffer, iv))
}

/// Decrypt `ciphertext` under `key` and `iv`
///
/// ## Errors
///
/// CTR mode cannot detect a wrong key or a tampered ciphertext; it simply
/// produces garbage. Callers that need to detect that must check the output
/// (the vault parses it as JSON, downloads verify signatures beforehand).
pub fn decrypt(ciphertext: &[u8], key: &SymmetricKey, iv: &Iv) -> Result<Vec<u8>> {
    let mut cipher = Aes256Ctr::new_from_slices(key.as_bytes(), iv.as_bytes())
        .map_err(|e| Error::DecryptionFailed(format!("Invalid key or IV: {}", e)))?;

    let mut buffer = ciphertext.to_vec();
    cipher.apply_keystream(&mut buffer);

    Ok(buffer)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt() {
        let key = SymmetricKey::random();
        let plaintext = b"quarterly-report.pdf contents";

        let (ciphertext, iv) = encrypt(plaintext, &key).unwrap();
        assert_eq!(ciphertext.len(), plaintext.len());
        assert_ne!(&ciphertext[..], &plaintext[..]);

        let decrypted = decrypt(&ciphertext, &key, &iv).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_hello_under_zero_key() {
        let key = SymmetricKey::from_bytes([0u8; KEY_SIZE]);
        let (ciphertext, iv) = encrypt(b"hello", &key).unwrap();
        assert_eq!(ciphertext.len(), 5);

        let decrypted = decrypt(&ciphertext, &key, &iv).unwrap();
        assert_eq!(decrypted, b"hello");
    }

    #[test]
    fn test_flipped_bit_changes_plaintext() {
        let key = SymmetricKey::random();
        let plaintext = b"transfer 100 to bob";
        let (mut ciphertext, iv) = encrypt(plaintext, &key).unwrap();

        ciphertext[9] ^= 0x01;
        let tampered = decrypt(&ciphertext, &key, &iv).unwrap();
        assert_ne!(tampered, plaintext);
        assert_eq!(tampered[9], plaintext[9] ^ 0x01);
    }

    #[test]
    fn test_empty_plaintext() {
        let key = SymmetricKey::random();
        let (ciphertext, iv) = encrypt(b"", &key).unwrap();
        assert!(ciphertext.is_empty());
        assert!(decrypt(&ciphertext, &key, &iv).unwrap().is_empty());
    }

    #[test]
    fn test_fresh_iv_per_call() {
        let key = SymmetricKey::random();
        let (c1, iv1) = encrypt(b"same message", &key).unwrap();
        let (c2, iv2) = encrypt(b"same message", &key).unwrap();

        assert_ne!(iv1, iv2);
        assert_ne!(c1, c2);
    }

    #[test]
    fn test_wrong_key_yields_different_plaintext() {
        let key = SymmetricKey::random();
        let other = SymmetricKey::random();
        let (ciphertext, iv) = encrypt(b"secret data", &key).unwrap();

        let garbage = decrypt(&ciphertext, &other, &iv).unwrap();
        assert_ne!(garbage, b"secret data");
    }

    #[test]
    fn test_known_answer() {
        // NIST SP 800-38A F.5.5 CTR-AES256.Encrypt, first block
        let key = SymmetricKey::from_slice(
            &hex::decode("603deb1015ca71be2b73aef0857d77811f352c073b6108d72d9810a30914dff4")
                .unwrap(),
        )
        .unwrap();
        let iv = Iv::from_slice(&hex::decode("f0f1f2f3f4f5f6f7f8f9fafbfcfdfeff").unwrap()).unwrap();
        let ciphertext = hex::decode("601ec313775789a5b7a7f504bbf3d228").unwrap();

        let plaintext = decrypt(&ciphertext, &key, &iv).unwrap();
        assert_eq!(hex::encode(plaintext), "6bc1bee22e409f96e93d7e117393172a");
    }

    #[test]
    fn test_wrong_lengths_rejected() {
        assert!(matches!(
            SymmetricKey::from_slice(&[0u8; 31]),
            Err(Error::InvalidKeyEncoding(_))
        ));
        assert!(matches!(
            Iv::from_slice(&[0u8; 12]),
            Err(Error::DecryptionFailed(_))
        ));
    }

    #[test]
    fn test_debug_redacts_key() {
        let key = SymmetricKey::from_bytes([7u8; KEY_SIZE]);
        assert_eq!(format!("{:?}", key), "SymmetricKey(..)");
    }
}
