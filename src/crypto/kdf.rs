//! # Key Derivation Functions
//!
//! Two derivations, both producing a 256-bit [`SymmetricKey`]:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    KEY DERIVATION                                       │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  VAULT PASSWORD KEY                                                    │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  Argon2id v1.3(                                                 │   │
//! │  │    password,                                                   │   │
//! │  │    salt = 16 random bytes (stored in the vault record),        │   │
//! │  │    t = 3 passes, m = 256 MiB, p = 1   (MODERATE)               │   │
//! │  │  ) → Kpwd (32 bytes)                                           │   │
//! │  │                                                                 │   │
//! │  │  Kpwd only ever wraps the vault master key.                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  SHARE WRAP KEY                                                        │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  SHA-256(X25519 shared secret) → wrap key (32 bytes)           │   │
//! │  │                                                                 │   │
//! │  │  Wraps the FEK and MEK of a shared file, each under its own    │   │
//! │  │  random IV.                                                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use super::kem::SharedSecret;
use super::symmetric::{SymmetricKey, KEY_SIZE};
use crate::error::{Error, Result};

/// Size of the Argon2id salt in bytes
pub const SALT_SIZE: usize = 16;

/// Argon2id cost parameters
///
/// Stored alongside the salt in the vault record so a vault created with one
/// profile still opens after the configured default changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
    /// Degree of parallelism (lanes)
    pub parallelism: u32,
}

impl KdfParams {
    /// libsodium's `OPSLIMIT_MODERATE` / `MEMLIMIT_MODERATE`
    pub const MODERATE: KdfParams = KdfParams {
        memory_kib: 256 * 1024,
        iterations: 3,
        parallelism: 1,
    };

    /// libsodium's `OPSLIMIT_INTERACTIVE` / `MEMLIMIT_INTERACTIVE`
    pub const INTERACTIVE: KdfParams = KdfParams {
        memory_kib: 64 * 1024,
        iterations: 2,
        parallelism: 1,
    };

    /// libsodium's `MEMLIMIT_SENSITIVE`; larger memory costs are refused
    pub const MAX_MEMORY_KIB: u32 = 1024 * 1024;

    /// Upper bound on passes
    pub const MAX_ITERATIONS: u32 = 16;

    /// Upper bound on lanes
    pub const MAX_PARALLELISM: u32 = 16;

    /// Refuse costs above the `MAX_*` bounds
    ///
    /// Parameters come back from disk, so a corrupted record must not be
    /// able to make Argon2 allocate arbitrary memory.
    pub fn check_bounds(&self) -> Result<()> {
        if self.memory_kib > Self::MAX_MEMORY_KIB
            || self.iterations > Self::MAX_ITERATIONS
            || self.parallelism > Self::MAX_PARALLELISM
        {
            return Err(Error::KeyDerivationFailed(format!(
                "Argon2 params out of bounds: m={} KiB, t={}, p={}",
                self.memory_kib, self.iterations, self.parallelism
            )));
        }
        Ok(())
    }

    /// Parse a profile name (`moderate` or `interactive`)
    pub fn from_profile(name: &str) -> Option<KdfParams> {
        match name.trim().to_ascii_lowercase().as_str() {
            "moderate" => Some(Self::MODERATE),
            "interactive" => Some(Self::INTERACTIVE),
            _ => None,
        }
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::MODERATE
    }
}

/// Generate a random Argon2id salt
pub fn random_salt() -> [u8; SALT_SIZE] {
    let mut salt = [0u8; SALT_SIZE];
    OsRng.fill_bytes(&mut salt);
    salt
}

/// Derive the vault password key with Argon2id
pub fn derive_password_key(
    password: &[u8],
    salt: &[u8; SALT_SIZE],
    params: &KdfParams,
) -> Result<SymmetricKey> {
    params.check_bounds()?;
    let argon_params = Params::new(
        params.memory_kib,
        params.iterations,
        params.parallelism,
        Some(KEY_SIZE),
    )
    .map_err(|e| Error::KeyDerivationFailed(format!("Invalid Argon2 params: {}", e)))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params);

    let mut output = Zeroizing::new([0u8; KEY_SIZE]);
    argon2
        .hash_password_into(password, salt, &mut output[..])
        .map_err(|e| Error::KeyDerivationFailed(format!("Argon2id failed: {}", e)))?;

    Ok(SymmetricKey::from_bytes(*output))
}

/// Derive the key that wraps share grants from a raw agreement output
pub fn derive_wrap_key(shared: &SharedSecret) -> SymmetricKey {
    let digest: [u8; KEY_SIZE] = Sha256::digest(shared.as_bytes()).into();
    SymmetricKey::from_bytes(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAST: KdfParams = KdfParams {
        memory_kib: 64,
        iterations: 1,
        parallelism: 1,
    };

    #[test]
    fn test_password_key_deterministic() {
        let salt = [3u8; SALT_SIZE];
        let k1 = derive_password_key(b"hunter2", &salt, &FAST).unwrap();
        let k2 = derive_password_key(b"hunter2", &salt, &FAST).unwrap();
        assert_eq!(k1, k2);
    }

    #[test]
    fn test_password_key_depends_on_inputs() {
        let salt = [3u8; SALT_SIZE];
        let base = derive_password_key(b"hunter2", &salt, &FAST).unwrap();

        let other_password = derive_password_key(b"hunter3", &salt, &FAST).unwrap();
        let other_salt = derive_password_key(b"hunter2", &[4u8; SALT_SIZE], &FAST).unwrap();

        assert_ne!(base, other_password);
        assert_ne!(base, other_salt);
    }

    #[test]
    fn test_invalid_params_rejected() {
        let bad = KdfParams {
            memory_kib: 1,
            iterations: 0,
            parallelism: 1,
        };
        assert!(matches!(
            derive_password_key(b"pw", &[0u8; SALT_SIZE], &bad),
            Err(Error::KeyDerivationFailed(_))
        ));
    }

    #[test]
    fn test_oversized_params_rejected() {
        let huge = KdfParams {
            memory_kib: u32::MAX,
            ..FAST
        };
        assert!(matches!(
            derive_password_key(b"pw", &[0u8; SALT_SIZE], &huge),
            Err(Error::KeyDerivationFailed(_))
        ));

        let slow = KdfParams {
            iterations: KdfParams::MAX_ITERATIONS + 1,
            ..FAST
        };
        assert!(slow.check_bounds().is_err());
        assert!(KdfParams::MODERATE.check_bounds().is_ok());
        assert!(KdfParams::INTERACTIVE.check_bounds().is_ok());
    }

    #[test]
    fn test_wrap_key_is_sha256_of_secret() {
        let shared = SharedSecret::from_bytes([9u8; 32]);
        let key = derive_wrap_key(&shared);
        assert_eq!(
            hex::encode(key.as_bytes()),
            crate::crypto::hash::sha256_hex(&[9u8; 32])
        );
    }

    #[test]
    fn test_profiles() {
        assert_eq!(KdfParams::from_profile("Moderate"), Some(KdfParams::MODERATE));
        assert_eq!(KdfParams::from_profile("interactive"), Some(KdfParams::INTERACTIVE));
        assert_eq!(KdfParams::from_profile("sensitive"), None);
        assert_eq!(KdfParams::default().memory_kib, 262144);
    }

    #[test]
    fn test_salts_are_random() {
        assert_ne!(random_salt(), random_salt());
    }
}
