//! SHA-256 digests.
//!
//! Uploaded content is signed over the hex digests of its two ciphertexts,
//! so both the uploader and every downloader go through [`sha256_hex`].

use sha2::{Digest, Sha256};

/// Size of a SHA-256 digest in bytes
pub const DIGEST_SIZE: usize = 32;

/// SHA-256 of `data`
pub fn sha256(data: &[u8]) -> [u8; DIGEST_SIZE] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Lowercase hex SHA-256 of `data` (64 characters)
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}
