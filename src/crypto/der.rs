//! SubjectPublicKeyInfo wrapping for 32-byte curve keys.
//!
//! The key directory stores the classical public keys as base64 of their
//! DER `SubjectPublicKeyInfo` (RFC 8410). For Ed25519 and X25519 that
//! structure has a fixed 12-byte prefix, so it is written and checked by
//! hand rather than through a general ASN.1 parser:
//!
//! ```text
//! 30 2a                 SEQUENCE (42 bytes)
//!    30 05              SEQUENCE (5 bytes)  AlgorithmIdentifier
//!       06 03 2b 65 XX  OID 1.3.101.XX      (0x70 = Ed25519, 0x6e = X25519)
//!    03 21 00           BIT STRING (33 bytes, 0 unused bits)
//!       <32 key bytes>
//! ```

use crate::error::{Error, Result};

/// Length of a DER-encoded SPKI for a 32-byte curve key
pub const SPKI_LEN: usize = 44;

const PREFIX_LEN: usize = 12;

/// Curve key types carried in SPKI form
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpkiAlgorithm {
    /// id-Ed25519, OID 1.3.101.112
    Ed25519,
    /// id-X25519, OID 1.3.101.110
    X25519,
}

impl SpkiAlgorithm {
    fn oid_tail(self) -> u8 {
        match self {
            SpkiAlgorithm::Ed25519 => 0x70,
            SpkiAlgorithm::X25519 => 0x6e,
        }
    }

    fn prefix(self) -> [u8; PREFIX_LEN] {
        [
            0x30, 0x2a, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65,
            self.oid_tail(),
            0x03, 0x21, 0x00,
        ]
    }
}

/// Wrap a raw 32-byte public key in its SPKI DER encoding
pub fn encode_spki(algorithm: SpkiAlgorithm, key: &[u8; 32]) -> Vec<u8> {
    let mut der = Vec::with_capacity(SPKI_LEN);
    der.extend_from_slice(&algorithm.prefix());
    der.extend_from_slice(key);
    der
}

/// Extract the raw 32-byte key from an SPKI DER encoding
///
/// Rejects anything that is not exactly the expected structure for
/// `algorithm`, including the other curve's OID.
pub fn decode_spki(algorithm: SpkiAlgorithm, der: &[u8]) -> Result<[u8; 32]> {
    if der.len() != SPKI_LEN {
        return Err(Error::InvalidKeyEncoding(format!(
            "{:?} SPKI must be {} bytes, got {}",
            algorithm,
            SPKI_LEN,
            der.len()
        )));
    }

    if der[..PREFIX_LEN] != algorithm.prefix() {
        return Err(Error::InvalidKeyEncoding(format!(
            "Not a {:?} SubjectPublicKeyInfo",
            algorithm
        )));
    }

    let mut key = [0u8; 32];
    key.copy_from_slice(&der[PREFIX_LEN..]);
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ed25519_prefix() {
        let der = encode_spki(SpkiAlgorithm::Ed25519, &[0xab; 32]);
        assert_eq!(der.len(), SPKI_LEN);
        assert_eq!(
            &der[..PREFIX_LEN],
            &[0x30, 0x2a, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x03, 0x21, 0x00]
        );
    }

    #[test]
    fn test_round_trip() {
        let key = [0x42u8; 32];
        for alg in [SpkiAlgorithm::Ed25519, SpkiAlgorithm::X25519] {
            let der = encode_spki(alg, &key);
            assert_eq!(decode_spki(alg, &der).unwrap(), key);
        }
    }

    #[test]
    fn test_wrong_oid_rejected() {
        let der = encode_spki(SpkiAlgorithm::X25519, &[1u8; 32]);
        assert!(matches!(
            decode_spki(SpkiAlgorithm::Ed25519, &der),
            Err(Error::InvalidKeyEncoding(_))
        ));
    }

    #[test]
    fn test_wrong_length_rejected() {
        let mut der = encode_spki(SpkiAlgorithm::Ed25519, &[1u8; 32]);
        der.push(0);
        assert!(decode_spki(SpkiAlgorithm::Ed25519, &der).is_err());
        assert!(decode_spki(SpkiAlgorithm::Ed25519, &der[..40]).is_err());
        assert!(decode_spki(SpkiAlgorithm::Ed25519, &[0u8; 32]).is_err());
    }
}
