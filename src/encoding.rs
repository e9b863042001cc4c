//! Base64 helpers shared by every wire and on-disk shape.
//!
//! All binary fields travel as standard (padded) base64.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::Result;

/// Encode bytes as standard base64
pub fn b64_encode(bytes: impl AsRef<[u8]>) -> String {
    STANDARD.encode(bytes)
}

/// Decode standard base64
pub fn b64_decode(text: &str) -> Result<Vec<u8>> {
    Ok(STANDARD.decode(text.trim())?)
}

/// Serde helper for `Vec<u8>` fields carried as base64 strings
pub mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize as a base64 string
    pub fn serialize<S>(bytes: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    /// Deserialize from a base64 string
    pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s.trim()).map_err(serde::de::Error::custom)
    }
}

/// Serde helper for [`Iv`](crate::crypto::Iv) fields carried as base64
pub mod base64_iv {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::crypto::Iv;

    /// Serialize as a base64 string
    pub fn serialize<S>(iv: &Iv, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(iv.as_bytes()))
    }

    /// Deserialize from a base64 string
    pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<Iv, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = STANDARD.decode(s.trim()).map_err(serde::de::Error::custom)?;
        Iv::from_slice(&bytes).map_err(serde::de::Error::custom)
    }
}

/// Serde helper for [`SymmetricKey`](crate::crypto::SymmetricKey) fields
///
/// Only used for the vault's own file, never for anything transmitted.
pub mod base64_key {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};
    use zeroize::Zeroizing;

    use crate::crypto::SymmetricKey;

    /// Serialize as a base64 string
    pub fn serialize<S>(key: &SymmetricKey, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let encoded = Zeroizing::new(STANDARD.encode(key.as_bytes()));
        serializer.serialize_str(&encoded)
    }

    /// Deserialize from a base64 string
    pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<SymmetricKey, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = Zeroizing::new(String::deserialize(deserializer)?);
        let bytes = Zeroizing::new(STANDARD.decode(s.trim()).map_err(serde::de::Error::custom)?);
        SymmetricKey::from_slice(&bytes).map_err(serde::de::Error::custom)
    }
}
