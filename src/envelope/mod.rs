//! # File Envelope Protocol
//!
//! Envelope encryption of one uploaded file.
//!
//! ## Upload
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         UPLOAD FLOW                                     │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  FEK, MEK ← 32 random bytes each                                       │
//! │                                                                         │
//! │  plaintext ──AES-CTR(FEK)──► cFile, ivFile                             │
//! │  {"filename","filesize"} ──AES-CTR(MEK)──► cMeta, ivMeta               │
//! │                                                                         │
//! │  msg = username | sha256hex(cFile) | sha256hex(cMeta)                  │
//! │  sigs = Ed25519(msg), Dilithium5(msg)                                  │
//! │                                                                         │
//! │  POST /api/fs/upload                                                   │
//! │    {file_content, metadata, pre_quantum_signature,                     │
//! │     post_quantum_signature}                                            │
//! │                                                                         │
//! │  201 {file_id} ──► vault: FileEnvelope{id, name, FEK, MEK, ivs}        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Download
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        DOWNLOAD FLOW                                    │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  response ──► DownloadResponse::verify(owner public identity)          │
//! │                 │  recompute hashes, both signatures must verify       │
//! │                 ▼                                                      │
//! │              VerifiedDownload::decrypt(envelope)                        │
//! │                 │  only a verified download can be decrypted           │
//! │                 ▼                                                      │
//! │              DecryptedFile{filename, content}                           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod download;
mod upload;

pub use download::{
    DecryptedFile, DownloadRequest, DownloadResponse, MetadataField, VerifiedDownload,
};
pub use upload::{prepare_upload, PreparedUpload, UploadBody, UploadResponse};

use serde::{Deserialize, Serialize};

use crate::crypto::{sha256_hex, Iv, SymmetricKey};
use crate::encoding::{base64_iv, base64_key};

/// Per-file key material held by whoever can read the file
///
/// Replaced wholesale on update; never partially mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEnvelope {
    /// Server-assigned file id
    pub file_id: u64,
    /// Plaintext filename (local only, never sent in clear)
    pub filename: String,
    /// File encryption key
    #[serde(rename = "fek_b64", with = "base64_key")]
    pub fek: SymmetricKey,
    /// IV of the content ciphertext
    #[serde(rename = "file_nonce_b64", with = "base64_iv")]
    pub file_nonce: Iv,
    /// Metadata encryption key
    #[serde(rename = "mek_b64", with = "base64_key")]
    pub mek: SymmetricKey,
    /// IV of the metadata ciphertext
    #[serde(rename = "metadata_nonce_b64", with = "base64_iv")]
    pub metadata_nonce: Iv,
}

impl FileEnvelope {
    /// Same keys, different filename
    pub fn with_filename(&self, filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            ..self.clone()
        }
    }
}

/// Plaintext of the metadata ciphertext
///
/// Unknown fields are ignored; missing ones default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    /// Original filename
    #[serde(default)]
    pub filename: String,
    /// Plaintext size in bytes
    #[serde(default)]
    pub filesize: u64,
}

/// The message both signatures of an upload cover
///
/// `username|sha256hex(file ciphertext)|sha256hex(metadata ciphertext)`
pub fn content_signing_message(
    username: &str,
    file_ciphertext: &[u8],
    metadata_ciphertext: &[u8],
) -> String {
    format!(
        "{}|{}|{}",
        username,
        sha256_hex(file_ciphertext),
        sha256_hex(metadata_ciphertext)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signing_message_format() {
        let msg = content_signing_message("alice", b"", b"abc");
        assert_eq!(
            msg,
            "alice|e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855|\
             ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_envelope_json_shape() {
        let envelope = FileEnvelope {
            file_id: 12,
            filename: "a.txt".into(),
            fek: SymmetricKey::from_bytes([1u8; 32]),
            file_nonce: Iv::from_bytes([2u8; 16]),
            mek: SymmetricKey::from_bytes([3u8; 32]),
            metadata_nonce: Iv::from_bytes([4u8; 16]),
        };

        let value = serde_json::to_value(&envelope).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        for key in [
            "file_id",
            "filename",
            "fek_b64",
            "file_nonce_b64",
            "mek_b64",
            "metadata_nonce_b64",
        ] {
            assert!(keys.contains(&key), "missing {}", key);
        }

        let restored: FileEnvelope = serde_json::from_value(value).unwrap();
        assert_eq!(restored, envelope);
    }

    #[test]
    fn test_metadata_tolerates_extra_fields() {
        let meta: FileMetadata = serde_json::from_str(
            r#"{"filename":"x.pdf","filesize":10,"upload_timestamp":"2025-06-03T10:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(meta.filename, "x.pdf");
        assert_eq!(meta.filesize, 10);

        let bare: FileMetadata = serde_json::from_str("{}").unwrap();
        assert!(bare.filename.is_empty());
    }

    #[test]
    fn test_with_filename_keeps_keys() {
        let envelope = FileEnvelope {
            file_id: 1,
            filename: "old".into(),
            fek: SymmetricKey::random(),
            file_nonce: Iv::random(),
            mek: SymmetricKey::random(),
            metadata_nonce: Iv::random(),
        };
        let renamed = envelope.with_filename("new");
        assert_eq!(renamed.filename, "new");
        assert_eq!(renamed.fek, envelope.fek);
        assert_eq!(renamed.metadata_nonce, envelope.metadata_nonce);
    }
}
