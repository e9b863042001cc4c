//! Download side of the envelope protocol.

use serde::{Deserialize, Serialize};

use super::{content_signing_message, FileEnvelope, FileMetadata};
use crate::crypto::decrypt;
use crate::encoding::{b64_decode, base64_bytes};
use crate::error::{Error, Result};
use crate::identity::{DualSignature, PublicIdentity};

/// Body of `POST /api/fs/download`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRequest {
    /// File to fetch
    pub file_id: u64,
}

/// The `metadata` field of a download response
///
/// Some server versions send a base64 string, others the JSON form of a
/// Node `Buffer`. Both decode to the same bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataField {
    /// `"base64…"`
    Base64(String),
    /// `{"type":"Buffer","data":[…]}`
    Buffer {
        /// Always `"Buffer"`
        #[serde(rename = "type")]
        kind: String,
        /// Raw bytes
        data: Vec<u8>,
    },
}

impl MetadataField {
    /// Decode to the ciphertext bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        match self {
            MetadataField::Base64(text) => b64_decode(text),
            MetadataField::Buffer { kind, data } if kind == "Buffer" => Ok(data.clone()),
            MetadataField::Buffer { kind, .. } => Err(Error::InvalidResponse(format!(
                "Unexpected metadata object type {:?}",
                kind
            ))),
        }
    }
}

/// `200` response of a download
#[derive(Debug, Clone, Deserialize)]
pub struct DownloadResponse {
    /// Content ciphertext, base64
    pub file_content: String,
    /// Metadata ciphertext
    pub metadata: MetadataField,
    /// Owner's Ed25519 signature
    #[serde(with = "base64_bytes")]
    pub pre_quantum_signature: Vec<u8>,
    /// Owner's Dilithium5 signature
    #[serde(with = "base64_bytes")]
    pub post_quantum_signature: Vec<u8>,
    /// Username of the uploader
    #[serde(alias = "owner_user_id")]
    pub owner_username: String,
    /// Whether the requester is the uploader
    #[serde(default)]
    pub is_owner: bool,
}

impl DownloadResponse {
    /// Check both of the owner's signatures over the received ciphertexts
    ///
    /// Nothing is decrypted here. A failure is [`Error::SignatureInvalid`];
    /// undecodable fields are [`Error::InvalidResponse`].
    pub fn verify(&self, owner: &PublicIdentity) -> Result<VerifiedDownload> {
        let file_ciphertext = b64_decode(&self.file_content)?;
        let metadata_ciphertext = self.metadata.to_bytes()?;

        let message =
            content_signing_message(&self.owner_username, &file_ciphertext, &metadata_ciphertext);
        let signature = DualSignature {
            classical: self.pre_quantum_signature.clone(),
            post_quantum: self.post_quantum_signature.clone(),
        };

        if let Err(e) = owner.verify(message.as_bytes(), &signature) {
            tracing::warn!(owner = %self.owner_username, "Download signature rejected");
            return Err(e);
        }

        Ok(VerifiedDownload {
            owner_username: self.owner_username.clone(),
            file_ciphertext,
            metadata_ciphertext,
        })
    }
}

/// Ciphertexts whose owner signatures have been checked
pub struct VerifiedDownload {
    owner_username: String,
    file_ciphertext: Vec<u8>,
    metadata_ciphertext: Vec<u8>,
}

impl VerifiedDownload {
    /// Uploader whose signatures were checked
    pub fn owner_username(&self) -> &str {
        &self.owner_username
    }

    /// Decrypt content and metadata with the file's envelope
    ///
    /// Metadata that does not decrypt to JSON means the envelope does not
    /// belong to this file, and fails with [`Error::DecryptionFailed`].
    /// Metadata without a filename falls back to the envelope's filename.
    pub fn decrypt(&self, envelope: &FileEnvelope) -> Result<DecryptedFile> {
        let metadata_plain =
            decrypt(&self.metadata_ciphertext, &envelope.mek, &envelope.metadata_nonce)?;
        let metadata: FileMetadata = serde_json::from_slice(&metadata_plain).map_err(|_| {
            Error::DecryptionFailed(format!(
                "Metadata of file {} did not decrypt to JSON",
                envelope.file_id
            ))
        })?;

        let content = decrypt(&self.file_ciphertext, &envelope.fek, &envelope.file_nonce)?;

        let filename = if metadata.filename.is_empty() {
            tracing::debug!(file_id = envelope.file_id, "Metadata has no filename, using stored one");
            envelope.filename.clone()
        } else {
            metadata.filename.clone()
        };

        Ok(DecryptedFile {
            file_id: envelope.file_id,
            filename,
            metadata,
            content,
        })
    }
}

/// A downloaded, verified and decrypted file
#[derive(Clone, PartialEq, Eq)]
pub struct DecryptedFile {
    /// Server file id
    pub file_id: u64,
    /// Filename from the verified metadata
    pub filename: String,
    /// Full decrypted metadata
    pub metadata: FileMetadata,
    /// Plaintext content
    pub content: Vec<u8>,
}

impl std::fmt::Debug for DecryptedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecryptedFile")
            .field("file_id", &self.file_id)
            .field("filename", &self.filename)
            .field("content_len", &self.content.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::b64_encode;
    use crate::envelope::prepare_upload;
    use crate::identity::Identity;

    fn uploaded(identity: &Identity, plaintext: &[u8]) -> (serde_json::Value, FileEnvelope) {
        let prepared = prepare_upload(plaintext, "notes.md", "alice", identity).unwrap();
        let body: serde_json::Value = serde_json::from_str(&prepared.body_json().unwrap()).unwrap();
        (body, prepared.into_envelope(5))
    }

    fn response_from(body: &serde_json::Value, owner: &str) -> DownloadResponse {
        let mut value = body.clone();
        value["owner_username"] = owner.into();
        value["is_owner"] = true.into();
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_verify_then_decrypt() {
        let alice = Identity::generate();
        let (body, envelope) = uploaded(&alice, b"# Notes\nhello");

        let verified = response_from(&body, "alice").verify(alice.public()).unwrap();
        assert_eq!(verified.owner_username(), "alice");

        let file = verified.decrypt(&envelope).unwrap();
        assert_eq!(file.content, b"# Notes\nhello");
        assert_eq!(file.filename, "notes.md");
        assert_eq!(file.metadata.filesize, 13);
    }

    #[test]
    fn test_tampered_content_rejected() {
        let alice = Identity::generate();
        let (mut body, _) = uploaded(&alice, b"original");

        let mut content = b64_decode(body["file_content"].as_str().unwrap()).unwrap();
        content[0] ^= 0x01;
        body["file_content"] = b64_encode(&content).into();

        let result = response_from(&body, "alice").verify(alice.public());
        assert!(matches!(result, Err(Error::SignatureInvalid)));
    }

    #[test]
    fn test_wrong_owner_name_rejected() {
        let alice = Identity::generate();
        let (body, _) = uploaded(&alice, b"data");

        let result = response_from(&body, "mallory").verify(alice.public());
        assert!(matches!(result, Err(Error::SignatureInvalid)));
    }

    #[test]
    fn test_wrong_owner_keys_rejected() {
        let alice = Identity::generate();
        let mallory = Identity::generate();
        let (body, _) = uploaded(&alice, b"data");

        let result = response_from(&body, "alice").verify(mallory.public());
        assert!(matches!(result, Err(Error::SignatureInvalid)));
    }

    #[test]
    fn test_buffer_metadata_equivalent() {
        let alice = Identity::generate();
        let (mut body, envelope) = uploaded(&alice, b"buffered");

        let bytes = b64_decode(body["metadata"].as_str().unwrap()).unwrap();
        body["metadata"] = serde_json::json!({ "type": "Buffer", "data": bytes });

        let file = response_from(&body, "alice")
            .verify(alice.public())
            .unwrap()
            .decrypt(&envelope)
            .unwrap();
        assert_eq!(file.content, b"buffered");
    }

    #[test]
    fn test_owner_user_id_alias() {
        let json = r#"{"file_content":"","metadata":"","pre_quantum_signature":"",
            "post_quantum_signature":"","owner_user_id":"bob"}"#;
        let response: DownloadResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.owner_username, "bob");
        assert!(!response.is_owner);
    }

    #[test]
    fn test_metadata_field_shapes() {
        let b64: MetadataField = serde_json::from_str(r#""AQID""#).unwrap();
        let buf: MetadataField =
            serde_json::from_str(r#"{"type":"Buffer","data":[1,2,3]}"#).unwrap();
        assert_eq!(b64.to_bytes().unwrap(), buf.to_bytes().unwrap());

        let other: MetadataField = serde_json::from_str(r#"{"type":"Blob","data":[1]}"#).unwrap();
        assert!(matches!(other.to_bytes(), Err(Error::InvalidResponse(_))));
    }

    #[test]
    fn test_wrong_envelope_detected() {
        let alice = Identity::generate();
        let (body, _) = uploaded(&alice, b"payload");
        let (_, other_envelope) = uploaded(&alice, b"payload");

        let verified = response_from(&body, "alice").verify(alice.public()).unwrap();
        assert!(matches!(
            verified.decrypt(&other_envelope),
            Err(Error::DecryptionFailed(_))
        ));
    }
}
