//! Upload side of the envelope protocol.

use serde::{Deserialize, Serialize};

use super::{content_signing_message, FileEnvelope, FileMetadata};
use crate::crypto::{encrypt, Iv, SymmetricKey};
use crate::encoding::base64_bytes;
use crate::error::Result;
use crate::identity::Identity;

/// Body of `POST /api/fs/upload`
///
/// Field order here is the field order on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadBody {
    /// Content ciphertext
    #[serde(with = "base64_bytes")]
    pub file_content: Vec<u8>,
    /// Metadata ciphertext
    #[serde(with = "base64_bytes")]
    pub metadata: Vec<u8>,
    /// Ed25519 signature over the content signing message
    #[serde(with = "base64_bytes")]
    pub pre_quantum_signature: Vec<u8>,
    /// Dilithium5 signature over the content signing message
    #[serde(with = "base64_bytes")]
    pub post_quantum_signature: Vec<u8>,
}

/// `201` response of an upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct UploadResponse {
    /// Id assigned by the server
    pub file_id: u64,
}

/// An encrypted, signed upload waiting for its server-assigned id
///
/// Holds the fresh FEK and MEK; nothing is persisted until
/// [`PreparedUpload::into_envelope`] is called with the id from a `201`.
pub struct PreparedUpload {
    body: UploadBody,
    filename: String,
    fek: SymmetricKey,
    mek: SymmetricKey,
    file_nonce: Iv,
    metadata_nonce: Iv,
}

impl PreparedUpload {
    /// The request body
    pub fn body(&self) -> &UploadBody {
        &self.body
    }

    /// The request body as the exact JSON text to sign and send
    pub fn body_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.body)?)
    }

    /// Filename the metadata carries
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Bind the key material to the id the server assigned
    pub fn into_envelope(self, file_id: u64) -> FileEnvelope {
        FileEnvelope {
            file_id,
            filename: self.filename,
            fek: self.fek,
            file_nonce: self.file_nonce,
            mek: self.mek,
            metadata_nonce: self.metadata_nonce,
        }
    }
}

/// Encrypt and sign a file for upload
///
/// Draws a fresh FEK and MEK; the IVs come out of the two encryptions.
pub fn prepare_upload(
    plaintext: &[u8],
    filename: &str,
    username: &str,
    identity: &Identity,
) -> Result<PreparedUpload> {
    let fek = SymmetricKey::random();
    let mek = SymmetricKey::random();

    let (file_content, file_nonce) = encrypt(plaintext, &fek)?;

    let metadata_plain = serde_json::to_vec(&FileMetadata {
        filename: filename.to_string(),
        filesize: plaintext.len() as u64,
    })?;
    let (metadata, metadata_nonce) = encrypt(&metadata_plain, &mek)?;

    let message = content_signing_message(username, &file_content, &metadata);
    let signature = identity.sign(message.as_bytes())?;

    tracing::debug!(
        content_len = file_content.len(),
        metadata_len = metadata.len(),
        "Prepared upload"
    );

    Ok(PreparedUpload {
        body: UploadBody {
            file_content,
            metadata,
            pre_quantum_signature: signature.classical,
            post_quantum_signature: signature.post_quantum,
        },
        filename: filename.to_string(),
        fek,
        mek,
        file_nonce,
        metadata_nonce,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::decrypt;
    use crate::identity::DualSignature;

    #[test]
    fn test_body_field_order() {
        let identity = Identity::generate();
        let prepared = prepare_upload(b"hello", "hello.txt", "alice", &identity).unwrap();
        let json = prepared.body_json().unwrap();

        let positions: Vec<usize> = [
            "\"file_content\"",
            "\"metadata\"",
            "\"pre_quantum_signature\"",
            "\"post_quantum_signature\"",
        ]
        .iter()
        .map(|key| json.find(key).unwrap())
        .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_signatures_cover_ciphertext_hashes() {
        let identity = Identity::generate();
        let prepared = prepare_upload(b"report", "r.pdf", "alice", &identity).unwrap();
        let body = prepared.body();

        let message = content_signing_message("alice", &body.file_content, &body.metadata);
        let signature = DualSignature {
            classical: body.pre_quantum_signature.clone(),
            post_quantum: body.post_quantum_signature.clone(),
        };
        assert!(identity.public().verify(message.as_bytes(), &signature).is_ok());
    }

    #[test]
    fn test_envelope_decrypts_body() {
        let identity = Identity::generate();
        let prepared = prepare_upload(b"top secret", "s.txt", "alice", &identity).unwrap();
        let body = prepared.body().clone();
        let envelope = prepared.into_envelope(42);

        assert_eq!(envelope.file_id, 42);
        assert_eq!(envelope.filename, "s.txt");

        let content = decrypt(&body.file_content, &envelope.fek, &envelope.file_nonce).unwrap();
        assert_eq!(content, b"top secret");

        let meta = decrypt(&body.metadata, &envelope.mek, &envelope.metadata_nonce).unwrap();
        let meta: FileMetadata = serde_json::from_slice(&meta).unwrap();
        assert_eq!(meta.filename, "s.txt");
        assert_eq!(meta.filesize, 10);
    }

    #[test]
    fn test_fresh_keys_per_upload() {
        let identity = Identity::generate();
        let a = prepare_upload(b"x", "x", "alice", &identity).unwrap().into_envelope(1);
        let b = prepare_upload(b"x", "x", "alice", &identity).unwrap().into_envelope(2);

        assert_ne!(a.fek, b.fek);
        assert_ne!(a.mek, b.mek);
        assert_ne!(a.fek, a.mek);
    }

    #[test]
    fn test_empty_file() {
        let identity = Identity::generate();
        let prepared = prepare_upload(b"", "empty", "alice", &identity).unwrap();
        assert!(prepared.body().file_content.is_empty());
    }
}
