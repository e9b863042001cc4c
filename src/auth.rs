//! # Request Authentication
//!
//! Every API call except registration carries three headers proving that the
//! holder of an identity sent exactly this request body at this time.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      REQUEST SIGNING                                    │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  canonical = username | timestamp | method | path | body               │
//! │                                                                         │
//! │              e.g. alice|2025-06-03T15:42:00Z|POST|/api/fs/list|{"page":1}│
//! │                                                                         │
//! │  X-Username : alice                                                    │
//! │  X-Timestamp: 2025-06-03T15:42:00Z                                     │
//! │  X-Signature: base64(Ed25519(canonical)) || base64(Dilithium5(canonical))│
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `body` is the exact JSON text that goes on the wire. Re-serializing it
//! between signing and sending breaks verification, so callers sign the
//! string they are about to send and send that same string.
//!
//! Clock-skew tolerance is the receiver's policy; [`verify_headers`] checks
//! signatures only.

use std::fmt;

use crate::encoding::{b64_decode, b64_encode};
use crate::error::{Error, Result};
use crate::identity::{DualSignature, Identity, PublicIdentity};

/// Header carrying the signer's username
pub const HEADER_USERNAME: &str = "X-Username";

/// Header carrying the signing time
pub const HEADER_TIMESTAMP: &str = "X-Timestamp";

/// Header carrying both signatures
pub const HEADER_SIGNATURE: &str = "X-Signature";

/// Separator between the two base64 signatures in `X-Signature`
pub const SIGNATURE_SEPARATOR: &str = "||";

/// The five fields covered by a request signature, in signing order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalRequest<'a> {
    /// Signer's username
    pub username: &'a str,
    /// ISO-8601 UTC timestamp
    pub timestamp: &'a str,
    /// HTTP method, upper case
    pub method: &'a str,
    /// Request path, e.g. `/api/fs/upload`
    pub path: &'a str,
    /// Exact JSON body text
    pub body: &'a str,
}

impl<'a> CanonicalRequest<'a> {
    /// Create a canonical request
    pub fn new(
        username: &'a str,
        timestamp: &'a str,
        method: &'a str,
        path: &'a str,
        body: &'a str,
    ) -> Self {
        Self {
            username,
            timestamp,
            method,
            path,
            body,
        }
    }
}

impl fmt::Display for CanonicalRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}|{}",
            self.username, self.timestamp, self.method, self.path, self.body
        )
    }
}

/// The three authentication header values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthHeaders {
    /// `X-Username`
    pub username: String,
    /// `X-Timestamp`
    pub timestamp: String,
    /// `X-Signature`
    pub signature: String,
}

impl AuthHeaders {
    /// As `(name, value)` pairs, ready to append to a request
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        vec![
            (HEADER_USERNAME.to_string(), self.username.clone()),
            (HEADER_TIMESTAMP.to_string(), self.timestamp.clone()),
            (HEADER_SIGNATURE.to_string(), self.signature.clone()),
        ]
    }

    /// Pick the three headers out of a header list (names are case-insensitive)
    pub fn from_pairs(headers: &[(String, String)]) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value.clone())
                .ok_or_else(|| Error::InvalidInput(format!("Missing {} header", name)))
        };

        Ok(Self {
            username: find(HEADER_USERNAME)?,
            timestamp: find(HEADER_TIMESTAMP)?,
            signature: find(HEADER_SIGNATURE)?,
        })
    }
}

/// Encode a dual signature as `base64(classical)||base64(post_quantum)`
pub fn encode_signature(signature: &DualSignature) -> String {
    format!(
        "{}{}{}",
        b64_encode(&signature.classical),
        SIGNATURE_SEPARATOR,
        b64_encode(&signature.post_quantum)
    )
}

/// Parse an `X-Signature` value
///
/// Requires exactly one separator and two non-empty base64 halves.
pub fn parse_signature(value: &str) -> Result<DualSignature> {
    let mut parts = value.split(SIGNATURE_SEPARATOR);
    let (classical, post_quantum) = match (parts.next(), parts.next(), parts.next()) {
        (Some(c), Some(p), None) if !c.is_empty() && !p.is_empty() => (c, p),
        _ => return Err(Error::SignatureInvalid),
    };

    Ok(DualSignature {
        classical: b64_decode(classical).map_err(|_| Error::SignatureInvalid)?,
        post_quantum: b64_decode(post_quantum).map_err(|_| Error::SignatureInvalid)?,
    })
}

/// Sign a canonical request with both of the identity's signing keys
pub fn sign_headers(identity: &Identity, canonical: &CanonicalRequest<'_>) -> Result<AuthHeaders> {
    let message = canonical.to_string();
    let signature = identity.sign(message.as_bytes())?;

    Ok(AuthHeaders {
        username: canonical.username.to_string(),
        timestamp: canonical.timestamp.to_string(),
        signature: encode_signature(&signature),
    })
}

/// Sign a request stamped with the current UTC time
pub fn sign_request(
    identity: &Identity,
    username: &str,
    method: &str,
    path: &str,
    body: &str,
) -> Result<AuthHeaders> {
    let timestamp = crate::time::iso8601_now();
    let canonical = CanonicalRequest::new(username, &timestamp, method, path, body);

    tracing::debug!(username, method, path, body_len = body.len(), "Signing request");
    sign_headers(identity, &canonical)
}

/// Receiving-side check of a signed request
///
/// Rebuilds the canonical string from the headers and the byte-identical
/// body, then requires both signatures to verify against `signer`.
pub fn verify_headers(
    signer: &PublicIdentity,
    headers: &AuthHeaders,
    method: &str,
    path: &str,
    body: &str,
) -> Result<()> {
    let signature = parse_signature(&headers.signature)?;
    let canonical =
        CanonicalRequest::new(&headers.username, &headers.timestamp, method, path, body);

    signer.verify(canonical.to_string().as_bytes(), &signature)
}

// ============================================================================
// TESTS
// ============================================================================
