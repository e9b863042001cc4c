//! # Error Handling
//!
//! Error types for the ssshare core.
//!
//! ## Error Hierarchy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           ERROR HIERARCHY                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Error (top-level)                                                     │
//! │  │                                                                      │
//! │  ├── Crypto Errors (300-399)                                           │
//! │  │   ├── InvalidKeyEncoding    - Malformed / wrong-length key          │
//! │  │   ├── SignatureInvalid      - Verification failed (fail closed)     │
//! │  │   ├── KeyUnwrapFailed       - Share grant did not yield a key       │
//! │  │   ├── AuthenticationFailed  - Vault unlock failed (generic)         │
//! │  │   ├── DecryptionFailed      - Symmetric layer mismatch              │
//! │  │   ├── EncryptionFailed      - Symmetric layer failure               │
//! │  │   └── KeyDerivationFailed   - Argon2id / wrap-key derivation        │
//! │  │                                                                      │
//! │  ├── Vault Errors (400-499)                                            │
//! │  │   ├── VaultLocked           - No unlocked session                   │
//! │  │   ├── NoRegisteredUser      - Vault holds no user yet               │
//! │  │   ├── UserAlreadyRegistered - Vault already holds a user            │
//! │  │   ├── FileNotFound          - No envelope for that file id          │
//! │  │   └── Storage*              - Read / write / corrupted record       │
//! │  │                                                                      │
//! │  ├── Input Validation Errors (500-599)                                 │
//! │  │   ├── UnexpectedStatus      - Non-2xx response                      │
//! │  │   ├── InvalidResponse       - Missing / malformed JSON fields       │
//! │  │   └── InvalidInput          - Caller supplied unusable input        │
//! │  │                                                                      │
//! │  ├── Transport Errors (600-699)                                        │
//! │  │   ├── TransportError        - Collaborator could not deliver        │
//! │  │   └── Timeout               - Collaborator timed out                │
//! │  │                                                                      │
//! │  └── Internal Errors (900-999)                                         │
//! │      └── SerializationError    - JSON encode / decode failure          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Cryptographic failures and input-validation failures are kept apart:
//! a server that answers `404` or omits `file_content` is not an attack,
//! a signature that does not verify is. See [`Error::is_crypto_failure`].

use thiserror::Error;

/// Result type alias for ssshare core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the ssshare core
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Crypto Errors (300-399)
    // ========================================================================
    /// A key could not be parsed: bad base64, bad DER wrapping or wrong length
    #[error("Invalid key encoding: {0}")]
    InvalidKeyEncoding(String),

    /// A classical or post-quantum signature did not verify
    #[error("Signature verification failed")]
    SignatureInvalid,

    /// A share grant did not unwrap to a 32-byte key
    #[error("Key unwrap failed: {0}")]
    KeyUnwrapFailed(String),

    /// Vault unlock failed.
    ///
    /// Deliberately carries no detail: wrong password, wrong username and a
    /// corrupted record all look the same to the caller.
    #[error("Authentication failed")]
    AuthenticationFailed,

    /// Symmetric decryption failed (key, nonce or ciphertext mismatch)
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    /// Symmetric encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Password or wrap-key derivation failed
    #[error("Failed to derive key: {0}")]
    KeyDerivationFailed(String),

    // ========================================================================
    // Vault Errors (400-499)
    // ========================================================================
    /// The vault has no unlocked session
    #[error("Vault is locked. Unlock it with the account password first.")]
    VaultLocked,

    /// The vault does not contain a registered user
    #[error("No registered user in the vault.")]
    NoRegisteredUser,

    /// The vault already contains a registered user
    #[error("A user is already registered in this vault: {0}")]
    UserAlreadyRegistered(String),

    /// No file envelope is stored for this file id
    #[error("No local keys for file {0}")]
    FileNotFound(u64),

    /// Failed to read the vault record
    #[error("Failed to read from storage: {0}")]
    StorageReadError(String),

    /// Failed to write the vault record
    #[error("Failed to write to storage: {0}")]
    StorageWriteError(String),

    /// The vault record on disk could not be parsed
    #[error("Data corruption detected: {0}")]
    StorageCorrupted(String),

    // ========================================================================
    // Input Validation Errors (500-599)
    // ========================================================================
    /// The server answered with a status the operation does not accept
    #[error("Unexpected status {status}: {body}")]
    UnexpectedStatus {
        /// HTTP status code
        status: u16,
        /// Response body, verbatim
        body: String,
    },

    /// The server response is missing fields or is not the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The caller supplied input the operation cannot use
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ========================================================================
    // Transport Errors (600-699)
    // ========================================================================
    /// The transport collaborator failed to deliver the request
    #[error("Transport error: {0}")]
    TransportError(String),

    /// The transport collaborator timed out
    #[error("Operation timed out: {0}")]
    Timeout(String),

    // ========================================================================
    // Internal Errors (900-999)
    // ========================================================================
    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl Error {
    /// Numeric error code, grouped by category:
    /// - 300-399: Crypto
    /// - 400-499: Vault / storage
    /// - 500-599: Input validation
    /// - 600-699: Transport
    /// - 900-999: Internal
    pub fn code(&self) -> i32 {
        match self {
            // Crypto (300-399)
            Error::InvalidKeyEncoding(_) => 300,
            Error::SignatureInvalid => 301,
            Error::KeyUnwrapFailed(_) => 302,
            Error::AuthenticationFailed => 303,
            Error::DecryptionFailed(_) => 304,
            Error::EncryptionFailed(_) => 305,
            Error::KeyDerivationFailed(_) => 306,

            // Vault (400-499)
            Error::VaultLocked => 400,
            Error::NoRegisteredUser => 401,
            Error::UserAlreadyRegistered(_) => 402,
            Error::FileNotFound(_) => 403,
            Error::StorageReadError(_) => 404,
            Error::StorageWriteError(_) => 405,
            Error::StorageCorrupted(_) => 406,

            // Input validation (500-599)
            Error::UnexpectedStatus { .. } => 500,
            Error::InvalidResponse(_) => 501,
            Error::InvalidInput(_) => 502,

            // Transport (600-699)
            Error::TransportError(_) => 600,
            Error::Timeout(_) => 601,

            // Internal (900-999)
            Error::SerializationError(_) => 900,
        }
    }

    /// Whether this error came out of a cryptographic check.
    ///
    /// These must never be retried blindly or downgraded to a warning.
    pub fn is_crypto_failure(&self) -> bool {
        (300..400).contains(&self.code())
    }

    /// Whether this error is a malformed or rejected server exchange
    pub fn is_input_validation(&self) -> bool {
        (500..600).contains(&self.code())
    }

    /// Check if this error is recoverable by retrying
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::TransportError(_) | Error::Timeout(_))
    }
}

// ============================================================================
// ERROR CONVERSIONS
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::StorageReadError(err.to_string())
    }
}

impl From<base64::DecodeError> for Error {
    fn from(err: base64::DecodeError) -> Self {
        Error::InvalidResponse(format!("invalid base64: {}", err))
    }
}

// ============================================================================
// TESTS
// ============================================================================
