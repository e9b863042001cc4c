//! # Cryptography Module
//!
//! All cryptographic primitives used by the ssshare core.
//!
//! ## Security Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    CRYPTOGRAPHIC ARCHITECTURE                           │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    IDENTITY KEYS                                │   │
//! │  ├─────────────────────────────────────────────────────────────────┤   │
//! │  │                                                                 │   │
//! │  │  ┌───────────────┐   ┌───────────────┐   ┌───────────────┐     │   │
//! │  │  │ KEM           │   │ Classical     │   │ Post-Quantum  │     │   │
//! │  │  │ (X25519)      │   │ (Ed25519)     │   │ (Dilithium5)  │     │   │
//! │  │  │               │   │               │   │               │     │   │
//! │  │  │ • Share wraps │   │ • Requests    │   │ • Requests    │     │   │
//! │  │  │               │   │ • Uploads     │   │ • Uploads     │     │   │
//! │  │  └───────────────┘   └───────────────┘   └───────────────┘     │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    PER-FILE KEYS                                │   │
//! │  ├─────────────────────────────────────────────────────────────────┤   │
//! │  │                                                                 │   │
//! │  │  FEK (32 B random) ──AES-256-CTR──► file content               │   │
//! │  │  MEK (32 B random) ──AES-256-CTR──► {filename, filesize}       │   │
//! │  │                                                                 │   │
//! │  │  Signed: username | sha256hex(cFile) | sha256hex(cMeta)        │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    VAULT KEYS                                   │   │
//! │  ├─────────────────────────────────────────────────────────────────┤   │
//! │  │                                                                 │   │
//! │  │  password ──Argon2id──► Kpwd ──wraps──► master key             │   │
//! │  │  master key ──wraps──► private identity bundle                 │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Algorithm Choices
//!
//! | Algorithm | Purpose | Role alias |
//! |-----------|---------|------------|
//! | Ed25519 | Classical signatures | [`ClassicalScheme`] |
//! | Dilithium5 | Post-quantum signatures | [`PostQuantumScheme`] |
//! | X25519 | Share key agreement | [`KemScheme`] |
//! | AES-256-CTR | All symmetric encryption | |
//! | SHA-256 | Content digests, share wrap key | |
//! | Argon2id | Vault password key | |
//!
//! ## Security Considerations
//!
//! 1. **Key Zeroization**: All secret keys are zeroized when dropped
//! 2. **Secure Random**: Using `rand::rngs::OsRng` for every key and IV
//! 3. **No IV Reuse**: A fresh IV is drawn on every encryption
//! 4. **Verify First**: Downloads verify both signatures before decrypting

pub mod der;
pub mod hash;
pub mod kdf;
pub mod kem;
pub mod signing;
pub mod symmetric;

pub use der::{decode_spki, encode_spki, SpkiAlgorithm};
pub use hash::{sha256, sha256_hex};
pub use kdf::{derive_password_key, derive_wrap_key, random_salt, KdfParams, SALT_SIZE};
pub use kem::{KeyAgreement, SharedSecret, X25519};
pub use signing::{Dilithium5, Ed25519, SchemeKeyPair, SignatureScheme};
pub use symmetric::{decrypt, encrypt, Iv, SymmetricKey, IV_SIZE, KEY_SIZE};

/// The classical signature role
pub type ClassicalScheme = Ed25519;

/// The post-quantum signature role
pub type PostQuantumScheme = Dilithium5;

/// The key agreement role
pub type KemScheme = X25519;
