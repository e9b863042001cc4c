//! # ssshare Core
//!
//! Client-side cryptographic core of a secure file-sharing service. Files
//! are encrypted and signed before they leave the machine; the server only
//! ever stores ciphertext, signatures and public keys.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         SSSHARE CORE MODULES                            │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                         FileClient                              │   │
//! │  │  register · login · upload · download · share · list · forget   │   │
//! │  └──────┬──────────────┬──────────────┬──────────────┬─────────────┘   │
//! │         │              │              │              │                 │
//! │  ┌──────▼──────┐ ┌─────▼──────┐ ┌─────▼──────┐ ┌─────▼──────┐          │
//! │  │  Envelope   │ │  Sharing   │ │    Auth    │ │   Vault    │          │
//! │  │ - FEK/MEK   │ │ - X25519   │ │ - Canonical│ │ - Argon2id │          │
//! │  │ - Sign hash │ │   ephemeral│ │   request  │ │ - Master   │          │
//! │  │ - Verify    │ │ - Wrap keys│ │ - X-Sig    │ │   key      │          │
//! │  └──────┬──────┘ └─────┬──────┘ └─────┬──────┘ └─────┬──────┘          │
//! │         └──────────────┴───────┬──────┴──────────────┘                 │
//! │                                │                                        │
//! │  ┌─────────────┐  ┌────────────▼────────────┐                          │
//! │  │  Identity   │◄─┤         Crypto          │                          │
//! │  │ - X25519    │  │ AES-256-CTR · SHA-256   │                          │
//! │  │ - Ed25519   │  │ Ed25519 · Dilithium5    │                          │
//! │  │ - Dilithium5│  │ X25519 · Argon2id · DER │                          │
//! │  └─────────────┘  └─────────────────────────┘                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Hierarchy
//!
//! - [`error`] - Error types for the entire library
//! - [`crypto`] - Primitives behind capability traits
//! - [`identity`] - Hybrid identity and its key bundle
//! - [`auth`] - Signed request headers
//! - [`envelope`] - Upload and download of encrypted files
//! - [`sharing`] - Wrapping file keys for another user
//! - [`vault`] - Password-protected local key store
//! - [`client`] - Orchestration over an abstract transport
//! - [`config`] - Environment-driven client configuration
//!
//! ## Security Model
//!
//! Every signature is a pair: Ed25519 and Dilithium5 over the same message,
//! and a verifier accepts only when both halves verify. Downloads are
//! verified before anything is decrypted.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod auth;
pub mod client;
pub mod config;
pub mod crypto;
pub mod encoding;
pub mod envelope;
pub mod error;
pub mod identity;
pub mod sharing;
/// UTC timestamps in the wire format.
pub mod time;
pub mod vault;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use client::{FileClient, HttpRequest, HttpResponse, ListFilter, Method, Transport};
pub use config::ClientConfig;
pub use crypto::KdfParams;
pub use envelope::{DecryptedFile, FileEnvelope};
pub use error::{Error, Result};
pub use identity::{DualSignature, Identity, KeyBundle, PublicIdentity};
pub use sharing::ShareGrant;
pub use vault::Vault;

// ============================================================================
// VERSION INFO
// ============================================================================

/// Returns the version of ssshare Core
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Returns build information for debugging
pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: env!("CARGO_PKG_VERSION"),
        target: std::env::consts::OS,
        profile: if cfg!(debug_assertions) {
            "debug"
        } else {
            "release"
        },
    }
}

/// Build information for debugging
#[derive(Debug, Clone)]
pub struct BuildInfo {
    /// Crate version
    pub version: &'static str,
    /// Target operating system
    pub target: &'static str,
    /// Build profile (debug/release)
    pub profile: &'static str,
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }

    #[test]
    fn test_build_info() {
        let info = build_info();
        assert_eq!(info.version, version());
        assert!(!info.target.is_empty());
    }
}
