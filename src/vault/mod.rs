//! # Vault
//!
//! Password-protected local store of the user's identity and of every file
//! envelope the user can read.
//!
//! ## Key Wrapping
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         VAULT LAYOUT                                    │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  password ──Argon2id(salt)──► Kpwd                                     │
//! │                                 │                                       │
//! │                                 ▼ AES-CTR                               │
//! │                        master_enc = E(master key)                       │
//! │                                 │                                       │
//! │                                 ▼ AES-CTR                               │
//! │                        priv_enc = E(private identity JSON)              │
//! │                                                                         │
//! │  Password change: new salt, new Kpwd, re-encrypt the SAME master key.  │
//! │  priv_enc is never touched after registration.                         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Lifecycle
//!
//! ```text
//!   Vault::open(path) ──► register(...) ──► [unlocked] ──► lock() ──► [locked]
//!                                               ▲                        │
//!                                               └──── unlock(user, pw) ◄─┘
//! ```
//!
//! ## Concurrency
//!
//! One `parking_lot::RwLock` guards the record, the file map and the
//! session. Every mutation persists the whole JSON document (temp file +
//! rename) while the write lock is held, so readers never observe a state
//! that is not also on disk. A vault without a path is memory-only.

mod record;

pub use record::{UserRecord, VaultFile};

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use crate::crypto::KdfParams;
use crate::envelope::FileEnvelope;
use crate::error::{Error, Result};
use crate::identity::{Identity, PublicIdentity};

/// Decrypted state, present only while unlocked
///
/// The master key is not kept: it is only needed to open or re-wrap the
/// record and is dropped (zeroized) as soon as that is done.
struct Session {
    identity: Identity,
}

#[derive(Default)]
struct VaultState {
    user: Option<UserRecord>,
    files: BTreeMap<u64, FileEnvelope>,
    session: Option<Session>,
}

/// The local secret vault
pub struct Vault {
    path: Option<PathBuf>,
    params: KdfParams,
    state: RwLock<VaultState>,
}

impl Vault {
    /// Open the vault stored at `path`, creating an empty one if absent
    ///
    /// `params` are used for new registrations and password changes; an
    /// existing record keeps the parameters it was sealed with.
    pub fn open(path: impl Into<PathBuf>, params: KdfParams) -> Result<Self> {
        let path = path.into();
        let file = load(&path)?;

        tracing::info!(
            path = %path.display(),
            registered = file.user.is_some(),
            files = file.files.len(),
            "Opened vault"
        );

        Ok(Self {
            path: Some(path),
            params,
            state: RwLock::new(VaultState {
                user: file.user,
                files: file.files.into_iter().map(|f| (f.file_id, f)).collect(),
                session: None,
            }),
        })
    }

    /// Create a vault that never touches disk
    pub fn in_memory(params: KdfParams) -> Self {
        Self {
            path: None,
            params,
            state: RwLock::new(VaultState::default()),
        }
    }

    /// Backing file, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Username of the registered user, readable while locked
    pub fn registered_username(&self) -> Option<String> {
        self.state.read().user.as_ref().map(|u| u.username.clone())
    }

    /// Whether a decrypted session is present
    pub fn is_unlocked(&self) -> bool {
        self.state.read().session.is_some()
    }

    // ========================================================================
    // ACCOUNT
    // ========================================================================

    /// Seal `identity` under `password` and persist it
    ///
    /// Leaves the vault unlocked.
    pub fn register(&self, username: &str, password: &str, identity: Identity) -> Result<()> {
        if username.is_empty() {
            return Err(Error::InvalidInput("Username must not be empty".into()));
        }

        let mut state = self.state.write();
        if let Some(existing) = &state.user {
            return Err(Error::UserAlreadyRegistered(existing.username.clone()));
        }

        let (record, master_key) = record::seal(username, password, &identity, &self.params)?;
        drop(master_key);
        self.persist(Some(&record), &state.files)?;

        state.user = Some(record);
        state.session = Some(Session { identity });

        tracing::info!(username, "Registered vault user");
        Ok(())
    }

    /// Decrypt the identity into a session
    ///
    /// Wrong username, wrong password and a corrupted record all fail with
    /// the same [`Error::AuthenticationFailed`].
    pub fn unlock(&self, username: &str, password: &str) -> Result<()> {
        let mut state = self.state.write();
        let user = state.user.as_ref().ok_or(Error::NoRegisteredUser)?;

        let (master_key, identity) = record::open(user, username, password)?;
        drop(master_key);
        state.session = Some(Session { identity });

        tracing::info!(username, "Vault unlocked");
        Ok(())
    }

    /// Drop the decrypted session (key material is zeroized)
    pub fn lock(&self) {
        if self.state.write().session.take().is_some() {
            tracing::info!("Vault locked");
        }
    }

    /// Re-wrap the master key under a new password
    ///
    /// The old password must open the full record, identity included. Leaves
    /// the vault unlocked.
    pub fn change_password(&self, old_password: &str, new_password: &str) -> Result<()> {
        let mut state = self.state.write();
        let user = state.user.as_ref().ok_or(Error::NoRegisteredUser)?;

        let (master_key, identity) = record::open(user, &user.username, old_password)?;
        let rewrapped = record::rewrap(user, &master_key, new_password, &self.params)?;
        drop(master_key);

        self.persist(Some(&rewrapped), &state.files)?;

        tracing::info!(username = %rewrapped.username, "Vault password changed");
        state.user = Some(rewrapped);
        state.session = Some(Session { identity });
        Ok(())
    }

    /// Username of the unlocked session
    pub fn username(&self) -> Result<String> {
        let state = self.state.read();
        state.session.as_ref().ok_or(Error::VaultLocked)?;
        state
            .user
            .as_ref()
            .map(|u| u.username.clone())
            .ok_or(Error::NoRegisteredUser)
    }

    /// Independent copy of the unlocked identity
    pub fn identity(&self) -> Result<Identity> {
        let state = self.state.read();
        let session = state.session.as_ref().ok_or(Error::VaultLocked)?;
        session.identity.try_clone()
    }

    /// Public identity of the registered user, readable while locked
    pub fn public_identity(&self) -> Result<PublicIdentity> {
        self.state
            .read()
            .user
            .as_ref()
            .map(|u| u.public_keybundle.clone())
            .ok_or(Error::NoRegisteredUser)
    }

    // ========================================================================
    // FILE ENVELOPES
    // ========================================================================

    /// Copy of the envelope for `file_id`
    pub fn file(&self, file_id: u64) -> Result<FileEnvelope> {
        let state = self.state.read();
        state.session.as_ref().ok_or(Error::VaultLocked)?;
        state
            .files
            .get(&file_id)
            .cloned()
            .ok_or(Error::FileNotFound(file_id))
    }

    /// Copies of all envelopes, ordered by file id
    pub fn files(&self) -> Result<Vec<FileEnvelope>> {
        let state = self.state.read();
        state.session.as_ref().ok_or(Error::VaultLocked)?;
        Ok(state.files.values().cloned().collect())
    }

    /// Insert or wholesale-replace the envelope for `envelope.file_id`
    pub fn upsert_file(&self, envelope: FileEnvelope) -> Result<()> {
        let mut state = self.state.write();
        state.session.as_ref().ok_or(Error::VaultLocked)?;

        let mut files = state.files.clone();
        let file_id = envelope.file_id;
        files.insert(file_id, envelope);
        self.persist(state.user.as_ref(), &files)?;
        state.files = files;

        tracing::debug!(file_id, "Stored file envelope");
        Ok(())
    }

    /// Delete the envelope for `file_id`; returns whether one existed
    pub fn remove_file(&self, file_id: u64) -> Result<bool> {
        let mut state = self.state.write();
        state.session.as_ref().ok_or(Error::VaultLocked)?;

        if !state.files.contains_key(&file_id) {
            return Ok(false);
        }
        let mut files = state.files.clone();
        files.remove(&file_id);
        self.persist(state.user.as_ref(), &files)?;
        state.files = files;

        tracing::debug!(file_id, "Removed file envelope");
        Ok(true)
    }

    // ========================================================================
    // PERSISTENCE
    // ========================================================================

    /// Write the whole document atomically; callers hold the write lock
    fn persist(&self, user: Option<&UserRecord>, files: &BTreeMap<u64, FileEnvelope>) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let document = VaultFile {
            user: user.cloned(),
            files: files.values().cloned().collect(),
        };
        let json = serde_json::to_vec_pretty(&document)?;

        write_atomic(path, &json)
            .map_err(|e| Error::StorageWriteError(format!("{}: {}", path.display(), e)))
    }
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault")
            .field("path", &self.path)
            .field("unlocked", &self.is_unlocked())
            .finish_non_exhaustive()
    }
}

fn load(path: &Path) -> Result<VaultFile> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(VaultFile::default()),
        Err(e) => {
            return Err(Error::StorageReadError(format!("{}: {}", path.display(), e)));
        }
    };

    if text.trim().is_empty() {
        return Ok(VaultFile::default());
    }

    serde_json::from_str(&text)
        .map_err(|e| Error::StorageCorrupted(format!("{}: {}", path.display(), e)))
}

fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "vault".to_string());
    let tmp = dir.join(format!(".{}.tmp", file_name));

    {
        let mut file = std::fs::File::create(&tmp)?;
        file.write_all(data)?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp, path)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{Iv, SymmetricKey};

    const FAST: KdfParams = KdfParams {
        memory_kib: 64,
        iterations: 1,
        parallelism: 1,
    };

    fn envelope(file_id: u64, filename: &str) -> FileEnvelope {
        FileEnvelope {
            file_id,
            filename: filename.into(),
            fek: SymmetricKey::random(),
            file_nonce: Iv::random(),
            mek: SymmetricKey::random(),
            metadata_nonce: Iv::random(),
        }
    }

    #[test]
    fn test_register_unlock_lock() {
        let vault = Vault::in_memory(FAST);
        let identity = Identity::generate();
        let public = identity.to_public();

        vault.register("alice", "pw", identity).unwrap();
        assert!(vault.is_unlocked());
        assert_eq!(vault.username().unwrap(), "alice");

        vault.lock();
        assert!(!vault.is_unlocked());
        assert!(matches!(vault.identity(), Err(Error::VaultLocked)));
        assert_eq!(vault.public_identity().unwrap(), public);

        vault.unlock("alice", "pw").unwrap();
        assert_eq!(vault.identity().unwrap().public(), &public);
    }

    #[test]
    fn test_unlock_failures_are_generic() {
        let vault = Vault::in_memory(FAST);
        assert!(matches!(vault.unlock("alice", "pw"), Err(Error::NoRegisteredUser)));

        vault.register("alice", "pw", Identity::generate()).unwrap();
        vault.lock();

        assert!(matches!(vault.unlock("alice", "nope"), Err(Error::AuthenticationFailed)));
        assert!(matches!(vault.unlock("bob", "pw"), Err(Error::AuthenticationFailed)));
        assert!(!vault.is_unlocked());
    }

    #[test]
    fn test_register_twice_rejected() {
        let vault = Vault::in_memory(FAST);
        vault.register("alice", "pw", Identity::generate()).unwrap();

        let result = vault.register("bob", "pw", Identity::generate());
        assert!(matches!(result, Err(Error::UserAlreadyRegistered(name)) if name == "alice"));
    }

    #[test]
    fn test_change_password() {
        let vault = Vault::in_memory(FAST);
        vault.register("alice", "old", Identity::generate()).unwrap();
        let public = vault.public_identity().unwrap();

        assert!(matches!(
            vault.change_password("wrong", "new"),
            Err(Error::AuthenticationFailed)
        ));

        vault.change_password("old", "new").unwrap();
        vault.lock();

        assert!(matches!(vault.unlock("alice", "old"), Err(Error::AuthenticationFailed)));
        vault.unlock("alice", "new").unwrap();
        assert_eq!(vault.identity().unwrap().public(), &public);
    }

    #[test]
    fn test_master_key_survives_password_change() {
        let vault = Vault::in_memory(FAST);
        vault.register("alice", "old", Identity::generate()).unwrap();
        let before = vault.state.read().user.clone().unwrap();

        vault.change_password("old", "new").unwrap();
        let after = vault.state.read().user.clone().unwrap();

        let (old_master, _) = record::open(&before, "alice", "old").unwrap();
        let (new_master, _) = record::open(&after, "alice", "new").unwrap();
        assert_eq!(old_master, new_master);
        assert_eq!(after.priv_enc, before.priv_enc);
    }

    #[test]
    fn test_identity_restored_bit_for_bit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client_store.json");
        let identity = Identity::generate();
        let private_json = identity.to_private_json().unwrap();

        {
            let vault = Vault::open(&path, FAST).unwrap();
            vault.register("alice", "pw", identity).unwrap();
            vault.change_password("pw", "pw2").unwrap();
        }

        let reopened = Vault::open(&path, FAST).unwrap();
        reopened.unlock("alice", "pw2").unwrap();
        let restored = reopened.identity().unwrap();
        assert_eq!(*restored.to_private_json().unwrap(), *private_json);
    }

    #[test]
    fn test_file_envelopes_require_unlock() {
        let vault = Vault::in_memory(FAST);
        vault.register("alice", "pw", Identity::generate()).unwrap();
        vault.upsert_file(envelope(1, "a.txt")).unwrap();
        vault.lock();

        assert!(matches!(vault.file(1), Err(Error::VaultLocked)));
        assert!(matches!(vault.upsert_file(envelope(2, "b")), Err(Error::VaultLocked)));
    }

    #[test]
    fn test_upsert_replaces_wholesale() {
        let vault = Vault::in_memory(FAST);
        vault.register("alice", "pw", Identity::generate()).unwrap();

        let first = envelope(7, "draft.txt");
        vault.upsert_file(first.clone()).unwrap();
        let second = envelope(7, "final.txt");
        vault.upsert_file(second.clone()).unwrap();

        assert_eq!(vault.file(7).unwrap(), second);
        assert_eq!(vault.files().unwrap().len(), 1);

        assert!(vault.remove_file(7).unwrap());
        assert!(!vault.remove_file(7).unwrap());
        assert!(matches!(vault.file(7), Err(Error::FileNotFound(7))));
    }

    #[test]
    fn test_persistence_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store").join("client_store.json");

        let stored = envelope(3, "report.pdf");
        {
            let vault = Vault::open(&path, FAST).unwrap();
            vault.register("alice", "pw", Identity::generate()).unwrap();
            vault.upsert_file(stored.clone()).unwrap();
        }

        let reopened = Vault::open(&path, KdfParams::MODERATE).unwrap();
        assert_eq!(reopened.registered_username().as_deref(), Some("alice"));
        assert!(!reopened.is_unlocked());

        // Sealed with FAST; the record's own params are used to open it
        reopened.unlock("alice", "pw").unwrap();
        assert_eq!(reopened.file(3).unwrap(), stored);
    }

    #[test]
    fn test_atomic_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client_store.json");

        let vault = Vault::open(&path, FAST).unwrap();
        vault.register("alice", "pw", Identity::generate()).unwrap();
        vault.upsert_file(envelope(1, "a")).unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["client_store.json".to_string()]);

        let on_disk: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk["user"]["username"], "alice");
        assert_eq!(on_disk["files"][0]["file_id"], 1);
        assert!(on_disk["user"].get("priv_enc").is_some());
    }

    #[test]
    fn test_corrupted_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client_store.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(Vault::open(&path, FAST), Err(Error::StorageCorrupted(_))));
    }

    #[test]
    fn test_empty_file_is_fresh_vault() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client_store.json");
        std::fs::write(&path, "").unwrap();

        let vault = Vault::open(&path, FAST).unwrap();
        assert!(vault.registered_username().is_none());
    }
}
