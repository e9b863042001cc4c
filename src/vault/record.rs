//! On-disk shapes of the vault and the pure functions that seal and open them.
//!
//! ```json
//! {
//!   "user": {
//!     "username": "alice",
//!     "salt": "…", "master_nonce": "…", "master_enc": "…",
//!     "priv_nonce": "…", "priv_enc": "…",
//!     "public_keybundle": {"preQuantum": {…}, "postQuantum": {…}},
//!     "kdf": {"memory_kib": 262144, "iterations": 3, "parallelism": 1}
//!   },
//!   "files": [
//!     {"file_id": 1, "filename": "a.txt", "fek_b64": "…", "file_nonce_b64": "…",
//!      "mek_b64": "…", "metadata_nonce_b64": "…"}
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::crypto::{
    decrypt, derive_password_key, encrypt, random_salt, Iv, KdfParams, SymmetricKey, SALT_SIZE,
};
use crate::encoding::{base64_bytes, base64_iv};
use crate::envelope::FileEnvelope;
use crate::error::{Error, Result};
use crate::identity::{Identity, PublicIdentity};

/// The registered user's sealed secrets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Account name
    pub username: String,
    /// Argon2id salt
    #[serde(with = "base64_bytes")]
    pub salt: Vec<u8>,
    /// IV of `master_enc`
    #[serde(with = "base64_iv")]
    pub master_nonce: Iv,
    /// Master key under the password key
    #[serde(with = "base64_bytes")]
    pub master_enc: Vec<u8>,
    /// IV of `priv_enc`
    #[serde(with = "base64_iv")]
    pub priv_nonce: Iv,
    /// Private identity JSON under the master key
    #[serde(with = "base64_bytes")]
    pub priv_enc: Vec<u8>,
    /// Public identity, readable without the password
    pub public_keybundle: PublicIdentity,
    /// Cost parameters `salt` was used with
    #[serde(default)]
    pub kdf: KdfParams,
}

/// Everything the vault persists
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VaultFile {
    /// Registered user, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserRecord>,
    /// File envelopes, ordered by id
    #[serde(default)]
    pub files: Vec<FileEnvelope>,
}

/// Seal a new identity under `password`
///
/// Returns the record and the freshly generated master key.
pub fn seal(
    username: &str,
    password: &str,
    identity: &Identity,
    params: &KdfParams,
) -> Result<(UserRecord, SymmetricKey)> {
    let salt = random_salt();
    let password_key = derive_password_key(password.as_bytes(), &salt, params)?;

    let master_key = SymmetricKey::random();
    let (master_enc, master_nonce) = encrypt(master_key.as_bytes(), &password_key)?;

    let private_json = identity.to_private_json()?;
    let (priv_enc, priv_nonce) = encrypt(private_json.as_bytes(), &master_key)?;

    let record = UserRecord {
        username: username.to_string(),
        salt: salt.to_vec(),
        master_nonce,
        master_enc,
        priv_nonce,
        priv_enc,
        public_keybundle: identity.to_public(),
        kdf: *params,
    };

    Ok((record, master_key))
}

/// Open a record with `username` and `password`
///
/// Every failure is [`Error::AuthenticationFailed`]; the reason is only
/// logged at debug level.
pub fn open(record: &UserRecord, username: &str, password: &str) -> Result<(SymmetricKey, Identity)> {
    open_inner(record, username, password).map_err(|e| {
        tracing::debug!(reason = %e, "Vault unlock rejected");
        Error::AuthenticationFailed
    })
}

fn open_inner(record: &UserRecord, username: &str, password: &str) -> Result<(SymmetricKey, Identity)> {
    if record.username != username {
        return Err(Error::InvalidInput("username mismatch".into()));
    }

    let salt: [u8; SALT_SIZE] = record
        .salt
        .as_slice()
        .try_into()
        .map_err(|_| Error::StorageCorrupted("salt length".into()))?;
    let password_key = derive_password_key(password.as_bytes(), &salt, &record.kdf)?;

    let master_plain = Zeroizing::new(decrypt(&record.master_enc, &password_key, &record.master_nonce)?);
    let master_key = SymmetricKey::from_slice(&master_plain)?;

    // CTR has no tag: a wrong password shows up as a private bundle that
    // does not parse or whose keys do not match each other.
    let private_plain = Zeroizing::new(decrypt(&record.priv_enc, &master_key, &record.priv_nonce)?);
    let private_json = std::str::from_utf8(&private_plain)
        .map_err(|_| Error::DecryptionFailed("private bundle is not UTF-8".into()))?;
    let identity = Identity::from_private_json(private_json)?;

    if identity.public() != &record.public_keybundle {
        return Err(Error::StorageCorrupted("public bundle mismatch".into()));
    }

    Ok((master_key, identity))
}

/// Re-wrap an already opened master key under `new_password`
///
/// `priv_enc` and `priv_nonce` are carried over untouched.
pub fn rewrap(
    record: &UserRecord,
    master_key: &SymmetricKey,
    new_password: &str,
    params: &KdfParams,
) -> Result<UserRecord> {
    let salt = random_salt();
    let password_key = derive_password_key(new_password.as_bytes(), &salt, params)?;
    let (master_enc, master_nonce) = encrypt(master_key.as_bytes(), &password_key)?;

    Ok(UserRecord {
        salt: salt.to_vec(),
        master_nonce,
        master_enc,
        kdf: *params,
        ..record.clone()
    })
}
