//! The file-sharing client.

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::api::{
    BundleRequest, BundleResponse, FileListEntry, ListFilter, ListRequest, ListResponse,
    ListedFile, RegisterBody, PATH_DOWNLOAD, PATH_GET_BUNDLE, PATH_LIST, PATH_REGISTER,
    PATH_SHARE, PATH_UPLOAD,
};
use super::{HttpRequest, HttpResponse, Method, Transport};
use crate::auth::sign_request;
use crate::config::ClientConfig;
use crate::crypto::decrypt;
use crate::envelope::{
    prepare_upload, DecryptedFile, DownloadRequest, DownloadResponse, FileMetadata,
    UploadResponse,
};
use crate::error::{Error, Result};
use crate::identity::{Identity, PublicIdentity};
use crate::sharing::{self, ShareBody};
use crate::time::parse_timestamp;
use crate::vault::Vault;

/// Client for one account against one server
///
/// Every operation that touches file keys requires an unlocked vault.
pub struct FileClient<T: Transport> {
    transport: T,
    config: ClientConfig,
    vault: Vault,
}

impl<T: Transport> FileClient<T> {
    /// Client over an already opened vault
    pub fn new(transport: T, config: ClientConfig, vault: Vault) -> Self {
        Self {
            transport,
            config,
            vault,
        }
    }

    /// Client over the vault at `config.store_path`
    pub fn open(transport: T, config: ClientConfig) -> Result<Self> {
        let vault = Vault::open(&config.store_path, config.kdf)?;
        Ok(Self::new(transport, config, vault))
    }

    /// The configuration in use
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The local vault
    pub fn vault(&self) -> &Vault {
        &self.vault
    }

    // ========================================================================
    // ACCOUNT
    // ========================================================================

    /// Create an identity, publish its bundle and seal it in the vault
    ///
    /// Nothing is written locally unless the server answers `201`. The vault
    /// is left unlocked.
    pub async fn register(&self, username: &str, password: &str) -> Result<()> {
        if username.is_empty() || password.is_empty() {
            return Err(Error::InvalidInput("Username and password are required".into()));
        }
        if let Some(existing) = self.vault.registered_username() {
            return Err(Error::UserAlreadyRegistered(existing));
        }

        let identity = Identity::generate();
        let body = to_body(&RegisterBody {
            username: username.to_string(),
            key_bundle: identity.public().to_key_bundle(),
        })?;

        let response = self.send(Method::Post, PATH_REGISTER, body, None).await?;
        expect_status(&response, 201, PATH_REGISTER)?;

        self.vault.register(username, password, identity)?;
        tracing::info!(username, "Registered account");
        Ok(())
    }

    /// Unlock the vault
    pub fn login(&self, username: &str, password: &str) -> Result<()> {
        self.vault.unlock(username, password)
    }

    /// Lock the vault
    pub fn logout(&self) {
        self.vault.lock();
    }

    /// Re-wrap the vault's master key under a new password
    pub fn change_password(&self, old_password: &str, new_password: &str) -> Result<()> {
        if new_password.is_empty() {
            return Err(Error::InvalidInput("New password must not be empty".into()));
        }
        self.vault.change_password(old_password, new_password)
    }

    // ========================================================================
    // FILES
    // ========================================================================

    /// Encrypt, sign and upload a file; returns the server-assigned id
    pub async fn upload(&self, plaintext: &[u8], filename: &str) -> Result<u64> {
        let (username, identity) = self.session()?;

        let prepared = prepare_upload(plaintext, filename, &username, &identity)?;
        let body = prepared.body_json()?;

        let response = self
            .send(Method::Post, PATH_UPLOAD, body, Some((username.as_str(), &identity)))
            .await?;
        expect_status(&response, 201, PATH_UPLOAD)?;
        let UploadResponse { file_id } = parse_json(&response)?;

        self.vault.upsert_file(prepared.into_envelope(file_id))?;
        tracing::info!(file_id, size = plaintext.len(), "Uploaded file");
        Ok(file_id)
    }

    /// Download, verify and decrypt a file
    ///
    /// The owner's signatures are checked against the local identity when
    /// the server reports the requester as owner, otherwise against the
    /// bundle fetched from the key directory. The stored filename is
    /// refreshed from the verified metadata.
    pub async fn download(&self, file_id: u64) -> Result<DecryptedFile> {
        let (username, identity) = self.session()?;
        let envelope = self.vault.file(file_id)?;

        let body = to_body(&DownloadRequest { file_id })?;
        let response = self
            .send(Method::Post, PATH_DOWNLOAD, body, Some((username.as_str(), &identity)))
            .await?;
        expect_status(&response, 200, PATH_DOWNLOAD)?;
        let download: DownloadResponse = parse_json(&response)?;

        let owner = if download.is_owner {
            identity.to_public()
        } else {
            self.fetch_public_identity(&download.owner_username).await?
        };

        let file = download.verify(&owner)?.decrypt(&envelope)?;

        if file.filename != envelope.filename {
            self.vault.upsert_file(envelope.with_filename(&file.filename))?;
        }

        tracing::info!(file_id, size = file.content.len(), "Downloaded file");
        Ok(file)
    }

    /// Look up another user's public identity in the key directory
    pub async fn fetch_public_identity(&self, username: &str) -> Result<PublicIdentity> {
        let (me, identity) = self.session()?;

        let body = to_body(&BundleRequest {
            username: username.to_string(),
        })?;
        let response = self
            .send(Method::Post, PATH_GET_BUNDLE, body, Some((me.as_str(), &identity)))
            .await?;
        expect_status(&response, 200, PATH_GET_BUNDLE)?;
        let BundleResponse { key_bundle } = parse_json(&response)?;

        PublicIdentity::from_key_bundle(&key_bundle)
    }

    /// Grant `recipient` access to a file
    pub async fn share(&self, file_id: u64, recipient: &str) -> Result<()> {
        let (username, identity) = self.session()?;
        if recipient == username {
            return Err(Error::InvalidInput("Cannot share a file with yourself".into()));
        }
        let envelope = self.vault.file(file_id)?;

        let recipient_identity = self.fetch_public_identity(recipient).await?;
        let grant = sharing::share(&envelope, recipient, &recipient_identity, &identity)?;

        let body = to_body(&ShareBody { file_id, grant })?;
        let response = self
            .send(Method::Post, PATH_SHARE, body, Some((username.as_str(), &identity)))
            .await?;
        expect_status(&response, 201, PATH_SHARE)?;

        tracing::info!(file_id, recipient, "Shared file");
        Ok(())
    }

    /// Fetch a page of the file listing and decrypt each entry's metadata
    ///
    /// Grants on files shared with us are unwrapped into the vault so the
    /// files can be downloaded later. Listing metadata carries no signature,
    /// so the filenames it yields are returned for display only and never
    /// stored. Entries that cannot be opened are skipped with a warning.
    pub async fn list_files(&self, page: u32, filter: ListFilter) -> Result<Vec<ListedFile>> {
        let (username, identity) = self.session()?;

        let body = to_body(&ListRequest { page })?;
        let response = self
            .send(Method::Post, PATH_LIST, body, Some((username.as_str(), &identity)))
            .await?;
        expect_status(&response, 200, PATH_LIST)?;
        let listing: ListResponse = parse_json(&response)?;

        let mut files = Vec::with_capacity(listing.file_data.len());
        for entry in listing.file_data {
            if !filter.admits(entry.is_owner) {
                continue;
            }
            let file_id = entry.file_id;
            match self.open_entry(entry, &identity) {
                Ok(Some(file)) => files.push(file),
                Ok(None) => {}
                Err(e) if e.is_crypto_failure() || e.is_input_validation() => {
                    tracing::warn!(file_id, error = %e, "Skipping listed file");
                }
                Err(e) => return Err(e),
            }
        }

        tracing::debug!(page, count = files.len(), "Listed files");
        Ok(files)
    }

    /// Drop the local keys of a file; returns whether any were stored
    pub fn forget_file(&self, file_id: u64) -> Result<bool> {
        self.vault.remove_file(file_id)
    }

    // ========================================================================
    // INTERNALS
    // ========================================================================

    fn session(&self) -> Result<(String, Identity)> {
        Ok((self.vault.username()?, self.vault.identity()?))
    }

    /// Resolve keys for one listed entry and decrypt its metadata
    ///
    /// An imported envelope is stored with an empty filename; `download`
    /// fills it in from verified metadata.
    fn open_entry(&self, entry: FileListEntry, identity: &Identity) -> Result<Option<ListedFile>> {
        let file_id = entry.file_id;

        let (envelope, imported) = match (self.vault.file(file_id), entry.shared_access.clone()) {
            (Ok(envelope), _) => (envelope, false),
            (Err(Error::FileNotFound(_)), Some(access)) if !entry.is_owner => {
                let grant = access.into_grant(self.vault.username()?);
                (sharing::unwrap_grant(&grant, file_id, "", identity)?, true)
            }
            (Err(Error::FileNotFound(_)), _) => {
                tracing::warn!(file_id, "No local keys for listed file");
                return Ok(None);
            }
            (Err(e), _) => return Err(e),
        };

        let ciphertext = entry.metadata.to_bytes()?;
        let plain = decrypt(&ciphertext, &envelope.mek, &envelope.metadata_nonce)?;
        let metadata: FileMetadata = serde_json::from_slice(&plain).map_err(|_| {
            Error::DecryptionFailed(format!("Metadata of file {} did not decrypt to JSON", file_id))
        })?;

        let filename = if metadata.filename.is_empty() {
            envelope.filename.clone()
        } else {
            metadata.filename
        };

        if imported {
            self.vault.upsert_file(envelope)?;
            tracing::info!(file_id, "Imported shared file keys");
        }

        Ok(Some(ListedFile {
            file_id,
            filename,
            filesize: metadata.filesize,
            is_owner: entry.is_owner,
            shared_by: entry.shared_access.and_then(|a| a.shared_by),
            uploaded_at: entry.upload_timestamp.as_deref().and_then(parse_timestamp),
        }))
    }

    /// Build, optionally sign, and send a request
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: String,
        signer: Option<(&str, &Identity)>,
    ) -> Result<HttpResponse> {
        let mut headers = vec![
            ("Host".to_string(), self.config.host_header()),
            ("Content-Type".to_string(), "application/json".to_string()),
        ];
        if let Some((username, identity)) = signer {
            let auth = sign_request(identity, username, method.as_str(), path, &body)?;
            headers.extend(auth.to_pairs());
        }

        let request = HttpRequest {
            method,
            path: path.to_string(),
            headers,
            body,
            connect_timeout: self.config.connect_timeout,
            read_timeout: self.config.read_timeout,
        };

        let response = self.transport.request(request).await?;
        tracing::debug!(%method, path, status = response.status, "Server responded");
        Ok(response)
    }
}

impl<T: Transport> std::fmt::Debug for FileClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileClient")
            .field("server", &self.config.host_header())
            .field("vault", &self.vault)
            .finish_non_exhaustive()
    }
}

fn to_body<B: Serialize>(body: &B) -> Result<String> {
    Ok(serde_json::to_string(body)?)
}

fn expect_status(response: &HttpResponse, expected: u16, path: &str) -> Result<()> {
    if response.status == expected {
        return Ok(());
    }
    tracing::warn!(path, status = response.status, expected, "Unexpected status");
    Err(Error::UnexpectedStatus {
        status: response.status,
        body: response.body.clone(),
    })
}

fn parse_json<R: DeserializeOwned>(response: &HttpResponse) -> Result<R> {
    serde_json::from_str(&response.body)
        .map_err(|e| Error::InvalidResponse(format!("Malformed response body: {}", e)))
}
