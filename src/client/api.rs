//! Endpoint paths and request/response bodies.

use serde::{Deserialize, Serialize};

use crate::envelope::MetadataField;
use crate::identity::KeyBundle;
use crate::sharing::SharedAccess;

/// Key directory registration (unsigned)
pub const PATH_REGISTER: &str = "/api/keyhandler/register";
/// Key directory lookup
pub const PATH_GET_BUNDLE: &str = "/api/keyhandler/getbundle";
/// File upload
pub const PATH_UPLOAD: &str = "/api/fs/upload";
/// File download
pub const PATH_DOWNLOAD: &str = "/api/fs/download";
/// Share a file's keys
pub const PATH_SHARE: &str = "/api/fs/share";
/// Paged file listing
pub const PATH_LIST: &str = "/api/fs/list";

/// Body of a registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterBody {
    /// Requested account name
    pub username: String,
    /// Public key bundle to publish
    pub key_bundle: KeyBundle,
}

/// Body of a key directory lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleRequest {
    /// Whose bundle to fetch
    pub username: String,
}

/// `200` response of a key directory lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleResponse {
    /// The published bundle
    pub key_bundle: KeyBundle,
}

/// Body of a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListRequest {
    /// 1-based page number
    pub page: u32,
}

/// `200` response of a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListResponse {
    /// One entry per visible file
    #[serde(rename = "fileData")]
    pub file_data: Vec<FileListEntry>,
}

/// A file as the server lists it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileListEntry {
    /// Server file id
    pub file_id: u64,
    /// Whether the requester uploaded it
    #[serde(default)]
    pub is_owner: bool,
    /// Metadata ciphertext
    pub metadata: MetadataField,
    /// Wrapped keys, present on files shared with the requester
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_access: Option<SharedAccess>,
    /// Server-side upload time, `YYYY-MM-DDTHH:MM:SSZ`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_timestamp: Option<String>,
}

/// Which listed files to return
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListFilter {
    /// Everything visible
    #[default]
    All,
    /// Only files the user uploaded
    Owned,
    /// Only files shared with the user
    Shared,
}

impl ListFilter {
    /// Whether an entry with this ownership passes
    pub fn admits(&self, is_owner: bool) -> bool {
        match self {
            ListFilter::All => true,
            ListFilter::Owned => is_owner,
            ListFilter::Shared => !is_owner,
        }
    }
}

/// A listed file with its metadata decrypted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedFile {
    /// Server file id
    pub file_id: u64,
    /// Filename from the metadata, or the locally stored one
    pub filename: String,
    /// Plaintext size from the metadata
    pub filesize: u64,
    /// Whether the user uploaded it
    pub is_owner: bool,
    /// Who shared it, when shared and reported
    pub shared_by: Option<String>,
    /// Upload time as a Unix timestamp, when reported and parseable
    pub uploaded_at: Option<i64>,
}
