//! Client configuration.
//!
//! Server address, timeouts, vault location and KDF profile, loaded from
//! environment variables with sensible defaults.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::crypto::KdfParams;

/// Default server host
pub const DEFAULT_SERVER_HOST: &str = "localhost";

/// Default server port
pub const DEFAULT_SERVER_PORT: u16 = 3000;

/// Default TCP connect timeout
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default per-request read timeout
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Vault file name inside the store directory
pub const STORE_FILE_NAME: &str = "client_store.json";

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Server host name, also sent as the `Host` header.
    pub server_host: String,
    /// Server port.
    pub server_port: u16,
    /// Connect timeout attached to every request.
    pub connect_timeout: Duration,
    /// Read timeout attached to every request.
    pub read_timeout: Duration,
    /// Location of the vault JSON file.
    pub store_path: PathBuf,
    /// Argon2id cost for new registrations and password changes.
    pub kdf: KdfParams,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparseable variables fall back to the defaults; an unknown
    /// KDF profile is logged and ignored.
    pub fn from_env() -> Self {
        let defaults = Self::defaults();

        let kdf = match env::var("SSSHARE_KDF_PROFILE") {
            Ok(name) => KdfParams::from_profile(&name).unwrap_or_else(|| {
                tracing::warn!(profile = %name, "Unknown KDF profile, using moderate");
                defaults.kdf
            }),
            Err(_) => defaults.kdf,
        };

        Self {
            server_host: env::var("SSSHARE_SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: env::var("SSSHARE_SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),
            connect_timeout: env_millis("SSSHARE_CONNECT_TIMEOUT_MS")
                .unwrap_or(defaults.connect_timeout),
            read_timeout: env_millis("SSSHARE_READ_TIMEOUT_MS").unwrap_or(defaults.read_timeout),
            store_path: env::var("SSSHARE_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.store_path),
            kdf,
        }
    }

    /// Built-in defaults, ignoring the environment
    pub fn defaults() -> Self {
        Self {
            server_host: DEFAULT_SERVER_HOST.to_string(),
            server_port: DEFAULT_SERVER_PORT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            store_path: default_store_path(),
            kdf: KdfParams::MODERATE,
        }
    }

    /// `host:port`, the value of the `Host` header.
    pub fn host_header(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// `~/.ssshare/client_store.json`, or the working directory if there is no home
pub fn default_store_path() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".ssshare"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(STORE_FILE_NAME)
}

fn env_millis(name: &str) -> Option<Duration> {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_millis)
}
