//! Storage provider abstraction layer.
//!
//! This module defines the [`StorageProvider`] trait which abstracts the
//! cloud storage operations the relay performs (token exchange, folder
//! verification, object upload). The production implementation talks to
//! Google Drive; tests substitute a recording stub.

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use std::sync::Arc;

pub mod google_drive;

pub use google_drive::GoogleDrive;

/// Create the production storage provider.
///
/// This is the single point where configuration becomes a provider instance;
/// supporting another provider means adding a variant here.
pub fn create_provider() -> anyhow::Result<Arc<dyn StorageProvider>> {
    Ok(Arc::new(GoogleDrive::new()?))
}

/// Result type for storage provider operations
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur while talking to the storage provider
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error("credential is not usable: {0}")]
    InvalidCredential(String),

    #[error("folder {folder_id} is not accessible")]
    FolderAccess { folder_id: String },

    #[error("storage provider API error: {0}")]
    ProviderApi(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Secret material used to authenticate to the storage provider.
///
/// Two shapes exist in deployments: a service-account key pair, or an OAuth
/// client with a long-lived refresh token. Which one is active is decided by
/// the configuration keys that are present.
#[derive(Debug, Clone)]
pub enum StorageCredential {
    ServiceAccount {
        client_email: String,
        /// PEM-encoded RSA private key
        private_key: String,
    },
    OauthRefresh {
        client_id: String,
        client_secret: String,
        refresh_token: String,
    },
}

impl StorageCredential {
    /// The identity to name in access-remediation hints.
    pub fn identity(&self) -> &str {
        match self {
            StorageCredential::ServiceAccount { client_email, .. } => client_email,
            StorageCredential::OauthRefresh { client_id, .. } => client_id,
        }
    }
}

/// Short-lived bearer token obtained from the provider's token endpoint.
#[derive(Debug, Clone)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

/// Metadata of the object created by a successful upload.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub web_view_link: Option<String>,
}

/// The storage operations the upload relay performs, in call order:
/// authenticate, optionally verify the target folder, then upload.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Exchange the configured credential for a bearer token.
    async fn authenticate(&self, credential: &StorageCredential) -> Result<AccessToken>;

    /// Verify read access to the target folder before uploading.
    async fn verify_folder(&self, token: &AccessToken, folder_id: &str) -> Result<()>;

    /// Create a new object from the uploaded bytes.
    async fn upload(&self, token: &AccessToken, file_name: &str, content: Bytes, folder_id: Option<&str>) -> Result<StoredFile>;
}
