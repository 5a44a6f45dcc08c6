//! Bearer credential sources
//!
//! The token exchange itself happens elsewhere; the engine only reads a
//! ready-to-use bearer token, once per session start.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Credential lookup errors
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("failed to read token file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("token file {0} is empty")]
    Empty(PathBuf),
    #[error("no bearer token configured")]
    Missing,
}

/// Supplies the bearer token used for the feed handshake
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn bearer_token(&self) -> Result<String, CredentialError>;
}

/// A fixed token, e.g. from the environment
pub struct StaticCredential {
    token: String,
}

impl StaticCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredential {
    async fn bearer_token(&self) -> Result<String, CredentialError> {
        let token = self.token.trim();
        if token.is_empty() {
            return Err(CredentialError::Missing);
        }
        Ok(token.to_string())
    }
}

/// A token file kept fresh by an external auth process
///
/// Re-read on every call so a refreshed token is used on the next reconnect.
pub struct FileCredential {
    path: PathBuf,
}

impl FileCredential {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CredentialProvider for FileCredential {
    async fn bearer_token(&self) -> Result<String, CredentialError> {
        let content =
            tokio::fs::read_to_string(&self.path)
                .await
                .map_err(|source| CredentialError::Read {
                    path: self.path.clone(),
                    source,
                })?;
        let token = content.trim();
        if token.is_empty() {
            return Err(CredentialError::Empty(self.path.clone()));
        }
        Ok(token.to_string())
    }
}
