//! JSON file credential store.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;
use vitalsync_core::CredentialStore;
use vitalsync_domain::{Credential, Result, VitalSyncError};

use crate::errors::InfraError;

/// Stores the credential pair as `{"access_token": .., "refresh_token": ..}`.
///
/// Writes go to a sibling temporary file that is then renamed over the
/// target, so a crash mid-write leaves the previous pair intact.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> Result<Option<Credential>> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "credential file does not exist");
                return Ok(None);
            }
            Err(err) => return Err(InfraError::from(err).into()),
        };

        let credential: Credential = serde_json::from_slice(&raw).map_err(|err| {
            VitalSyncError::Storage(format!(
                "credential file {} is not valid: {err}",
                self.path.display()
            ))
        })?;
        Ok(Some(credential))
    }

    async fn save(&self, credential: &Credential) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(InfraError::from)?;
        }

        let json = serde_json::to_vec(credential).map_err(InfraError::from)?;
        let temp = self.temp_path();
        tokio::fs::write(&temp, &json).await.map_err(InfraError::from)?;
        tokio::fs::rename(&temp, &self.path).await.map_err(InfraError::from)?;

        debug!(path = %self.path.display(), "credential persisted");
        Ok(())
    }
}
