//! Port interfaces for durable credential storage

use async_trait::async_trait;
use vitalsync_domain::{Credential, Result};

/// Durable home of the single access/refresh token pair.
///
/// The token manager owns the in-memory copy; implementations of this trait
/// own the persisted one.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Load the persisted credential.
    ///
    /// Returns `Ok(None)` when nothing has been stored yet.
    async fn load(&self) -> Result<Option<Credential>>;

    /// Replace the persisted credential wholesale.
    async fn save(&self, credential: &Credential) -> Result<()>;
}
