//! One-off admin claim synchronization.

use corretora_core::{Uid, UidError};
use corretora_functions::services::{ClaimSynchronizer, SyncError};
use thiserror::Error;

use super::{ConnectError, connect};

/// Errors that can occur while syncing claims.
#[derive(Debug, Error)]
pub enum ClaimsError {
    #[error("Invalid uid: {0}")]
    InvalidUid(#[from] UidError),

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Sync(#[from] SyncError),
}

/// Recompute a user's admin claim from `admins/{uid}` and `users/{uid}`.
pub async fn sync(uid: &str) -> Result<(), ClaimsError> {
    let uid = Uid::parse(uid)?;
    let (_config, backends) = connect()?;
    let claims = ClaimSynchronizer::new(backends.documents, backends.credentials);

    let is_admin = claims.sync_user(&uid).await?;

    tracing::info!(%uid, is_admin, "Admin claim synchronized");
    Ok(())
}
