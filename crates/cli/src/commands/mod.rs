//! Subcommand implementations.
//!
//! Each command loads the functions configuration, connects to the Google
//! project with the service account, and calls the same services the HTTP
//! functions use.

pub mod claims;
pub mod news;
pub mod sitemap;
pub mod tags;

use corretora_functions::config::{ConfigError, FunctionsConfig};
use corretora_functions::state::{Backends, StateError};
use thiserror::Error;

/// Errors that can occur before a command starts its work.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Scripts never fall back to ambient credentials.
    #[error("A service account is required: set FIREBASE_SERVICE_ACCOUNT")]
    MissingServiceAccount,

    #[error(transparent)]
    State(#[from] StateError),
}

/// Load configuration and connect to the project's stores.
pub fn connect() -> Result<(FunctionsConfig, Backends), ConnectError> {
    dotenvy::dotenv().ok();

    let config = FunctionsConfig::from_env()?;
    if config.google.service_account.is_none() {
        return Err(ConnectError::MissingServiceAccount);
    }

    let backends = Backends::google(&config)?;
    tracing::info!(
        project = config.google.project_id.as_deref().unwrap_or_default(),
        "Connected"
    );
    Ok((config, backends))
}
