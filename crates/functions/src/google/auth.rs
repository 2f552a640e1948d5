//! OAuth2 access tokens for Google APIs.
//!
//! Two sources are supported:
//! - a service-account key, exchanged through the JWT bearer grant
//! - the metadata server, when running on Google infrastructure
//!
//! Tokens are cached and refreshed a few minutes before Google's one-hour expiry.

use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::instrument;

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const SCOPES: &str = "https://www.googleapis.com/auth/cloud-platform \
                      https://www.googleapis.com/auth/datastore \
                      https://www.googleapis.com/auth/identitytoolkit";

/// Lifetime of the signed assertion; Google caps it at one hour.
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// How long a fetched token is reused.
const TOKEN_CACHE_TTL: Duration = Duration::from_secs(50 * 60);

/// Errors that can occur while obtaining an access token.
#[derive(Debug, Error)]
pub enum GoogleAuthError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The token endpoint rejected the request.
    #[error("token endpoint error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The service-account key could not sign the assertion.
    #[error("failed to sign assertion: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    /// A concurrent fetch of the same token failed.
    #[error(transparent)]
    Shared(#[from] Arc<GoogleAuthError>),
}

/// The subset of a service-account key file this backend needs.
///
/// Implements `Debug` manually to redact the private key.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(default)]
    pub project_id: Option<String>,
    pub client_email: String,
    #[serde(deserialize_with = "secret_string")]
    pub private_key: SecretString,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("private_key", &"[REDACTED]")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

enum TokenSource {
    ServiceAccount(ServiceAccountKey),
    Metadata,
}

/// Access-token provider for Google APIs.
///
/// Cheaply cloneable; clones share the token cache.
#[derive(Clone)]
pub struct GoogleAuth {
    inner: Arc<GoogleAuthInner>,
}

struct GoogleAuthInner {
    client: reqwest::Client,
    source: TokenSource,
    cache: Cache<(), SecretString>,
}

impl GoogleAuth {
    /// Create a token provider.
    ///
    /// Uses the service-account key when given, the metadata server otherwise.
    #[must_use]
    pub fn new(client: reqwest::Client, key: Option<ServiceAccountKey>) -> Self {
        let source = key.map_or(TokenSource::Metadata, TokenSource::ServiceAccount);
        let cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(TOKEN_CACHE_TTL)
            .build();

        Self {
            inner: Arc::new(GoogleAuthInner {
                client,
                source,
                cache,
            }),
        }
    }

    /// Get a valid access token, fetching a new one if the cached one expired.
    ///
    /// # Errors
    ///
    /// Returns an error if the token endpoint cannot be reached or rejects
    /// the request.
    pub async fn access_token(&self) -> Result<SecretString, GoogleAuthError> {
        let token = self
            .inner
            .cache
            .try_get_with((), self.fetch_token())
            .await?;
        Ok(token)
    }

    #[instrument(skip(self))]
    async fn fetch_token(&self) -> Result<SecretString, GoogleAuthError> {
        let response = match &self.inner.source {
            TokenSource::ServiceAccount(key) => {
                let assertion = sign_assertion(key, chrono::Utc::now().timestamp())?;
                self.inner
                    .client
                    .post(&key.token_uri)
                    .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
                    .send()
                    .await?
            }
            TokenSource::Metadata => {
                self.inner
                    .client
                    .get(METADATA_TOKEN_URL)
                    .header("Metadata-Flavor", "Google")
                    .send()
                    .await?
            }
        };

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GoogleAuthError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let token: TokenResponse = response.json().await?;
        tracing::debug!("Fetched Google access token");
        Ok(SecretString::from(token.access_token))
    }
}

/// Sign the JWT bearer assertion for a service account.
fn sign_assertion(key: &ServiceAccountKey, now: i64) -> Result<String, GoogleAuthError> {
    let claims = AssertionClaims {
        iss: &key.client_email,
        scope: SCOPES,
        aud: &key.token_uri,
        iat: now,
        exp: now + ASSERTION_LIFETIME_SECS,
    };
    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.expose_secret().as_bytes())?;
    Ok(jsonwebtoken::encode(
        &Header::new(Algorithm::RS256),
        &claims,
        &encoding_key,
    )?)
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

fn secret_string<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}
