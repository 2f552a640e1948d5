//! Identity Toolkit REST v1 adapter: custom claims and ID-token verification.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use corretora_core::{CustomClaims, Uid};
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use moka::future::Cache;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::google::GoogleAuth;

use super::{CredentialStore, StoreError, TokenVerifier};

const IDENTITY_TOOLKIT_API_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const SECURE_TOKEN_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";
const SECURE_TOKEN_ISSUER: &str = "https://securetoken.google.com";

/// Serialized custom claims may not exceed this many bytes.
const MAX_CLAIMS_BYTES: usize = 1000;
/// Google rotates signing keys daily; an hour keeps us well inside that.
const JWKS_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<UserRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserRecord {
    custom_attributes: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    sub: String,
}

/// Credential store and token verifier backed by the Identity Toolkit API.
#[derive(Clone)]
pub struct IdentityToolkit {
    inner: Arc<IdentityToolkitInner>,
}

struct IdentityToolkitInner {
    client: reqwest::Client,
    auth: GoogleAuth,
    project_id: String,
    base_url: String,
    jwks_url: String,
    jwks: Cache<(), Arc<JwkSet>>,
}

impl IdentityToolkit {
    /// Create a client for the given project.
    #[must_use]
    pub fn new(client: reqwest::Client, auth: GoogleAuth, project_id: &str) -> Self {
        let jwks = Cache::builder()
            .max_capacity(1)
            .time_to_live(JWKS_CACHE_TTL)
            .build();

        Self {
            inner: Arc::new(IdentityToolkitInner {
                client,
                auth,
                project_id: project_id.to_owned(),
                base_url: IDENTITY_TOOLKIT_API_URL.to_owned(),
                jwks_url: SECURE_TOKEN_JWKS_URL.to_owned(),
                jwks,
            }),
        }
    }

    fn accounts_url(&self, method: &str) -> String {
        format!(
            "{}/projects/{}/accounts:{method}",
            self.inner.base_url, self.inner.project_id
        )
    }

    async fn post(&self, method: &str, body: serde_json::Value) -> Result<reqwest::Response, StoreError> {
        let token = self.inner.auth.access_token().await?;
        let response = self
            .inner
            .client
            .post(self.accounts_url(method))
            .bearer_auth(token.expose_secret())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StoreError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    async fn signing_keys(&self) -> Result<Arc<JwkSet>, StoreError> {
        self.inner
            .jwks
            .try_get_with((), async {
                let response = self.inner.client.get(&self.inner.jwks_url).send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(StoreError::Api {
                        status: status.as_u16(),
                        message: "failed to fetch token signing keys".to_string(),
                    });
                }
                let keys: JwkSet = response
                    .json()
                    .await
                    .map_err(|e| StoreError::Decode(e.to_string()))?;
                Ok::<_, StoreError>(Arc::new(keys))
            })
            .await
            .map_err(|e: Arc<StoreError>| StoreError::Unavailable(e.to_string()))
    }
}

#[async_trait]
impl CredentialStore for IdentityToolkit {
    #[instrument(skip(self), fields(uid = %uid))]
    async fn custom_claims(&self, uid: &Uid) -> Result<CustomClaims, StoreError> {
        let response = self
            .post("lookup", json!({ "localId": [uid.as_str()] }))
            .await?;
        let lookup: LookupResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;

        let user = lookup
            .users
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::UserNotFound(uid.to_string()))?;

        match user.custom_attributes.as_deref().map(str::trim) {
            None | Some("") => Ok(CustomClaims::new()),
            Some(raw) => serde_json::from_str(raw)
                .map_err(|e| StoreError::Decode(format!("customAttributes: {e}"))),
        }
    }

    #[instrument(skip(self, claims), fields(uid = %uid))]
    async fn set_custom_claims(&self, uid: &Uid, claims: &CustomClaims) -> Result<(), StoreError> {
        let serialized =
            serde_json::to_string(claims).map_err(|e| StoreError::InvalidClaims(e.to_string()))?;
        if serialized.len() > MAX_CLAIMS_BYTES {
            return Err(StoreError::InvalidClaims(format!(
                "claims must serialize to at most {MAX_CLAIMS_BYTES} bytes (got {})",
                serialized.len()
            )));
        }

        self.post(
            "update",
            json!({ "localId": uid.as_str(), "customAttributes": serialized }),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl TokenVerifier for IdentityToolkit {
    #[instrument(skip(self, token))]
    async fn verify_id_token(&self, token: &str) -> Result<Uid, StoreError> {
        let header =
            jsonwebtoken::decode_header(token).map_err(|e| StoreError::InvalidToken(e.to_string()))?;
        let kid = header
            .kid
            .ok_or_else(|| StoreError::InvalidToken("token has no key id".to_string()))?;

        let keys = self.signing_keys().await?;
        let jwk = keys
            .find(&kid)
            .ok_or_else(|| StoreError::InvalidToken(format!("unknown key id: {kid}")))?;
        let key = DecodingKey::from_jwk(jwk).map_err(|e| StoreError::InvalidToken(e.to_string()))?;

        let project_id = &self.inner.project_id;
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[project_id.as_str()]);
        validation.set_issuer(&[format!("{SECURE_TOKEN_ISSUER}/{project_id}")]);

        let data = jsonwebtoken::decode::<IdTokenClaims>(token, &key, &validation)
            .map_err(|e| StoreError::InvalidToken(e.to_string()))?;

        Uid::parse(&data.claims.sub).map_err(|e| StoreError::InvalidToken(e.to_string()))
    }
}
