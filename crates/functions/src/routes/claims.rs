//! On-demand admin claim sync for the signed-in caller.

use std::sync::LazyLock;

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, header::AUTHORIZATION},
};
use regex::Regex;
use serde::Serialize;
use tracing::instrument;

use crate::error::{AppError, Result, set_sentry_user};
use crate::state::AppState;

/// `Bearer <token>`, with the token captured.
static BEARER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Bearer\s+(\S+)$").expect("Invalid regex"));

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    pub ok: bool,
    pub uid: String,
    pub is_admin: bool,
}

/// Extract the token from an `Authorization: Bearer <token>` header.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    BEARER_RE
        .captures(value.trim())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Recompute the caller's admin claim from the authorization and profile
/// documents.
///
/// GET|POST /sync-admin-claims
///
/// A missing or malformed header is a 401 and touches no store. A token that
/// fails verification is a 500.
#[instrument(skip(state, headers))]
pub async fn sync_admin_claims(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SyncResponse>> {
    let token = bearer_token(&headers).ok_or_else(|| {
        AppError::Unauthorized(
            "Missing or malformed Authorization header, expected 'Bearer <ID token>'".to_string(),
        )
    })?;

    let uid = state.tokens().verify_id_token(token).await.map_err(|e| {
        tracing::warn!(error = %e, "ID token verification failed");
        AppError::TokenVerification(e)
    })?;
    set_sentry_user(&uid);

    let is_admin = state.claims().sync_user(&uid).await?;

    Ok(Json(SyncResponse {
        ok: true,
        uid: uid.to_string(),
        is_admin,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(&headers("Bearer abc.def.ghi")), Some("abc.def.ghi"));
        assert_eq!(bearer_token(&headers("Bearer    tok")), Some("tok"));
        assert_eq!(bearer_token(&headers("bearer tok")), None);
        assert_eq!(bearer_token(&headers("Bearer")), None);
        assert_eq!(bearer_token(&headers("Bearer a b")), None);
        assert_eq!(bearer_token(&headers("Basic dXNlcjpwYXNz")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
