//! Firestore REST v1 adapter.

mod value;

use async_trait::async_trait;
use corretora_core::DocPath;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::instrument;

use crate::google::GoogleAuth;

use super::{Document, DocumentStore, StoreError, StoredDocument};

use value::{decode_fields, encode_fields, field_path};

const FIRESTORE_API_URL: &str = "https://firestore.googleapis.com/v1";
const LIST_PAGE_SIZE: &str = "300";

/// A document resource as returned by the REST API.
#[derive(Debug, Deserialize)]
struct FirestoreDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    documents: Vec<FirestoreDocument>,
    next_page_token: Option<String>,
}

/// Document store backed by Firestore's REST API.
#[derive(Clone)]
pub struct FirestoreStore {
    client: reqwest::Client,
    auth: GoogleAuth,
    /// `.../projects/{project}/databases/(default)/documents`
    documents_url: String,
    /// `projects/{project}/databases/(default)/documents`, the prefix of resource names
    name_prefix: String,
}

impl FirestoreStore {
    /// Create a store for the project's default database.
    #[must_use]
    pub fn new(client: reqwest::Client, auth: GoogleAuth, project_id: &str) -> Self {
        Self::with_base_url(client, auth, project_id, FIRESTORE_API_URL)
    }

    /// Create a store against a different API root, e.g. the local emulator.
    #[must_use]
    pub fn with_base_url(
        client: reqwest::Client,
        auth: GoogleAuth,
        project_id: &str,
        base_url: &str,
    ) -> Self {
        let name_prefix = format!("projects/{project_id}/databases/(default)/documents");
        Self {
            client,
            auth,
            documents_url: format!("{}/{name_prefix}", base_url.trim_end_matches('/')),
            name_prefix,
        }
    }

    fn url(&self, relative: &str) -> String {
        format!("{}/{relative}", self.documents_url)
    }

    async fn bearer(&self) -> Result<String, StoreError> {
        let token = self.auth.access_token().await?;
        Ok(format!("Bearer {}", token.expose_secret()))
    }

    /// Turn a resource name back into a document path.
    fn path_from_name(&self, name: &str) -> Result<DocPath, StoreError> {
        let relative = name
            .strip_prefix(&self.name_prefix)
            .ok_or_else(|| StoreError::Decode(format!("unexpected document name: {name}")))?;
        DocPath::parse(relative).map_err(|e| StoreError::Decode(e.to_string()))
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    #[instrument(skip(self), fields(path = %path))]
    async fn get(&self, path: &DocPath) -> Result<Option<Document>, StoreError> {
        let response = self
            .client
            .get(self.url(path.as_str()))
            .header(reqwest::header::AUTHORIZATION, self.bearer().await?)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StoreError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let document: FirestoreDocument = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        decode_fields(&document.fields).map(Some)
    }

    #[instrument(skip(self, fields), fields(path = %path))]
    async fn merge(&self, path: &DocPath, fields: Document) -> Result<(), StoreError> {
        let mask: Vec<(&str, String)> = fields
            .keys()
            .map(|key| ("updateMask.fieldPaths", field_path(key)))
            .collect();
        let body = json!({ "fields": encode_fields(&fields) });

        let response = self
            .client
            .patch(self.url(path.as_str()))
            .header(reqwest::header::AUTHORIZATION, self.bearer().await?)
            .query(&mask)
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

        Ok(())
    }

    #[instrument(skip(self))]
    async fn list(&self, collection: &str) -> Result<Vec<StoredDocument>, StoreError> {
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![("pageSize", LIST_PAGE_SIZE.to_string())];
            if let Some(token) = page_token.take() {
                query.push(("pageToken", token));
            }

            let response = self
                .client
                .get(self.url(collection.trim_matches('/')))
                .header(reqwest::header::AUTHORIZATION, self.bearer().await?)
                .query(&query)
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

            let page: ListResponse = response
                .json()
                .await
                .map_err(|e| StoreError::Decode(e.to_string()))?;

            for document in page.documents {
                documents.push(StoredDocument {
                    path: self.path_from_name(&document.name)?,
                    fields: decode_fields(&document.fields)?,
                });
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        tracing::debug!(collection, count = documents.len(), "Listed documents");
        Ok(documents)
    }
}
