//! Integration tests for the Corretora functions.
//!
//! Every test builds the real router over a [`MemoryStore`] and fake email
//! and completion providers, then drives it with `tower::ServiceExt::oneshot`.
//! Nothing here needs network access or Google credentials.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p corretora-integration-tests
//! ```

#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use corretora_core::{DocPath, Uid};
use corretora_functions::config::FunctionsConfig;
use corretora_functions::services::{
    ChatMessage, CompletionError, CompletionProvider, EmailError, EmailReply, EmailSender,
};
use corretora_functions::state::{AppState, Backends};
use corretora_functions::stores::{Document, MemoryStore};
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;

/// Shared secret the test app expects on `POST /events`.
pub const EVENTS_SECRET: &str = "Xq7!vR2#mN9$kL4&pT6*wZ1^bH8@cJ3";

/// Configuration used by [`TestApp::new`]: events enabled, nothing external.
#[must_use]
pub fn test_config() -> FunctionsConfig {
    FunctionsConfig {
        events_secret: Some(SecretString::from(EVENTS_SECRET)),
        ..FunctionsConfig::default()
    }
}

/// Build a `Uid`, panicking on invalid input.
#[must_use]
pub fn uid(s: &str) -> Uid {
    Uid::parse(s).unwrap()
}

/// Build a `DocPath`, panicking on invalid input.
#[must_use]
pub fn path(s: &str) -> DocPath {
    DocPath::parse(s).unwrap()
}

/// Turn a JSON object literal into document fields.
#[must_use]
pub fn fields(value: Value) -> Document {
    value.as_object().cloned().unwrap()
}

// =============================================================================
// Fakes
// =============================================================================

/// Email sender that records payloads and answers with a fixed status.
pub struct FakeEmail {
    status: u16,
    body: String,
    sent: Mutex<Vec<Value>>,
}

impl Default for FakeEmail {
    fn default() -> Self {
        Self::replying(200, "OK")
    }
}

impl FakeEmail {
    #[must_use]
    pub fn replying(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Payloads sent so far.
    #[must_use]
    pub fn sent(&self) -> Vec<Value> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailSender for FakeEmail {
    async fn send(&self, payload: &Value) -> Result<EmailReply, EmailError> {
        self.sent.lock().unwrap().push(payload.clone());
        Ok(EmailReply {
            status: self.status,
            body: self.body.clone(),
        })
    }
}

/// Completion provider that replays canned responses, then fails.
#[derive(Default)]
pub struct FakeCompletion {
    replies: Mutex<VecDeque<String>>,
    calls: AtomicUsize,
}

impl FakeCompletion {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionProvider for FakeCompletion {
    async fn complete(&self, _messages: &[ChatMessage]) -> Result<String, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(CompletionError::Empty)
    }
}

// =============================================================================
// Test application
// =============================================================================

/// Router plus handles on everything behind it.
pub struct TestApp {
    pub router: Router,
    pub store: MemoryStore,
    pub email: Arc<FakeEmail>,
}

/// Builder for [`TestApp`].
pub struct TestAppBuilder {
    config: FunctionsConfig,
    email: Arc<FakeEmail>,
    email_sender: Option<Arc<dyn EmailSender>>,
    completion: Option<Arc<dyn CompletionProvider>>,
}

impl TestAppBuilder {
    /// Adjust the configuration.
    #[must_use]
    pub fn config(mut self, f: impl FnOnce(&mut FunctionsConfig)) -> Self {
        f(&mut self.config);
        self
    }

    /// Replace the recording email fake.
    #[must_use]
    pub fn email(mut self, email: FakeEmail) -> Self {
        self.email = Arc::new(email);
        self
    }

    /// Use a different email sender entirely, e.g. a real client.
    #[must_use]
    pub fn email_sender(mut self, sender: Arc<dyn EmailSender>) -> Self {
        self.email_sender = Some(sender);
        self
    }

    #[must_use]
    pub fn completion(mut self, completion: Arc<dyn CompletionProvider>) -> Self {
        self.completion = Some(completion);
        self
    }

    #[must_use]
    pub fn build(self) -> TestApp {
        let store = MemoryStore::new();
        let email = self.email;
        let backends = Backends {
            documents: Arc::new(store.clone()),
            credentials: Arc::new(store.clone()),
            tokens: Arc::new(store.clone()),
            email: self
                .email_sender
                .unwrap_or_else(|| email.clone() as Arc<dyn EmailSender>),
            completion: self.completion,
        };
        let state = AppState::new(self.config, backends).expect("Failed to build state");

        TestApp {
            router: corretora_functions::app(state),
            store,
            email,
        }
    }
}

impl TestApp {
    /// A test app with [`test_config`] and no completion provider.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    #[must_use]
    pub fn builder() -> TestAppBuilder {
        TestAppBuilder {
            config: test_config(),
            email: Arc::new(FakeEmail::default()),
            email_sender: None,
            completion: None,
        }
    }

    /// Make an HTTP request to the test app.
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut req = Request::builder().method(method).uri(path);

        if body.is_some() {
            req = req.header("Content-Type", "application/json");
        }
        for (name, value) in headers {
            req = req.header(*name, *value);
        }

        let body = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();
        let req = req.body(Body::from(body)).expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");

        let text = String::from_utf8_lossy(&bytes).into_owned();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            body,
            text,
        }
    }

    /// Deliver a document event with the correct secret.
    pub async fn event(&self, event: Value) -> TestResponse {
        self.request(
            "POST",
            "/events",
            Some(event),
            &[("x-events-secret", EVENTS_SECRET)],
        )
        .await
    }

    /// Call `/sync-admin-claims` with a bearer token.
    pub async fn sync_claims(&self, token: &str) -> TestResponse {
        let header = format!("Bearer {token}");
        self.request("POST", "/sync-admin-claims", None, &[("Authorization", &header)])
            .await
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// Response from a test request.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Parsed JSON body, or `Null` if the body is not JSON.
    pub body: Value,
    /// Raw body text.
    pub text: String,
}
