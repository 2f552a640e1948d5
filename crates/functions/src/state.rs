//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{ConfigError, FunctionsConfig};
use crate::google::GoogleAuth;
use crate::services::{
    ClaimSynchronizer, CompletionProvider, EmailJsClient, EmailSender, FirstMessageNotifier,
    NewsService, OpenAiClient,
};
use crate::stores::{CredentialStore, DocumentStore, FirestoreStore, IdentityToolkit, MemoryStore, TokenVerifier};
use crate::triggers::{TriggerError, TriggerRegistry, TriggerTargets};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("corretora-functions/", env!("CARGO_PKG_VERSION"));

/// Error assembling the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("trigger registry error: {0}")]
    Triggers(#[from] TriggerError),
}

/// The external collaborators every handler talks to.
#[derive(Clone)]
pub struct Backends {
    pub documents: Arc<dyn DocumentStore>,
    pub credentials: Arc<dyn CredentialStore>,
    pub tokens: Arc<dyn TokenVerifier>,
    pub email: Arc<dyn EmailSender>,
    pub completion: Option<Arc<dyn CompletionProvider>>,
}

impl Backends {
    /// Google-hosted stores plus the configured email and completion APIs.
    ///
    /// # Errors
    ///
    /// Returns `StateError` if no project id is configured or the HTTP client
    /// cannot be built.
    pub fn google(config: &FunctionsConfig) -> Result<Self, StateError> {
        let client = http_client()?;
        let project_id = config.google.require_project_id()?;
        let auth = GoogleAuth::new(client.clone(), config.google.service_account.clone());

        let documents = FirestoreStore::new(client.clone(), auth.clone(), project_id);
        let identity = IdentityToolkit::new(client.clone(), auth, project_id);
        let email = EmailJsClient::new(client.clone(), &config.email);
        let completion = config.completion.clone().map(|completion| {
            Arc::new(OpenAiClient::new(client.clone(), completion)) as Arc<dyn CompletionProvider>
        });

        Ok(Self {
            documents: Arc::new(documents),
            credentials: Arc::new(identity.clone()),
            tokens: Arc::new(identity),
            email: Arc::new(email),
            completion,
        })
    }

    /// In-process stores with the configured email and completion APIs.
    ///
    /// # Errors
    ///
    /// Returns `StateError` if the HTTP client cannot be built.
    pub fn in_memory(config: &FunctionsConfig, store: &MemoryStore) -> Result<Self, StateError> {
        let client = http_client()?;
        let email = EmailJsClient::new(client.clone(), &config.email);
        let completion = config.completion.clone().map(|completion| {
            Arc::new(OpenAiClient::new(client, completion)) as Arc<dyn CompletionProvider>
        });

        Ok(Self {
            documents: Arc::new(store.clone()),
            credentials: Arc::new(store.clone()),
            tokens: Arc::new(store.clone()),
            email: Arc::new(email),
            completion,
        })
    }
}

/// Shared outbound HTTP client.
///
/// # Errors
///
/// Returns an error if the TLS backend fails to initialize.
pub fn http_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(HTTP_TIMEOUT)
        .build()
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// configuration, services and the trigger registry.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: FunctionsConfig,
    tokens: Arc<dyn TokenVerifier>,
    email: Arc<dyn EmailSender>,
    news: NewsService,
    triggers: TriggerRegistry,
    targets: TriggerTargets,
}

impl AppState {
    /// Create a new application state.
    ///
    /// The first-contact notifier is only wired up when notifications are
    /// enabled in `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the trigger registry cannot be built.
    pub fn new(config: FunctionsConfig, backends: Backends) -> Result<Self, StateError> {
        let notifications_enabled = config.email.notifications_enabled;

        let claims = ClaimSynchronizer::new(backends.documents.clone(), backends.credentials);
        let notifier = notifications_enabled.then(|| {
            FirstMessageNotifier::new(
                backends.documents.clone(),
                backends.email.clone(),
                config.email.clone(),
            )
        });
        let news = NewsService::new(backends.documents, backends.completion);
        let triggers = TriggerRegistry::standard(notifications_enabled)?;

        tracing::info!(
            triggers = triggers.len(),
            notifications_enabled,
            "Trigger registry ready"
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                tokens: backends.tokens,
                email: backends.email,
                news,
                triggers,
                targets: TriggerTargets { claims, notifier },
            }),
        })
    }

    /// Get a reference to the functions configuration.
    #[must_use]
    pub fn config(&self) -> &FunctionsConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn tokens(&self) -> &dyn TokenVerifier {
        self.inner.tokens.as_ref()
    }

    #[must_use]
    pub fn email(&self) -> &dyn EmailSender {
        self.inner.email.as_ref()
    }

    #[must_use]
    pub fn claims(&self) -> &ClaimSynchronizer {
        &self.inner.targets.claims
    }

    #[must_use]
    pub fn news(&self) -> &NewsService {
        &self.inner.news
    }

    #[must_use]
    pub fn triggers(&self) -> &TriggerRegistry {
        &self.inner.triggers
    }

    /// Handlers the trigger registry dispatches to.
    #[must_use]
    pub fn trigger_targets(&self) -> &TriggerTargets {
        &self.inner.targets
    }
}
