//! Corretora functions - HTTP and event-triggered backend for the website.
//!
//! # Architecture
//!
//! - Axum router exposing the HTTP functions
//! - Firestore (REST) as the document store
//! - Identity Toolkit (REST) for custom claims and ID-token verification
//! - EmailJS for transactional email, OpenAI for summaries and tags
//!
//! Document-store events arrive through `POST /events` and are dispatched by
//! the trigger registry.
//!
//! Without a Google project id the server falls back to in-memory stores,
//! which is only useful for local development.

#![cfg_attr(not(test), forbid(unsafe_code))]

use corretora_functions::config::FunctionsConfig;
use corretora_functions::state::{AppState, Backends};
use corretora_functions::stores::MemoryStore;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &FunctionsConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = FunctionsConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "corretora_functions=info,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let backends = if config.google.project_id.is_some() {
        Backends::google(&config).expect("Failed to initialize Google backends")
    } else {
        tracing::warn!("No Google project configured, using in-memory stores");
        Backends::in_memory(&config, &MemoryStore::new())
            .expect("Failed to initialize in-memory backends")
    };

    let state =
        AppState::new(config.clone(), backends).expect("Failed to initialize application state");

    let app = corretora_functions::app(state);

    let addr = config.socket_addr();
    tracing::info!("functions listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
