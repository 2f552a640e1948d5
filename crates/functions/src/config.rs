//! Functions configuration loaded from environment variables.
//!
//! The configuration is built once at process start and handed to every
//! handler through `AppState`. Where several names are listed, the first one
//! that is set (and non-empty) wins.
//!
//! # Environment Variables
//!
//! ## Server
//! - `FUNCTIONS_HOST` - Bind address (default: 0.0.0.0)
//! - `PORT`, `FUNCTIONS_PORT` - Listen port (default: 8080)
//!
//! ## Google
//! - `FIREBASE_PROJECT_ID`, `GOOGLE_CLOUD_PROJECT`, `GCLOUD_PROJECT` - Project id
//!   (falls back to `project_id` inside the service-account blob)
//! - `FIREBASE_SERVICE_ACCOUNT`, `GOOGLE_SERVICE_ACCOUNT_JSON` - Service-account
//!   key JSON. Without it, tokens come from the metadata server.
//!
//! ## Email
//! - `EMAILJS_API_URL` - Send endpoint (default: EmailJS REST API)
//! - `EMAILJS_SERVICE_ID`, `EMAILJS_TEMPLATE_ID`
//! - `EMAILJS_PUBLIC_KEY`, `EMAILJS_USER_ID` - Public key
//! - `NOTIFY_EMAIL_TO`, `ADMIN_EMAIL` - Notification recipient
//! - `SITE_BASE_URL`, `PUBLIC_SITE_URL` - Public site URL used in links
//! - `EMAIL_NOTIFICATIONS_ENABLED`, `SEND_EMAIL_NOTIFICATIONS` (legacy) - Feature flag
//!
//! ## Completion API
//! - `OPENAI_API_KEY` - Enables summaries and tagging when set
//! - `OPENAI_MODEL` - Model name (default: gpt-4o-mini)
//! - `OPENAI_API_URL` - Chat completions endpoint
//!
//! ## Other
//! - `EVENTS_SHARED_SECRET` - Enables `POST /events` when set
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT` - Sentry error tracking

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use crate::google::ServiceAccountKey;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const MIN_SHARED_SECRET_LENGTH: usize = 24;

const DEFAULT_SITE_BASE_URL: &str = "https://www.example-corretora.pt";
const DEFAULT_EMAIL_API_URL: &str = "https://api.emailjs.com/api/v1.0/email/send";
const DEFAULT_COMPLETION_MODEL: &str = "gpt-4o-mini";
const DEFAULT_COMPLETION_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "password",
    "xxx",
    "todo",
    "insert",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Functions application configuration.
#[derive(Debug, Clone)]
pub struct FunctionsConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Google project and credentials
    pub google: GoogleConfig,
    /// Transactional email settings
    pub email: EmailConfig,
    /// Completion API settings; `None` disables summaries and tagging
    pub completion: Option<CompletionConfig>,
    /// Shared secret guarding `POST /events`; `None` leaves the route unmounted
    pub events_secret: Option<SecretString>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Google project configuration.
#[derive(Debug, Clone, Default)]
pub struct GoogleConfig {
    pub project_id: Option<String>,
    pub service_account: Option<ServiceAccountKey>,
}

/// Transactional email configuration.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub api_url: String,
    pub service_id: Option<String>,
    pub template_id: Option<String>,
    pub public_key: Option<String>,
    pub recipient: Option<String>,
    pub site_base_url: String,
    /// Gates the first-chat-message notification trigger
    pub notifications_enabled: bool,
}

/// Completion API configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct CompletionConfig {
    pub api_key: SecretString,
    pub model: String,
    pub api_url: String,
}

impl std::fmt::Debug for CompletionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl Default for FunctionsConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8080,
            google: GoogleConfig::default(),
            email: EmailConfig::default(),
            completion: None,
            events_secret: None,
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_EMAIL_API_URL.to_string(),
            service_id: None,
            template_id: None,
            public_key: None,
            recipient: None,
            site_base_url: DEFAULT_SITE_BASE_URL.to_string(),
            notifications_enabled: false,
        }
    }
}

impl FunctionsConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is malformed or the events secret
    /// fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("FUNCTIONS_HOST", "0.0.0.0")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("FUNCTIONS_HOST".to_string(), e.to_string()))?;
        let port = first_env(&["PORT", "FUNCTIONS_PORT"])
            .unwrap_or_else(|| "8080".to_string())
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("PORT".to_string(), e.to_string()))?;

        let events_secret = match get_optional_env("EVENTS_SHARED_SECRET") {
            Some(value) => {
                validate_secret_strength(&value, "EVENTS_SHARED_SECRET")?;
                Some(SecretString::from(value))
            }
            None => None,
        };

        Ok(Self {
            host,
            port,
            google: GoogleConfig::from_env()?,
            email: EmailConfig::from_env()?,
            completion: CompletionConfig::from_env(),
            events_secret,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl GoogleConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let service_account = match first_env_named(&[
            "FIREBASE_SERVICE_ACCOUNT",
            "GOOGLE_SERVICE_ACCOUNT_JSON",
        ]) {
            Some((name, blob)) => Some(
                serde_json::from_str::<ServiceAccountKey>(&blob)
                    .map_err(|e| ConfigError::InvalidEnvVar(name.to_string(), e.to_string()))?,
            ),
            None => None,
        };

        let project_id = first_env(&["FIREBASE_PROJECT_ID", "GOOGLE_CLOUD_PROJECT", "GCLOUD_PROJECT"])
            .or_else(|| service_account.as_ref().and_then(|k| k.project_id.clone()));

        Ok(Self {
            project_id,
            service_account,
        })
    }

    /// The project id, required by every Google-backed store.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if no project id could be resolved.
    pub fn require_project_id(&self) -> Result<&str, ConfigError> {
        self.project_id
            .as_deref()
            .ok_or_else(|| ConfigError::MissingEnvVar("FIREBASE_PROJECT_ID".to_string()))
    }
}

impl EmailConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let site_base_url = match first_env_named(&["SITE_BASE_URL", "PUBLIC_SITE_URL"]) {
            Some((name, value)) => normalize_base_url(&value)
                .map_err(|e| ConfigError::InvalidEnvVar(name.to_string(), e.to_string()))?,
            None => DEFAULT_SITE_BASE_URL.to_string(),
        };

        Ok(Self {
            api_url: get_env_or_default("EMAILJS_API_URL", DEFAULT_EMAIL_API_URL),
            service_id: get_optional_env("EMAILJS_SERVICE_ID"),
            template_id: get_optional_env("EMAILJS_TEMPLATE_ID"),
            public_key: first_env(&["EMAILJS_PUBLIC_KEY", "EMAILJS_USER_ID"]),
            recipient: first_env(&["NOTIFY_EMAIL_TO", "ADMIN_EMAIL"]),
            site_base_url,
            notifications_enabled: first_env(&[
                "EMAIL_NOTIFICATIONS_ENABLED",
                "SEND_EMAIL_NOTIFICATIONS",
            ])
            .is_some_and(|v| parse_flag(&v)),
        })
    }
}

impl CompletionConfig {
    fn from_env() -> Option<Self> {
        let api_key = get_optional_env("OPENAI_API_KEY")?;
        Some(Self {
            api_key: SecretString::from(api_key),
            model: get_env_or_default("OPENAI_MODEL", DEFAULT_COMPLETION_MODEL),
            api_url: get_env_or_default("OPENAI_API_URL", DEFAULT_COMPLETION_API_URL),
        })
    }
}

/// Check a presented shared secret against the configured one.
///
/// Compares SHA-256 digests so the comparison does not short-circuit on the
/// first differing byte of the secret itself.
#[must_use]
pub fn secret_matches(expected: &SecretString, presented: &str) -> bool {
    use sha2::{Digest, Sha256};

    let a = Sha256::digest(expected.expose_secret().as_bytes());
    let b = Sha256::digest(presented.as_bytes());
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// First set variable in a fallback chain.
fn first_env(keys: &[&str]) -> Option<String> {
    first_env_named(keys).map(|(_, value)| value)
}

/// First set variable in a fallback chain, along with the name that matched.
fn first_env_named<'a>(keys: &[&'a str]) -> Option<(&'a str, String)> {
    keys.iter()
        .find_map(|key| get_optional_env(key).map(|value| (*key, value)))
}

/// Check that a base URL is absolute http(s) and strip trailing slashes.
fn normalize_base_url(value: &str) -> Result<String, url::ParseError> {
    let parsed = url::Url::parse(value.trim())?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(url::ParseError::RelativeUrlWithoutBase);
    }
    Ok(value.trim().trim_end_matches('/').to_string())
}

/// Parse a boolean feature flag.
fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is long enough, not a placeholder, and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    if secret.len() < MIN_SHARED_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {MIN_SHARED_SECRET_LENGTH} characters (got {})",
                secret.len()
            ),
        ));
    }

    let lower = secret.to_lowercase();
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-events-secret-goes-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_too_short() {
        assert!(validate_secret_strength("aB3$xY9!", "TEST_VAR").is_err());
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength(&"ab".repeat(20), "TEST_VAR");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("TRUE"));
        assert!(parse_flag(" 1 "));
        assert!(parse_flag("on"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("enabled"));
    }

    #[test]
    fn test_secret_matches() {
        let secret = SecretString::from("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6");
        assert!(secret_matches(&secret, "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6"));
        assert!(!secret_matches(&secret, "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC7"));
        assert!(!secret_matches(&secret, ""));
    }

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url("https://corretora.pt/").unwrap(),
            "https://corretora.pt"
        );
        assert!(normalize_base_url("corretora.pt").is_err());
        assert!(normalize_base_url("ftp://corretora.pt").is_err());
    }

    #[test]
    fn test_socket_addr() {
        let config = FunctionsConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 9000,
            ..FunctionsConfig::default()
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 9000);
    }

    #[test]
    fn test_completion_config_debug_redacts_key() {
        let config = CompletionConfig {
            api_key: SecretString::from("sk-super-secret-value"),
            model: "gpt-4o-mini".to_string(),
            api_url: DEFAULT_COMPLETION_API_URL.to_string(),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("gpt-4o-mini"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("sk-super-secret-value"));
    }

    #[test]
    fn test_require_project_id() {
        let google = GoogleConfig::default();
        assert!(matches!(
            google.require_project_id(),
            Err(ConfigError::MissingEnvVar(_))
        ));

        let google = GoogleConfig {
            project_id: Some("corretora-prod".to_string()),
            service_account: None,
        };
        assert_eq!(google.require_project_id().unwrap(), "corretora-prod");
    }
}
