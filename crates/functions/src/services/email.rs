//! Transactional email via the EmailJS REST API.
//!
//! The send endpoint takes `{service_id, template_id, user_id, template_params}`
//! and answers with a plain-text body. The contact-form proxy forwards a
//! caller-built payload unchanged; the chat notifier builds its own from
//! [`EmailConfig`].

use askama::Template;
use async_trait::async_trait;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::instrument;

use crate::config::EmailConfig;

/// Keys the send endpoint requires at the top level of a payload.
pub const REQUIRED_FIELDS: [&str; 4] = ["service_id", "template_id", "user_id", "template_params"];

/// Plain text body for the first-contact notification.
#[derive(Template)]
#[template(path = "email/first_contact.txt")]
struct FirstContactText<'a> {
    name: &'a str,
    email: &'a str,
    phone: &'a str,
    message: &'a str,
    chat_url: &'a str,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// The request never got a response.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The email service answered with a non-success status.
    #[error("email rejected: {status} - {message}")]
    Rejected { status: u16, message: String },

    /// Service, template, public key or recipient is not configured.
    #[error("email not configured: missing {0}")]
    NotConfigured(&'static str),

    /// Template rendering error.
    #[error("template error: {0}")]
    Template(#[from] askama::Error),
}

/// Status and body returned by the email service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailReply {
    pub status: u16,
    pub body: String,
}

impl EmailReply {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Treat a non-success status as an error.
    ///
    /// # Errors
    ///
    /// Returns `EmailError::Rejected` for any non-2xx status.
    pub fn error_for_status(self) -> Result<Self, EmailError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(EmailError::Rejected {
                status: self.status,
                message: self.body,
            })
        }
    }
}

/// Anything that can deliver an email payload.
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Post a payload once. Any HTTP response, success or not, is `Ok`.
    async fn send(&self, payload: &Value) -> Result<EmailReply, EmailError>;
}

/// EmailJS REST client.
#[derive(Clone)]
pub struct EmailJsClient {
    client: reqwest::Client,
    api_url: String,
}

impl EmailJsClient {
    #[must_use]
    pub fn new(client: reqwest::Client, config: &EmailConfig) -> Self {
        Self {
            client,
            api_url: config.api_url.clone(),
        }
    }
}

#[async_trait]
impl EmailSender for EmailJsClient {
    #[instrument(skip(self, payload))]
    async fn send(&self, payload: &Value) -> Result<EmailReply, EmailError> {
        let response = self.client.post(&self.api_url).json(payload).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();

        tracing::debug!(status, "Email service responded");
        Ok(EmailReply { status, body })
    }
}

/// Names of required fields that are absent or null in a contact payload.
#[must_use]
pub fn missing_fields(payload: &Value) -> Vec<&'static str> {
    REQUIRED_FIELDS
        .into_iter()
        .filter(|key| payload.get(key).is_none_or(Value::is_null))
        .collect()
}

/// Details of a chat's first client message.
#[derive(Debug, Clone, Copy)]
pub struct FirstContact<'a> {
    pub chat_id: &'a str,
    pub name: &'a str,
    pub email: &'a str,
    pub phone: &'a str,
    pub message: &'a str,
}

/// Build the notification payload for a chat's first client message.
///
/// # Errors
///
/// Returns `EmailError::NotConfigured` if any send setting is missing, or
/// `EmailError::Template` if the body fails to render.
pub fn first_contact_payload(
    config: &EmailConfig,
    contact: &FirstContact<'_>,
) -> Result<Value, EmailError> {
    let service_id = config
        .service_id
        .as_deref()
        .ok_or(EmailError::NotConfigured("service id"))?;
    let template_id = config
        .template_id
        .as_deref()
        .ok_or(EmailError::NotConfigured("template id"))?;
    let public_key = config
        .public_key
        .as_deref()
        .ok_or(EmailError::NotConfigured("public key"))?;
    let recipient = config
        .recipient
        .as_deref()
        .ok_or(EmailError::NotConfigured("recipient"))?;

    let chat_url = format!("{}/admin/chats/{}", config.site_base_url, contact.chat_id);
    let message = FirstContactText {
        name: contact.name,
        email: contact.email,
        phone: contact.phone,
        message: contact.message,
        chat_url: &chat_url,
    }
    .render()?;

    Ok(json!({
        "service_id": service_id,
        "template_id": template_id,
        "user_id": public_key,
        "template_params": {
            "to_email": recipient,
            "from_name": contact.name,
            "reply_to": contact.email,
            "subject": format!("Novo contacto: {}", contact.name),
            "message": message,
            "chat_url": chat_url,
        }
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn configured() -> EmailConfig {
        EmailConfig {
            service_id: Some("svc".to_string()),
            template_id: Some("tpl".to_string()),
            public_key: Some("pk".to_string()),
            recipient: Some("geral@corretora.pt".to_string()),
            site_base_url: "https://corretora.pt".to_string(),
            ..EmailConfig::default()
        }
    }

    fn contact() -> FirstContact<'static> {
        FirstContact {
            chat_id: "c1",
            name: "Rui",
            email: "rui@mail.pt",
            phone: "912345678",
            message: "Queria um orçamento",
        }
    }

    #[test]
    fn test_missing_fields() {
        let payload = json!({"service_id": "s", "template_id": "t", "user_id": "u"});
        assert_eq!(missing_fields(&payload), vec!["template_params"]);

        let payload = json!({
            "service_id": "s", "template_id": "t", "user_id": "u", "template_params": null
        });
        assert_eq!(missing_fields(&payload), vec!["template_params"]);

        let payload = json!({
            "service_id": "s", "template_id": "t", "user_id": "u", "template_params": {}
        });
        assert!(missing_fields(&payload).is_empty());

        assert_eq!(missing_fields(&json!("text")).len(), 4);
    }

    #[test]
    fn test_error_for_status() {
        let ok = EmailReply {
            status: 200,
            body: "OK".to_string(),
        };
        assert!(ok.error_for_status().is_ok());

        let rejected = EmailReply {
            status: 400,
            body: "The user ID is invalid".to_string(),
        };
        assert!(matches!(
            rejected.error_for_status(),
            Err(EmailError::Rejected { status: 400, .. })
        ));
    }

    #[test]
    fn test_first_contact_payload() {
        let payload = first_contact_payload(&configured(), &contact()).unwrap();
        assert_eq!(payload["user_id"], json!("pk"));
        assert_eq!(payload["template_params"]["to_email"], json!("geral@corretora.pt"));
        assert_eq!(
            payload["template_params"]["chat_url"],
            json!("https://corretora.pt/admin/chats/c1")
        );
        let message = payload["template_params"]["message"].as_str().unwrap();
        assert!(message.contains("Queria um orçamento"));
        assert!(message.contains("912345678"));
    }

    #[test]
    fn test_first_contact_payload_requires_config() {
        let config = EmailConfig {
            recipient: None,
            ..configured()
        };
        assert!(matches!(
            first_contact_payload(&config, &contact()),
            Err(EmailError::NotConfigured("recipient"))
        ));
    }
}
