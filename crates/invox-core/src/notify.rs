//! Outbound email notification.
//!
//! The pipeline never depends on notification; callers decide what to do
//! with a [`NotifyError`].

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::info;

use crate::error::NotifyError;
use crate::models::config::NotifyConfig;

/// Sends a plain-text message.
pub trait Notifier {
    fn send(&self, sender: &str, recipient: &str, subject: &str, body: &str) -> Result<(), NotifyError>;
}

/// SMTP notifier using STARTTLS and password login.
pub struct SmtpNotifier {
    host: String,
    port: u16,
    password: String,
}

impl SmtpNotifier {
    pub fn new(host: impl Into<String>, port: u16, password: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            password: password.into(),
        }
    }

    /// Build a notifier from config, reading the password from the
    /// environment variable named by `password_env`.
    pub fn from_config(config: &NotifyConfig) -> Result<Self, NotifyError> {
        let password = std::env::var(&config.password_env)
            .ok()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| NotifyError::MissingCredentials(config.password_env.clone()))?;
        Ok(Self::new(config.smtp_host.clone(), config.smtp_port, password))
    }
}

impl Notifier for SmtpNotifier {
    fn send(&self, sender: &str, recipient: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        let from = parse_mailbox(sender)?;
        let to = parse_mailbox(recipient)?;

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| NotifyError::Message(e.to_string()))?;

        let mailer = SmtpTransport::starttls_relay(&self.host)
            .map_err(|e| NotifyError::Transport(e.to_string()))?
            .port(self.port)
            .credentials(Credentials::new(sender.to_string(), self.password.clone()))
            .build();

        mailer
            .send(&message)
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        info!(recipient, "Notification sent");
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address.trim().parse::<Mailbox>().map_err(|e| NotifyError::Address {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_password() {
        let config = NotifyConfig {
            password_env: "INVOX_TEST_UNSET_SMTP_PASSWORD".to_string(),
            ..Default::default()
        };

        let result = SmtpNotifier::from_config(&config);

        assert!(matches!(
            result,
            Err(NotifyError::MissingCredentials(ref name)) if name == "INVOX_TEST_UNSET_SMTP_PASSWORD"
        ));
    }

    #[test]
    fn test_invalid_recipient_rejected_before_sending() {
        let notifier = SmtpNotifier::new("localhost", 2525, "secret");

        let result = notifier.send("billing@example.com", "not an address", "s", "b");

        assert!(matches!(result, Err(NotifyError::Address { ref address, .. }) if address == "not an address"));
    }

    #[test]
    fn test_default_message() {
        let config = NotifyConfig::default();
        assert_eq!(config.subject, "Invoice Processed");
        assert_eq!(config.body, "Your invoice has been processed successfully.");
        assert_eq!(config.smtp_port, 587);
    }
}
