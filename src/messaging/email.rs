//! SMTP email transport.

use super::EmailService;
use crate::config::Config;
use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use std::sync::Arc;

/// SMTP sender, or a no-op that only logs when no host is configured.
#[derive(Clone)]
pub struct SmtpEmailService {
    transport: Option<Arc<AsyncSmtpTransport<Tokio1Executor>>>,
    from: Mailbox,
}

impl SmtpEmailService {
    pub fn from_config(config: &Config) -> Result<Self> {
        let from = config
            .email_from
            .parse::<Mailbox>()
            .with_context(|| format!("Invalid EMAIL_FROM address: {}", config.email_from))?;

        let transport = if config.smtp_host.trim().is_empty() {
            tracing::warn!("SMTP host not configured; email service will operate in no-op mode");
            None
        } else {
            let builder = if config.smtp_starttls {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            } else {
                AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            }
            .context("Failed to configure SMTP transport")?
            .port(config.smtp_port);

            let builder = match (&config.smtp_username, &config.smtp_password) {
                (Some(username), Some(password)) => {
                    builder.credentials(Credentials::new(username.clone(), password.clone()))
                }
                _ => builder,
            };

            Some(Arc::new(builder.build()))
        };

        Ok(Self { transport, from })
    }

    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }
}

#[async_trait]
impl EmailService for SmtpEmailService {
    async fn send_html(&self, to: &str, subject: &str, html: &str) -> Result<String> {
        let Some(transport) = &self.transport else {
            tracing::info!(subject, to, "Email service running in no-op mode; skipping actual send");
            return Ok("no-op".to_string());
        };

        let recipient = to
            .parse::<Mailbox>()
            .with_context(|| format!("Invalid recipient email address: {to}"))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(recipient)
            .subject(subject)
            .header(header::ContentType::TEXT_HTML)
            .body(html.to_string())
            .context("Failed to build email message")?;

        let response = transport
            .send(email)
            .await
            .context("Failed to send email")?;

        let line = response.first_line().unwrap_or_default();
        tracing::info!(subject, code = %response.code(), "Email sent");
        Ok(format!("{} {}", response.code(), line).trim_end().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_mode_without_host() {
        let service = SmtpEmailService::from_config(&Config::default()).unwrap();
        assert!(!service.is_enabled());
        let reply = service.send_html("a@x.io", "Hi", "<p>x</p>").await.unwrap();
        assert_eq!(reply, "no-op");
    }

    #[test]
    fn invalid_sender_is_rejected() {
        let config = Config {
            email_from: "not an address".to_string(),
            ..Config::default()
        };
        let err = SmtpEmailService::from_config(&config).err().unwrap();
        assert!(err.to_string().contains("EMAIL_FROM"));
    }

    #[test]
    fn configured_host_enables_transport() {
        let config = Config {
            smtp_host: "smtp.example.com".to_string(),
            smtp_username: Some("user".to_string()),
            smtp_password: Some("secret".to_string()),
            ..Config::default()
        };
        assert!(SmtpEmailService::from_config(&config).unwrap().is_enabled());
    }
}
