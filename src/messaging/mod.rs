//! Outbound messaging: HTML email and push notifications.
//!
//! Both transports degrade to a logging no-op when unconfigured so local runs
//! and tests need no mail server or push credentials.

pub mod email;
pub mod push;

pub use email::SmtpEmailService;
pub use push::FcmNotificationService;

use crate::error::{ListingError, Result};
use crate::model::fields;
use crate::store::{self, paths, DataStore, StoreFilter};
use async_trait::async_trait;
use serde::Deserialize;

#[async_trait]
pub trait EmailService: Send + Sync {
    /// Send an HTML message and return the transport's response line.
    async fn send_html(&self, to: &str, subject: &str, html: &str) -> anyhow::Result<String>;
}

#[async_trait]
pub trait NotificationService: Send + Sync {
    /// Push to one device and return the message id.
    async fn send(&self, device_token: &str, title: &str, body: &str) -> anyhow::Result<String>;
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmailRequest {
    pub to: Option<String>,
    pub subject: Option<String>,
    pub html: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    pub email: Option<String>,
    pub user_type: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
}

fn require<'a>(
    value: &'a Option<String>,
    name: &'static str,
    missing: &mut Vec<&'static str>,
) -> &'a str {
    match value.as_deref() {
        Some(v) if !v.is_empty() => v,
        _ => {
            missing.push(name);
            ""
        }
    }
}

pub async fn send_email(service: &dyn EmailService, request: &EmailRequest) -> Result<String> {
    let mut missing = Vec::new();
    let to = require(&request.to, "to", &mut missing);
    let subject = require(&request.subject, "subject", &mut missing);
    let html = require(&request.html, "html", &mut missing);
    if !missing.is_empty() {
        return Err(ListingError::MissingFields(missing));
    }

    let response = service
        .send_html(to, subject, html)
        .await
        .map_err(|err| ListingError::downstream(format!("{err:#}")))?;
    Ok(format!("Email sent: {response}"))
}

/// Look up the recipient's device token and push to it.
pub async fn send_notification(
    store: &dyn DataStore,
    push: &dyn NotificationService,
    request: &NotificationRequest,
) -> Result<String> {
    let mut missing = Vec::new();
    let email = require(&request.email, "email", &mut missing);
    let user_type = require(&request.user_type, "userType", &mut missing);
    let title = require(&request.title, "title", &mut missing);
    let body = require(&request.body, "body", &mut missing);
    if !missing.is_empty() {
        return Err(ListingError::MissingFields(missing));
    }

    let filter = StoreFilter::eq(fields::USER_EMAIL, email);
    let users = store::read_collection(store, &paths::users(user_type), Some(&filter)).await?;
    let token = users
        .first()
        .and_then(|doc| crate::text::non_empty_str(doc.data.get(fields::FCM_TOKEN)))
        .ok_or_else(|| {
            tracing::warn!(email, user_type, "No device token on record");
            ListingError::Downstream("No token for user".to_string())
        })?;

    let message_id = push
        .send(token, title, body)
        .await
        .map_err(|err| ListingError::downstream(format!("{err:#}")))?;
    tracing::info!(email, message_id = %message_id, "Notification sent");
    Ok(format!("Successfully sent message: {message_id}"))
}
