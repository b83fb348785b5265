//! Firebase Cloud Messaging (HTTP v1) push transport.

use super::NotificationService;
use crate::config::Config;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const FCM_BASE_URL: &str = "https://fcm.googleapis.com";

#[derive(Debug, Serialize)]
struct FcmMessage<'a> {
    message: FcmMessageContent<'a>,
}

#[derive(Debug, Serialize)]
struct FcmMessageContent<'a> {
    token: &'a str,
    notification: FcmNotification<'a>,
}

#[derive(Debug, Serialize)]
struct FcmNotification<'a> {
    title: &'a str,
    body: &'a str,
}

#[derive(Debug, Deserialize)]
struct FcmApiResponse {
    name: Option<String>,
}

struct FcmTarget {
    project_id: String,
    access_token: String,
}

/// Push sender, or a no-op that only logs when credentials are missing.
pub struct FcmNotificationService {
    target: Option<FcmTarget>,
    base_url: String,
    http: reqwest::Client,
}

impl FcmNotificationService {
    pub fn from_config(config: &Config) -> Result<Self> {
        let target = match (&config.fcm_project_id, &config.fcm_access_token) {
            (Some(project_id), Some(access_token)) => Some(FcmTarget {
                project_id: project_id.clone(),
                access_token: access_token.clone(),
            }),
            _ => {
                tracing::warn!("FCM credentials not configured; push service will operate in no-op mode");
                None
            }
        };
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.fcm_timeout_ms))
            .build()
            .context("Failed to build FCM HTTP client")?;
        Ok(Self {
            target,
            base_url: FCM_BASE_URL.to_string(),
            http,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.target.is_some()
    }
}

#[async_trait]
impl NotificationService for FcmNotificationService {
    async fn send(&self, device_token: &str, title: &str, body: &str) -> Result<String> {
        let Some(target) = &self.target else {
            tracing::info!(title, "Push service running in no-op mode; skipping actual send");
            return Ok("no-op".to_string());
        };

        let message = FcmMessage {
            message: FcmMessageContent {
                token: device_token,
                notification: FcmNotification { title, body },
            },
        };
        let url = format!(
            "{}/v1/projects/{}/messages:send",
            self.base_url, target.project_id
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(&target.access_token)
            .json(&message)
            .send()
            .await
            .context("FCM send request failed")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!("FCM API error: {status} - {error_text}"));
        }

        let parsed: FcmApiResponse = response
            .json()
            .await
            .context("Failed to parse FCM response")?;
        parsed
            .name
            .ok_or_else(|| anyhow!("FCM response carried no message name"))
    }
}
