//! Chat dispatch via incoming webhooks

use async_trait::async_trait;
use serde::Serialize;

use crate::errors::VolleyError;

/// Posts one message to one channel (an incoming-webhook URL).
#[async_trait]
pub trait ChatPoster: Send + Sync {
    async fn post(&self, channel: &str, text: &str) -> Result<(), VolleyError>;
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    text: &'a str,
}

/// Production poster using a shared HTTP client.
pub struct WebhookPoster {
    client: reqwest::Client,
}

impl WebhookPoster {
    pub fn new() -> Result<Self, VolleyError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| VolleyError::NotificationError(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl ChatPoster for WebhookPoster {
    async fn post(&self, channel: &str, text: &str) -> Result<(), VolleyError> {
        let response = self
            .client
            .post(channel)
            .json(&WebhookPayload { text })
            .send()
            .await
            .map_err(|e| VolleyError::NotificationError(e.to_string()))?;

        response
            .error_for_status()
            .map_err(|e| VolleyError::NotificationError(e.to_string()))?;

        Ok(())
    }
}
