//! Alert sinks: delivery of notifications to the outside world.
//!
//! The webhook sink POSTs JSON via reqwest. HTTP calls sit behind the
//! [`WebhookHttpClient`] trait so tests can substitute a mock.

use crate::alert::AlertNotification;
use crate::error::SinkError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;

/// Destination for alert notifications.
#[async_trait]
pub trait AlertSink: Send + Sync {
    fn name(&self) -> &str;

    async fn deliver(&self, notification: &AlertNotification) -> Result<(), SinkError>;
}

/// Emits notifications as structured `tracing` events.
#[derive(Debug, Clone, Default)]
pub struct LogSink;

#[async_trait]
impl AlertSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn deliver(&self, notification: &AlertNotification) -> Result<(), SinkError> {
        tracing::warn!(
            title = %notification.title,
            severity = %notification.severity,
            run_id = %notification.run_id,
            step = notification.step,
            divergent = notification.is_divergent,
            "{}",
            notification.body
        );
        Ok(())
    }
}

/// Keeps every delivered notification in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    delivered: Mutex<Vec<AlertNotification>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<AlertNotification> {
        self.delivered
            .lock()
            .map(|d| d.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn len(&self) -> usize {
        self.notifications().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AlertSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    async fn deliver(&self, notification: &AlertNotification) -> Result<(), SinkError> {
        let mut delivered = self
            .delivered
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        delivered.push(notification.clone());
        Ok(())
    }
}

/// Trait for webhook HTTP interactions.
#[async_trait]
pub trait WebhookHttpClient: Send + Sync {
    async fn post_json(&self, url: &str, payload: &str) -> Result<String, String>;
}

/// Real webhook HTTP client using reqwest.
pub struct ReqwestWebhookClient {
    client: reqwest::Client,
}

impl ReqwestWebhookClient {
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

impl Default for ReqwestWebhookClient {
    fn default() -> Self {
        Self::new(Duration::from_secs(default_webhook_timeout()))
    }
}

#[async_trait]
impl WebhookHttpClient for ReqwestWebhookClient {
    async fn post_json(&self, url: &str, payload: &str) -> Result<String, String> {
        let resp = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .body(payload.to_string())
            .send()
            .await
            .map_err(|e| format!("HTTP error: {e}"))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| format!("Read error: {e}"))?;

        if !status.is_success() {
            return Err(format!("Webhook POST failed ({status}): {body}"));
        }

        Ok(body)
    }
}

/// POSTs each notification as JSON to a fixed URL.
pub struct WebhookSink {
    url: String,
    http_client: Box<dyn WebhookHttpClient>,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>, http_client: Box<dyn WebhookHttpClient>) -> Self {
        Self {
            url: url.into(),
            http_client,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl AlertSink for WebhookSink {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn deliver(&self, notification: &AlertNotification) -> Result<(), SinkError> {
        let payload = serde_json::to_string(notification)?;
        self.http_client
            .post_json(&self.url, &payload)
            .await
            .map(|_| ())
            .map_err(|message| SinkError::DeliveryFailed {
                sink: self.name().to_string(),
                message,
            })
    }
}

fn default_webhook_timeout() -> u64 {
    10
}

/// Serializable sink selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SinkConfig {
    #[default]
    Log,
    Webhook {
        url: String,
        #[serde(default = "default_webhook_timeout")]
        timeout_secs: u64,
    },
}

impl SinkConfig {
    pub fn build(&self) -> Box<dyn AlertSink> {
        match self {
            SinkConfig::Log => Box::new(LogSink),
            SinkConfig::Webhook { url, timeout_secs } => {
                let client = ReqwestWebhookClient::new(Duration::from_secs(*timeout_secs));
                Box::new(WebhookSink::new(url.clone(), Box::new(client)))
            }
        }
    }
}
