//! Webhook notification delivery

use anyhow::{bail, Result};
use async_trait::async_trait;
use monitor_lib::{Notification, NotificationSink};
use std::time::Duration;
use tracing::debug;

/// Posts each notification as JSON to a fixed URL
pub struct WebhookSink {
    client: reqwest::Client,
    url: String,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    async fn send(&self, notification: &Notification) -> Result<()> {
        let response = self.client.post(&self.url).json(notification).send().await?;
        let status = response.status();
        if !status.is_success() {
            bail!("webhook returned {}", status);
        }

        debug!(
            url = %self.url,
            recipients = notification.recipients.len(),
            "Notification posted"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notification() -> Notification {
        Notification {
            subject: "[prod] Workload alerts: 1 degraded".to_string(),
            body: "DEGRADED (1)\n".to_string(),
            recipients: vec!["sre@example.com".to_string()],
        }
    }

    #[tokio::test]
    async fn test_posts_json_payload() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hooks/alerts")
            .match_header("content-type", "application/json")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"subject":"[prod] Workload alerts: 1 degraded"}"#.to_string(),
            ))
            .with_status(200)
            .create_async()
            .await;

        let sink = WebhookSink::new(
            format!("{}/hooks/alerts", server.url()),
            Duration::from_secs(5),
        )
        .unwrap();
        sink.send(&notification()).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_status_is_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/hooks/alerts")
            .with_status(502)
            .create_async()
            .await;

        let sink = WebhookSink::new(
            format!("{}/hooks/alerts", server.url()),
            Duration::from_secs(5),
        )
        .unwrap();
        let err = sink.send(&notification()).await.unwrap_err();
        assert!(err.to_string().contains("502"));
    }
}
