use anyhow::Result;
use chrono::Utc;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::info;

/// Best-effort webhook notifications about finished runs.
pub struct AlertService {
    webhook_url: String,
    client: Client,
}

impl AlertService {
    pub fn new(webhook_url: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client for AlertService");

        Self {
            webhook_url: webhook_url.unwrap_or_default(),
            client,
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.webhook_url.is_empty()
    }

    pub async fn notify(
        &self,
        target: &str,
        status: &str,
        message: &str,
        archive_path: Option<&str>,
    ) -> Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }

        let payload = json!({
            "timestamp": Utc::now().to_rfc3339(),
            "alert_type": "backup_run",
            "target": target,
            "status": status,
            "message": message,
            "archive_path": archive_path,
        });

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("webhook answered with HTTP {}", response.status());
        }

        info!("Sent backup notification for {}: {}", target, status);
        Ok(())
    }
}
