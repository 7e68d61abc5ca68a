//! Push notifications through an ntfy-compatible server

use crate::config::NtfySettings;
use crate::error::{Error, Result};
use reqwest::Client;
use tracing::debug;

/// Publishes notifications to one ntfy topic
pub struct NtfyNotifier {
    client: Client,
    endpoint: String,
    priority: u8,
}

impl NtfyNotifier {
    /// Create a notifier for the configured topic
    pub fn new(settings: &NtfySettings) -> Result<Self> {
        let client = Client::builder()
            .user_agent("pr-phase-monitor")
            .build()
            .map_err(|e| Error::Notification(format!("Failed to create HTTP client: {e}")))?;

        let endpoint = format!(
            "{}/{}",
            settings.server.trim_end_matches('/'),
            urlencoding::encode(settings.topic.trim())
        );

        Ok(Self {
            client,
            endpoint,
            priority: settings.priority.clamp(1, 5),
        })
    }

    /// Publish a message; `click_url` opens when the notification is tapped
    pub async fn send(&self, title: &str, message: &str, click_url: &str) -> Result<()> {
        debug!(endpoint = %self.endpoint, title, "sending notification");
        let priority = self.priority.to_string();

        let response = self
            .client
            .post(&self.endpoint)
            // Query parameters rather than headers: titles may be non-ASCII
            .query(&[
                ("title", title),
                ("click", click_url),
                ("priority", priority.as_str()),
                ("tags", "white_check_mark"),
            ])
            .body(message.to_string())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Notification(format!(
                "ntfy returned {}",
                response.status()
            )));
        }

        debug!("notification sent");
        Ok(())
    }
}
