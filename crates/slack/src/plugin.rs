//! `AlertPlugin` implementation backed by the Slack dispatcher.

use {
    anyhow::Result,
    async_trait::async_trait,
    tokio::sync::RwLock,
    tracing::{error, info},
};

use vigil_alerts::{AlertEvent, AlertPlugin};

use crate::{config::SlackAlertConfig, dispatch::Dispatcher};

/// Slack alert plugin. Holds the admin-panel configuration and builds a
/// dispatcher per alert; dispatches share no mutable state.
#[derive(Default)]
pub struct SlackAlertPlugin {
    config: RwLock<Option<SlackAlertConfig>>,
}

impl SlackAlertPlugin {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AlertPlugin for SlackAlertPlugin {
    fn id(&self) -> &str {
        "slack"
    }

    fn name(&self) -> &str {
        "Slack"
    }

    async fn configure(&self, config: serde_json::Value) -> Result<()> {
        let config: SlackAlertConfig = serde_json::from_value(config)?;

        // Validate up front; Dispatcher::new checks token, channel and URL.
        Dispatcher::new(&config.instance, &config.binding)?;

        info!(
            server_url = %config.instance.server_url,
            channel = config.binding.resolve(&config.instance),
            "slack alert plugin configured"
        );
        *self.config.write().await = Some(config);
        Ok(())
    }

    fn is_configured(&self) -> bool {
        // try_read keeps this sync; a held write lock reads as unconfigured.
        matches!(self.config.try_read().as_deref(), Ok(Some(_)))
    }

    async fn send_alert(&self, event: &AlertEvent) -> Result<()> {
        let config = {
            let guard = self.config.read().await;
            guard
                .clone()
                .ok_or_else(|| anyhow::anyhow!("slack alert plugin is not configured"))?
        };

        let dispatcher = Dispatcher::new(&config.instance, &config.binding)?;
        match dispatcher.dispatch(event).await {
            Ok(receipt) => {
                if receipt.message_ts.is_none() {
                    info!(service = %event.service_name, "alert not posted (transition suppressed)");
                }
                Ok(())
            },
            Err(e) => {
                error!(service = %event.service_name, error = %e, "slack alert dispatch failed");
                Err(e.into())
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use {super::*, serde_json::json, vigil_alerts::ServiceStatus};

    fn valid_config(server_url: &str) -> serde_json::Value {
        json!({
            "instance": {
                "server_url": server_url,
                "access_token": "xoxb-test"
            },
            "binding": { "channel": "C456" }
        })
    }

    #[test]
    fn plugin_id_and_name() {
        let plugin = SlackAlertPlugin::new();
        assert_eq!(plugin.id(), "slack");
        assert_eq!(plugin.name(), "Slack");
    }

    #[tokio::test]
    async fn configure_rejects_empty_token() {
        let plugin = SlackAlertPlugin::new();
        let config = json!({
            "instance": { "server_url": "https://slack.com/" },
            "binding": { "channel": "C456" }
        });
        let result = plugin.configure(config).await;
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("access token not set")
        );
        assert!(!plugin.is_configured());
    }

    #[tokio::test]
    async fn configure_rejects_missing_channel() {
        let plugin = SlackAlertPlugin::new();
        let config = json!({
            "instance": {
                "server_url": "https://slack.com/",
                "access_token": "xoxb-test"
            }
        });
        let result = plugin.configure(config).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("channel not set"));
    }

    #[tokio::test]
    async fn configure_accepts_instance_default_channel() {
        let plugin = SlackAlertPlugin::new();
        let config = json!({
            "instance": {
                "server_url": "https://slack.com/",
                "access_token": "xoxb-test",
                "default_channel": "C0DEFAULT"
            }
        });
        plugin.configure(config).await.unwrap();
        assert!(plugin.is_configured());
    }

    #[tokio::test]
    async fn send_alert_requires_configuration() {
        let plugin = SlackAlertPlugin::new();
        let event = AlertEvent::new("Service", ServiceStatus::Error, ServiceStatus::Passing);
        let result = plugin.send_alert(&event).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("not configured"));
    }

    #[tokio::test]
    async fn send_alert_end_to_end() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/conversations.join")
            .with_body(r#"{"ok": true}"#)
            .create_async()
            .await;
        let post = server
            .mock("POST", "/api/chat.postMessage")
            .with_body(r#"{"ok": true, "ts": "1712.0009"}"#)
            .create_async()
            .await;

        let plugin = SlackAlertPlugin::new();
        plugin.configure(valid_config(&server.url())).await.unwrap();

        let event = AlertEvent::new("Service", ServiceStatus::Error, ServiceStatus::Passing);
        plugin.send_alert(&event).await.unwrap();
        post.assert_async().await;
    }

    #[tokio::test]
    async fn send_alert_surfaces_dispatch_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/conversations.join")
            .with_body(r#"{"ok": false, "error": "channel_not_found"}"#)
            .create_async()
            .await;

        let plugin = SlackAlertPlugin::new();
        plugin.configure(valid_config(&server.url())).await.unwrap();

        let event = AlertEvent::new("Service", ServiceStatus::Error, ServiceStatus::Passing);
        let result = plugin.send_alert(&event).await;
        assert!(result.is_err());
    }
}
