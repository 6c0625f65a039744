//! Configuration records for the Slack alert backend.
//!
//! Mirrors the admin-panel records: a workspace connection (server URL plus
//! bot token, optionally a default channel) and a per-service channel
//! binding. Both are read-only to the dispatcher.

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// A configured Slack workspace connection.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackInstance {
    /// Base URL of the Slack server, usually `https://slack.com/`.
    pub server_url: String,

    /// Bot User OAuth Token (xoxb-...).
    #[serde(serialize_with = "serialize_secret")]
    pub access_token: Secret<String>,

    /// Channel used when a service has no binding of its own.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_channel: Option<String>,
}

impl std::fmt::Debug for SlackInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackInstance")
            .field("server_url", &self.server_url)
            .field("access_token", &"[REDACTED]")
            .field("default_channel", &self.default_channel)
            .finish()
    }
}

impl Default for SlackInstance {
    fn default() -> Self {
        Self {
            server_url: String::new(),
            access_token: Secret::new(String::new()),
            default_channel: None,
        }
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

/// Per-service channel binding.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelBinding {
    /// Channel override for this service; falls back to the instance default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
}

impl ChannelBinding {
    /// Effective channel for a dispatch, or `None` when neither the binding
    /// nor the instance names a non-empty channel.
    pub fn resolve<'a>(&'a self, instance: &'a SlackInstance) -> Option<&'a str> {
        self.channel
            .as_deref()
            .filter(|c| !c.is_empty())
            .or_else(|| instance.default_channel.as_deref().filter(|c| !c.is_empty()))
    }
}

/// Full configuration for the Slack alert plugin, as delivered by the host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackAlertConfig {
    pub instance: SlackInstance,
    pub binding: ChannelBinding,
}
