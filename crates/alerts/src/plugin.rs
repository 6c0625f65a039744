//! Host-facing alert plugin contract.
//!
//! The host's alerting framework holds one instance per alert backend and
//! calls `send_alert` for every service status transition it wants delivered.

use {anyhow::Result, async_trait::async_trait};

use crate::event::AlertEvent;

/// An alert backend the host can deliver service alerts through.
#[async_trait]
pub trait AlertPlugin: Send + Sync {
    /// Stable identifier the host routes alert types by ("slack").
    fn id(&self) -> &str;

    /// Human-readable name shown in the admin panel.
    fn name(&self) -> &str;

    /// Apply admin-panel configuration, delivered as JSON.
    ///
    /// Called on registration and again whenever the records change. Returns
    /// an error when the configuration is malformed or incomplete.
    async fn configure(&self, config: serde_json::Value) -> Result<()>;

    /// Whether the plugin has enough configuration to deliver alerts.
    fn is_configured(&self) -> bool;

    /// Deliver one alert. A returned error is recorded once in the host's
    /// alert history; the host does not retry.
    async fn send_alert(&self, event: &AlertEvent) -> Result<()>;
}
