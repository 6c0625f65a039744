//! Alert event data model shared between the host and alert plugins.

use serde::{Deserialize, Serialize};

/// Recipients whose user-ID override matches this are never @mentioned and
/// never reported as missing. Useful for dummy accounts (pager rotations,
/// mailing-list users, ...).
pub const IGNORE_USER_ID: &str = "ignore";

/// Overall status of a monitored service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    Passing,
    Warning,
    Error,
    Critical,
    Acked,
}

impl ServiceStatus {
    /// Uppercase label used in alert text ("PASSING", "ERROR", ...).
    pub fn label(&self) -> &'static str {
        match self {
            Self::Passing => "PASSING",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
            Self::Acked => "ACKED",
        }
    }
}

impl std::fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A single failing status check attached to an alert.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckFailure {
    pub name: String,
    /// Error text from the check's last result.
    pub error: Option<String>,
    /// Link to the check's detail page in the host UI.
    pub detail_url: Option<String>,
    /// External status page for the check (Grafana, CI job, ...).
    pub status_url: Option<String>,
    /// Button label for `status_url`.
    pub status_label: Option<String>,
}

/// Image attached to an alert, typically a metrics graph snapshot.
#[derive(Debug, Clone)]
pub struct ImageAttachment {
    pub file_name: String,
    pub data: Vec<u8>,
}

/// Someone an alert should @mention.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Recipient {
    /// Primary identifier: an email address or a chat handle.
    pub identifier: String,
    /// Display name, shown when the recipient cannot be resolved.
    pub display_name: Option<String>,
    /// Chat user-ID override set in the recipient's profile. Set to
    /// [`IGNORE_USER_ID`] to disable mentions for this recipient.
    pub user_id_override: Option<String>,
}

impl Recipient {
    /// Whether this recipient opted out of mentions via the ignore sentinel.
    pub fn mention_disabled(&self) -> bool {
        self.user_id_override.as_deref() == Some(IGNORE_USER_ID)
    }
}

/// One service alert, constructed by the host per status transition.
/// Ephemeral: consumed by the plugin and never persisted.
#[derive(Debug, Clone)]
pub struct AlertEvent {
    pub service_name: String,
    pub status: ServiceStatus,
    /// Status before the transition that triggered this alert.
    pub old_status: ServiceStatus,
    /// Free-form body shown before the failing-check list.
    pub message_body: Option<String>,
    pub failing_checks: Vec<CheckFailure>,
    pub image: Option<ImageAttachment>,
    pub recipients: Vec<Recipient>,
}

impl AlertEvent {
    /// A minimal event for the given transition; remaining fields default.
    pub fn new(
        service_name: impl Into<String>,
        status: ServiceStatus,
        old_status: ServiceStatus,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            status,
            old_status,
            message_body: None,
            failing_checks: Vec::new(),
            image: None,
            recipients: Vec::new(),
        }
    }
}
