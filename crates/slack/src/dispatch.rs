//! The sequential alert dispatch workflow.
//!
//! One dispatch is a linear run of Slack Web API calls: resolve recipients,
//! join the bound channel, invite missing members, upload the attached image,
//! post the message. Recipient resolution failures degrade to plain text;
//! everything after that is fatal for the dispatch.

use {
    secrecy::ExposeSecret,
    tracing::{debug, info, warn},
};

use vigil_alerts::{AlertEvent, Recipient};

use crate::{
    api::{ApiError, SlackApi},
    config::{ChannelBinding, SlackInstance},
    gating::{MentionPolicy, mention_policy},
    message,
};

/// Invite responses with this Slack error are a no-op, not a failure.
const ALREADY_IN_CHANNEL: &str = "already_in_channel";
/// Expected lookup miss; anything else on lookup is logged loudly.
const USERS_NOT_FOUND: &str = "users_not_found";

/// A failed dispatch, reported once to the host's alert history.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("slack alert configuration invalid: {0}")]
    Config(String),

    #[error("could not join channel {channel}")]
    ChannelJoin {
        channel: String,
        #[source]
        source: ApiError,
    },

    #[error("could not invite users to channel {channel}")]
    Invite {
        channel: String,
        #[source]
        source: ApiError,
    },

    #[error("could not upload image to channel {channel}")]
    Upload {
        channel: String,
        #[source]
        source: ApiError,
    },

    #[error("could not post message to channel {channel}")]
    Post {
        channel: String,
        #[source]
        source: ApiError,
    },
}

/// What a completed dispatch did.
#[derive(Debug, Clone, Default)]
pub struct DispatchReceipt {
    /// `ts` of the posted message; `None` when the transition was suppressed.
    pub message_ts: Option<String>,
    /// Resolved user IDs that were mentioned.
    pub mentioned: Vec<String>,
    /// Identifiers that could not be resolved to Slack users.
    pub unresolved: Vec<String>,
}

/// Sequential dispatcher bound to one workspace and channel.
pub struct Dispatcher {
    api: SlackApi,
    channel: String,
}

impl Dispatcher {
    /// Build a dispatcher from the configured records. Fails when the token
    /// is empty, no channel is bound, or the server URL does not parse.
    pub fn new(instance: &SlackInstance, binding: &ChannelBinding) -> Result<Self, DispatchError> {
        if instance.access_token.expose_secret().is_empty() {
            return Err(DispatchError::Config("access token not set".into()));
        }
        let channel = binding
            .resolve(instance)
            .ok_or_else(|| DispatchError::Config("channel not set".into()))?
            .to_string();
        let api = SlackApi::new(&instance.server_url, instance.access_token.clone())
            .map_err(|e| DispatchError::Config(e.to_string()))?;
        Ok(Self { api, channel })
    }

    /// Run the dispatch sequence for one alert event.
    pub async fn dispatch(&self, event: &AlertEvent) -> Result<DispatchReceipt, DispatchError> {
        let policy = mention_policy(event.status, event.old_status);
        if policy == MentionPolicy::Suppress {
            debug!(
                service = %event.service_name,
                status = %event.status,
                old_status = %event.old_status,
                "alert suppressed for this transition"
            );
            return Ok(DispatchReceipt::default());
        }

        // 1. Resolve recipients. Per-recipient failures are non-fatal; they
        //    degrade to a plain-text listing in the message.
        let (mention_ids, unresolved) = if policy == MentionPolicy::Mention {
            self.resolve_recipients(&event.recipients).await
        } else {
            (Vec::new(), Vec::new())
        };

        // 2. Ensure the bot is in the channel. Slack returns ok with an
        //    `already_in_channel` warning when it is, so this is idempotent.
        self.api
            .join_channel(&self.channel)
            .await
            .map_err(|source| DispatchError::ChannelJoin {
                channel: self.channel.clone(),
                source,
            })?;

        // 3. Invite mentioned users that are not members yet.
        self.ensure_members(&mention_ids).await?;

        // 4. Upload the attached image, keeping its permalink for the message.
        let image_permalink = match &event.image {
            Some(image) => Some(
                self.api
                    .upload_file(&self.channel, &image.file_name, image.data.clone())
                    .await
                    .map_err(|source| DispatchError::Upload {
                        channel: self.channel.clone(),
                        source,
                    })?,
            ),
            None => None,
        };

        // 5. Post the formatted message.
        let blocks =
            message::build_blocks(event, &mention_ids, &unresolved, image_permalink.as_deref());
        let text = message::fallback_text(event);
        let ts = self
            .api
            .post_message(&self.channel, &text, &blocks)
            .await
            .map_err(|source| DispatchError::Post {
                channel: self.channel.clone(),
                source,
            })?;

        info!(
            channel = %self.channel,
            service = %event.service_name,
            status = %event.status,
            ts = %ts,
            mentioned = mention_ids.len(),
            "alert posted"
        );

        Ok(DispatchReceipt {
            message_ts: Some(ts),
            mentioned: mention_ids,
            unresolved: unresolved
                .into_iter()
                .map(|recipient| recipient.identifier)
                .collect(),
        })
    }

    /// Map recipients to Slack user IDs. Profile overrides are honored when
    /// they look like user IDs; the `ignore` sentinel skips the recipient.
    async fn resolve_recipients(
        &self,
        recipients: &[Recipient],
    ) -> (Vec<String>, Vec<Recipient>) {
        let mut mention_ids = Vec::new();
        let mut unresolved = Vec::new();

        for recipient in recipients {
            if recipient.mention_disabled() {
                continue;
            }

            if let Some(id) = recipient.user_id_override.as_deref() {
                if id.starts_with('U') || id.starts_with('W') {
                    mention_ids.push(id.to_string());
                    continue;
                }
                warn!(
                    identifier = %recipient.identifier,
                    "user ID override is not a Slack user ID, falling back to email lookup"
                );
            }

            match self.api.lookup_user_by_email(&recipient.identifier).await {
                Ok(id) => mention_ids.push(id),
                Err(e) => {
                    if e.slack_error() == Some(USERS_NOT_FOUND) {
                        debug!(identifier = %recipient.identifier, "no Slack account for recipient");
                    } else {
                        warn!(
                            identifier = %recipient.identifier,
                            error = %e,
                            "unexpected error resolving recipient"
                        );
                    }
                    unresolved.push(recipient.clone());
                }
            }
        }

        (mention_ids, unresolved)
    }

    /// Invite the given user IDs, skipping those already in the channel.
    async fn ensure_members(&self, user_ids: &[String]) -> Result<(), DispatchError> {
        if user_ids.is_empty() {
            return Ok(());
        }

        let members = self
            .api
            .channel_members(&self.channel)
            .await
            .map_err(|source| DispatchError::Invite {
                channel: self.channel.clone(),
                source,
            })?;
        let missing: Vec<String> = user_ids
            .iter()
            .filter(|id| !members.contains(*id))
            .cloned()
            .collect();
        if missing.is_empty() {
            return Ok(());
        }

        match self.api.invite(&self.channel, &missing).await {
            Ok(()) => Ok(()),
            Err(e) if e.slack_error() == Some(ALREADY_IN_CHANNEL) => {
                debug!(channel = %self.channel, "invited users were already in channel");
                Ok(())
            },
            Err(source) => Err(DispatchError::Invite {
                channel: self.channel.clone(),
                source,
            }),
        }
    }
}
