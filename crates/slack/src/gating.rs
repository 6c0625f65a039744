//! Mention gating by service status transition.
//!
//! Keeps repeat failures and acked noise out of the channel: some
//! transitions post without @mentions, some are not posted at all.

use vigil_alerts::ServiceStatus;

/// How loud an alert for a given transition may be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MentionPolicy {
    /// Post with @mentions.
    Mention,
    /// Post, but without @mentions.
    Quiet,
    /// Do not post at all.
    Suppress,
}

/// Decide the policy for a `old_status -> status` transition.
pub fn mention_policy(status: ServiceStatus, old_status: ServiceStatus) -> MentionPolicy {
    use ServiceStatus::*;
    match (status, old_status) {
        // Warnings never page anyone.
        (Warning, _) => MentionPolicy::Quiet,
        // Don't re-mention for a service that stays in ERROR.
        (Error, Error) => MentionPolicy::Quiet,
        // Recovery from an acked failure was already acknowledged.
        (Passing, Acked) => MentionPolicy::Suppress,
        (Passing, Warning) => MentionPolicy::Quiet,
        // ACKED posts once, quietly; repeats and post-recovery acks are dropped.
        (Acked, Acked) | (Acked, Passing) => MentionPolicy::Suppress,
        (Acked, _) => MentionPolicy::Quiet,
        _ => MentionPolicy::Mention,
    }
}
