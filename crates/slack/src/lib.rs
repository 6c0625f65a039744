//! Slack alert backend for the vigil monitoring host.
//!
//! Implements `AlertPlugin` by mapping each alert event to a short sequence
//! of Slack Web API calls: resolve recipients to user IDs, join the bound
//! channel, invite the resolved users, upload any attached image, and post
//! the formatted Block Kit message with @mentions.

pub mod api;
pub mod config;
pub mod dispatch;
pub mod gating;
pub mod message;
pub mod plugin;

pub use {
    config::{ChannelBinding, SlackAlertConfig, SlackInstance},
    dispatch::{DispatchError, DispatchReceipt, Dispatcher},
    plugin::SlackAlertPlugin,
};
